//! Provider health sampling
//!
//! Health is sampled explicitly (no implicit background checks): the adapter
//! records the latest report and the router filters on it. A provider with no
//! sample yet reads as `Unknown`, which routing treats as eligible.

mod private
{
  use serde::{ Serialize, Deserialize };

  /// Health of a provider endpoint
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  pub enum HealthStatus
  {
    /// Responding within thresholds
    Healthy,
    /// Failing or responding too slowly
    Unhealthy,
    /// Not sampled yet
    Unknown,
  }

  /// How a health sample is taken
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  pub enum HealthCheckStrategy
  {
    /// Connectivity only, minimal overhead
    Ping,
    /// Cheap real call, more accurate
    LightweightCall,
  }

  /// Health sampling configuration
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct HealthCheckConfig
  {
    /// Sample timeout in milliseconds
    pub timeout_ms : u64,
    /// Latency above which a responding endpoint still counts unhealthy
    pub unhealthy_threshold_ms : u64,
    /// Sampling strategy
    pub strategy : HealthCheckStrategy,
  }

  impl Default for HealthCheckConfig
  {
    fn default() -> Self
    {
      Self
      {
        timeout_ms : 5000,
        unhealthy_threshold_ms : 5000,
        strategy : HealthCheckStrategy::LightweightCall,
      }
    }
  }

  /// Result of one health sample
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct HealthReport
  {
    /// Sampled status
    pub status : HealthStatus,
    /// Observed latency in milliseconds
    pub latency_ms : u64,
    /// Failure detail when unhealthy
    pub message : Option< String >,
    /// Sample timestamp, epoch milliseconds
    pub checked_at_ms : i64,
  }

  impl HealthReport
  {
    /// Report a healthy sample
    #[ must_use ]
    pub fn healthy( latency_ms : u64 ) -> Self
    {
      Self
      {
        status : HealthStatus::Healthy,
        latency_ms,
        message : None,
        checked_at_ms : chrono::Utc::now().timestamp_millis(),
      }
    }

    /// Report a failed sample
    #[ must_use ]
    pub fn unhealthy( latency_ms : u64, message : impl Into< String > ) -> Self
    {
      Self
      {
        status : HealthStatus::Unhealthy,
        latency_ms,
        message : Some( message.into() ),
        checked_at_ms : chrono::Utc::now().timestamp_millis(),
      }
    }

    /// Report that no sample has been taken
    #[ must_use ]
    pub fn unknown() -> Self
    {
      Self
      {
        status : HealthStatus::Unknown,
        latency_ms : 0,
        message : None,
        checked_at_ms : chrono::Utc::now().timestamp_millis(),
      }
    }

    /// Apply the latency threshold of `config` to a nominally healthy sample
    #[ must_use ]
    pub fn with_threshold( mut self, config : &HealthCheckConfig ) -> Self
    {
      if self.status == HealthStatus::Healthy && self.latency_ms > config.unhealthy_threshold_ms
      {
        self.status = HealthStatus::Unhealthy;
        self.message = Some( format!( "latency {}ms above threshold {}ms", self.latency_ms, config.unhealthy_threshold_ms ) );
      }
      self
    }

    /// Whether routing may send traffic here
    #[ inline ]
    #[ must_use ]
    pub fn is_routable( &self ) -> bool
    {
      matches!( self.status, HealthStatus::Healthy | HealthStatus::Unknown )
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    HealthCheckConfig,
    HealthCheckStrategy,
    HealthReport,
    HealthStatus,
  };
}

//! Gateway configuration
//!
//! Typed configuration records for the control plane. Every record has
//! explicit defaults matching the documented contract and a `validate()`
//! used at engine init; out-of-range values are rejected up front rather
//! than clamped at use sites.

mod private
{
  use serde::{ Serialize, Deserialize };
  use crate::error::{ GatewayError, GatewayResult };
  use crate::circuit_breaker::CircuitBreakerConfig;
  use crate::router::RouterConfig;
  use crate::sampling::SamplingBounds;

  /// Warm pool sizing and eviction
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct PoolConfig
  {
    /// Maximum number of resident runners before LRU eviction
    pub max_size : usize,
    /// Idle time after which a runner is evicted (milliseconds)
    pub idle_ttl_ms : u64,
    /// Whether prewarm requests are honored
    pub warmup_enabled : bool,
  }

  impl Default for PoolConfig
  {
    fn default() -> Self
    {
      Self
      {
        max_size : 4,
        idle_ttl_ms : 600_000,
        warmup_enabled : true,
      }
    }
  }

  /// Default quota window applied when a tenant has no explicit limit
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct QuotaWindowConfig
  {
    /// Units allowed per window
    pub default_limit : u64,
    /// Window length in milliseconds
    pub default_window_ms : u64,
  }

  impl Default for QuotaWindowConfig
  {
    fn default() -> Self
    {
      Self
      {
        default_limit : 1000,
        default_window_ms : 60_000,
      }
    }
  }

  /// Streaming emitter buffering
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct StreamBufferConfig
  {
    /// Bounded channel capacity between producer and consumer
    pub capacity : usize,
  }

  impl Default for StreamBufferConfig
  {
    fn default() -> Self
    {
      Self { capacity : 32 }
    }
  }

  /// Top-level configuration of the control plane
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct GatewayConfig
  {
    /// Hard ceiling for caller-supplied deadlines (milliseconds)
    pub max_deadline_ms : u64,
    /// Deadline applied when the caller supplies none (milliseconds)
    pub default_deadline_ms : u64,
    /// Window in which a duplicate in-flight request id is rejected (milliseconds)
    pub dedup_window_ms : u64,
    /// Hard timeout for a single provider call (milliseconds)
    pub provider_call_timeout_ms : u64,
    /// Soft per-phase budget; overruns are observed, never enforced (milliseconds)
    pub phase_soft_budget_ms : u64,
    /// Maximum EXECUTE attempts (1 = no retry)
    pub max_attempts : u32,
    /// Base backoff delay between EXECUTE retries (milliseconds)
    pub retry_base_ms : u64,
    /// Backoff cap (milliseconds)
    pub retry_max_backoff_ms : u64,
    /// Router weights and normalization bounds
    pub router : RouterConfig,
    /// Circuit breaker applied to every provider
    pub breaker : CircuitBreakerConfig,
    /// Warm pool sizing
    pub pool : PoolConfig,
    /// Default quota window
    pub quota : QuotaWindowConfig,
    /// Streaming buffer sizing
    pub streaming : StreamBufferConfig,
    /// Bounds enforced on caller-supplied sampling parameters
    pub sampling : SamplingBounds,
  }

  impl Default for GatewayConfig
  {
    fn default() -> Self
    {
      Self
      {
        max_deadline_ms : 120_000,
        default_deadline_ms : 30_000,
        dedup_window_ms : 60_000,
        provider_call_timeout_ms : 60_000,
        phase_soft_budget_ms : 1_000,
        max_attempts : 3,
        retry_base_ms : 100,
        retry_max_backoff_ms : 10_000,
        router : RouterConfig::default(),
        breaker : CircuitBreakerConfig::default(),
        pool : PoolConfig::default(),
        quota : QuotaWindowConfig::default(),
        streaming : StreamBufferConfig::default(),
        sampling : SamplingBounds::default(),
      }
    }
  }

  impl GatewayConfig
  {
    /// Create a configuration with documented defaults
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Set the server-side deadline ceiling
    #[ must_use ]
    pub fn with_max_deadline_ms( mut self, max_deadline_ms : u64 ) -> Self
    {
      self.max_deadline_ms = max_deadline_ms;
      self
    }

    /// Set the maximum EXECUTE attempts
    #[ must_use ]
    pub fn with_max_attempts( mut self, max_attempts : u32 ) -> Self
    {
      self.max_attempts = max_attempts;
      self
    }

    /// Set the retry backoff base
    #[ must_use ]
    pub fn with_retry_base_ms( mut self, retry_base_ms : u64 ) -> Self
    {
      self.retry_base_ms = retry_base_ms;
      self
    }

    /// Replace the router configuration
    #[ must_use ]
    pub fn with_router( mut self, router : RouterConfig ) -> Self
    {
      self.router = router;
      self
    }

    /// Replace the breaker configuration
    #[ must_use ]
    pub fn with_breaker( mut self, breaker : CircuitBreakerConfig ) -> Self
    {
      self.breaker = breaker;
      self
    }

    /// Replace the warm pool configuration
    #[ must_use ]
    pub fn with_pool( mut self, pool : PoolConfig ) -> Self
    {
      self.pool = pool;
      self
    }

    /// Replace the default quota window
    #[ must_use ]
    pub fn with_quota( mut self, quota : QuotaWindowConfig ) -> Self
    {
      self.quota = quota;
      self
    }

    /// Apply `GATEWAY_*` environment overrides
    ///
    /// Recognized variables : `GATEWAY_MAX_DEADLINE_MS`,
    /// `GATEWAY_DEFAULT_DEADLINE_MS`, `GATEWAY_MAX_ATTEMPTS`,
    /// `GATEWAY_RETRY_BASE_MS`, `GATEWAY_PROVIDER_CALL_TIMEOUT_MS`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable that failed to parse.
    pub fn with_env_overrides( mut self ) -> error_tools::untyped::Result< Self >
    {
      fn parse_var( name : &str ) -> error_tools::untyped::Result< Option< u64 > >
      {
        match std::env::var( name )
        {
          Ok( raw ) => match raw.trim().parse::< u64 >()
          {
            Ok( value ) => Ok( Some( value ) ),
            Err( _ ) => Err( error_tools::Error::msg( format!( "{name} must be an integer, got '{raw}'" ) ) ),
          },
          Err( _ ) => Ok( None ),
        }
      }

      if let Some( value ) = parse_var( "GATEWAY_MAX_DEADLINE_MS" )?
      {
        self.max_deadline_ms = value;
      }
      if let Some( value ) = parse_var( "GATEWAY_DEFAULT_DEADLINE_MS" )?
      {
        self.default_deadline_ms = value;
      }
      if let Some( value ) = parse_var( "GATEWAY_MAX_ATTEMPTS" )?
      {
        self.max_attempts = value as u32;
      }
      if let Some( value ) = parse_var( "GATEWAY_RETRY_BASE_MS" )?
      {
        self.retry_base_ms = value;
      }
      if let Some( value ) = parse_var( "GATEWAY_PROVIDER_CALL_TIMEOUT_MS" )?
      {
        self.provider_call_timeout_ms = value;
      }
      Ok( self )
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` naming the first offending field.
    pub fn validate( &self ) -> GatewayResult< () >
    {
      if self.max_attempts == 0
      {
        return Err( GatewayError::invalid_argument( "max_attempts must be >= 1" ) );
      }
      if self.retry_base_ms == 0
      {
        return Err( GatewayError::invalid_argument( "retry_base_ms must be > 0" ) );
      }
      if self.retry_max_backoff_ms < self.retry_base_ms
      {
        return Err( GatewayError::invalid_argument( "retry_max_backoff_ms must be >= retry_base_ms" ) );
      }
      if self.default_deadline_ms == 0 || self.max_deadline_ms == 0
      {
        return Err( GatewayError::invalid_argument( "deadlines must be > 0" ) );
      }
      if self.default_deadline_ms > self.max_deadline_ms
      {
        return Err( GatewayError::invalid_argument( "default_deadline_ms must be <= max_deadline_ms" ) );
      }
      if self.streaming.capacity == 0
      {
        return Err( GatewayError::invalid_argument( "streaming.capacity must be > 0" ) );
      }
      if self.pool.max_size == 0
      {
        return Err( GatewayError::invalid_argument( "pool.max_size must be > 0" ) );
      }
      self.router.validate()?;
      self.breaker.validate()?;
      Ok( () )
    }

    /// Check whether the configuration is valid
    #[ must_use ]
    pub fn is_valid( &self ) -> bool
    {
      self.validate().is_ok()
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    GatewayConfig,
    PoolConfig,
    QuotaWindowConfig,
    StreamBufferConfig,
  };
}

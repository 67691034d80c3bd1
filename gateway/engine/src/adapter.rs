//! Provider adapter
//!
//! Every registered provider is wrapped in a `ProviderAdapter` which applies
//! the cross-cutting machinery in a fixed order: per-(tenant, provider) quota
//! reservation, circuit breaker admission, hard call timeout, error
//! classification and health caching. The router only ever sees adapters.
//!
//! Gate ordering matters: quota is reserved before the breaker is consulted,
//! so a short-circuited call can return its reservation without having to
//! abort an admitted breaker probe.

mod private
{
  use std::sync::Arc;
  use std::time::{ Duration, Instant };
  use parking_lot::Mutex;
  use crate::error::{ GatewayError, GatewayResult };
  use crate::provider::
  {
    Provider,
    ProviderCapabilities,
    ProviderEventStream,
    ProviderProfile,
    ProviderResponse,
    ProviderState,
  };
  use crate::circuit_breaker::{ BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics };
  use crate::quota::{ QuotaKey, QuotaService };
  use crate::health::{ HealthCheckConfig, HealthReport, HealthStatus };
  use crate::request::{ InferenceRequest, Usage };
  use crate::sampling::SamplingConfig;
  use crate::context::TenantContext;

  #[ derive( Debug, Default ) ]
  struct CallStats
  {
    total : u64,
    succeeded : u64,
  }

  /// A provider wrapped with quota, breaker, timeout and health machinery
  pub struct ProviderAdapter
  {
    provider : Arc< dyn Provider >,
    breaker : Arc< CircuitBreaker >,
    quota : Arc< dyn QuotaService >,
    call_timeout : Duration,
    health_config : HealthCheckConfig,
    last_health : Mutex< HealthReport >,
    state : Mutex< ProviderState >,
    stats : Arc< Mutex< CallStats > >,
  }

  impl std::fmt::Debug for ProviderAdapter
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "ProviderAdapter" )
        .field( "provider", &self.provider.id() )
        .field( "state", &*self.state.lock() )
        .finish_non_exhaustive()
    }
  }

  impl ProviderAdapter
  {
    /// Wrap an initialized provider
    #[ must_use ]
    pub fn new
    (
      provider : Arc< dyn Provider >,
      quota : Arc< dyn QuotaService >,
      breaker_config : CircuitBreakerConfig,
      call_timeout_ms : u64,
    ) -> Self
    {
      Self
      {
        provider,
        breaker : Arc::new( CircuitBreaker::new( breaker_config ) ),
        quota,
        call_timeout : Duration::from_millis( call_timeout_ms ),
        health_config : HealthCheckConfig::default(),
        last_health : Mutex::new( HealthReport::unknown() ),
        state : Mutex::new( ProviderState::Initialized ),
        stats : Arc::new( Mutex::new( CallStats::default() ) ),
      }
    }

    /// Override the health sampling configuration
    #[ must_use ]
    pub fn with_health_config( mut self, health_config : HealthCheckConfig ) -> Self
    {
      self.health_config = health_config;
      self
    }

    /// Provider identifier
    pub fn id( &self ) -> &str
    {
      self.provider.id()
    }

    /// Provider capability flags
    pub fn capabilities( &self ) -> ProviderCapabilities
    {
      self.provider.capabilities()
    }

    /// Static scoring profile
    pub fn profile( &self ) -> ProviderProfile
    {
      self.provider.profile()
    }

    /// Whether the wrapped provider claims support for the model
    pub fn supports( &self, model_id : &str, tenant : &TenantContext ) -> bool
    {
      self.provider.supports( model_id, tenant )
    }

    /// Lifecycle state as tracked by this adapter
    pub fn state( &self ) -> ProviderState
    {
      *self.state.lock()
    }

    /// Consistent breaker snapshot for routing
    pub fn breaker_snapshot( &self ) -> BreakerSnapshot
    {
      self.breaker.snapshot()
    }

    /// Breaker lifetime counters
    pub fn breaker_metrics( &self ) -> CircuitBreakerMetrics
    {
      self.breaker.metrics()
    }

    /// Whether the breaker would currently admit a regular call
    pub fn breaker_permits( &self ) -> bool
    {
      self.breaker.is_call_permitted()
    }

    /// Success ratio over the adapter's lifetime, 1.0 before any call
    pub fn reliability( &self ) -> f64
    {
      let stats = self.stats.lock();
      if stats.total == 0
      {
        1.0
      }
      else
      {
        stats.succeeded as f64 / stats.total as f64
      }
    }

    /// Remaining per-(tenant, provider) quota units
    ///
    /// # Errors
    ///
    /// Propagates quota service failures.
    pub async fn quota_remaining( &self, tenant_id : &str ) -> GatewayResult< u64 >
    {
      let key = QuotaKey::provider( tenant_id, self.id() );
      Ok( self.quota.check( &key ).await?.remaining )
    }

    /// Latest cached health report
    pub fn health( &self ) -> HealthReport
    {
      self.last_health.lock().clone()
    }

    /// Sample provider health and update the cache
    pub async fn refresh_health( &self ) -> HealthReport
    {
      let started = Instant::now();
      let report = match tokio::time::timeout
      (
        Duration::from_millis( self.health_config.timeout_ms ),
        self.provider.health(),
      ).await
      {
        Ok( report ) => report.with_threshold( &self.health_config ),
        Err( _elapsed ) => HealthReport::unhealthy
        (
          started.elapsed().as_millis() as u64,
          "health sample timed out",
        ),
      };

      {
        let mut state = self.state.lock();
        if *state != ProviderState::Shutdown
        {
          *state = match report.status
          {
            HealthStatus::Healthy => ProviderState::Healthy,
            HealthStatus::Unhealthy => ProviderState::Unhealthy,
            HealthStatus::Unknown => *state,
          };
        }
      }
      *self.last_health.lock() = report.clone();
      report
    }

    fn ensure_serving( &self ) -> GatewayResult< () >
    {
      if *self.state.lock() == ProviderState::Shutdown
      {
        return Err( GatewayError::provider_unavailable( format!( "provider '{}' is shut down", self.id() ) ) );
      }
      Ok( () )
    }

    fn record_call( &self, succeeded : bool )
    {
      let mut stats = self.stats.lock();
      stats.total += 1;
      if succeeded
      {
        stats.succeeded += 1;
      }
    }

    /// Execute a non-streaming call through all gates
    ///
    /// # Errors
    ///
    /// `QUOTA_EXHAUSTED` before dispatch, `CIRCUIT_OPEN` on short-circuit,
    /// classified provider errors or a timeout mapped to `PROVIDER_TRANSIENT`.
    pub async fn infer( &self, request : &InferenceRequest, sampling : &SamplingConfig ) -> GatewayResult< ProviderResponse >
    {
      self.ensure_serving()?;
      let key = QuotaKey::provider( &request.tenant_id, self.id() );
      self.quota.reserve( &key, 1 ).await
        .map_err( | error | error.with_provider( self.id() ).with_request( &request.request_id ) )?;

      if let Err( error ) = self.breaker.try_acquire( self.id() )
      {
        self.quota.release( &key, 1 ).await.ok();
        return Err( error.with_request( &request.request_id ) );
      }

      match tokio::time::timeout( self.call_timeout, self.provider.infer( request, sampling ) ).await
      {
        Ok( Ok( response ) ) =>
        {
          self.breaker.record_success();
          self.record_call( true );
          self.quota.record_usage( &key, 1, response.usage.total() ).await?;
          Ok( response )
        },
        Ok( Err( error ) ) =>
        {
          let error = error.with_provider( self.id() ).with_request( &request.request_id );
          if error.counts_toward_breaker()
          {
            self.breaker.record_failure( self.id() );
          }
          self.record_call( false );
          self.quota.release( &key, 1 ).await.ok();
          Err( error )
        },
        Err( _elapsed ) =>
        {
          let error = GatewayError::provider_transient
          (
            format!( "provider call timed out after {}ms", self.call_timeout.as_millis() )
          )
          .with_provider( self.id() )
          .with_request( &request.request_id );
          self.breaker.record_failure( self.id() );
          self.record_call( false );
          self.quota.release( &key, 1 ).await.ok();
          Err( error )
        },
      }
    }

    /// Open a streaming call through all gates
    ///
    /// The returned [`StreamSettlement`] must be resolved exactly once by the
    /// stream driver: `complete` on a final chunk, `fail` on a stream error,
    /// `cancel` when the consumer went away.
    ///
    /// # Errors
    ///
    /// Same admission errors as [`Self::infer`].
    pub async fn begin_stream( &self, request : &InferenceRequest, sampling : &SamplingConfig )
      -> GatewayResult< ( ProviderEventStream, StreamSettlement ) >
    {
      self.ensure_serving()?;
      let key = QuotaKey::provider( &request.tenant_id, self.id() );
      self.quota.reserve( &key, 1 ).await
        .map_err( | error | error.with_provider( self.id() ).with_request( &request.request_id ) )?;

      if let Err( error ) = self.breaker.try_acquire( self.id() )
      {
        self.quota.release( &key, 1 ).await.ok();
        return Err( error.with_request( &request.request_id ) );
      }

      match tokio::time::timeout( self.call_timeout, self.provider.stream( request, sampling ) ).await
      {
        Ok( Ok( events ) ) =>
        {
          let settlement = StreamSettlement
          {
            provider_id : self.id().to_string(),
            key,
            quota : self.quota.clone(),
            breaker : self.breaker.clone(),
            stats : self.stats.clone(),
          };
          Ok( ( events, settlement ) )
        },
        Ok( Err( error ) ) =>
        {
          let error = error.with_provider( self.id() ).with_request( &request.request_id );
          if error.counts_toward_breaker()
          {
            self.breaker.record_failure( self.id() );
          }
          self.record_call( false );
          self.quota.release( &key, 1 ).await.ok();
          Err( error )
        },
        Err( _elapsed ) =>
        {
          let error = GatewayError::provider_transient
          (
            format!( "provider stream setup timed out after {}ms", self.call_timeout.as_millis() )
          )
          .with_provider( self.id() )
          .with_request( &request.request_id );
          self.breaker.record_failure( self.id() );
          self.record_call( false );
          self.quota.release( &key, 1 ).await.ok();
          Err( error )
        },
      }
    }

    /// Shut the provider down; further calls fail
    ///
    /// # Errors
    ///
    /// Propagates the provider's shutdown failure after marking the adapter.
    pub async fn shutdown( &self ) -> GatewayResult< () >
    {
      *self.state.lock() = ProviderState::Shutdown;
      self.provider.shutdown().await
    }
  }

  /// Pending accounting of an open stream
  ///
  /// Exactly one of the three outcomes must be called once the stream ends.
  pub struct StreamSettlement
  {
    provider_id : String,
    key : QuotaKey,
    quota : Arc< dyn QuotaService >,
    breaker : Arc< CircuitBreaker >,
    stats : Arc< Mutex< CallStats > >,
  }

  impl std::fmt::Debug for StreamSettlement
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "StreamSettlement" )
        .field( "provider_id", &self.provider_id )
        .field( "key", &self.key )
        .finish_non_exhaustive()
    }
  }

  impl StreamSettlement
  {
    /// The stream finished with a final chunk
    pub async fn complete( self, usage : Usage )
    {
      self.breaker.record_success();
      {
        let mut stats = self.stats.lock();
        stats.total += 1;
        stats.succeeded += 1;
      }
      self.quota.record_usage( &self.key, 1, usage.total() ).await.ok();
    }

    /// The stream failed mid-flight
    pub async fn fail( self, error : &GatewayError )
    {
      if error.counts_toward_breaker()
      {
        self.breaker.record_failure( &self.provider_id );
      }
      {
        let mut stats = self.stats.lock();
        stats.total += 1;
      }
      self.quota.release( &self.key, 1 ).await.ok();
    }

    /// The consumer cancelled before the stream ended
    ///
    /// No success or failure is recorded; an admitted breaker probe is given
    /// back so the next call may probe again.
    pub async fn cancel( self )
    {
      self.breaker.release_probe();
      self.quota.release( &self.key, 1 ).await.ok();
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ProviderAdapter,
    StreamSettlement,
  };
}

//! Process-wide engine state
//!
//! `EngineContext` is the read-only handle every component receives: the
//! provider registry, the router, the quota service, configuration and the
//! observability sinks. It is created explicitly with `init( config )` and
//! torn down with `shutdown()`; nothing in the crate starts implicitly.

mod private
{
  use std::sync::Arc;
  use tokio_util::sync::CancellationToken;
  use crate::adapter::ProviderAdapter;
  use crate::config::GatewayConfig;
  use crate::error::{ GatewayError, GatewayResult };
  use crate::provider::Provider;
  use crate::quota::{ InMemoryQuotaService, QuotaService };
  use crate::registry::ProviderRegistry;
  use crate::router::Router;

  #[ cfg( feature = "observability" ) ]
  use crate::observability::MetricsRegistry;
  #[ cfg( feature = "async-jobs" ) ]
  use crate::jobs::JobStore;

  /// Read-only process-wide context
  ///
  /// Requests hold it behind a `Weak` back-reference; the process owner holds
  /// the `Arc` returned by `init`.
  #[ derive( Debug ) ]
  pub struct EngineContext
  {
    config : GatewayConfig,
    registry : ProviderRegistry,
    router : Router,
    quota : Arc< dyn QuotaService >,
    shutdown : CancellationToken,
    #[ cfg( feature = "observability" ) ]
    metrics : MetricsRegistry,
    #[ cfg( feature = "async-jobs" ) ]
    jobs : JobStore,
  }

  impl EngineContext
  {
    /// Initialize the engine with the bundled per-node quota service
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` when the configuration is invalid.
    pub fn init( config : GatewayConfig ) -> GatewayResult< Arc< Self > >
    {
      let quota = Arc::new( InMemoryQuotaService::new( config.quota.clone() ) );
      Self::init_with_quota( config, quota )
    }

    /// Initialize the engine with an external quota service
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` when the configuration is invalid.
    pub fn init_with_quota( config : GatewayConfig, quota : Arc< dyn QuotaService > ) -> GatewayResult< Arc< Self > >
    {
      config.validate()?;
      Ok( Arc::new( Self
      {
        router : Router::new( config.router.clone() ),
        registry : ProviderRegistry::new(),
        quota,
        shutdown : CancellationToken::new(),
        #[ cfg( feature = "observability" ) ]
        metrics : MetricsRegistry::new(),
        #[ cfg( feature = "async-jobs" ) ]
        jobs : JobStore::new(),
        config,
      } ) )
    }

    /// Engine configuration
    pub fn config( &self ) -> &GatewayConfig
    {
      &self.config
    }

    /// Provider catalogue
    pub fn registry( &self ) -> &ProviderRegistry
    {
      &self.registry
    }

    /// Request router
    pub fn router( &self ) -> &Router
    {
      &self.router
    }

    /// Quota service handle
    pub fn quota( &self ) -> &Arc< dyn QuotaService >
    {
      &self.quota
    }

    /// Token observed by background tasks; fires on shutdown
    pub fn shutdown_token( &self ) -> CancellationToken
    {
      self.shutdown.clone()
    }

    /// Metrics sink
    #[ cfg( feature = "observability" ) ]
    pub fn metrics( &self ) -> &MetricsRegistry
    {
      &self.metrics
    }

    /// Async job store
    #[ cfg( feature = "async-jobs" ) ]
    pub fn jobs( &self ) -> &JobStore
    {
      &self.jobs
    }

    /// Wrap an initialized provider in an adapter and register it
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` when the provider id is already taken.
    pub fn register_provider( &self, provider : Box< dyn Provider > ) -> GatewayResult< () >
    {
      let adapter = ProviderAdapter::new
      (
        Arc::from( provider ),
        self.quota.clone(),
        self.config.breaker.clone(),
        self.config.provider_call_timeout_ms,
      );
      self.registry.register( Arc::new( adapter ) )
    }

    /// Unregister a provider and shut it down
    ///
    /// In-flight requests holding the adapter finish undisturbed.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` when the id is unknown, or the provider's
    /// shutdown failure.
    pub async fn unregister_provider( &self, provider_id : &str ) -> GatewayResult< () >
    {
      match self.registry.unregister( provider_id )
      {
        Some( adapter ) => adapter.shutdown().await,
        None => Err( GatewayError::invalid_argument( format!( "provider '{provider_id}' is not registered" ) ) ),
      }
    }

    /// Sample health of every registered provider
    pub async fn refresh_health( &self )
    {
      for adapter in self.registry.all()
      {
        adapter.refresh_health().await;
      }
    }

    /// Spawn the periodic health sampler
    ///
    /// Samples every `interval_ms` until `shutdown()` fires. Nothing starts
    /// implicitly; the process owner opts in once at startup.
    pub fn spawn_health_sampler( engine : &Arc< Self >, interval_ms : u64 ) -> tokio::task::JoinHandle< () >
    {
      let engine = engine.clone();
      let token = engine.shutdown.clone();
      tokio::spawn( async move
      {
        let period = std::time::Duration::from_millis( interval_ms.max( 1 ) );
        loop
        {
          tokio::select!
          {
            () = token.cancelled() => break,
            () = tokio::time::sleep( period ) =>
            {
              engine.refresh_health().await;
            },
          }
        }
      } )
    }

    /// Tear the engine down : stop background tasks, shut providers down
    ///
    /// # Errors
    ///
    /// Returns the first provider shutdown failure, after attempting all.
    pub async fn shutdown( &self ) -> GatewayResult< () >
    {
      self.shutdown.cancel();
      let mut first_failure = None;
      for id in self.registry.ids()
      {
        if let Some( adapter ) = self.registry.unregister( &id )
        {
          if let Err( error ) = adapter.shutdown().await
          {
            first_failure.get_or_insert( error );
          }
        }
      }
      match first_failure
      {
        Some( error ) => Err( error ),
        None => Ok( () ),
      }
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    EngineContext,
  };
}

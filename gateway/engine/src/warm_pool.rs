//! Runner cache and warm pool
//!
//! Local providers draw loaded model instances from the pool. For every
//! `( manifest, runner )` key there is at most one resident runner; concurrent
//! `get_or_create` calls for a missing key coalesce onto a single load, and a
//! failed load surfaces to every waiter without being cached. LRU metadata is
//! kept separately from the slot map; the pool mutex guards only map and
//! pointer moves, never a load or a close.

#[ cfg( feature = "warm-pool" ) ]
mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;
  use std::time::Instant;
  use lru::LruCache;
  use parking_lot::Mutex;
  use serde::{ Serialize, Deserialize };
  use tokio::sync::broadcast;
  use crate::config::PoolConfig;
  use crate::error::{ GatewayError, GatewayResult };

  #[ cfg( feature = "logging" ) ]
  use tracing::{ debug, warn };

  /// Lifecycle of a loaded model instance
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  pub enum RunnerState
  {
    /// Constructed, nothing loaded
    Created,
    /// Weights loaded, not yet serving
    Loaded,
    /// Idle and claimable
    Ready,
    /// Serving a forward pass
    Busy,
    /// Resources released
    Closed,
  }

  /// Identity of a pooled runner
  #[ derive( Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize ) ]
  pub struct RunnerKey
  {
    /// Manifest identity, typically `model_id@version`
    pub manifest_id : String,
    /// Runner implementation name, e.g. `gguf-cpu`
    pub runner_name : String,
  }

  impl RunnerKey
  {
    /// Create a key
    #[ must_use ]
    pub fn new( manifest_id : impl Into< String >, runner_name : impl Into< String > ) -> Self
    {
      Self
      {
        manifest_id : manifest_id.into(),
        runner_name : runner_name.into(),
      }
    }
  }

  impl std::fmt::Display for RunnerKey
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      write!( f, "{}/{}", self.manifest_id, self.runner_name )
    }
  }

  /// A loaded model instance owned by the pool
  #[ async_trait::async_trait ]
  pub trait Runner : Send + Sync
  {
    /// Current lifecycle state
    fn state( &self ) -> RunnerState;

    /// Release native and file resources deterministically
    ///
    /// # Errors
    ///
    /// Implementations report release failures; the pool logs and drops the
    /// instance regardless.
    async fn close( &self ) -> GatewayResult< () >;
  }

  /// Loads runners for the pool
  #[ async_trait::async_trait ]
  pub trait RunnerFactory< R > : Send + Sync
  {
    /// Load a runner for `key`; called at most once per resident instance
    async fn load( &self, key : &RunnerKey ) -> GatewayResult< Arc< R > >;
  }

  enum Slot< R >
  {
    Ready
    {
      runner : Arc< R >,
      last_used : Instant,
    },
    Loading( broadcast::Sender< Result< Arc< R >, GatewayError > > ),
  }

  struct PoolInner< R >
  {
    slots : HashMap< RunnerKey, Slot< R > >,
    // LRU metadata for Ready slots only; Loading slots are never evicted.
    lru : LruCache< RunnerKey, () >,
  }

  impl< R > PoolInner< R >
  {
    fn ready_count( &self ) -> usize
    {
      self.lru.len()
    }
  }

  /// Cache of loaded runners with load coalescing and LRU eviction
  pub struct WarmPool< R >
  {
    config : PoolConfig,
    factory : Arc< dyn RunnerFactory< R > >,
    inner : Mutex< PoolInner< R > >,
  }

  impl< R > std::fmt::Debug for WarmPool< R >
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      let inner = self.inner.lock();
      f.debug_struct( "WarmPool" )
        .field( "resident", &inner.ready_count() )
        .field( "max_size", &self.config.max_size )
        .finish_non_exhaustive()
    }
  }

  impl< R > WarmPool< R >
  where
    R : Runner + Send + Sync + 'static,
  {
    /// Create a pool over a factory
    #[ must_use ]
    pub fn new( config : PoolConfig, factory : Arc< dyn RunnerFactory< R > > ) -> Self
    {
      Self
      {
        config,
        factory,
        inner : Mutex::new( PoolInner
        {
          slots : HashMap::new(),
          lru : LruCache::unbounded(),
        } ),
      }
    }

    /// Return the cached runner or load it, coalescing concurrent loads
    ///
    /// # Errors
    ///
    /// Surfaces the factory error to every coalesced waiter; the key is not
    /// cached after a failed load.
    pub async fn get_or_create( &self, key : &RunnerKey ) -> GatewayResult< Arc< R > >
    {
      // Fast path and single-flight admission under one lock acquisition.
      let waiter = {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match inner.slots.get_mut( key )
        {
          Some( Slot::Ready { runner, last_used } ) =>
          {
            *last_used = Instant::now();
            inner.lru.get( key );
            return Ok( runner.clone() );
          },
          Some( Slot::Loading( sender ) ) => Some( sender.subscribe() ),
          None =>
          {
            let ( sender, _receiver ) = broadcast::channel( 1 );
            inner.slots.insert( key.clone(), Slot::Loading( sender ) );
            None
          },
        }
      };

      if let Some( mut receiver ) = waiter
      {
        return match receiver.recv().await
        {
          Ok( outcome ) => outcome,
          Err( _closed ) => Err( GatewayError::internal( format!( "runner load for '{key}' was abandoned" ) ) ),
        };
      }

      // This caller owns the load; the lock is not held across it.
      let loaded = self.factory.load( key ).await;

      let ( outcome, evicted ) = {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let sender = match inner.slots.remove( key )
        {
          Some( Slot::Loading( sender ) ) => Some( sender ),
          // close() raced the load and dropped the slot; nothing waits.
          _ => None,
        };

        let mut evicted = Vec::new();
        let outcome = match loaded
        {
          Ok( runner ) =>
          {
            inner.slots.insert( key.clone(), Slot::Ready
            {
              runner : runner.clone(),
              last_used : Instant::now(),
            } );
            inner.lru.put( key.clone(), () );
            while inner.ready_count() > self.config.max_size
            {
              if let Some( ( victim, () ) ) = inner.lru.pop_lru()
              {
                if let Some( Slot::Ready { runner, .. } ) = inner.slots.remove( &victim )
                {
                  evicted.push( ( victim, runner ) );
                }
              }
              else
              {
                break;
              }
            }
            Ok( runner )
          },
          Err( error ) => Err( error ),
        };

        if let Some( sender ) = sender
        {
          sender.send( outcome.clone() ).ok();
        }
        ( outcome, evicted )
      };

      for ( victim, runner ) in evicted
      {
        #[ cfg( feature = "logging" ) ]
        debug!( key = %victim, "evicting runner over pool capacity" );
        #[ cfg( not( feature = "logging" ) ) ]
        let _ = &victim;
        runner.close().await.ok();
      }

      outcome
    }

    /// Best-effort background load of a set of keys
    ///
    /// Honored only when warmup is enabled; load failures are logged and
    /// never raised.
    pub async fn prewarm( &self, keys : &[ RunnerKey ] )
    {
      if !self.config.warmup_enabled
      {
        return;
      }
      for key in keys
      {
        if let Err( _error ) = self.get_or_create( key ).await
        {
          #[ cfg( feature = "logging" ) ]
          warn!( key = %key, error = %_error, "prewarm load failed" );
        }
      }
    }

    /// Evict and release one key
    ///
    /// A load in flight for the key is left to finish and cache; call again
    /// afterwards to evict the late arrival.
    pub async fn close( &self, key : &RunnerKey ) -> GatewayResult< () >
    {
      let removed = {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.lru.pop( key );
        match inner.slots.remove( key )
        {
          Some( Slot::Ready { runner, .. } ) => Some( runner ),
          Some( loading @ Slot::Loading( .. ) ) =>
          {
            // The load keeps going and will cache; put its slot back.
            inner.slots.insert( key.clone(), loading );
            None
          },
          None => None,
        }
      };
      match removed
      {
        Some( runner ) => runner.close().await,
        None => Ok( () ),
      }
    }

    /// Evict runners idle longer than the configured TTL
    pub async fn evict_idle( &self )
    {
      let ttl = std::time::Duration::from_millis( self.config.idle_ttl_ms );
      let stale : Vec< ( RunnerKey, Arc< R > ) > = {
        let mut inner = self.inner.lock();
        let keys : Vec< RunnerKey > = inner.slots.iter()
          .filter_map( | ( key, slot ) | match slot
          {
            Slot::Ready { last_used, .. } if last_used.elapsed() >= ttl => Some( key.clone() ),
            _ => None,
          } )
          .collect();
        keys.into_iter()
          .filter_map( | key |
          {
            inner.lru.pop( &key );
            match inner.slots.remove( &key )
            {
              Some( Slot::Ready { runner, .. } ) => Some( ( key, runner ) ),
              _ => None,
            }
          } )
          .collect()
      };
      for ( _key, runner ) in stale
      {
        #[ cfg( feature = "logging" ) ]
        debug!( key = %_key, "evicting idle runner" );
        runner.close().await.ok();
      }
    }

    /// Number of resident runners
    pub fn resident( &self ) -> usize
    {
      self.inner.lock().ready_count()
    }

    /// Whether a ready runner exists for the key
    pub fn contains( &self, key : &RunnerKey ) -> bool
    {
      matches!( self.inner.lock().slots.get( key ), Some( Slot::Ready { .. } ) )
    }

    /// Close every resident runner
    pub async fn shutdown( &self )
    {
      let drained : Vec< Arc< R > > = {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.slots.drain()
          .filter_map( | ( _key, slot ) | match slot
          {
            Slot::Ready { runner, .. } => Some( runner ),
            Slot::Loading( .. ) => None,
          } )
          .collect()
      };
      for runner in drained
      {
        runner.close().await.ok();
      }
    }
  }
}

#[ cfg( feature = "warm-pool" ) ]
crate::mod_interface!
{
  exposed use
  {
    Runner,
    RunnerFactory,
    RunnerKey,
    RunnerState,
    WarmPool,
  };
}

#[ cfg( not( feature = "warm-pool" ) ) ]
mod private {}

#[ cfg( not( feature = "warm-pool" ) ) ]
crate::mod_interface!
{
}

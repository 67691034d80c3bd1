//! Windowed quota accounting
//!
//! Quota is enforced at two granularities with the same service: per tenant
//! in the AUTHORIZE phase and per `(tenant, provider)` inside the provider
//! adapter. Counters reset lazily when a window has elapsed; `reserve` is a
//! compare-and-add and `release` clamps at zero, so a counter never goes
//! negative. Global coordination across gateway replicas belongs to an
//! external implementation of [`QuotaService`]; the bundled one is per-node.

mod private
{
  use std::collections::HashMap;
  use parking_lot::Mutex;
  use serde::{ Serialize, Deserialize };
  use crate::error::{ GatewayError, GatewayResult };
  use crate::config::QuotaWindowConfig;

  /// Key of one quota counter
  #[ derive( Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize ) ]
  pub struct QuotaKey
  {
    /// Tenant being charged
    pub tenant_id : String,
    /// Provider scope; `None` for the tenant-wide counter
    pub provider_id : Option< String >,
  }

  impl QuotaKey
  {
    /// Tenant-wide counter key
    #[ must_use ]
    pub fn tenant( tenant_id : impl Into< String > ) -> Self
    {
      Self { tenant_id : tenant_id.into(), provider_id : None }
    }

    /// Per-provider counter key
    #[ must_use ]
    pub fn provider( tenant_id : impl Into< String >, provider_id : impl Into< String > ) -> Self
    {
      Self { tenant_id : tenant_id.into(), provider_id : Some( provider_id.into() ) }
    }

    /// Canonical string form used for storage and diagnostics
    #[ must_use ]
    pub fn canonical( &self ) -> String
    {
      match &self.provider_id
      {
        Some( provider_id ) => format!( "{}:{}", self.tenant_id, provider_id ),
        None => self.tenant_id.clone(),
      }
    }
  }

  /// Snapshot of one quota counter
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct QuotaInfo
  {
    /// Canonical key
    pub id : String,
    /// Units consumed in the current window
    pub used : u64,
    /// Units allowed per window
    pub limit : u64,
    /// Units left, `max( 0, limit - used )`
    pub remaining : u64,
    /// When the current window resets, epoch milliseconds
    pub reset_at_epoch_ms : i64,
  }

  /// Quota accounting operations
  ///
  /// All operations are atomic per key. Implementations backed by an external
  /// store may suspend; the bundled in-memory one never does.
  #[ async_trait::async_trait ]
  pub trait QuotaService : Send + Sync + std::fmt::Debug
  {
    /// Read the counter without charging it
    async fn check( &self, key : &QuotaKey ) -> GatewayResult< QuotaInfo >;

    /// Atomically charge `amount` units if the window has room
    ///
    /// # Errors
    ///
    /// Returns `QUOTA_EXHAUSTED` without changing the counter when the window
    /// has fewer than `amount` units left.
    async fn reserve( &self, key : &QuotaKey, amount : u64 ) -> GatewayResult< QuotaInfo >;

    /// Return `amount` previously reserved units, clamping at zero
    async fn release( &self, key : &QuotaKey, amount : u64 ) -> GatewayResult< () >;

    /// Settle a finished call : replace `reserved` units with the real usage
    ///
    /// `used` may exceed the reservation; the delta is charged. The counter
    /// is never reduced below zero.
    async fn record_usage( &self, key : &QuotaKey, reserved : u64, used : u64 ) -> GatewayResult< () >;

    /// Override the limit and window for one key
    async fn set_limit( &self, key : &QuotaKey, limit : u64, window_ms : u64 ) -> GatewayResult< () >;
  }

  #[ derive( Debug, Clone ) ]
  struct CounterState
  {
    used : u64,
    limit : u64,
    window_ms : u64,
    window_start_ms : i64,
  }

  impl CounterState
  {
    fn maybe_reset( &mut self, now_ms : i64 )
    {
      if now_ms >= self.window_start_ms + self.window_ms as i64
      {
        self.used = 0;
        self.window_start_ms = now_ms;
      }
    }

    fn info( &self, id : String ) -> QuotaInfo
    {
      QuotaInfo
      {
        id,
        used : self.used,
        limit : self.limit,
        remaining : self.limit.saturating_sub( self.used ),
        reset_at_epoch_ms : self.window_start_ms + self.window_ms as i64,
      }
    }
  }

  /// Per-node in-memory quota service
  #[ derive( Debug ) ]
  pub struct InMemoryQuotaService
  {
    defaults : QuotaWindowConfig,
    counters : Mutex< HashMap< String, CounterState > >,
  }

  impl InMemoryQuotaService
  {
    /// Create a service with the given default window
    #[ must_use ]
    pub fn new( defaults : QuotaWindowConfig ) -> Self
    {
      Self
      {
        defaults,
        counters : Mutex::new( HashMap::new() ),
      }
    }

    fn with_counter< T >( &self, key : &QuotaKey, op : impl FnOnce( &mut CounterState, String ) -> T ) -> T
    {
      let canonical = key.canonical();
      let now_ms = chrono::Utc::now().timestamp_millis();
      let mut counters = self.counters.lock();
      let counter = counters.entry( canonical.clone() ).or_insert_with( || CounterState
      {
        used : 0,
        limit : self.defaults.default_limit,
        window_ms : self.defaults.default_window_ms,
        window_start_ms : now_ms,
      } );
      counter.maybe_reset( now_ms );
      op( counter, canonical )
    }
  }

  #[ async_trait::async_trait ]
  impl QuotaService for InMemoryQuotaService
  {
    async fn check( &self, key : &QuotaKey ) -> GatewayResult< QuotaInfo >
    {
      Ok( self.with_counter( key, | counter, canonical | counter.info( canonical ) ) )
    }

    async fn reserve( &self, key : &QuotaKey, amount : u64 ) -> GatewayResult< QuotaInfo >
    {
      self.with_counter( key, | counter, canonical |
      {
        if counter.limit.saturating_sub( counter.used ) < amount
        {
          return Err
          (
            GatewayError::quota_exhausted( format!( "quota exhausted for '{canonical}'" ) )
              .with_retry_after_ms( ( counter.window_start_ms + counter.window_ms as i64 - chrono::Utc::now().timestamp_millis() ).max( 0 ) as u64 )
          );
        }
        counter.used += amount;
        Ok( counter.info( canonical ) )
      } )
    }

    async fn release( &self, key : &QuotaKey, amount : u64 ) -> GatewayResult< () >
    {
      self.with_counter( key, | counter, _canonical |
      {
        counter.used = counter.used.saturating_sub( amount );
      } );
      Ok( () )
    }

    async fn record_usage( &self, key : &QuotaKey, reserved : u64, used : u64 ) -> GatewayResult< () >
    {
      self.with_counter( key, | counter, _canonical |
      {
        // The reservation is already charged; only the delta is added.
        counter.used += used.saturating_sub( reserved );
      } );
      Ok( () )
    }

    async fn set_limit( &self, key : &QuotaKey, limit : u64, window_ms : u64 ) -> GatewayResult< () >
    {
      self.with_counter( key, | counter, _canonical |
      {
        counter.limit = limit;
        counter.window_ms = window_ms;
      } );
      Ok( () )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    fn service() -> InMemoryQuotaService
    {
      InMemoryQuotaService::new( QuotaWindowConfig { default_limit : 10, default_window_ms : 60_000 } )
    }

    #[ tokio::test ]
    async fn release_after_reserve_restores_counter()
    {
      let service = service();
      let key = QuotaKey::tenant( "t1" );

      let before = service.check( &key ).await.unwrap();
      service.reserve( &key, 3 ).await.unwrap();
      service.release( &key, 3 ).await.unwrap();
      let after = service.check( &key ).await.unwrap();
      assert_eq!( before.used, after.used );
    }

    #[ tokio::test ]
    async fn reserve_fails_without_room_and_leaves_counter_unchanged()
    {
      let service = service();
      let key = QuotaKey::provider( "t1", "pA" );

      service.set_limit( &key, 2, 60_000 ).await.unwrap();
      service.reserve( &key, 2 ).await.unwrap();
      let error = service.reserve( &key, 1 ).await.unwrap_err();
      assert_eq!( error.kind(), crate::error::ErrorKind::QuotaExhausted );

      let info = service.check( &key ).await.unwrap();
      assert_eq!( info.used, 2 );
      assert_eq!( info.remaining, 0 );
    }

    #[ tokio::test ]
    async fn record_usage_charges_only_the_delta()
    {
      let service = service();
      let key = QuotaKey::tenant( "t2" );

      service.set_limit( &key, 100, 60_000 ).await.unwrap();
      service.reserve( &key, 1 ).await.unwrap();
      service.record_usage( &key, 1, 7 ).await.unwrap();
      let info = service.check( &key ).await.unwrap();
      assert_eq!( info.used, 7 );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    InMemoryQuotaService,
    QuotaInfo,
    QuotaKey,
    QuotaService,
  };
}

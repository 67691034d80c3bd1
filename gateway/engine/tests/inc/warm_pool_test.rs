//! Warm pool tests
//!
//! Load coalescing (one load per key under concurrency, failures surfacing
//! to every waiter without caching), LRU eviction over capacity, idle TTL
//! eviction and deterministic close.

use super::*;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use the_module::{ PoolConfig, Runner, RunnerFactory, RunnerKey, RunnerState, WarmPool };

#[ derive( Debug ) ]
pub struct TestRunner
{
  closed : AtomicBool,
}

#[ async_trait::async_trait ]
impl Runner for TestRunner
{
  fn state( &self ) -> RunnerState
  {
    if self.closed.load( Ordering::SeqCst )
    {
      RunnerState::Closed
    }
    else
    {
      RunnerState::Ready
    }
  }

  async fn close( &self ) -> GatewayResult< () >
  {
    self.closed.store( true, Ordering::SeqCst );
    Ok( () )
  }
}

#[ derive( Debug ) ]
struct CountingFactory
{
  loads : AtomicU64,
  fail : AtomicBool,
  delay_ms : u64,
}

impl CountingFactory
{
  fn new( delay_ms : u64 ) -> Self
  {
    Self
    {
      loads : AtomicU64::new( 0 ),
      fail : AtomicBool::new( false ),
      delay_ms,
    }
  }
}

#[ async_trait::async_trait ]
impl RunnerFactory< TestRunner > for CountingFactory
{
  async fn load( &self, key : &RunnerKey ) -> GatewayResult< Arc< TestRunner > >
  {
    tokio::time::sleep( Duration::from_millis( self.delay_ms ) ).await;
    self.loads.fetch_add( 1, Ordering::SeqCst );
    if self.fail.load( Ordering::SeqCst )
    {
      return Err( GatewayError::internal( format!( "cannot load '{key}'" ) ) );
    }
    Ok( Arc::new( TestRunner { closed : AtomicBool::new( false ) } ) )
  }
}

fn pool_config( max_size : usize, idle_ttl_ms : u64 ) -> PoolConfig
{
  PoolConfig { max_size, idle_ttl_ms, warmup_enabled : true }
}

#[ tokio::test ]
async fn concurrent_loads_coalesce_onto_one()
{
  let factory = Arc::new( CountingFactory::new( 30 ) );
  let pool = Arc::new( WarmPool::new( pool_config( 4, 60_000 ), factory.clone() ) );
  let key = RunnerKey::new( "m1@v1", "gguf-cpu" );

  let mut handles = Vec::new();
  for _ in 0..10
  {
    let pool = pool.clone();
    let key = key.clone();
    handles.push( tokio::spawn( async move { pool.get_or_create( &key ).await } ) );
  }

  let mut runners = Vec::new();
  for handle in handles
  {
    runners.push( handle.await.unwrap().unwrap() );
  }

  // One underlying load, all ten callers share the instance.
  assert_eq!( factory.loads.load( Ordering::SeqCst ), 1 );
  for runner in &runners
  {
    assert!( Arc::ptr_eq( runner, &runners[ 0 ] ) );
  }
  assert_eq!( pool.resident(), 1 );
}

#[ tokio::test ]
async fn failed_loads_surface_to_all_waiters_and_are_not_cached()
{
  let factory = Arc::new( CountingFactory::new( 30 ) );
  factory.fail.store( true, Ordering::SeqCst );
  let pool = Arc::new( WarmPool::new( pool_config( 4, 60_000 ), factory.clone() ) );
  let key = RunnerKey::new( "m1@v1", "gguf-cpu" );

  let mut handles = Vec::new();
  for _ in 0..10
  {
    let pool = pool.clone();
    let key = key.clone();
    handles.push( tokio::spawn( async move { pool.get_or_create( &key ).await } ) );
  }
  for handle in handles
  {
    assert!( handle.await.unwrap().is_err() );
  }
  assert_eq!( factory.loads.load( Ordering::SeqCst ), 1 );
  assert!( !pool.contains( &key ) );

  // The next call retries the load instead of serving a cached failure.
  factory.fail.store( false, Ordering::SeqCst );
  pool.get_or_create( &key ).await.unwrap();
  assert_eq!( factory.loads.load( Ordering::SeqCst ), 2 );
}

#[ tokio::test ]
async fn lru_eviction_closes_the_coldest_runner()
{
  let factory = Arc::new( CountingFactory::new( 1 ) );
  let pool = WarmPool::new( pool_config( 2, 60_000 ), factory );

  let k1 = RunnerKey::new( "m1@v1", "r" );
  let k2 = RunnerKey::new( "m2@v1", "r" );
  let k3 = RunnerKey::new( "m3@v1", "r" );

  let r1 = pool.get_or_create( &k1 ).await.unwrap();
  pool.get_or_create( &k2 ).await.unwrap();
  // Touch k1 so k2 becomes the LRU victim.
  pool.get_or_create( &k1 ).await.unwrap();
  pool.get_or_create( &k3 ).await.unwrap();

  assert_eq!( pool.resident(), 2 );
  assert!( pool.contains( &k1 ) );
  assert!( !pool.contains( &k2 ) );
  assert!( pool.contains( &k3 ) );
  assert_eq!( r1.state(), RunnerState::Ready );
}

#[ tokio::test ]
async fn idle_runners_are_evicted_and_closed()
{
  let factory = Arc::new( CountingFactory::new( 1 ) );
  let pool = WarmPool::new( pool_config( 4, 30 ), factory );
  let key = RunnerKey::new( "m1@v1", "r" );

  let runner = pool.get_or_create( &key ).await.unwrap();
  tokio::time::sleep( Duration::from_millis( 60 ) ).await;
  pool.evict_idle().await;

  assert!( !pool.contains( &key ) );
  assert_eq!( runner.state(), RunnerState::Closed );
}

#[ tokio::test ]
async fn close_releases_the_runner_deterministically()
{
  let factory = Arc::new( CountingFactory::new( 1 ) );
  let pool = WarmPool::new( pool_config( 4, 60_000 ), factory );
  let key = RunnerKey::new( "m1@v1", "r" );

  let runner = pool.get_or_create( &key ).await.unwrap();
  pool.close( &key ).await.unwrap();
  assert!( !pool.contains( &key ) );
  assert_eq!( runner.state(), RunnerState::Closed );

  // Closing an absent key is a no-op.
  pool.close( &key ).await.unwrap();
}

#[ tokio::test ]
async fn prewarm_is_best_effort()
{
  let factory = Arc::new( CountingFactory::new( 1 ) );
  factory.fail.store( true, Ordering::SeqCst );
  let pool = WarmPool::new( pool_config( 4, 60_000 ), factory.clone() );

  // Failures are swallowed.
  pool.prewarm( &[ RunnerKey::new( "m1@v1", "r" ) ] ).await;
  assert_eq!( pool.resident(), 0 );

  factory.fail.store( false, Ordering::SeqCst );
  pool.prewarm( &[ RunnerKey::new( "m1@v1", "r" ), RunnerKey::new( "m2@v1", "r" ) ] ).await;
  assert_eq!( pool.resident(), 2 );
}

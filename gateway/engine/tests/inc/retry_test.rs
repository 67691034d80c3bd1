//! EXECUTE retry behavior
//!
//! Transient failures back off exponentially and eventually succeed within
//! the attempt budget; the final token reports the attempt count; the
//! deadline bounds the whole dance.

use super::*;
use std::time::Instant;
use the_module::{ ErrorKind, Orchestrator };

#[ tokio::test ]
async fn transient_failures_retry_until_success()
{
  let mut config = test_config();
  config.retry_base_ms = 100;
  config.retry_max_backoff_ms = 1000;
  config.max_attempts = 3;
  let engine = test_engine( config );

  let provider = MockProvider::new( "pA", &[ "m" ] )
    .with_script( &[ MockOutcome::Transient, MockOutcome::Transient ] );
  engine.register_provider( Box::new( provider ) ).unwrap();

  let orchestrator = Orchestrator::new( engine.clone() );
  let started = Instant::now();
  let response = orchestrator.infer( request( "r-retry", "m" ), tenant() ).await.unwrap();
  let elapsed = started.elapsed();

  // Third attempt succeeded after 100ms + 200ms of backoff.
  assert_eq!( response.metadata.get( "attempts" ).unwrap(), "3" );
  assert!( elapsed >= std::time::Duration::from_millis( 300 ), "elapsed {elapsed:?}" );

  #[ cfg( feature = "observability" ) ]
  assert_eq!( engine.metrics().counter( "orchestrator.execute.retry" ), 2 );
}

#[ tokio::test ]
async fn attempts_are_bounded_by_max_attempts()
{
  let mut config = test_config();
  config.max_attempts = 2;
  let engine = test_engine( config );

  let provider = MockProvider::new( "pA", &[ "m" ] )
    .with_script( &[ MockOutcome::Transient, MockOutcome::Transient, MockOutcome::Transient ] );
  engine.register_provider( Box::new( provider ) ).unwrap();

  let orchestrator = Orchestrator::new( engine.clone() );
  let error = orchestrator.infer( request( "r-bounded", "m" ), tenant() ).await.unwrap_err();
  assert_eq!( error.kind(), ErrorKind::ProviderTransient );

  let adapter = engine.registry().get( "pA" ).unwrap();
  assert_eq!( adapter.breaker_metrics().failed_calls, 2 );
}

#[ tokio::test ]
async fn backoff_is_bounded_by_the_deadline()
{
  let mut config = test_config();
  config.max_attempts = 5;
  config.retry_base_ms = 300;
  config.retry_max_backoff_ms = 10_000;
  let engine = test_engine( config );

  let provider = MockProvider::new( "pA", &[ "m" ] )
    .with_script( &[ MockOutcome::Transient, MockOutcome::Transient, MockOutcome::Transient ] );
  engine.register_provider( Box::new( provider ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let mut tight = request( "r-deadline", "m" );
  tight.deadline_ms = Some( 200 );

  let started = Instant::now();
  let error = orchestrator.infer( tight, tenant() ).await.unwrap_err();

  // The 300ms backoff does not fit the 200ms budget : the transient error
  // surfaces instead of sleeping past the deadline.
  assert_eq!( error.kind(), ErrorKind::ProviderTransient );
  assert!( started.elapsed() < std::time::Duration::from_millis( 600 ) );
}

#[ tokio::test ]
async fn quota_reservations_balance_out_after_retries()
{
  let mut config = test_config();
  config.max_attempts = 3;
  let engine = test_engine( config );

  let provider = MockProvider::new( "pA", &[ "m" ] )
    .with_script( &[ MockOutcome::Transient, MockOutcome::Transient ] );
  engine.register_provider( Box::new( provider ) ).unwrap();

  let orchestrator = Orchestrator::new( engine.clone() );
  orchestrator.infer( request( "r-balance", "m" ), tenant() ).await.unwrap();

  // Two failed attempts released their units; the success recorded real
  // usage ( 8 tokens from the mock ).
  let key = the_module::QuotaKey::provider( "t1", "pA" );
  let info = engine.quota().check( &key ).await.unwrap();
  assert_eq!( info.used, 8 );
}

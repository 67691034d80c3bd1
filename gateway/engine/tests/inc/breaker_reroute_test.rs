//! Breaker-driven rerouting
//!
//! A provider whose breaker opens is filtered by the router : retries within
//! a request and subsequent requests land on the healthy provider, and after
//! the breaker timeout the next call probes the failed one.

use super::*;
use std::time::Duration;
use the_module::{ CircuitState, ErrorKind, Orchestrator };

fn reroute_config() -> the_module::GatewayConfig
{
  let mut config = test_config();
  config.breaker.failure_threshold = 1;
  config.breaker.timeout_ms = 150;
  config.max_attempts = 2;
  config
}

#[ tokio::test ]
async fn open_breaker_reroutes_to_the_secondary()
{
  let engine = test_engine( reroute_config() );
  // pA scores higher but fails; pB is healthy.
  let failing = MockProvider::new( "pA", &[ "m" ] )
    .with_performance( 0.9 )
    .with_script( &[ MockOutcome::Transient ] );
  engine.register_provider( Box::new( failing ) ).unwrap();
  engine.register_provider( Box::new( MockProvider::new( "pB", &[ "m" ] ).with_performance( 0.5 ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine.clone() );
  let response = orchestrator.infer( request( "r-reroute", "m" ), tenant() ).await.unwrap();

  // First attempt opened pA's breaker; the retry re-routed to pB.
  assert!( response.content.contains( "pB" ) );
  let snapshot = engine.registry().get( "pA" ).unwrap().breaker_snapshot();
  assert_eq!( snapshot.state, CircuitState::Open );
}

#[ tokio::test ]
async fn short_circuited_calls_do_not_reach_the_provider()
{
  let mut config = reroute_config();
  config.breaker.failure_threshold = 3;
  config.max_attempts = 1;
  let engine = test_engine( config );

  let failing = MockProvider::new( "pA", &[ "m" ] ).with_script( &[
    MockOutcome::Transient, MockOutcome::Transient, MockOutcome::Transient,
  ] );
  engine.register_provider( Box::new( failing ) ).unwrap();
  let adapter = engine.registry().get( "pA" ).unwrap();

  let orchestrator = Orchestrator::new( engine.clone() );

  // Three requests trip the breaker at the threshold.
  for index in 0..3
  {
    let error = orchestrator.infer( request( &format!( "r-trip-{index}" ), "m" ), tenant() ).await.unwrap_err();
    assert_eq!( error.kind(), ErrorKind::ProviderTransient );
  }
  assert_eq!( adapter.breaker_snapshot().state, CircuitState::Open );
  let provider_calls = adapter.breaker_metrics().failed_calls;

  // Calls four and five short-circuit : the provider sees nothing.
  for index in 3..5
  {
    let error = orchestrator.infer( request( &format!( "r-trip-{index}" ), "m" ), tenant() ).await.unwrap_err();
    assert_eq!( error.kind(), ErrorKind::ProviderUnavailable );
  }
  assert_eq!( adapter.breaker_metrics().failed_calls, provider_calls );
}

#[ tokio::test ]
async fn adapter_short_circuit_returns_the_quota_reservation()
{
  let mut config = reroute_config();
  config.breaker.timeout_ms = 60_000;
  let engine = test_engine( config );
  let provider = MockProvider::new( "pA", &[ "m" ] ).with_script( &[ MockOutcome::Transient ] );
  engine.register_provider( Box::new( provider ) ).unwrap();
  let adapter = engine.registry().get( "pA" ).unwrap();

  let sampling = the_module::SamplingConfig::default();
  adapter.infer( &request( "r-a", "m" ), &sampling ).await.unwrap_err();
  assert_eq!( adapter.breaker_snapshot().state, CircuitState::Open );

  let error = adapter.infer( &request( "r-b", "m" ), &sampling ).await.unwrap_err();
  assert_eq!( error.kind(), ErrorKind::CircuitOpen );

  // The short-circuited call gave its unit back; only the failed call's
  // release already balanced out, so nothing is held.
  let key = the_module::QuotaKey::provider( "t1", "pA" );
  let info = engine.quota().check( &key ).await.unwrap();
  assert_eq!( info.used, 0 );
}

#[ tokio::test ]
async fn breaker_probes_after_its_timeout()
{
  let engine = test_engine( reroute_config() );
  let provider = MockProvider::new( "pA", &[ "m" ] ).with_script( &[ MockOutcome::Transient ] );
  engine.register_provider( Box::new( provider ) ).unwrap();
  let adapter = engine.registry().get( "pA" ).unwrap();

  let orchestrator = Orchestrator::new( engine.clone() );
  orchestrator.infer( request( "r-open", "m" ), tenant() ).await.unwrap_err();
  assert_eq!( adapter.breaker_snapshot().state, CircuitState::Open );

  tokio::time::sleep( Duration::from_millis( 200 ) ).await;

  // Past the timeout the next call probes and, succeeding, closes the
  // breaker.
  let response = orchestrator.infer( request( "r-probe", "m" ), tenant() ).await.unwrap();
  assert!( response.content.contains( "pA" ) );
  let snapshot = adapter.breaker_snapshot();
  assert_eq!( snapshot.state, CircuitState::Closed );
  assert_eq!( snapshot.consecutive_failures, 0 );
}

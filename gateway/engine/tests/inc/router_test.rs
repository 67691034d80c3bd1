//! Router selection tests
//!
//! Scoring, determinism, breaker/quota filtering and the invariant that an
//! empty candidate set yields `provider_id = None` instead of an error.

use super::*;
use the_module::{ PrefixRule, QuotaKey, RouteHints, RoutePreference };

async fn engine_with( providers : Vec< MockProvider > ) -> Arc< EngineContext >
{
  let engine = test_engine( test_config() );
  for provider in providers
  {
    engine.register_provider( Box::new( provider ) ).unwrap();
  }
  engine
}

#[ tokio::test ]
async fn highest_score_wins()
{
  let engine = engine_with( vec!
  [
    MockProvider::new( "pA", &[ "m-cpu" ] ).with_performance( 0.8 ),
    MockProvider::new( "pB", &[ "m-cpu" ] ).with_performance( 0.6 ),
  ] ).await;

  let decision = engine.router().select
  (
    engine.registry(), "m-cpu", &tenant(), "r1", &RouteHints::default()
  ).await;

  assert_eq!( decision.provider_id.as_deref(), Some( "pA" ) );
  assert_eq!( decision.candidates, vec![ "pA".to_string(), "pB".to_string() ] );
  assert!( decision.score > 0.0 && decision.score <= 1.0 );
}

#[ tokio::test ]
async fn selection_is_deterministic()
{
  let engine = engine_with( vec!
  [
    // Identical profiles : the lexicographically smaller id must always win.
    MockProvider::new( "pB", &[ "m" ] ).with_performance( 0.5 ),
    MockProvider::new( "pA", &[ "m" ] ).with_performance( 0.5 ),
  ] ).await;

  for _ in 0..10
  {
    let decision = engine.router().select
    (
      engine.registry(), "m", &tenant(), "r1", &RouteHints::default()
    ).await;
    assert_eq!( decision.provider_id.as_deref(), Some( "pA" ) );
  }
}

#[ tokio::test ]
async fn no_candidate_yields_none_not_an_error()
{
  let engine = engine_with( vec![ MockProvider::new( "pA", &[ "m" ] ) ] ).await;

  let decision = engine.router().select
  (
    engine.registry(), "unknown-model", &tenant(), "r1", &RouteHints::default()
  ).await;

  assert!( decision.provider_id.is_none() );
  assert!( decision.candidates.is_empty() );
  assert_eq!( decision.score, 0.0 );
}

#[ tokio::test ]
async fn exhausted_tenant_quota_filters_a_provider()
{
  let engine = engine_with( vec!
  [
    MockProvider::new( "pA", &[ "m" ] ).with_performance( 0.9 ),
    MockProvider::new( "pB", &[ "m" ] ).with_performance( 0.1 ),
  ] ).await;

  // Exhaust the ( t1, pA ) window; pB keeps room.
  let key = QuotaKey::provider( "t1", "pA" );
  engine.quota().set_limit( &key, 1, 60_000 ).await.unwrap();
  engine.quota().reserve( &key, 1 ).await.unwrap();

  let decision = engine.router().select
  (
    engine.registry(), "m", &tenant(), "r1", &RouteHints::default()
  ).await;
  assert_eq!( decision.provider_id.as_deref(), Some( "pB" ) );
  assert_eq!( decision.metadata.get( "filtered.quota" ).unwrap(), "1" );
}

#[ tokio::test ]
async fn prefix_rule_matches_model_classes()
{
  let mut config = test_config();
  config.router.prefix_rules = vec!
  [
    PrefixRule { prefix : "gpt-".to_string(), provider_id : "pA".to_string() },
  ];
  let engine = test_engine( config );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let decision = engine.router().select
  (
    engine.registry(), "gpt-4o-mini", &tenant(), "r1", &RouteHints::default()
  ).await;
  assert_eq!( decision.provider_id.as_deref(), Some( "pA" ) );
}

#[ tokio::test ]
async fn cost_preference_shifts_the_choice()
{
  let engine = {
    let engine = test_engine( test_config() );
    let mut cheap = MockProvider::new( "cheap", &[ "m" ] ).with_performance( 0.4 );
    let mut strong = MockProvider::new( "strong", &[ "m" ] ).with_performance( 0.9 );
    cheap = cheap.with_cost( 0.1 );
    strong = strong.with_cost( 9.0 );
    engine.register_provider( Box::new( cheap ) ).unwrap();
    engine.register_provider( Box::new( strong ) ).unwrap();
    engine
  };

  let neutral = engine.router().select
  (
    engine.registry(), "m", &tenant(), "r1", &RouteHints::default()
  ).await;
  assert_eq!( neutral.provider_id.as_deref(), Some( "strong" ) );

  let hints = RouteHints { preference : Some( RoutePreference::Cost ), ..RouteHints::default() };
  let preferring = engine.router().select
  (
    engine.registry(), "m", &tenant(), "r2", &hints
  ).await;
  assert_eq!( preferring.provider_id.as_deref(), Some( "cheap" ) );
}

#[ tokio::test ]
async fn tenant_preference_multiplier_applies()
{
  let mut config = test_config();
  config.router.tenant_preferences.insert
  (
    "t1".to_string(),
    std::collections::HashMap::from( [ ( "pB".to_string(), 2.0 ) ] ),
  );
  let engine = test_engine( config );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ).with_performance( 0.6 ) ) ).unwrap();
  engine.register_provider( Box::new( MockProvider::new( "pB", &[ "m" ] ).with_performance( 0.5 ) ) ).unwrap();

  let decision = engine.router().select
  (
    engine.registry(), "m", &tenant(), "r1", &RouteHints::default()
  ).await;
  assert_eq!( decision.provider_id.as_deref(), Some( "pB" ) );
}

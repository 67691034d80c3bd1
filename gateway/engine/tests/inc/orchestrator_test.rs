//! End-to-end orchestration tests
//!
//! Happy path with competing providers, response shape, duplicate-id
//! rejection and terminal status handling.

use super::*;
use the_module::{ Orchestrator, ErrorKind };

#[ tokio::test ]
async fn happy_path_routes_to_the_stronger_provider()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m-cpu" ] ).with_performance( 0.8 ) ) ).unwrap();
  engine.register_provider( Box::new( MockProvider::new( "pB", &[ "m-cpu" ] ).with_performance( 0.6 ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine.clone() );
  let response = orchestrator.infer( request( "r-happy", "m-cpu" ), tenant() ).await.unwrap();

  assert_eq!( response.model, "m-cpu" );
  assert!( response.content.contains( "pA" ) );
  assert!( response.tokens_used() > 0 );
  assert_eq!( response.metadata.get( "routing.provider" ).unwrap(), "pA" );

  #[ cfg( feature = "observability" ) ]
  assert_eq!( engine.metrics().counter( "router.selected{provider_id:pA}" ), 1 );
}

#[ tokio::test ]
async fn duplicate_request_id_is_rejected_within_the_window()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  orchestrator.infer( request( "r-dup", "m" ), tenant() ).await.unwrap();

  let error = orchestrator.infer( request( "r-dup", "m" ), tenant() ).await.unwrap_err();
  assert_eq!( error.kind(), ErrorKind::InvalidArgument );
}

#[ tokio::test ]
async fn no_provider_surfaces_provider_unavailable()
{
  let engine = test_engine( test_config() );
  let orchestrator = Orchestrator::new( engine );

  let error = orchestrator.infer( request( "r-none", "m-unknown" ), tenant() ).await.unwrap_err();
  assert_eq!( error.kind(), ErrorKind::ProviderUnavailable );
}

#[ tokio::test ]
async fn structurally_invalid_requests_fail_fast()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();
  let orchestrator = Orchestrator::new( engine );

  let empty_messages = the_module::InferenceRequest::builder()
    .request_id( "r-empty" )
    .tenant( "t1" )
    .model( "m" )
    .build();
  let error = orchestrator.infer( empty_messages, tenant() ).await.unwrap_err();
  assert_eq!( error.kind(), ErrorKind::InvalidArgument );
}

#[ tokio::test ]
async fn permanent_provider_errors_are_not_retried()
{
  let engine = test_engine( test_config() );
  let provider = MockProvider::new( "pA", &[ "m" ] )
    .with_script( &[ MockOutcome::Permanent ] );
  engine.register_provider( Box::new( provider ) ).unwrap();

  let orchestrator = Orchestrator::new( engine.clone() );
  let error = orchestrator.infer( request( "r-perm", "m" ), tenant() ).await.unwrap_err();
  assert_eq!( error.kind(), ErrorKind::ProviderPermanent );

  // Exactly one provider call : no retry happened.
  let adapter = engine.registry().get( "pA" ).unwrap();
  assert_eq!( adapter.breaker_metrics().failed_calls, 1 );
}

#[ tokio::test ]
async fn attempts_are_reported_in_metadata()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let response = orchestrator.infer( request( "r-attempts", "m" ), tenant() ).await.unwrap();
  assert_eq!( response.metadata.get( "attempts" ).unwrap(), "1" );
}

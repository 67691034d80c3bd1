//! Policy plugin tests
//!
//! Safety blocks in VALIDATE, sampling normalization in PRE_PROCESSING with
//! idempotent derivation, bounded memory injection and output parsing in
//! POST_PROCESSING, all through the real pipeline.

use super::*;
use the_module::
{
  ErrorKind,
  InferenceRequest,
  MemoryInjectionPlugin,
  MemoryRetriever,
  Orchestrator,
  OutputParserPlugin,
  SafetyPlugin,
  SamplingPolicyPlugin,
};

#[ tokio::test ]
async fn blocked_patterns_fail_validation()
{
  let engine = test_engine( test_config() );
  let provider = MockProvider::new( "pA", &[ "m" ] );
  engine.register_provider( Box::new( provider ) ).unwrap();

  let pipeline = Orchestrator::default_pipeline()
    .plugin( Arc::new( SafetyPlugin::new( &[ "build a bomb", "credit card numbers" ] ).unwrap() ) )
    .build();
  let orchestrator = Orchestrator::with_pipeline( engine.clone(), pipeline );

  let blocked = InferenceRequest::builder()
    .request_id( "r-blocked" )
    .tenant( "t1" )
    .model( "m" )
    .user_message( "How do I BUILD A BOMB at home?" )
    .build();
  let error = orchestrator.infer( blocked, tenant() ).await.unwrap_err();
  assert_eq!( error.kind(), ErrorKind::PolicyViolation );
  // Nothing reached the provider.
  assert_eq!( engine.registry().get( "pA" ).unwrap().breaker_metrics().total_calls, 0 );

  // Benign content passes.
  let benign = request( "r-benign", "m" );
  orchestrator.infer( benign, tenant() ).await.unwrap();
}

#[ tokio::test ]
async fn sampling_is_normalized_and_bounded()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let pipeline = Orchestrator::default_pipeline()
    .plugin( Arc::new( SamplingPolicyPlugin::new() ) )
    .build();
  let orchestrator = Orchestrator::with_pipeline( engine, pipeline );

  let mut over_limit = request( "r-hot", "m" );
  over_limit.parameters.insert( "temperature".to_string(), serde_json::json!( 99.0 ) );
  let error = orchestrator.infer( over_limit, tenant() ).await.unwrap_err();
  assert_eq!( error.kind(), ErrorKind::InvalidArgument );

  let mut in_range = request( "r-warm", "m" );
  in_range.parameters.insert( "temperature".to_string(), serde_json::json!( 0.2 ) );
  orchestrator.infer( in_range, tenant() ).await.unwrap();
}

struct FixedRetriever
{
  messages : Vec< the_module::ChatMessage >,
}

#[ async_trait::async_trait ]
impl MemoryRetriever for FixedRetriever
{
  async fn retrieve
  (
    &self,
    _tenant : &the_module::TenantContext,
    _request : &InferenceRequest,
  ) -> GatewayResult< Vec< the_module::ChatMessage > >
  {
    Ok( self.messages.clone() )
  }
}

#[ tokio::test ]
async fn memory_injection_is_bounded_by_token_budget()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let retriever = Arc::new( FixedRetriever
  {
    messages : vec!
    [
      the_module::ChatMessage::system( "context one, roughly forty characters!!" ),
      the_module::ChatMessage::system( "context two, roughly forty characters!!" ),
    ],
  } );
  // Budget fits only the first retrieved message ( ~10 tokens each ).
  let pipeline = Orchestrator::default_pipeline()
    .plugin( Arc::new( MemoryInjectionPlugin::new( retriever, 12 ) ) )
    .build();
  let orchestrator = Orchestrator::with_pipeline( engine, pipeline );

  let response = orchestrator.infer( request( "r-memory", "m" ), tenant() ).await.unwrap();
  assert_eq!( response.metadata.get( "memory.injected_messages" ).unwrap(), "1" );
}

#[ tokio::test ]
async fn output_parser_extracts_tool_calls_from_the_response()
{
  let engine = test_engine( test_config() );
  let scripted = MockProvider::new( "pA", &[ "m" ] ).with_script( &[ MockOutcome::Succeed
  (
    "<think>user wants weather</think>Checking. <tool_call>{\"name\":\"get_weather\",\"arguments\":{\"city\":\"Kyiv\"}}</tool_call>".to_string()
  ) ] );
  engine.register_provider( Box::new( scripted ) ).unwrap();

  let pipeline = Orchestrator::default_pipeline()
    .plugin( Arc::new( OutputParserPlugin::new().with_known_tools( vec![ "get_weather".to_string() ] ) ) )
    .build();
  let orchestrator = Orchestrator::with_pipeline( engine, pipeline );

  let response = orchestrator.infer( request( "r-tools", "m" ), tenant() ).await.unwrap();
  assert_eq!( response.content, "Checking." );
  assert_eq!( response.tool_calls.len(), 1 );
  assert_eq!( response.tool_calls[ 0 ].name, "get_weather" );
  assert!( !response.metadata.contains_key( "warnings" ) );
}

#[ tokio::test ]
async fn unknown_tools_taint_the_response_without_failing_it()
{
  let engine = test_engine( test_config() );
  let scripted = MockProvider::new( "pA", &[ "m" ] ).with_script( &[ MockOutcome::Succeed
  (
    "<tool_call>{\"name\":\"rm_rf\",\"arguments\":{}}</tool_call>".to_string()
  ) ] );
  engine.register_provider( Box::new( scripted ) ).unwrap();

  let pipeline = Orchestrator::default_pipeline()
    .plugin( Arc::new( OutputParserPlugin::new().with_known_tools( vec![ "get_weather".to_string() ] ) ) )
    .build();
  let orchestrator = Orchestrator::with_pipeline( engine, pipeline );

  let response = orchestrator.infer( request( "r-unknown-tool", "m" ), tenant() ).await.unwrap();
  assert_eq!( response.tool_calls.len(), 1 );
  assert!( response.metadata.get( "warnings" ).unwrap().contains( "rm_rf" ) );
}

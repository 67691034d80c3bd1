//! Provider SPI surface tests

use super::*;
use gateway_engine::{ Provider, TenantContext };
use the_module::AnthropicProvider;

#[ test ]
fn serves_the_claude_model_class()
{
  let provider = AnthropicProvider::new();
  let tenant = TenantContext::new( "t1" );

  assert!( provider.supports( "claude-sonnet-4", &tenant ) );
  assert!( provider.supports( "claude-haiku-3-5", &tenant ) );
  assert!( !provider.supports( "gpt-4o", &tenant ) );
  assert!( !provider.supports( "m-local", &tenant ) );
}

#[ tokio::test ]
async fn configured_extra_models_are_supported()
{
  let mut provider = AnthropicProvider::new();
  let mut config = gateway_engine::ProviderConfig::new();
  config.insert( "api.key".to_string(), serde_json::json!( "sk-test-key" ) );
  config.insert( "models".to_string(), serde_json::json!( [ "my-tuned-model" ] ) );
  provider.initialize( config ).await.unwrap();

  let tenant = TenantContext::new( "t1" );
  assert!( provider.supports( "my-tuned-model", &tenant ) );
}

#[ tokio::test ]
async fn initialize_requires_a_key()
{
  // Guard the env var so a developer shell does not leak a real key in.
  if std::env::var( the_module::API_KEY_ENV ).is_ok()
  {
    return;
  }
  let mut provider = AnthropicProvider::new();
  let error = provider.initialize( gateway_engine::ProviderConfig::new() ).await.unwrap_err();
  assert_eq!( error.kind(), gateway_engine::ErrorKind::Unauthenticated );
}

#[ tokio::test ]
async fn calls_before_initialize_are_internal_errors()
{
  let provider = AnthropicProvider::new();
  let request = gateway_engine::InferenceRequest::builder()
    .request_id( "r1" )
    .tenant( "t1" )
    .model( "claude-sonnet-4" )
    .user_message( "hi" )
    .build();
  let error = provider.infer( &request, &gateway_engine::SamplingConfig::default() ).await.unwrap_err();
  assert_eq!( error.kind(), gateway_engine::ErrorKind::Internal );
}

#[ test ]
fn capabilities_advertise_streaming_and_tools()
{
  let provider = AnthropicProvider::new();
  let capabilities = provider.capabilities();
  assert!( capabilities.tool_calling );
  assert!( capabilities.max_context_tokens >= 100_000 );
  #[ cfg( feature = "streaming" ) ]
  assert!( capabilities.streaming );
}

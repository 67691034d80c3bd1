//! Provider SPI surface tests

use super::*;
use gateway_engine::{ Provider, TenantContext };
use the_module::OpenAiProvider;

#[ test ]
fn serves_the_gpt_and_o_model_classes()
{
  let provider = OpenAiProvider::new();
  let tenant = TenantContext::new( "t1" );

  assert!( provider.supports( "gpt-4o", &tenant ) );
  assert!( provider.supports( "o3-mini", &tenant ) );
  assert!( !provider.supports( "claude-sonnet-4", &tenant ) );
}

#[ tokio::test ]
async fn compatible_endpoints_serve_configured_models()
{
  let mut provider = OpenAiProvider::new();
  let mut config = gateway_engine::ProviderConfig::new();
  config.insert( "api.key".to_string(), serde_json::json!( "sk-local" ) );
  config.insert( "api.base-url".to_string(), serde_json::json!( "http://127.0.0.1:8000/v1" ) );
  config.insert( "models".to_string(), serde_json::json!( [ "llama-3.1-8b-instruct" ] ) );
  provider.initialize( config ).await.unwrap();

  let tenant = TenantContext::new( "t1" );
  assert!( provider.supports( "llama-3.1-8b-instruct", &tenant ) );
}

#[ tokio::test ]
async fn initialize_requires_a_key()
{
  if std::env::var( the_module::API_KEY_ENV ).is_ok()
  {
    return;
  }
  let mut provider = OpenAiProvider::new();
  let error = provider.initialize( gateway_engine::ProviderConfig::new() ).await.unwrap_err();
  assert_eq!( error.kind(), gateway_engine::ErrorKind::Unauthenticated );
}

#[ test ]
fn capabilities_advertise_embeddings()
{
  let provider = OpenAiProvider::new();
  assert!( provider.capabilities().embeddings );
}

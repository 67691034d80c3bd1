//! Local provider end-to-end tests through the engine

use super::*;
use gateway_engine::
{
  ChatMessage,
  EngineContext,
  GatewayConfig,
  InferenceRequest,
  Orchestrator,
  Provider,
  ProviderConfig,
  TenantContext,
};
use the_module::LocalProvider;

fn local_request( id : &str ) -> InferenceRequest
{
  InferenceRequest::builder()
    .request_id( id )
    .tenant( "t1" )
    .model( "m-cpu" )
    .message( ChatMessage::user( "hello local" ) )
    .build()
}

async fn initialized_provider( dir : &tempfile::TempDir, manifest : the_module::ModelManifest ) -> LocalProvider
{
  let mut provider = LocalProvider::new();
  provider.register_manifest( manifest );

  let mut config = ProviderConfig::new();
  config.insert( "device".to_string(), serde_json::json!( "CPU" ) );
  config.insert( "threads".to_string(), serde_json::json!( 2 ) );
  config.insert( "base-path".to_string(), serde_json::json!( dir.path().to_string_lossy() ) );
  provider.initialize( config ).await.unwrap();
  provider
}

#[ tokio::test ]
async fn inference_runs_through_the_engine()
{
  let ( dir, manifest ) = fake_artifact( "m-cpu", "v1", b"weights" );
  let provider = initialized_provider( &dir, manifest ).await;

  let engine = EngineContext::init( GatewayConfig::default() ).unwrap();
  engine.register_provider( Box::new( provider ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let response = orchestrator.infer( local_request( "r-local" ), TenantContext::new( "t1" ) ).await.unwrap();

  assert_eq!( response.model, "m-cpu" );
  assert!( response.content.contains( "m-cpu" ) );
  assert!( response.tokens_used() > 0 );
}

#[ tokio::test ]
async fn warm_pool_loads_once_across_requests()
{
  let ( dir, manifest ) = fake_artifact( "m-cpu", "v1", b"weights" );
  let provider = initialized_provider( &dir, manifest.clone() ).await;

  // Warmup already loaded the runner; both calls reuse it.
  let pool = provider.pool().unwrap().clone();
  assert!( pool.contains( &manifest.runner_key( "template" ) ) );
  assert_eq!( pool.resident(), 1 );

  let sampling = gateway_engine::SamplingConfig::default();
  provider.infer( &local_request( "r-a" ), &sampling ).await.unwrap();
  provider.infer( &local_request( "r-b" ), &sampling ).await.unwrap();
  assert_eq!( pool.resident(), 1 );
}

#[ tokio::test ]
async fn streaming_chunks_the_generation()
{
  let ( dir, manifest ) = fake_artifact( "m-cpu", "v1", b"weights" );
  let provider = initialized_provider( &dir, manifest ).await;

  let engine = EngineContext::init( GatewayConfig::default() ).unwrap();
  engine.register_provider( Box::new( provider ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let mut streaming = local_request( "r-stream" );
  streaming.streaming = true;
  let stream = orchestrator.stream( streaming, TenantContext::new( "t1" ) ).await.unwrap();

  let text = stream.collect_text().await.unwrap();
  assert!( text.contains( "m-cpu" ) );
}

#[ tokio::test ]
async fn unknown_models_are_not_supported()
{
  let ( dir, manifest ) = fake_artifact( "m-cpu", "v1", b"weights" );
  let provider = initialized_provider( &dir, manifest ).await;
  let tenant = TenantContext::new( "t1" );

  assert!( provider.supports( "m-cpu", &tenant ) );
  assert!( !provider.supports( "m-gpu", &tenant ) );
}

#[ tokio::test ]
async fn shutdown_drains_the_pool()
{
  let ( dir, manifest ) = fake_artifact( "m-cpu", "v1", b"weights" );
  let provider = initialized_provider( &dir, manifest ).await;
  let pool = provider.pool().unwrap().clone();
  assert_eq!( pool.resident(), 1 );

  provider.shutdown().await.unwrap();
  assert_eq!( pool.resident(), 0 );
}

#[ tokio::test ]
async fn version_bumps_produce_fresh_runners()
{
  let ( dir, v1 ) = fake_artifact( "m-cpu", "v1", b"weights v1" );
  let provider = initialized_provider( &dir, v1.clone() ).await;
  let pool = provider.pool().unwrap().clone();

  // Re-registering the model at v2 points new requests at a new key.
  let ( _dir2, v2 ) = fake_artifact( "m-cpu", "v2", b"weights v2" );
  provider.register_manifest( v2.clone() );

  let sampling = gateway_engine::SamplingConfig::default();
  provider.infer( &local_request( "r-v2" ), &sampling ).await.unwrap();

  assert!( pool.contains( &v2.runner_key( "template" ) ) );
  // The v1 instance stays resident until evicted or closed.
  assert!( pool.contains( &v1.runner_key( "template" ) ) );
  assert_eq!( pool.resident(), 2 );
}

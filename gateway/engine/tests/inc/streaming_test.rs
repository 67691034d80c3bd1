//! Streaming semantics tests
//!
//! Dense sequence numbers with exactly one trailing final chunk, error
//! termination without retraction, consumer cancellation with teardown and
//! quota release, and CLEANUP on every path.

use super::*;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use the_module::
{
  ErrorKind,
  ExecutionContext,
  Orchestrator,
  Phase,
  PhasePlugin,
  QuotaKey,
};

/// CLEANUP plugin flipping a shared flag
struct CleanupProbe
{
  ran : Arc< AtomicBool >,
}

#[ async_trait::async_trait ]
impl PhasePlugin for CleanupProbe
{
  fn id( &self ) -> &str
  {
    "cleanup-probe"
  }

  fn phase( &self ) -> Phase
  {
    Phase::Cleanup
  }

  async fn execute( &self, _ctx : &mut ExecutionContext, _engine : &EngineContext ) -> GatewayResult< () >
  {
    self.ran.store( true, Ordering::SeqCst );
    Ok( () )
  }
}

fn probed_orchestrator( engine : &Arc< EngineContext > ) -> ( Orchestrator, Arc< AtomicBool > )
{
  let ran = Arc::new( AtomicBool::new( false ) );
  let pipeline = Orchestrator::default_pipeline()
    .plugin( Arc::new( CleanupProbe { ran : ran.clone() } ) )
    .build();
  ( Orchestrator::with_pipeline( engine.clone(), pipeline ), ran )
}

fn streaming_request( id : &str, model : &str ) -> the_module::InferenceRequest
{
  let mut request = request( id, model );
  request.streaming = true;
  request
}

#[ tokio::test ]
async fn chunks_are_dense_with_exactly_one_final()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( FiniteStreamProvider::new( "pS", &[ "m" ], &[ "a", "b", "c" ] ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let mut stream = orchestrator.stream( streaming_request( "r-stream", "m" ), tenant() ).await.unwrap();

  let mut chunks = Vec::new();
  while let Some( item ) = stream.next_chunk().await
  {
    chunks.push( item.unwrap() );
  }

  assert_eq!( chunks.len(), 4 );
  for ( expected, chunk ) in chunks.iter().enumerate()
  {
    assert_eq!( chunk.sequence_number, expected as u64 );
  }
  let finals : Vec< _ > = chunks.iter().filter( | chunk | chunk.is_final ).collect();
  assert_eq!( finals.len(), 1 );
  assert!( chunks.last().unwrap().is_final );
  assert_eq!
  (
    chunks.iter().map( | chunk | chunk.delta.as_str() ).collect::< String >(),
    "abc"
  );
}

#[ tokio::test ]
async fn producer_failure_terminates_without_a_final_chunk()
{
  let engine = test_engine( test_config() );
  let provider = FiniteStreamProvider::new( "pS", &[ "m" ], &[ "a", "b", "c" ] ).failing_after( 2 );
  engine.register_provider( Box::new( provider ) ).unwrap();

  let ( orchestrator, cleanup_ran ) = probed_orchestrator( &engine );
  let mut stream = orchestrator.stream( streaming_request( "r-fail", "m" ), tenant() ).await.unwrap();

  // Delivered chunks stand; then the error arrives and the stream ends.
  assert_eq!( stream.next_chunk().await.unwrap().unwrap().delta, "a" );
  assert_eq!( stream.next_chunk().await.unwrap().unwrap().delta, "b" );
  let error = stream.next_chunk().await.unwrap().unwrap_err();
  assert_eq!( error.kind(), ErrorKind::ProviderTransient );
  assert!( stream.next_chunk().await.is_none() );

  // Settlement released the reservation and CLEANUP ran.
  tokio::time::sleep( Duration::from_millis( 50 ) ).await;
  assert!( cleanup_ran.load( Ordering::SeqCst ) );
  let info = engine.quota().check( &QuotaKey::provider( "t1", "pS" ) ).await.unwrap();
  assert_eq!( info.used, 0 );
}

#[ tokio::test ]
async fn consumer_cancellation_tears_the_producer_down()
{
  let mut config = test_config();
  config.streaming.capacity = 2;
  let engine = test_engine( config );
  engine.register_provider( Box::new( MockProvider::new( "pS", &[ "m" ] ) ) ).unwrap();

  let ( orchestrator, cleanup_ran ) = probed_orchestrator( &engine );
  let mut stream = orchestrator.stream( streaming_request( "r-cancel", "m" ), tenant() ).await.unwrap();

  // Consume chunks 0..=3, then cancel.
  for expected in 0..4u64
  {
    let chunk = stream.next_chunk().await.unwrap().unwrap();
    assert_eq!( chunk.sequence_number, expected );
    assert!( !chunk.is_final );
  }
  stream.cancel();

  // The producer observes the cancellation at its next write boundary :
  // quota is released and CLEANUP runs without a final chunk having been
  // delivered.
  tokio::time::sleep( Duration::from_millis( 100 ) ).await;
  assert!( cleanup_ran.load( Ordering::SeqCst ) );
  let info = engine.quota().check( &QuotaKey::provider( "t1", "pS" ) ).await.unwrap();
  assert_eq!( info.used, 0 );
}

#[ tokio::test ]
async fn collect_text_concatenates_all_deltas()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( FiniteStreamProvider::new( "pS", &[ "m" ], &[ "hel", "lo" ] ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let stream = orchestrator.stream( streaming_request( "r-collect", "m" ), tenant() ).await.unwrap();
  assert_eq!( stream.collect_text().await.unwrap(), "hello" );
}

#[ tokio::test ]
async fn stream_completion_records_usage()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( FiniteStreamProvider::new( "pS", &[ "m" ], &[ "x", "y" ] ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine.clone() );
  let stream = orchestrator.stream( streaming_request( "r-usage", "m" ), tenant() ).await.unwrap();
  stream.collect_text().await.unwrap();

  tokio::time::sleep( Duration::from_millis( 50 ) ).await;
  let info = engine.quota().check( &QuotaKey::provider( "t1", "pS" ) ).await.unwrap();
  // 2 input + 2 output tokens from the finite provider.
  assert_eq!( info.used, 4 );
}

//! Phase pipeline dispatch tests
//!
//! Ordering within a phase is `( order, registration index )`, plugins can
//! skip themselves, and CLEANUP aggregates failures instead of halting.

use super::*;
use the_module::
{
  ExecutionContext,
  Phase,
  PhasePipeline,
  PhasePlugin,
};
use tokio_util::sync::CancellationToken;

/// Records its label into a shared trace when executed
struct TracePlugin
{
  label : &'static str,
  phase : Phase,
  order : i32,
  skip : bool,
  fail : bool,
  trace : Arc< Mutex< Vec< &'static str > > >,
}

#[ async_trait::async_trait ]
impl PhasePlugin for TracePlugin
{
  fn id( &self ) -> &str
  {
    self.label
  }

  fn phase( &self ) -> Phase
  {
    self.phase
  }

  fn order( &self ) -> i32
  {
    self.order
  }

  fn should_execute( &self, _ctx : &ExecutionContext ) -> bool
  {
    !self.skip
  }

  async fn execute( &self, _ctx : &mut ExecutionContext, _engine : &EngineContext ) -> GatewayResult< () >
  {
    self.trace.lock().push( self.label );
    if self.fail
    {
      return Err( GatewayError::internal( format!( "{} failed", self.label ) ) );
    }
    Ok( () )
  }
}

fn trace_plugin
(
  label : &'static str,
  phase : Phase,
  order : i32,
  trace : &Arc< Mutex< Vec< &'static str > > >,
) -> Arc< TracePlugin >
{
  Arc::new( TracePlugin
  {
    label,
    phase,
    order,
    skip : false,
    fail : false,
    trace : trace.clone(),
  } )
}

fn ctx_for( engine : &Arc< EngineContext > ) -> ExecutionContext
{
  ExecutionContext::new( request( "r-pipeline", "m" ), tenant(), engine )
}

#[ tokio::test ]
async fn plugins_run_in_order_with_registration_tie_break()
{
  let engine = test_engine( test_config() );
  let trace = Arc::new( Mutex::new( Vec::new() ) );

  // Same order for b and c : registration order must decide.
  let pipeline = PhasePipeline::builder()
    .plugin( trace_plugin( "late", Phase::Validate, 10, &trace ) )
    .plugin( trace_plugin( "b", Phase::Validate, 0, &trace ) )
    .plugin( trace_plugin( "c", Phase::Validate, 0, &trace ) )
    .plugin( trace_plugin( "early", Phase::Validate, -5, &trace ) )
    .build();

  let mut ctx = ctx_for( &engine );
  pipeline.run_phase( Phase::Validate, &mut ctx, &engine, &CancellationToken::new() ).await.unwrap();

  assert_eq!( *trace.lock(), vec![ "early", "b", "c", "late" ] );
}

#[ tokio::test ]
async fn a_skipped_plugin_does_not_run()
{
  let engine = test_engine( test_config() );
  let trace = Arc::new( Mutex::new( Vec::new() ) );

  let skipped = Arc::new( TracePlugin
  {
    label : "skipped",
    phase : Phase::Validate,
    order : 0,
    skip : true,
    fail : false,
    trace : trace.clone(),
  } );
  let pipeline = PhasePipeline::builder()
    .plugin( skipped )
    .plugin( trace_plugin( "ran", Phase::Validate, 1, &trace ) )
    .build();

  let mut ctx = ctx_for( &engine );
  pipeline.run_phase( Phase::Validate, &mut ctx, &engine, &CancellationToken::new() ).await.unwrap();
  assert_eq!( *trace.lock(), vec![ "ran" ] );
}

#[ tokio::test ]
async fn a_failing_plugin_halts_its_phase()
{
  let engine = test_engine( test_config() );
  let trace = Arc::new( Mutex::new( Vec::new() ) );

  let failing = Arc::new( TracePlugin
  {
    label : "failing",
    phase : Phase::Validate,
    order : 0,
    skip : false,
    fail : true,
    trace : trace.clone(),
  } );
  let pipeline = PhasePipeline::builder()
    .plugin( failing )
    .plugin( trace_plugin( "after", Phase::Validate, 1, &trace ) )
    .build();

  let mut ctx = ctx_for( &engine );
  let error = pipeline.run_phase( Phase::Validate, &mut ctx, &engine, &CancellationToken::new() ).await.unwrap_err();
  assert!( error.message().contains( "failing" ) );
  assert_eq!( *trace.lock(), vec![ "failing" ] );
}

#[ tokio::test ]
async fn cleanup_runs_every_plugin_and_aggregates_errors()
{
  let engine = test_engine( test_config() );
  let trace = Arc::new( Mutex::new( Vec::new() ) );

  let failing = Arc::new( TracePlugin
  {
    label : "broken-cleanup",
    phase : Phase::Cleanup,
    order : 0,
    skip : false,
    fail : true,
    trace : trace.clone(),
  } );
  let pipeline = PhasePipeline::builder()
    .plugin( failing )
    .plugin( trace_plugin( "second-cleanup", Phase::Cleanup, 1, &trace ) )
    .build();

  let mut ctx = ctx_for( &engine );
  pipeline.run_cleanup( &mut ctx, &engine ).await;

  // Both ran despite the failure, which landed in metadata.
  assert_eq!( *trace.lock(), vec![ "broken-cleanup", "second-cleanup" ] );
  assert!( ctx.metadata().get( "cleanup.errors" ).unwrap().contains( "broken-cleanup" ) );
}

#[ tokio::test ]
async fn cancellation_is_observed_between_plugins()
{
  let engine = test_engine( test_config() );
  let trace = Arc::new( Mutex::new( Vec::new() ) );
  let pipeline = PhasePipeline::builder()
    .plugin( trace_plugin( "only", Phase::Validate, 0, &trace ) )
    .build();

  let cancel = CancellationToken::new();
  cancel.cancel();
  let mut ctx = ctx_for( &engine );
  let error = pipeline.run_phase( Phase::Validate, &mut ctx, &engine, &cancel ).await.unwrap_err();
  assert_eq!( error.kind(), the_module::ErrorKind::Cancelled );
  assert!( trace.lock().is_empty() );
}

#[ test ]
fn phase_order_is_total()
{
  for window in Phase::ALL.windows( 2 )
  {
    assert!( window[ 0 ] < window[ 1 ] );
  }
}

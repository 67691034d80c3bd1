//! Async job and batch surface tests

use super::*;
use std::time::Duration;
use the_module::{ ErrorKind, JobState, Orchestrator };

async fn wait_terminal
(
  orchestrator : &Orchestrator,
  job_id : &str,
  tenant : &the_module::TenantContext,
) -> the_module::JobStatus
{
  for _ in 0..100
  {
    let status = orchestrator.job_status( job_id, tenant ).unwrap();
    if matches!( status.state, JobState::Succeeded | JobState::Failed )
    {
      return status;
    }
    tokio::time::sleep( Duration::from_millis( 10 ) ).await;
  }
  panic!( "job '{job_id}' never reached a terminal state" );
}

#[ tokio::test ]
async fn submitted_jobs_run_to_completion()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let job_id = orchestrator.submit_async( request( "r-job", "m" ), tenant() ).unwrap();

  let status = wait_terminal( &orchestrator, &job_id, &tenant() ).await;
  assert_eq!( status.state, JobState::Succeeded );
  assert!( status.result.unwrap().content.contains( "pA" ) );
  assert!( status.error.is_none() );
}

#[ tokio::test ]
async fn failing_jobs_carry_their_error()
{
  let engine = test_engine( test_config() );
  let provider = MockProvider::new( "pA", &[ "m" ] ).with_script( &[ MockOutcome::Permanent ] );
  engine.register_provider( Box::new( provider ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let job_id = orchestrator.submit_async( request( "r-job-fail", "m" ), tenant() ).unwrap();

  let status = wait_terminal( &orchestrator, &job_id, &tenant() ).await;
  assert_eq!( status.state, JobState::Failed );
  assert_eq!( status.error.unwrap().kind(), ErrorKind::ProviderPermanent );
}

#[ tokio::test ]
async fn jobs_are_invisible_across_tenants()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let job_id = orchestrator.submit_async( request( "r-job-t1", "m" ), tenant() ).unwrap();

  let other = the_module::TenantContext::new( "t2" );
  let error = orchestrator.job_status( &job_id, &other ).unwrap_err();
  assert_eq!( error.kind(), ErrorKind::PermissionDenied );
}

#[ tokio::test ]
async fn batches_fan_out_and_report_per_item()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let orchestrator = Orchestrator::new( engine );
  let batch_id = orchestrator.batch
  (
    vec![ request( "item-a", "m" ), request( "item-b", "m" ), request( "item-c", "m" ) ],
    tenant(),
  ).unwrap();

  // Wait until every job settled.
  for _ in 0..100
  {
    let statuses = orchestrator.batch_status( &batch_id, &tenant() ).unwrap();
    if statuses.iter().all( | status | matches!( status.state, JobState::Succeeded | JobState::Failed ) )
    {
      break;
    }
    tokio::time::sleep( Duration::from_millis( 10 ) ).await;
  }

  let statuses = orchestrator.batch_status( &batch_id, &tenant() ).unwrap();
  assert_eq!( statuses.len(), 3 );
  let ids : Vec< &str > = statuses.iter().map( | status | status.request_id.as_str() ).collect();
  assert_eq!( ids, vec![ "item-a", "item-b", "item-c" ] );
  for status in &statuses
  {
    assert_eq!( status.state, JobState::Succeeded );
  }
}

#[ tokio::test ]
async fn empty_batches_are_rejected()
{
  let engine = test_engine( test_config() );
  let orchestrator = Orchestrator::new( engine );
  let error = orchestrator.batch( Vec::new(), tenant() ).unwrap_err();
  assert_eq!( error.kind(), ErrorKind::InvalidArgument );
}

#[ tokio::test ]
async fn oversized_batch_ids_are_rejected()
{
  let engine = test_engine( test_config() );
  engine.register_provider( Box::new( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();
  let orchestrator = Orchestrator::new( engine );

  let oversized = request( &"x".repeat( 300 ), "m" );
  let error = orchestrator.batch( vec![ oversized ], tenant() ).unwrap_err();
  assert_eq!( error.kind(), ErrorKind::InvalidArgument );
}

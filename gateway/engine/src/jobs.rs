//! Async job and batch bookkeeping
//!
//! Backs `submit_async`, `job_status` and `batch`. Records live and die with
//! the process; a façade wanting durable jobs persists them outside the
//! engine. Job visibility is tenant-scoped.

#[ cfg( feature = "async-jobs" ) ]
mod private
{
  use std::collections::HashMap;
  use parking_lot::RwLock;
  use serde::{ Serialize, Deserialize };
  use crate::error::{ GatewayError, GatewayResult };
  use crate::request::InferenceResponse;

  /// Lifecycle of an async job
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  pub enum JobState
  {
    /// Accepted, not started
    Pending,
    /// Executing
    Running,
    /// Finished with a response
    Succeeded,
    /// Finished with an error
    Failed,
  }

  /// Caller-visible job snapshot
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct JobStatus
  {
    /// Job identifier
    pub job_id : String,
    /// Request behind the job
    pub request_id : String,
    /// Current state
    pub state : JobState,
    /// Response once succeeded
    pub result : Option< InferenceResponse >,
    /// Error once failed
    pub error : Option< GatewayError >,
  }

  #[ derive( Debug, Clone ) ]
  struct JobRecord
  {
    tenant_id : String,
    batch_id : Option< String >,
    status : JobStatus,
    updated_at_ms : i64,
  }

  /// In-memory job store
  #[ derive( Debug, Default ) ]
  pub struct JobStore
  {
    jobs : RwLock< HashMap< String, JobRecord > >,
  }

  impl JobStore
  {
    /// Create an empty store
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Register a pending job, returning its id
    pub fn create( &self, request_id : &str, tenant_id : &str, batch_id : Option< &str > ) -> String
    {
      let job_id = uuid::Uuid::new_v4().to_string();
      let record = JobRecord
      {
        tenant_id : tenant_id.to_string(),
        batch_id : batch_id.map( str::to_string ),
        status : JobStatus
        {
          job_id : job_id.clone(),
          request_id : request_id.to_string(),
          state : JobState::Pending,
          result : None,
          error : None,
        },
        updated_at_ms : chrono::Utc::now().timestamp_millis(),
      };
      self.jobs.write().insert( job_id.clone(), record );
      job_id
    }

    fn update( &self, job_id : &str, op : impl FnOnce( &mut JobStatus ) )
    {
      if let Some( record ) = self.jobs.write().get_mut( job_id )
      {
        op( &mut record.status );
        record.updated_at_ms = chrono::Utc::now().timestamp_millis();
      }
    }

    /// Mark a job running
    pub fn mark_running( &self, job_id : &str )
    {
      self.update( job_id, | status | status.state = JobState::Running );
    }

    /// Finish a job with its response
    pub fn complete( &self, job_id : &str, response : InferenceResponse )
    {
      self.update( job_id, | status |
      {
        status.state = JobState::Succeeded;
        status.result = Some( response );
      } );
    }

    /// Finish a job with an error
    pub fn fail( &self, job_id : &str, error : GatewayError )
    {
      self.update( job_id, | status |
      {
        status.state = JobState::Failed;
        status.error = Some( error );
      } );
    }

    /// Read a job, enforcing tenant visibility
    ///
    /// # Errors
    ///
    /// `INVALID_ARGUMENT` for an unknown id, `PERMISSION_DENIED` when the job
    /// belongs to a different tenant.
    pub fn status( &self, job_id : &str, tenant_id : &str ) -> GatewayResult< JobStatus >
    {
      let jobs = self.jobs.read();
      let record = jobs.get( job_id )
        .ok_or_else( || GatewayError::invalid_argument( format!( "unknown job '{job_id}'" ) ) )?;
      if record.tenant_id != tenant_id
      {
        return Err( GatewayError::permission_denied( format!( "job '{job_id}' belongs to another tenant" ) ) );
      }
      Ok( record.status.clone() )
    }

    /// Read every job of a batch, enforcing tenant visibility
    ///
    /// # Errors
    ///
    /// `INVALID_ARGUMENT` when the batch is unknown for this tenant.
    pub fn batch_status( &self, batch_id : &str, tenant_id : &str ) -> GatewayResult< Vec< JobStatus > >
    {
      let jobs = self.jobs.read();
      let mut statuses : Vec< JobStatus > = jobs.values()
        .filter( | record | record.tenant_id == tenant_id && record.batch_id.as_deref() == Some( batch_id ) )
        .map( | record | record.status.clone() )
        .collect();
      if statuses.is_empty()
      {
        return Err( GatewayError::invalid_argument( format!( "unknown batch '{batch_id}'" ) ) );
      }
      statuses.sort_by( | a, b | a.request_id.cmp( &b.request_id ) );
      Ok( statuses )
    }

    /// Drop finished jobs older than `max_age_ms`
    pub fn sweep( &self, max_age_ms : i64 )
    {
      let cutoff = chrono::Utc::now().timestamp_millis() - max_age_ms;
      self.jobs.write().retain( | _job_id, record |
      {
        let finished = matches!( record.status.state, JobState::Succeeded | JobState::Failed );
        !( finished && record.updated_at_ms < cutoff )
      } );
    }
  }
}

#[ cfg( feature = "async-jobs" ) ]
crate::mod_interface!
{
  exposed use
  {
    JobState,
    JobStatus,
    JobStore,
  };
}

#[ cfg( not( feature = "async-jobs" ) ) ]
mod private {}

#[ cfg( not( feature = "async-jobs" ) ) ]
crate::mod_interface!
{
}

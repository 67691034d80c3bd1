//! Per-request execution state
//!
//! `ExecutionContext` is the single mutable container a request owns while it
//! walks the pipeline. It is never shared across requests and needs no
//! internal locking; plugins receive it as `&mut`. The immutable
//! `ExecutionToken` snapshot inside it is replaced wholesale on every
//! transition, and terminal statuses are sinks.

mod private
{
  use std::collections::HashMap;
  use std::sync::Weak;
  use serde::{ Serialize, Deserialize };
  use crate::error::{ GatewayError, GatewayResult };
  use crate::phase::Phase;
  use crate::engine::EngineContext;
  use crate::request::InferenceRequest;

  /// Variable key of the normalized sampling config (set in PRE_PROCESSING)
  pub const VAR_SAMPLING_CONFIG : &str = "sampling.config";
  /// Variable key of the routing decision (set in ROUTE)
  pub const VAR_ROUTING_DECISION : &str = "routing.decision";
  /// Variable key of the provider response (set in EXECUTE)
  pub const VAR_EXECUTE_RESPONSE : &str = "execute.response";
  /// Variable key of memory-injected messages (set in PRE_PROCESSING)
  pub const VAR_INJECTED_MESSAGES : &str = "memory.injected";
  /// Variable key marking a held tenant-level quota reservation
  pub const VAR_TENANT_QUOTA_RESERVED : &str = "quota.tenant_reserved";

  /// Immutable identity of the caller
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct TenantContext
  {
    /// Tenant identifier
    pub tenant_id : String,
    /// Acting user within the tenant, if known
    pub user_id : Option< String >,
    /// Roles granted to the caller
    pub roles : Vec< String >,
  }

  impl TenantContext
  {
    /// Create a tenant context with no user or roles
    #[ must_use ]
    pub fn new( tenant_id : impl Into< String > ) -> Self
    {
      Self
      {
        tenant_id : tenant_id.into(),
        user_id : None,
        roles : Vec::new(),
      }
    }

    /// Attach the acting user
    #[ must_use ]
    pub fn with_user( mut self, user_id : impl Into< String > ) -> Self
    {
      self.user_id = Some( user_id.into() );
      self
    }

    /// Attach granted roles
    #[ must_use ]
    pub fn with_roles( mut self, roles : Vec< String > ) -> Self
    {
      self.roles = roles;
      self
    }
  }

  /// Lifecycle status of a request
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  pub enum ExecutionStatus
  {
    /// Admitted, not yet running
    Pending,
    /// Walking the pipeline
    Running,
    /// Finished with a response
    Succeeded,
    /// Finished with an error
    Failed,
    /// Cancelled by the caller or the deadline
    Cancelled,
  }

  impl ExecutionStatus
  {
    /// Whether the status is a sink
    #[ inline ]
    #[ must_use ]
    pub fn is_terminal( self ) -> bool
    {
      matches!( self, Self::Succeeded | Self::Failed | Self::Cancelled )
    }
  }

  /// Immutable snapshot of a request's progress
  ///
  /// Replaced atomically on every transition; never mutated in place.
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct ExecutionToken
  {
    /// Request identifier
    pub request_id : String,
    /// Tenant identifier
    pub tenant_id : String,
    /// Phase the request is currently in
    pub current_phase : Phase,
    /// Lifecycle status
    pub status : ExecutionStatus,
    /// EXECUTE attempt counter, 1-based once running
    pub attempt : u32,
    /// Admission timestamp, epoch milliseconds
    pub started_at_ms : i64,
  }

  impl ExecutionToken
  {
    /// Create the admission snapshot
    #[ must_use ]
    pub fn new( request_id : impl Into< String >, tenant_id : impl Into< String > ) -> Self
    {
      Self
      {
        request_id : request_id.into(),
        tenant_id : tenant_id.into(),
        current_phase : Phase::Validate,
        status : ExecutionStatus::Pending,
        attempt : 0,
        started_at_ms : chrono::Utc::now().timestamp_millis(),
      }
    }
  }

  /// Mutable per-request container threaded through every phase
  #[ derive( Debug ) ]
  pub struct ExecutionContext
  {
    request : InferenceRequest,
    token : ExecutionToken,
    tenant : TenantContext,
    variables : HashMap< String, serde_json::Value >,
    metadata : HashMap< String, String >,
    error : Option< GatewayError >,
    engine : Weak< EngineContext >,
    deadline_at : Option< std::time::Instant >,
  }

  impl ExecutionContext
  {
    /// Create a context at admission
    #[ must_use ]
    pub fn new( request : InferenceRequest, tenant : TenantContext, engine : &std::sync::Arc< EngineContext > ) -> Self
    {
      let token = ExecutionToken::new( request.request_id.clone(), tenant.tenant_id.clone() );
      Self
      {
        request,
        token,
        tenant,
        variables : HashMap::new(),
        metadata : HashMap::new(),
        error : None,
        engine : std::sync::Arc::downgrade( engine ),
        deadline_at : None,
      }
    }

    /// Fix the absolute deadline of this request
    pub fn set_deadline( &mut self, deadline_at : std::time::Instant )
    {
      self.deadline_at = Some( deadline_at );
    }

    /// Budget left before the deadline; `None` when no deadline is set
    pub fn remaining_budget( &self ) -> Option< std::time::Duration >
    {
      self.deadline_at.map( | deadline | deadline.saturating_duration_since( std::time::Instant::now() ) )
    }

    /// Fail fast when the deadline has passed
    ///
    /// # Errors
    ///
    /// Returns `DEADLINE_EXCEEDED` once the budget is spent.
    pub fn check_deadline( &self ) -> GatewayResult< () >
    {
      match self.remaining_budget()
      {
        Some( remaining ) if remaining.is_zero() =>
          Err( GatewayError::deadline_exceeded( "request deadline elapsed" ).with_request( &self.token.request_id ) ),
        _ => Ok( () ),
      }
    }

    /// The admitted request; immutable for the rest of the lifecycle
    pub fn request( &self ) -> &InferenceRequest
    {
      &self.request
    }

    /// Current token snapshot
    pub fn token( &self ) -> &ExecutionToken
    {
      &self.token
    }

    /// Caller identity
    pub fn tenant( &self ) -> &TenantContext
    {
      &self.tenant
    }

    /// Upgrade the weak engine back-reference
    ///
    /// Returns `None` only during engine shutdown.
    pub fn engine( &self ) -> Option< std::sync::Arc< EngineContext > >
    {
      self.engine.upgrade()
    }

    /// Mark the request running; no-op once terminal
    pub fn mark_running( &mut self )
    {
      if !self.token.status.is_terminal()
      {
        self.token = ExecutionToken { status : ExecutionStatus::Running, attempt : 1, ..self.token.clone() };
      }
    }

    /// Advance to a phase; no-op once terminal
    pub fn advance_phase( &mut self, phase : Phase )
    {
      if !self.token.status.is_terminal()
      {
        self.token = ExecutionToken { current_phase : phase, ..self.token.clone() };
      }
    }

    /// Increment the EXECUTE attempt counter
    pub fn next_attempt( &mut self )
    {
      if !self.token.status.is_terminal()
      {
        self.token = ExecutionToken { attempt : self.token.attempt + 1, ..self.token.clone() };
      }
    }

    /// Transition to `Succeeded`; no-op once terminal
    pub fn mark_succeeded( &mut self )
    {
      if !self.token.status.is_terminal()
      {
        self.token = ExecutionToken { status : ExecutionStatus::Succeeded, ..self.token.clone() };
      }
    }

    /// Transition to `Failed` recording the error; no-op once terminal
    pub fn mark_failed( &mut self, error : GatewayError )
    {
      if !self.token.status.is_terminal()
      {
        self.token = ExecutionToken { status : ExecutionStatus::Failed, ..self.token.clone() };
        self.error = Some( error );
      }
    }

    /// Transition to `Cancelled`; idempotent
    pub fn mark_cancelled( &mut self )
    {
      if !self.token.status.is_terminal()
      {
        self.token = ExecutionToken { status : ExecutionStatus::Cancelled, ..self.token.clone() };
      }
    }

    /// Error recorded by a failed phase, if any
    pub fn error( &self ) -> Option< &GatewayError >
    {
      self.error.as_ref()
    }

    /// Store a typed variable for downstream plugins
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL` if the value cannot be serialized.
    pub fn set_variable< T : Serialize >( &mut self, key : impl Into< String >, value : &T ) -> GatewayResult< () >
    {
      let encoded = serde_json::to_value( value )
        .map_err( | e | GatewayError::internal( format!( "variable encoding failed : {e}" ) ) )?;
      self.variables.insert( key.into(), encoded );
      Ok( () )
    }

    /// Read a typed variable set by an earlier plugin
    pub fn variable< T : serde::de::DeserializeOwned >( &self, key : &str ) -> Option< T >
    {
      self.variables.get( key )
        .and_then( | value | serde_json::from_value( value.clone() ).ok() )
    }

    /// Whether a variable is present
    pub fn has_variable( &self, key : &str ) -> bool
    {
      self.variables.contains_key( key )
    }

    /// Remove a variable
    pub fn remove_variable( &mut self, key : &str )
    {
      self.variables.remove( key );
    }

    /// Append a diagnostic surfaced in the response metadata
    pub fn set_metadata( &mut self, key : impl Into< String >, value : impl Into< String > )
    {
      self.metadata.insert( key.into(), value.into() );
    }

    /// Diagnostics accumulated so far
    pub fn metadata( &self ) -> &HashMap< String, String >
    {
      &self.metadata
    }

    /// Append a warning without clobbering earlier ones
    pub fn push_warning( &mut self, warning : impl Into< String > )
    {
      let warning = warning.into();
      match self.metadata.get_mut( "warnings" )
      {
        Some( existing ) =>
        {
          existing.push_str( "; " );
          existing.push_str( &warning );
        },
        None =>
        {
          self.metadata.insert( "warnings".to_string(), warning );
        },
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn terminal_states_are_sinks()
    {
      let engine = crate::engine::EngineContext::init( crate::config::GatewayConfig::default() ).unwrap();
      let request = InferenceRequest::builder()
        .request_id( "r1" )
        .tenant( "t1" )
        .model( "m" )
        .user_message( "hi" )
        .build();
      let mut ctx = ExecutionContext::new( request, TenantContext::new( "t1" ), &engine );

      ctx.mark_running();
      ctx.mark_cancelled();
      assert_eq!( ctx.token().status, ExecutionStatus::Cancelled );

      // Cancelling again and succeeding afterwards are both no-ops
      ctx.mark_cancelled();
      ctx.mark_succeeded();
      assert_eq!( ctx.token().status, ExecutionStatus::Cancelled );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ExecutionContext,
    ExecutionStatus,
    ExecutionToken,
    TenantContext,
    VAR_EXECUTE_RESPONSE,
    VAR_INJECTED_MESSAGES,
    VAR_ROUTING_DECISION,
    VAR_SAMPLING_CONFIG,
    VAR_TENANT_QUOTA_RESERVED,
  };
}

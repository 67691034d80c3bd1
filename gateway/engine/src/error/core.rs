//! Core error types for the inference gateway
//!
//! `GatewayError` is the single error currency of the control plane. It is a
//! kind-tagged record rather than a deep enum so that the façade can map it to
//! a transport status without downcasting.

mod private
{
  use serde::{ Serialize, Deserialize };
  use std::fmt;

  /// Result alias used across the gateway crates
  pub type GatewayResult< T > = Result< T, GatewayError >;

  /// Error kinds of the gateway taxonomy
  ///
  /// Kinds are stable contract: the transport façade translates them to its
  /// own status space and must not depend on messages.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize ) ]
  pub enum ErrorKind
  {
    /// Schema or bound violation, surfaced verbatim
    InvalidArgument,
    /// Missing or invalid credentials
    Unauthenticated,
    /// Authenticated but not allowed
    PermissionDenied,
    /// Tenant or provider quota exhausted
    QuotaExhausted,
    /// Upstream rate limit hit
    RateLimited,
    /// Safety policy block
    PolicyViolation,
    /// No candidate provider passed routing
    ProviderUnavailable,
    /// Upstream 5xx or connection failure
    ProviderTransient,
    /// Upstream 4xx that is neither auth nor quota
    ProviderPermanent,
    /// Circuit breaker short-circuited the call
    CircuitOpen,
    /// Request deadline elapsed
    DeadlineExceeded,
    /// Request was cancelled by the caller
    Cancelled,
    /// Unexpected internal failure, surfaced opaque
    Internal,
  }

  impl ErrorKind
  {
    /// Whether an error of this kind is terminal for the request
    ///
    /// Terminal kinds are never retried regardless of the retryable flag.
    #[ inline ]
    #[ must_use ]
    pub fn is_terminal( self ) -> bool
    {
      matches!( self, Self::DeadlineExceeded | Self::Cancelled )
    }
  }

  impl fmt::Display for ErrorKind
  {
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      let name = match self
      {
        Self::InvalidArgument => "INVALID_ARGUMENT",
        Self::Unauthenticated => "UNAUTHENTICATED",
        Self::PermissionDenied => "PERMISSION_DENIED",
        Self::QuotaExhausted => "QUOTA_EXHAUSTED",
        Self::RateLimited => "RATE_LIMITED",
        Self::PolicyViolation => "POLICY_VIOLATION",
        Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
        Self::ProviderTransient => "PROVIDER_TRANSIENT",
        Self::ProviderPermanent => "PROVIDER_PERMANENT",
        Self::CircuitOpen => "CIRCUIT_OPEN",
        Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Self::Cancelled => "CANCELLED",
        Self::Internal => "INTERNAL",
      };
      write!( f, "{name}" )
    }
  }

  /// Recovery action suggested to the caller
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  pub enum SuggestedAction
  {
    /// Retry the same request, possibly after `retry_after_ms`
    Retry,
    /// Retry against a different provider or model
    Fallback,
    /// Escalate to an operator
    Escalate,
    /// Requires human review (safety blocks)
    HumanReview,
  }

  /// Structured gateway error
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct GatewayError
  {
    kind : ErrorKind,
    message : String,
    provider_id : Option< String >,
    request_id : Option< String >,
    retryable : bool,
    retry_after_ms : Option< u64 >,
    suggested_action : SuggestedAction,
  }

  impl GatewayError
  {
    /// Create an error with an explicit kind and retryability
    #[ must_use ]
    pub fn new( kind : ErrorKind, message : impl Into< String >, retryable : bool, suggested_action : SuggestedAction ) -> Self
    {
      Self
      {
        kind,
        message : message.into(),
        provider_id : None,
        request_id : None,
        retryable,
        retry_after_ms : None,
        suggested_action,
      }
    }

    /// Schema or bound violation
    #[ must_use ]
    pub fn invalid_argument( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::InvalidArgument, message, false, SuggestedAction::Escalate )
    }

    /// Missing or invalid credentials
    #[ must_use ]
    pub fn unauthenticated( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::Unauthenticated, message, false, SuggestedAction::Escalate )
    }

    /// Authenticated but not allowed
    #[ must_use ]
    pub fn permission_denied( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::PermissionDenied, message, false, SuggestedAction::Escalate )
    }

    /// Tenant or provider quota exhausted
    #[ must_use ]
    pub fn quota_exhausted( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::QuotaExhausted, message, false, SuggestedAction::Retry )
    }

    /// Upstream rate limit, retry after the given delay
    #[ must_use ]
    pub fn rate_limited( message : impl Into< String >, retry_after_ms : Option< u64 > ) -> Self
    {
      let mut error = Self::new( ErrorKind::RateLimited, message, false, SuggestedAction::Retry );
      error.retry_after_ms = retry_after_ms;
      error
    }

    /// Safety policy block
    #[ must_use ]
    pub fn policy_violation( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::PolicyViolation, message, false, SuggestedAction::HumanReview )
    }

    /// No candidate provider passed routing
    #[ must_use ]
    pub fn provider_unavailable( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::ProviderUnavailable, message, true, SuggestedAction::Fallback )
    }

    /// Upstream 5xx or connection failure
    #[ must_use ]
    pub fn provider_transient( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::ProviderTransient, message, true, SuggestedAction::Retry )
    }

    /// Upstream 4xx that is neither auth nor quota
    #[ must_use ]
    pub fn provider_permanent( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::ProviderPermanent, message, false, SuggestedAction::Escalate )
    }

    /// Call short-circuited by an open circuit breaker
    ///
    /// The current attempt fails immediately; a later attempt may be routed to
    /// a different provider, so the error is marked retryable.
    #[ must_use ]
    pub fn circuit_open( provider_id : impl Into< String > ) -> Self
    {
      let provider_id = provider_id.into();
      let mut error = Self::new
      (
        ErrorKind::CircuitOpen,
        format!( "circuit breaker open for provider '{provider_id}'" ),
        true,
        SuggestedAction::Fallback,
      );
      error.provider_id = Some( provider_id );
      error
    }

    /// Request deadline elapsed
    #[ must_use ]
    pub fn deadline_exceeded( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::DeadlineExceeded, message, false, SuggestedAction::Escalate )
    }

    /// Request cancelled by the caller
    #[ must_use ]
    pub fn cancelled( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::Cancelled, message, false, SuggestedAction::Escalate )
    }

    /// Unexpected internal failure
    #[ must_use ]
    pub fn internal( message : impl Into< String > ) -> Self
    {
      Self::new( ErrorKind::Internal, message, false, SuggestedAction::Escalate )
    }

    /// Attach the provider that produced the error
    #[ must_use ]
    pub fn with_provider( mut self, provider_id : impl Into< String > ) -> Self
    {
      self.provider_id = Some( provider_id.into() );
      self
    }

    /// Attach the request the error belongs to
    #[ must_use ]
    pub fn with_request( mut self, request_id : impl Into< String > ) -> Self
    {
      self.request_id = Some( request_id.into() );
      self
    }

    /// Override the retry-after hint
    #[ must_use ]
    pub fn with_retry_after_ms( mut self, retry_after_ms : u64 ) -> Self
    {
      self.retry_after_ms = Some( retry_after_ms );
      self
    }

    /// Error kind
    pub fn kind( &self ) -> ErrorKind
    {
      self.kind
    }

    /// Human-readable message
    pub fn message( &self ) -> &str
    {
      &self.message
    }

    /// Provider that produced the error, if any
    pub fn provider_id( &self ) -> Option< &str >
    {
      self.provider_id.as_deref()
    }

    /// Request the error belongs to, if attached
    pub fn request_id( &self ) -> Option< &str >
    {
      self.request_id.as_deref()
    }

    /// Whether the EXECUTE phase may retry after this error
    pub fn is_retryable( &self ) -> bool
    {
      self.retryable && !self.kind.is_terminal()
    }

    /// Suggested delay before the next attempt, if the upstream told us
    pub fn retry_after_ms( &self ) -> Option< u64 >
    {
      self.retry_after_ms
    }

    /// Suggested recovery action
    pub fn suggested_action( &self ) -> SuggestedAction
    {
      self.suggested_action
    }

    /// Whether the error counts toward the provider circuit breaker
    ///
    /// Only provider-side failures trip the breaker. Caller mistakes, policy
    /// blocks and short-circuits themselves do not.
    #[ must_use ]
    pub fn counts_toward_breaker( &self ) -> bool
    {
      matches!( self.kind, ErrorKind::ProviderTransient | ErrorKind::ProviderPermanent )
    }
  }

  impl fmt::Display for GatewayError
  {
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      match ( &self.provider_id, &self.request_id )
      {
        ( Some( provider ), Some( request ) ) =>
          write!( f, "{} : {} (provider {}, request {})", self.kind, self.message, provider, request ),
        ( Some( provider ), None ) =>
          write!( f, "{} : {} (provider {})", self.kind, self.message, provider ),
        ( None, Some( request ) ) =>
          write!( f, "{} : {} (request {})", self.kind, self.message, request ),
        ( None, None ) =>
          write!( f, "{} : {}", self.kind, self.message ),
      }
    }
  }

  impl std::error::Error for GatewayError {}
}

crate::mod_interface!
{
  exposed use
  {
    ErrorKind,
    GatewayError,
    GatewayResult,
    SuggestedAction,
  };
}

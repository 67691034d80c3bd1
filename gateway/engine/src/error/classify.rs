//! Error classification for provider adapters
//!
//! Maps raw provider failures (HTTP statuses, transport errors, timeouts) to
//! the gateway taxonomy and decides retryability. All providers funnel their
//! failures through this table so the breaker and the retry loop see a single
//! vocabulary.

mod private
{
  use super::super::core::orphan::*;

  /// Coarse classification of a provider-side failure
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum ErrorClass
  {
    /// Request was malformed for this provider
    Validation,
    /// Credentials rejected
    Auth,
    /// Provider-side quota exhausted
    Quota,
    /// Provider rate limit
    RateLimit,
    /// Transient upstream failure (5xx, connect/reset)
    ProviderTransient,
    /// Permanent upstream failure (other 4xx)
    ProviderPermanent,
    /// Provider call timed out
    Timeout,
  }

  impl ErrorClass
  {
    /// Classify an HTTP status code
    #[ must_use ]
    pub fn from_status( status : u16 ) -> Self
    {
      match status
      {
        400 | 422 => Self::Validation,
        401 | 403 => Self::Auth,
        402 => Self::Quota,
        408 => Self::Timeout,
        429 => Self::RateLimit,
        500..=599 => Self::ProviderTransient,
        _ => Self::ProviderPermanent,
      }
    }

    /// Whether the EXECUTE phase may retry after this class of failure
    #[ must_use ]
    pub fn is_retryable( self ) -> bool
    {
      matches!( self, Self::ProviderTransient | Self::Timeout )
    }

    /// Whether this class counts toward the provider circuit breaker
    #[ must_use ]
    pub fn counts_toward_breaker( self ) -> bool
    {
      matches!( self, Self::ProviderTransient | Self::ProviderPermanent | Self::Timeout )
    }

    /// Convert the class into a gateway error
    #[ must_use ]
    pub fn into_error( self, provider_id : &str, message : impl Into< String > ) -> GatewayError
    {
      let message = message.into();
      let error = match self
      {
        Self::Validation => GatewayError::invalid_argument( message ),
        Self::Auth => GatewayError::unauthenticated( message ),
        Self::Quota => GatewayError::quota_exhausted( message ),
        Self::RateLimit => GatewayError::rate_limited( message, None ),
        Self::ProviderTransient => GatewayError::provider_transient( message ),
        Self::ProviderPermanent => GatewayError::provider_permanent( message ),
        // Call-level timeouts are provider failures, not request-deadline ones:
        // the attempt may be retried and the breaker must account for it.
        Self::Timeout => GatewayError::provider_transient( message ),
      };
      error.with_provider( provider_id )
    }
  }

  /// Classify an HTTP status into a gateway error for the given provider
  #[ must_use ]
  pub fn classify_status( provider_id : &str, status : u16, body : &str ) -> GatewayError
  {
    ErrorClass::from_status( status )
      .into_error( provider_id, format!( "HTTP {status}: {body}" ) )
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn statuses_map_to_expected_classes()
    {
      assert_eq!( ErrorClass::from_status( 400 ), ErrorClass::Validation );
      assert_eq!( ErrorClass::from_status( 401 ), ErrorClass::Auth );
      assert_eq!( ErrorClass::from_status( 429 ), ErrorClass::RateLimit );
      assert_eq!( ErrorClass::from_status( 503 ), ErrorClass::ProviderTransient );
      assert_eq!( ErrorClass::from_status( 404 ), ErrorClass::ProviderPermanent );
    }

    #[ test ]
    fn only_transient_and_timeout_are_retryable()
    {
      assert!( ErrorClass::ProviderTransient.is_retryable() );
      assert!( ErrorClass::Timeout.is_retryable() );
      assert!( !ErrorClass::ProviderPermanent.is_retryable() );
      assert!( !ErrorClass::Auth.is_retryable() );
      assert!( !ErrorClass::RateLimit.is_retryable() );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ErrorClass,
    classify_status,
  };
}

//! Retry backoff schedule
//!
//! Only the EXECUTE phase is retried, and only for errors the provider
//! adapter marked retryable. Delays follow `base · 2^(attempt-1)` capped at
//! the configured maximum; the orchestrator additionally bounds every sleep
//! by the request deadline.

mod private
{
  use std::time::Duration;
  use crate::error::GatewayError;

  /// Exponential backoff parameters
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub struct BackoffSchedule
  {
    base_ms : u64,
    max_backoff_ms : u64,
  }

  impl BackoffSchedule
  {
    /// Create a schedule
    #[ must_use ]
    pub fn new( base_ms : u64, max_backoff_ms : u64 ) -> Self
    {
      Self { base_ms, max_backoff_ms }
    }

    /// Delay to sleep after a failed attempt, 1-based
    ///
    /// Attempt 1 failing yields the base delay, attempt 2 twice that, and so
    /// on, capped at the configured maximum.
    #[ must_use ]
    pub fn delay_after_attempt( &self, attempt : u32 ) -> Duration
    {
      let exponent = attempt.saturating_sub( 1 ).min( 32 );
      let delay = self.base_ms.saturating_mul( 1u64 << exponent );
      Duration::from_millis( delay.min( self.max_backoff_ms ) )
    }

    /// Delay for a failed attempt honoring an upstream `retry-after` hint
    ///
    /// The hint wins when it is longer than the computed backoff.
    #[ must_use ]
    pub fn delay_after_error( &self, attempt : u32, error : &GatewayError ) -> Duration
    {
      let computed = self.delay_after_attempt( attempt );
      match error.retry_after_ms()
      {
        Some( hinted ) => computed.max( Duration::from_millis( hinted ) ),
        None => computed,
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn backoff_doubles_and_caps()
    {
      let schedule = BackoffSchedule::new( 100, 350 );
      assert_eq!( schedule.delay_after_attempt( 1 ), Duration::from_millis( 100 ) );
      assert_eq!( schedule.delay_after_attempt( 2 ), Duration::from_millis( 200 ) );
      assert_eq!( schedule.delay_after_attempt( 3 ), Duration::from_millis( 350 ) );
      assert_eq!( schedule.delay_after_attempt( 10 ), Duration::from_millis( 350 ) );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    BackoffSchedule,
  };
}

//! Per-provider circuit breaker
//!
//! Suppresses calls to a failing provider: consecutive provider-side failures
//! open the circuit, calls short-circuit while it is open, and after the
//! configured timeout a single probe decides between closing and re-opening.
//! All transitions happen under one lock and are visible in the metrics.

mod private
{
  use std::time::{ Duration, Instant };
  use parking_lot::Mutex;
  use serde::{ Serialize, Deserialize };
  use crate::error::{ GatewayError, GatewayResult };

  #[ cfg( feature = "logging" ) ]
  use tracing::{ info, warn };

  /// Probe behavior while half-open
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum ProbePolicy
  {
    /// Allow exactly one in-flight probe
    #[ default ]
    Single,
  }

  /// Circuit breaker configuration
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct CircuitBreakerConfig
  {
    /// Consecutive failures required to open the circuit
    pub failure_threshold : u32,
    /// Time the circuit stays open before probing (milliseconds)
    pub timeout_ms : u64,
    /// Probe behavior while half-open
    pub probe_policy : ProbePolicy,
  }

  impl Default for CircuitBreakerConfig
  {
    fn default() -> Self
    {
      Self
      {
        failure_threshold : 5,
        timeout_ms : 60_000,
        probe_policy : ProbePolicy::Single,
      }
    }
  }

  impl CircuitBreakerConfig
  {
    /// Set the failure threshold
    #[ must_use ]
    pub fn with_failure_threshold( mut self, failure_threshold : u32 ) -> Self
    {
      self.failure_threshold = failure_threshold;
      self
    }

    /// Set the open timeout
    #[ must_use ]
    pub fn with_timeout_ms( mut self, timeout_ms : u64 ) -> Self
    {
      self.timeout_ms = timeout_ms;
      self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` if the threshold or timeout is zero.
    pub fn validate( &self ) -> GatewayResult< () >
    {
      if self.failure_threshold == 0
      {
        return Err( GatewayError::invalid_argument( "breaker failure_threshold must be > 0" ) );
      }
      if self.timeout_ms == 0
      {
        return Err( GatewayError::invalid_argument( "breaker timeout_ms must be > 0" ) );
      }
      Ok( () )
    }
  }

  /// Observable breaker state
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  pub enum CircuitState
  {
    /// Calls pass through
    Closed,
    /// Calls short-circuit
    Open,
    /// One probe allowed
    HalfOpen,
  }

  /// Counters kept across the breaker's lifetime
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default ) ]
  pub struct CircuitBreakerMetrics
  {
    /// Calls that reached `try_acquire`
    pub total_calls : u64,
    /// Failures recorded
    pub failed_calls : u64,
    /// Calls rejected by an open circuit
    pub blocked_calls : u64,
    /// State transitions
    pub state_transitions : u64,
  }

  /// Consistent snapshot for routing decisions and diagnostics
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub struct BreakerSnapshot
  {
    /// Current state
    pub state : CircuitState,
    /// Consecutive provider-side failures observed
    pub consecutive_failures : u32,
    /// When the circuit last opened
    pub opened_at : Option< Instant >,
  }

  #[ derive( Debug ) ]
  enum Inner
  {
    Closed,
    Open( Instant ),
    HalfOpen
    {
      probe_in_flight : bool,
    },
  }

  #[ derive( Debug ) ]
  struct BreakerState
  {
    inner : Inner,
    consecutive_failures : u32,
    opened_at : Option< Instant >,
    metrics : CircuitBreakerMetrics,
  }

  /// Per-provider circuit breaker
  #[ derive( Debug ) ]
  pub struct CircuitBreaker
  {
    config : CircuitBreakerConfig,
    state : Mutex< BreakerState >,
  }

  impl CircuitBreaker
  {
    /// Create a closed breaker
    #[ must_use ]
    pub fn new( config : CircuitBreakerConfig ) -> Self
    {
      Self
      {
        config,
        state : Mutex::new( BreakerState
        {
          inner : Inner::Closed,
          consecutive_failures : 0,
          opened_at : None,
          metrics : CircuitBreakerMetrics::default(),
        } ),
      }
    }

    /// Ask permission to place a call
    ///
    /// Open circuits transition to half-open once the timeout has elapsed;
    /// half-open circuits admit a single probe.
    ///
    /// # Errors
    ///
    /// Returns `CIRCUIT_OPEN` when the call must short-circuit.
    pub fn try_acquire( &self, provider_id : &str ) -> GatewayResult< () >
    {
      let mut state = self.state.lock();
      state.metrics.total_calls += 1;

      match state.inner
      {
        Inner::Closed => Ok( () ),
        Inner::Open( opened_at ) =>
        {
          if opened_at.elapsed() >= Duration::from_millis( self.config.timeout_ms )
          {
            state.inner = Inner::HalfOpen { probe_in_flight : true };
            state.metrics.state_transitions += 1;
            #[ cfg( feature = "logging" ) ]
            info!( provider_id, "circuit breaker half-open, probing" );
            Ok( () )
          }
          else
          {
            state.metrics.blocked_calls += 1;
            Err( GatewayError::circuit_open( provider_id ) )
          }
        },
        Inner::HalfOpen { probe_in_flight } =>
        {
          if probe_in_flight
          {
            state.metrics.blocked_calls += 1;
            Err( GatewayError::circuit_open( provider_id ) )
          }
          else
          {
            state.inner = Inner::HalfOpen { probe_in_flight : true };
            Ok( () )
          }
        },
      }
    }

    /// Record a successful call
    pub fn record_success( &self )
    {
      let mut state = self.state.lock();
      match state.inner
      {
        Inner::HalfOpen { .. } =>
        {
          state.inner = Inner::Closed;
          state.consecutive_failures = 0;
          state.opened_at = None;
          state.metrics.state_transitions += 1;
          #[ cfg( feature = "logging" ) ]
          info!( "circuit breaker closed after successful probe" );
        },
        Inner::Closed =>
        {
          state.consecutive_failures = 0;
        },
        Inner::Open( .. ) =>
        {
          // Success reported for a call admitted before the circuit opened;
          // the open state stands until its timeout.
        },
      }
    }

    /// Record a provider-side failure
    pub fn record_failure( &self, provider_id : &str )
    {
      let mut state = self.state.lock();
      state.metrics.failed_calls += 1;

      match state.inner
      {
        Inner::Closed =>
        {
          state.consecutive_failures += 1;
          if state.consecutive_failures >= self.config.failure_threshold
          {
            let now = Instant::now();
            state.inner = Inner::Open( now );
            state.opened_at = Some( now );
            state.metrics.state_transitions += 1;
            #[ cfg( feature = "logging" ) ]
            warn!( provider_id, failures = state.consecutive_failures, "circuit breaker opened" );
          }
        },
        Inner::HalfOpen { .. } =>
        {
          let now = Instant::now();
          state.inner = Inner::Open( now );
          state.opened_at = Some( now );
          state.consecutive_failures += 1;
          state.metrics.state_transitions += 1;
          #[ cfg( feature = "logging" ) ]
          warn!( provider_id, "probe failed, circuit breaker re-opened" );
        },
        Inner::Open( .. ) =>
        {
          // Late failure from a call admitted earlier; nothing to transition.
        },
      }
      #[ cfg( not( feature = "logging" ) ) ]
      let _ = provider_id;
    }

    /// Current observable state
    ///
    /// Reading does not trigger the open-to-half-open transition; only
    /// `try_acquire` does, so routing snapshots stay consistent.
    pub fn state( &self ) -> CircuitState
    {
      match self.state.lock().inner
      {
        Inner::Closed => CircuitState::Closed,
        Inner::Open( .. ) => CircuitState::Open,
        Inner::HalfOpen { .. } => CircuitState::HalfOpen,
      }
    }

    /// Whether `try_acquire` would currently admit a regular call
    pub fn is_call_permitted( &self ) -> bool
    {
      let state = self.state.lock();
      match state.inner
      {
        Inner::Closed => true,
        Inner::Open( opened_at ) => opened_at.elapsed() >= Duration::from_millis( self.config.timeout_ms ),
        Inner::HalfOpen { probe_in_flight } => !probe_in_flight,
      }
    }

    /// Consistent snapshot of state and counters
    pub fn snapshot( &self ) -> BreakerSnapshot
    {
      let state = self.state.lock();
      BreakerSnapshot
      {
        state : match state.inner
        {
          Inner::Closed => CircuitState::Closed,
          Inner::Open( .. ) => CircuitState::Open,
          Inner::HalfOpen { .. } => CircuitState::HalfOpen,
        },
        consecutive_failures : state.consecutive_failures,
        opened_at : state.opened_at,
      }
    }

    /// Lifetime counters
    pub fn metrics( &self ) -> CircuitBreakerMetrics
    {
      self.state.lock().metrics
    }

    /// Give back an admitted probe without recording an outcome
    ///
    /// Used when a half-open probe call is cancelled before the provider
    /// answered; the next call may probe again.
    pub fn release_probe( &self )
    {
      let mut state = self.state.lock();
      if let Inner::HalfOpen { probe_in_flight : true } = state.inner
      {
        state.inner = Inner::HalfOpen { probe_in_flight : false };
      }
    }

    /// Force the breaker back to closed
    pub fn reset( &self )
    {
      let mut state = self.state.lock();
      state.inner = Inner::Closed;
      state.consecutive_failures = 0;
      state.opened_at = None;
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    BreakerSnapshot,
    CircuitBreaker,
    CircuitBreakerConfig,
    CircuitBreakerMetrics,
    CircuitState,
    ProbePolicy,
  };
}

//! Observability spine
//!
//! In-process metrics registry and audit hook consumed across the control
//! plane: the orchestrator records request outcomes and retry counts, the
//! router records selections, the adapter's breaker exposes its own counters.
//! Snapshots are plain data; exporting them is a façade concern.

#[ cfg( feature = "observability" ) ]
mod private
{
  use std::collections::HashMap;
  use parking_lot::Mutex;
  use serde::{ Serialize, Deserialize };

  /// Point-in-time view of all recorded metrics
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize, Default ) ]
  pub struct MetricsSnapshot
  {
    /// Monotonic counters keyed by metric name plus labels
    pub counters : HashMap< String, u64 >,
    /// Duration aggregates keyed by metric name
    pub durations : HashMap< String, DurationStats >,
  }

  /// Aggregated duration observations for one metric
  #[ derive( Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default ) ]
  pub struct DurationStats
  {
    /// Observations recorded
    pub count : u64,
    /// Sum of observed milliseconds
    pub total_ms : u64,
    /// Largest observation
    pub max_ms : u64,
  }

  impl DurationStats
  {
    /// Mean observation in milliseconds
    #[ must_use ]
    pub fn mean_ms( &self ) -> f64
    {
      if self.count == 0
      {
        0.0
      }
      else
      {
        self.total_ms as f64 / self.count as f64
      }
    }
  }

  /// Format a metric key with one label, `name{label:value}`
  #[ must_use ]
  pub fn labeled( name : &str, label : &str, value : &str ) -> String
  {
    format!( "{name}{{{label}:{value}}}" )
  }

  /// In-process metrics registry
  #[ derive( Debug, Default ) ]
  pub struct MetricsRegistry
  {
    counters : Mutex< HashMap< String, u64 > >,
    durations : Mutex< HashMap< String, DurationStats > >,
  }

  impl MetricsRegistry
  {
    /// Create an empty registry
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Add one to a counter
    pub fn increment( &self, key : impl Into< String > )
    {
      self.add( key, 1 );
    }

    /// Add an amount to a counter
    pub fn add( &self, key : impl Into< String >, amount : u64 )
    {
      let mut counters = self.counters.lock();
      *counters.entry( key.into() ).or_insert( 0 ) += amount;
    }

    /// Record one duration observation
    pub fn observe_ms( &self, key : impl Into< String >, duration_ms : u64 )
    {
      let mut durations = self.durations.lock();
      let stats = durations.entry( key.into() ).or_default();
      stats.count += 1;
      stats.total_ms += duration_ms;
      stats.max_ms = stats.max_ms.max( duration_ms );
    }

    /// Read one counter, 0 when never written
    pub fn counter( &self, key : &str ) -> u64
    {
      self.counters.lock().get( key ).copied().unwrap_or( 0 )
    }

    /// Snapshot every metric
    pub fn snapshot( &self ) -> MetricsSnapshot
    {
      MetricsSnapshot
      {
        counters : self.counters.lock().clone(),
        durations : self.durations.lock().clone(),
      }
    }
  }

  /// Audit event emitted at request milestones
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct AuditEvent
  {
    /// Request the event belongs to
    pub request_id : String,
    /// Tenant the request is billed to
    pub tenant_id : String,
    /// Milestone name, e.g. `admitted`, `routed`, `completed`
    pub action : String,
    /// Free-form detail
    pub detail : String,
    /// Event timestamp, epoch milliseconds
    pub timestamp_ms : i64,
  }

  impl AuditEvent
  {
    /// Create an event stamped now
    #[ must_use ]
    pub fn new( request_id : &str, tenant_id : &str, action : &str, detail : impl Into< String > ) -> Self
    {
      Self
      {
        request_id : request_id.to_string(),
        tenant_id : tenant_id.to_string(),
        action : action.to_string(),
        detail : detail.into(),
        timestamp_ms : chrono::Utc::now().timestamp_millis(),
      }
    }
  }

  /// Sink for audit events
  pub trait AuditHook : Send + Sync
  {
    /// Consume one event; must not block
    fn record( &self, event : AuditEvent );
  }

  /// Audit hook that retains events in memory, mainly for tests
  #[ derive( Debug, Default ) ]
  pub struct MemoryAuditHook
  {
    events : Mutex< Vec< AuditEvent > >,
  }

  impl MemoryAuditHook
  {
    /// Create an empty hook
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Events recorded so far
    pub fn events( &self ) -> Vec< AuditEvent >
    {
      self.events.lock().clone()
    }
  }

  impl AuditHook for MemoryAuditHook
  {
    fn record( &self, event : AuditEvent )
    {
      self.events.lock().push( event );
    }
  }
}

#[ cfg( feature = "observability" ) ]
crate::mod_interface!
{
  exposed use
  {
    AuditEvent,
    AuditHook,
    DurationStats,
    MemoryAuditHook,
    MetricsRegistry,
    MetricsSnapshot,
    labeled,
  };
}

#[ cfg( not( feature = "observability" ) ) ]
mod private {}

#[ cfg( not( feature = "observability" ) ) ]
crate::mod_interface!
{
}

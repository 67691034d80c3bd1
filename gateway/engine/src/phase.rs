//! Pipeline phases and the plugin contract
//!
//! A request walks the phases in declared order. Plugins attach to exactly
//! one phase with an integer `order`; within a phase the total order is
//! `( order, registration index )`.

mod private
{
  use serde::{ Serialize, Deserialize };
  use std::fmt;
  use crate::context::ExecutionContext;
  use crate::engine::EngineContext;
  use crate::error::GatewayResult;

  /// One stage of the request pipeline
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize ) ]
  pub enum Phase
  {
    /// Structural and policy validation
    Validate,
    /// Tenant-level authorization and quota
    Authorize,
    /// Provider selection
    Route,
    /// Request normalization and enrichment
    PreProcessing,
    /// Provider call
    Execute,
    /// Output parsing and response shaping
    PostProcessing,
    /// Unconditional teardown
    Cleanup,
  }

  impl Phase
  {
    /// All phases in pipeline order
    pub const ALL : [ Self; 7 ] =
    [
      Self::Validate,
      Self::Authorize,
      Self::Route,
      Self::PreProcessing,
      Self::Execute,
      Self::PostProcessing,
      Self::Cleanup,
    ];

    /// Stable lowercase name used in metadata and metrics
    #[ must_use ]
    pub fn as_str( self ) -> &'static str
    {
      match self
      {
        Self::Validate => "validate",
        Self::Authorize => "authorize",
        Self::Route => "route",
        Self::PreProcessing => "pre_processing",
        Self::Execute => "execute",
        Self::PostProcessing => "post_processing",
        Self::Cleanup => "cleanup",
      }
    }
  }

  impl fmt::Display for Phase
  {
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      write!( f, "{}", self.as_str() )
    }
  }

  /// A unit of policy attached to one phase
  ///
  /// Plugins mutate the per-request [`ExecutionContext`] and read the
  /// process-wide [`EngineContext`]; they hold no reference back to the
  /// pipeline.
  #[ async_trait::async_trait ]
  pub trait PhasePlugin : Send + Sync
  {
    /// Stable plugin identifier, used in diagnostics
    fn id( &self ) -> &str;

    /// Phase this plugin runs in
    fn phase( &self ) -> Phase;

    /// Ordering within the phase; lower runs first
    fn order( &self ) -> i32
    {
      0
    }

    /// Whether the plugin applies to this request
    fn should_execute( &self, ctx : &ExecutionContext ) -> bool
    {
      let _ = ctx;
      true
    }

    /// Run the plugin
    async fn execute( &self, ctx : &mut ExecutionContext, engine : &EngineContext ) -> GatewayResult< () >;
  }
}

crate::mod_interface!
{
  exposed use
  {
    Phase,
    PhasePlugin,
  };
}

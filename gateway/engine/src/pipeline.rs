//! Ordered plugin dispatch
//!
//! `PhasePipeline` holds the registered plugins sorted by
//! `( phase, order, registration index )` and runs one phase at a time.
//! A plugin error halts the phase; the orchestrator then jumps to CLEANUP.
//! CLEANUP itself is special: every cleanup plugin runs even when earlier
//! ones fail, and their errors are aggregated into context metadata.

mod private
{
  use std::sync::Arc;
  use tokio_util::sync::CancellationToken;
  use crate::context::ExecutionContext;
  use crate::engine::EngineContext;
  use crate::error::{ GatewayError, GatewayResult };
  use crate::phase::{ Phase, PhasePlugin };

  #[ cfg( feature = "logging" ) ]
  use tracing::{ debug, warn };

  /// Builder collecting plugins in registration order
  #[ derive( Default ) ]
  pub struct PhasePipelineBuilder
  {
    plugins : Vec< Arc< dyn PhasePlugin > >,
  }

  impl std::fmt::Debug for PhasePipelineBuilder
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "PhasePipelineBuilder" )
        .field( "plugins", &self.plugins.len() )
        .finish()
    }
  }

  impl PhasePipelineBuilder
  {
    /// Create an empty builder
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Register a plugin; registration order breaks `order` ties
    #[ must_use ]
    pub fn plugin( mut self, plugin : Arc< dyn PhasePlugin > ) -> Self
    {
      self.plugins.push( plugin );
      self
    }

    /// Finish the pipeline
    #[ must_use ]
    pub fn build( mut self ) -> PhasePipeline
    {
      // Stable sort keeps registration order for equal ( phase, order ).
      self.plugins.sort_by_key( | plugin | ( plugin.phase(), plugin.order() ) );
      PhasePipeline { plugins : self.plugins }
    }
  }

  /// The ordered plugin chain of the gateway
  pub struct PhasePipeline
  {
    plugins : Vec< Arc< dyn PhasePlugin > >,
  }

  impl std::fmt::Debug for PhasePipeline
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "PhasePipeline" )
        .field( "plugins", &self.plugins.len() )
        .finish()
    }
  }

  impl PhasePipeline
  {
    /// Start building a pipeline
    #[ must_use ]
    pub fn builder() -> PhasePipelineBuilder
    {
      PhasePipelineBuilder::new()
    }

    /// Plugins attached to `phase`, in execution order
    pub fn plugins_for( &self, phase : Phase ) -> impl Iterator< Item = &Arc< dyn PhasePlugin > >
    {
      self.plugins.iter().filter( move | plugin | plugin.phase() == phase )
    }

    /// Number of registered plugins
    pub fn len( &self ) -> usize
    {
      self.plugins.len()
    }

    /// Whether the pipeline has no plugins
    pub fn is_empty( &self ) -> bool
    {
      self.plugins.is_empty()
    }

    /// Run a single non-CLEANUP phase
    ///
    /// The context's current phase is advanced first. The first plugin error
    /// halts the loop and is returned; the orchestrator decides whether it is
    /// terminal, retryable or a POST taint.
    ///
    /// # Errors
    ///
    /// `CANCELLED` when the token fires between plugins, or the first plugin
    /// error.
    pub async fn run_phase
    (
      &self,
      phase : Phase,
      ctx : &mut ExecutionContext,
      engine : &EngineContext,
      cancel : &CancellationToken,
    ) -> GatewayResult< () >
    {
      debug_assert!( phase != Phase::Cleanup, "CLEANUP goes through run_cleanup" );
      ctx.advance_phase( phase );

      for plugin in self.plugins_for( phase )
      {
        if cancel.is_cancelled()
        {
          return Err( GatewayError::cancelled( format!( "cancelled before plugin '{}'", plugin.id() ) ) );
        }
        if !plugin.should_execute( ctx )
        {
          continue;
        }
        #[ cfg( feature = "logging" ) ]
        debug!( phase = %phase, plugin = plugin.id(), "running plugin" );
        plugin.execute( ctx, engine ).await?;
      }
      Ok( () )
    }

    /// Run CLEANUP unconditionally
    ///
    /// Every cleanup plugin runs; failures are aggregated under the
    /// `cleanup.errors` metadata key and never replace the request's error.
    pub async fn run_cleanup( &self, ctx : &mut ExecutionContext, engine : &EngineContext )
    {
      ctx.advance_phase( Phase::Cleanup );
      let mut failures : Vec< String > = Vec::new();

      for plugin in self.plugins_for( Phase::Cleanup )
      {
        if !plugin.should_execute( ctx )
        {
          continue;
        }
        if let Err( error ) = plugin.execute( ctx, engine ).await
        {
          #[ cfg( feature = "logging" ) ]
          warn!( plugin = plugin.id(), %error, "cleanup plugin failed" );
          failures.push( format!( "{} : {}", plugin.id(), error ) );
        }
      }

      if !failures.is_empty()
      {
        ctx.set_metadata( "cleanup.errors", failures.join( "; " ) );
      }
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    PhasePipeline,
    PhasePipelineBuilder,
  };
}

//! Sampling normalization plugin
//!
//! PRE_PROCESSING: derives the normalized [`SamplingConfig`] from the raw
//! request parameters against the configured bounds and stores it for the
//! EXECUTE phase. Re-running on an already-normalized request yields an equal
//! config.

#[ cfg( feature = "policy-plugins" ) ]
mod private
{
  use crate::context::{ ExecutionContext, VAR_SAMPLING_CONFIG };
  use crate::engine::EngineContext;
  use crate::error::GatewayResult;
  use crate::phase::{ Phase, PhasePlugin };
  use crate::sampling::SamplingConfig;

  /// Builds the normalized sampling config for every request
  #[ derive( Debug, Default ) ]
  pub struct SamplingPolicyPlugin;

  impl SamplingPolicyPlugin
  {
    /// Create the plugin
    #[ must_use ]
    pub fn new() -> Self
    {
      Self
    }
  }

  #[ async_trait::async_trait ]
  impl PhasePlugin for SamplingPolicyPlugin
  {
    fn id( &self ) -> &str
    {
      "sampling-policy"
    }

    fn phase( &self ) -> Phase
    {
      Phase::PreProcessing
    }

    async fn execute( &self, ctx : &mut ExecutionContext, engine : &EngineContext ) -> GatewayResult< () >
    {
      let config = SamplingConfig::derive( &ctx.request().parameters, &engine.config().sampling )?;
      ctx.set_variable( VAR_SAMPLING_CONFIG, &config )
    }
  }
}

#[ cfg( feature = "policy-plugins" ) ]
crate::mod_interface!
{
  exposed use
  {
    SamplingPolicyPlugin,
  };
}

#[ cfg( not( feature = "policy-plugins" ) ) ]
mod private {}

#[ cfg( not( feature = "policy-plugins" ) ) ]
crate::mod_interface!
{
}

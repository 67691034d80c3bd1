//! Tenant-level quota gate
//!
//! AUTHORIZE: reserves one unit on the tenant-wide counter and fails with
//! `QUOTA_EXHAUSTED` when the window has no room, before any provider is
//! touched. The matching CLEANUP plugin settles the reservation: real usage
//! is charged on success, the unit is returned on failure or cancellation.
//! The per-provider gate inside the adapter is the orthogonal second gate.

#[ cfg( feature = "policy-plugins" ) ]
mod private
{
  use crate::context::{ ExecutionContext, VAR_EXECUTE_RESPONSE, VAR_TENANT_QUOTA_RESERVED };
  use crate::engine::EngineContext;
  use crate::error::GatewayResult;
  use crate::phase::{ Phase, PhasePlugin };
  use crate::quota::QuotaKey;
  use crate::request::InferenceResponse;

  /// Reserves tenant quota before routing
  #[ derive( Debug, Default ) ]
  pub struct TenantQuotaPlugin;

  impl TenantQuotaPlugin
  {
    /// Create the plugin
    #[ must_use ]
    pub fn new() -> Self
    {
      Self
    }
  }

  #[ async_trait::async_trait ]
  impl PhasePlugin for TenantQuotaPlugin
  {
    fn id( &self ) -> &str
    {
      "tenant-quota"
    }

    fn phase( &self ) -> Phase
    {
      Phase::Authorize
    }

    async fn execute( &self, ctx : &mut ExecutionContext, engine : &EngineContext ) -> GatewayResult< () >
    {
      let key = QuotaKey::tenant( &ctx.tenant().tenant_id );
      engine.quota().reserve( &key, 1 ).await?;
      ctx.set_variable( VAR_TENANT_QUOTA_RESERVED, &true )
    }
  }

  /// Settles the tenant quota reservation during CLEANUP
  #[ derive( Debug, Default ) ]
  pub struct TenantQuotaSettlementPlugin;

  impl TenantQuotaSettlementPlugin
  {
    /// Create the plugin
    #[ must_use ]
    pub fn new() -> Self
    {
      Self
    }
  }

  #[ async_trait::async_trait ]
  impl PhasePlugin for TenantQuotaSettlementPlugin
  {
    fn id( &self ) -> &str
    {
      "tenant-quota-settlement"
    }

    fn phase( &self ) -> Phase
    {
      Phase::Cleanup
    }

    fn should_execute( &self, ctx : &ExecutionContext ) -> bool
    {
      ctx.variable::< bool >( VAR_TENANT_QUOTA_RESERVED ).unwrap_or( false )
    }

    async fn execute( &self, ctx : &mut ExecutionContext, engine : &EngineContext ) -> GatewayResult< () >
    {
      let key = QuotaKey::tenant( &ctx.tenant().tenant_id );
      match ctx.variable::< InferenceResponse >( VAR_EXECUTE_RESPONSE )
      {
        Some( response ) => engine.quota().record_usage( &key, 1, response.usage.total() ).await?,
        None => engine.quota().release( &key, 1 ).await?,
      }
      // A second CLEANUP pass must not settle again.
      ctx.remove_variable( VAR_TENANT_QUOTA_RESERVED );
      Ok( () )
    }
  }
}

#[ cfg( feature = "policy-plugins" ) ]
crate::mod_interface!
{
  exposed use
  {
    TenantQuotaPlugin,
    TenantQuotaSettlementPlugin,
  };
}

#[ cfg( not( feature = "policy-plugins" ) ) ]
mod private {}

#[ cfg( not( feature = "policy-plugins" ) ) ]
crate::mod_interface!
{
}

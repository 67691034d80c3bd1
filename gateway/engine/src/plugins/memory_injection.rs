//! Memory / context injection plugin
//!
//! PRE_PROCESSING: asks a retriever for context messages and stores them for
//! the EXECUTE phase, which prepends them to the conversation. The injected
//! prefix is bounded by `max_injected_tokens`; retrieval failures degrade to
//! no injection with a metadata warning rather than failing the request.

#[ cfg( feature = "policy-plugins" ) ]
mod private
{
  use std::sync::Arc;
  use crate::context::{ ExecutionContext, TenantContext, VAR_INJECTED_MESSAGES };
  use crate::engine::EngineContext;
  use crate::error::GatewayResult;
  use crate::phase::{ Phase, PhasePlugin };
  use crate::request::{ ChatMessage, InferenceRequest };

  /// Rough token estimate used to bound injected context
  #[ must_use ]
  pub fn approximate_tokens( text : &str ) -> usize
  {
    // Four characters per token is the house heuristic for budget checks.
    text.len().div_ceil( 4 )
  }

  /// Source of context messages for a request
  #[ async_trait::async_trait ]
  pub trait MemoryRetriever : Send + Sync
  {
    /// Retrieve context messages, most relevant first
    async fn retrieve( &self, tenant : &TenantContext, request : &InferenceRequest ) -> GatewayResult< Vec< ChatMessage > >;
  }

  /// Prepends retrieved context to the conversation
  pub struct MemoryInjectionPlugin
  {
    retriever : Arc< dyn MemoryRetriever >,
    max_injected_tokens : usize,
  }

  impl std::fmt::Debug for MemoryInjectionPlugin
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "MemoryInjectionPlugin" )
        .field( "max_injected_tokens", &self.max_injected_tokens )
        .finish_non_exhaustive()
    }
  }

  impl MemoryInjectionPlugin
  {
    /// Create the plugin over a retriever
    #[ must_use ]
    pub fn new( retriever : Arc< dyn MemoryRetriever >, max_injected_tokens : usize ) -> Self
    {
      Self { retriever, max_injected_tokens }
    }
  }

  #[ async_trait::async_trait ]
  impl PhasePlugin for MemoryInjectionPlugin
  {
    fn id( &self ) -> &str
    {
      "memory-injection"
    }

    fn phase( &self ) -> Phase
    {
      Phase::PreProcessing
    }

    fn order( &self ) -> i32
    {
      10
    }

    async fn execute( &self, ctx : &mut ExecutionContext, _engine : &EngineContext ) -> GatewayResult< () >
    {
      let retrieved = match self.retriever.retrieve( ctx.tenant(), ctx.request() ).await
      {
        Ok( messages ) => messages,
        Err( error ) =>
        {
          ctx.push_warning( format!( "memory retrieval failed : {error}" ) );
          return Ok( () );
        },
      };

      let mut budget = self.max_injected_tokens;
      let mut injected = Vec::new();
      for message in retrieved
      {
        let cost = approximate_tokens( &message.content );
        if cost > budget
        {
          break;
        }
        budget -= cost;
        injected.push( message );
      }

      if injected.is_empty()
      {
        return Ok( () );
      }
      ctx.set_metadata( "memory.injected_messages", injected.len().to_string() );
      ctx.set_variable( VAR_INJECTED_MESSAGES, &injected )
    }
  }
}

#[ cfg( feature = "policy-plugins" ) ]
crate::mod_interface!
{
  exposed use
  {
    MemoryInjectionPlugin,
    MemoryRetriever,
    approximate_tokens,
  };
}

#[ cfg( not( feature = "policy-plugins" ) ) ]
mod private {}

#[ cfg( not( feature = "policy-plugins" ) ) ]
crate::mod_interface!
{
}

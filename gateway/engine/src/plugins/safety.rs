//! Content moderation plugin
//!
//! VALIDATE: scans every message against the configured blocked-pattern set
//! and fails the request with `POLICY_VIOLATION` on the first hit. The
//! offending content is never echoed back; only the pattern index is named.

#[ cfg( feature = "policy-plugins" ) ]
mod private
{
  use regex::RegexSet;
  use crate::context::ExecutionContext;
  use crate::engine::EngineContext;
  use crate::error::{ GatewayError, GatewayResult };
  use crate::phase::{ Phase, PhasePlugin };

  /// Blocks requests whose messages match a configured pattern
  #[ derive( Debug ) ]
  pub struct SafetyPlugin
  {
    patterns : RegexSet,
  }

  impl SafetyPlugin
  {
    /// Compile the blocked-pattern set
    ///
    /// Patterns are case-insensitive regular expressions.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` for an uncompilable pattern.
    pub fn new< S : AsRef< str > >( patterns : &[ S ] ) -> GatewayResult< Self >
    {
      let decorated : Vec< String > = patterns.iter()
        .map( | pattern | format!( "(?i){}", pattern.as_ref() ) )
        .collect();
      let patterns = RegexSet::new( &decorated )
        .map_err( | e | GatewayError::invalid_argument( format!( "invalid blocked pattern : {e}" ) ) )?;
      Ok( Self { patterns } )
    }

    /// Number of configured patterns
    pub fn len( &self ) -> usize
    {
      self.patterns.len()
    }

    /// Whether no patterns are configured
    pub fn is_empty( &self ) -> bool
    {
      self.patterns.is_empty()
    }
  }

  #[ async_trait::async_trait ]
  impl PhasePlugin for SafetyPlugin
  {
    fn id( &self ) -> &str
    {
      "safety-moderation"
    }

    fn phase( &self ) -> Phase
    {
      Phase::Validate
    }

    fn should_execute( &self, _ctx : &ExecutionContext ) -> bool
    {
      !self.patterns.is_empty()
    }

    async fn execute( &self, ctx : &mut ExecutionContext, _engine : &EngineContext ) -> GatewayResult< () >
    {
      for ( index, message ) in ctx.request().messages.iter().enumerate()
      {
        let matched = self.patterns.matches( &message.content );
        if let Some( pattern_index ) = matched.iter().next()
        {
          return Err( GatewayError::policy_violation
          (
            format!( "message {index} matched blocked pattern {pattern_index}" )
          ) );
        }
      }
      Ok( () )
    }
  }
}

#[ cfg( feature = "policy-plugins" ) ]
crate::mod_interface!
{
  exposed use
  {
    SafetyPlugin,
  };
}

#[ cfg( not( feature = "policy-plugins" ) ) ]
mod private {}

#[ cfg( not( feature = "policy-plugins" ) ) ]
crate::mod_interface!
{
}

//! Output parsing plugin
//!
//! POST_PROCESSING: strips reasoning scaffolding from the model output and
//! extracts tool-call intents, both JSON-style (the whole output is a single
//! call object) and tag-style (`<tool_call> … </tool_call>` blocks). Parsed
//! calls land on the response; unknown tool names are downgraded to a
//! metadata warning instead of failing the request.

#[ cfg( feature = "policy-plugins" ) ]
mod private
{
  use regex::Regex;
  use crate::context::{ ExecutionContext, VAR_EXECUTE_RESPONSE };
  use crate::engine::EngineContext;
  use crate::error::{ GatewayError, GatewayResult };
  use crate::phase::{ Phase, PhasePlugin };
  use crate::request::{ InferenceResponse, ToolCall };

  /// Extracts tool calls and strips reasoning scaffolding
  #[ derive( Debug ) ]
  pub struct OutputParserPlugin
  {
    reasoning : Regex,
    tagged_call : Regex,
    known_tools : Vec< String >,
  }

  impl Default for OutputParserPlugin
  {
    fn default() -> Self
    {
      Self::new()
    }
  }

  impl OutputParserPlugin
  {
    /// Create the parser with no tool-name validation
    ///
    /// # Panics
    ///
    /// Never panics; the embedded patterns are compile-time constants.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self
      {
        reasoning : Regex::new( r"(?s)<(think|reasoning)>.*?</(think|reasoning)>" )
          .expect( "reasoning pattern is valid" ),
        tagged_call : Regex::new( r"(?s)<tool_call>\s*(\{.*?\})\s*</tool_call>" )
          .expect( "tool call pattern is valid" ),
        known_tools : Vec::new(),
      }
    }

    /// Validate parsed calls against a set of known tool names
    #[ must_use ]
    pub fn with_known_tools( mut self, known_tools : Vec< String > ) -> Self
    {
      self.known_tools = known_tools;
      self
    }

    fn parse_call_object( value : &serde_json::Value, index : usize ) -> Option< ToolCall >
    {
      let name = value.get( "name" )
        .or_else( || value.get( "tool" ) )?
        .as_str()?;
      let arguments = value.get( "arguments" )
        .or_else( || value.get( "parameters" ) )
        .cloned()
        .unwrap_or( serde_json::Value::Null );
      Some( ToolCall
      {
        id : format!( "call-{index}" ),
        name : name.to_string(),
        arguments,
      } )
    }

    /// Extract tool calls from output text, returning the remaining text
    #[ must_use ]
    pub fn extract( &self, content : &str ) -> ( String, Vec< ToolCall > )
    {
      let mut calls = Vec::new();

      // Tag-style blocks anywhere in the output.
      let stripped = self.tagged_call.replace_all( content, | captures : &regex::Captures< '_ > |
      {
        if let Ok( value ) = serde_json::from_str::< serde_json::Value >( &captures[ 1 ] )
        {
          if let Some( call ) = Self::parse_call_object( &value, calls.len() )
          {
            calls.push( call );
            return String::new();
          }
        }
        captures[ 0 ].to_string()
      } ).into_owned();

      let trimmed = stripped.trim();

      // JSON-style : the whole remaining output is one call object.
      if calls.is_empty() && trimmed.starts_with( '{' ) && trimmed.ends_with( '}' )
      {
        if let Ok( value ) = serde_json::from_str::< serde_json::Value >( trimmed )
        {
          if let Some( call ) = Self::parse_call_object( &value, 0 )
          {
            calls.push( call );
            return ( String::new(), calls );
          }
        }
      }

      ( trimmed.to_string(), calls )
    }

    /// Remove reasoning scaffolding from output text
    #[ must_use ]
    pub fn strip_reasoning( &self, content : &str ) -> String
    {
      self.reasoning.replace_all( content, "" ).trim().to_string()
    }
  }

  #[ async_trait::async_trait ]
  impl PhasePlugin for OutputParserPlugin
  {
    fn id( &self ) -> &str
    {
      "output-parser"
    }

    fn phase( &self ) -> Phase
    {
      Phase::PostProcessing
    }

    fn should_execute( &self, ctx : &ExecutionContext ) -> bool
    {
      ctx.has_variable( VAR_EXECUTE_RESPONSE )
    }

    async fn execute( &self, ctx : &mut ExecutionContext, _engine : &EngineContext ) -> GatewayResult< () >
    {
      let mut response : InferenceResponse = ctx.variable( VAR_EXECUTE_RESPONSE )
        .ok_or_else( || GatewayError::internal( "output parser ran without a response" ) )?;

      let without_reasoning = self.strip_reasoning( &response.content );
      let ( content, calls ) = self.extract( &without_reasoning );

      if !self.known_tools.is_empty()
      {
        for call in &calls
        {
          if !self.known_tools.contains( &call.name )
          {
            ctx.push_warning( format!( "model requested unknown tool '{}'", call.name ) );
          }
        }
      }

      response.content = content;
      response.tool_calls = calls;
      ctx.set_variable( VAR_EXECUTE_RESPONSE, &response )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn tagged_tool_call_is_extracted()
    {
      let parser = OutputParserPlugin::new();
      let output = r#"Let me check. <tool_call>{"name":"get_weather","arguments":{"city":"Kyiv"}}</tool_call>"#;
      let ( content, calls ) = parser.extract( output );
      assert_eq!( content, "Let me check." );
      assert_eq!( calls.len(), 1 );
      assert_eq!( calls[ 0 ].name, "get_weather" );
    }

    #[ test ]
    fn reasoning_scaffolding_is_stripped()
    {
      let parser = OutputParserPlugin::new();
      let output = "<think>step by step</think>The answer is 4.";
      assert_eq!( parser.strip_reasoning( output ), "The answer is 4." );
    }

    #[ test ]
    fn whole_output_json_call_is_extracted()
    {
      let parser = OutputParserPlugin::new();
      let output = r#"{"tool":"search","parameters":{"q":"rust"}}"#;
      let ( content, calls ) = parser.extract( output );
      assert!( content.is_empty() );
      assert_eq!( calls[ 0 ].name, "search" );
    }
  }
}

#[ cfg( feature = "policy-plugins" ) ]
crate::mod_interface!
{
  exposed use
  {
    OutputParserPlugin,
  };
}

#[ cfg( not( feature = "policy-plugins" ) ) ]
mod private {}

#[ cfg( not( feature = "policy-plugins" ) ) ]
crate::mod_interface!
{
}

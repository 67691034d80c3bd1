//! Sampling configuration and normalization
//!
//! The raw `parameters` map of a request is normalized into a
//! `SamplingConfig` during PRE_PROCESSING: enumerated defaults fill missing
//! keys, configured bounds reject out-of-range values. Normalization is
//! idempotent, so re-deriving from an already-normalized request yields an
//! equal config.

mod private
{
  use std::collections::HashMap;
  use serde::{ Serialize, Deserialize };
  use crate::error::{ GatewayError, GatewayResult };

  /// Constrained decoding mode
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum GrammarMode
  {
    /// Output must be a single JSON document
    Json,
  }

  /// Normalized sampling parameters
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct SamplingConfig
  {
    /// Softmax temperature
    pub temperature : f64,
    /// Top-k cutoff, 0 disables
    pub top_k : u32,
    /// Nucleus sampling mass
    pub top_p : f64,
    /// Repetition penalty multiplier
    pub repetition_penalty : f64,
    /// Presence penalty
    pub presence_penalty : f64,
    /// Output token budget
    pub max_tokens : u32,
    /// Stop sequences, checked in order
    pub stop_tokens : Vec< String >,
    /// Constrained decoding mode, if any
    pub grammar_mode : Option< GrammarMode >,
  }

  impl Default for SamplingConfig
  {
    fn default() -> Self
    {
      Self
      {
        temperature : 0.7,
        top_k : 40,
        top_p : 0.95,
        repetition_penalty : 1.1,
        presence_penalty : 0.0,
        max_tokens : 2048,
        stop_tokens : Vec::new(),
        grammar_mode : None,
      }
    }
  }

  /// Bounds enforced on caller-supplied sampling parameters
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct SamplingBounds
  {
    /// Maximum accepted temperature
    pub max_temperature : f64,
    /// Maximum accepted output token budget
    pub max_tokens_cap : u32,
  }

  impl Default for SamplingBounds
  {
    fn default() -> Self
    {
      Self
      {
        max_temperature : 2.0,
        max_tokens_cap : 8192,
      }
    }
  }

  fn number_parameter( parameters : &HashMap< String, serde_json::Value >, key : &str ) -> GatewayResult< Option< f64 > >
  {
    match parameters.get( key )
    {
      None => Ok( None ),
      Some( value ) => match value.as_f64()
      {
        Some( number ) => Ok( Some( number ) ),
        None => Err( GatewayError::invalid_argument( format!( "parameter '{key}' must be a number" ) ) ),
      },
    }
  }

  impl SamplingConfig
  {
    /// Derive a normalized config from raw request parameters
    ///
    /// Missing keys take the enumerated defaults; present keys are validated
    /// against `bounds`.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` for non-numeric values, out-of-range values
    /// or an unknown grammar mode.
    pub fn derive( parameters : &HashMap< String, serde_json::Value >, bounds : &SamplingBounds ) -> GatewayResult< Self >
    {
      let mut config = Self::default();

      if let Some( temperature ) = number_parameter( parameters, "temperature" )?
      {
        config.temperature = temperature;
      }
      if let Some( top_k ) = number_parameter( parameters, "top_k" )?
      {
        if top_k < 0.0 || top_k.fract() != 0.0
        {
          return Err( GatewayError::invalid_argument( "top_k must be a non-negative integer" ) );
        }
        config.top_k = top_k as u32;
      }
      if let Some( top_p ) = number_parameter( parameters, "top_p" )?
      {
        config.top_p = top_p;
      }
      if let Some( repetition_penalty ) = number_parameter( parameters, "repetition_penalty" )?
      {
        config.repetition_penalty = repetition_penalty;
      }
      if let Some( presence_penalty ) = number_parameter( parameters, "presence_penalty" )?
      {
        config.presence_penalty = presence_penalty;
      }
      if let Some( max_tokens ) = number_parameter( parameters, "max_tokens" )?
      {
        if max_tokens < 1.0 || max_tokens.fract() != 0.0
        {
          return Err( GatewayError::invalid_argument( "max_tokens must be a positive integer" ) );
        }
        config.max_tokens = max_tokens as u32;
      }
      if let Some( stop ) = parameters.get( "stop" )
      {
        let list = stop.as_array()
          .ok_or_else( || GatewayError::invalid_argument( "parameter 'stop' must be an array of strings" ) )?;
        let mut stop_tokens = Vec::with_capacity( list.len() );
        for entry in list
        {
          let token = entry.as_str()
            .ok_or_else( || GatewayError::invalid_argument( "parameter 'stop' must contain only strings" ) )?;
          stop_tokens.push( token.to_string() );
        }
        config.stop_tokens = stop_tokens;
      }
      if let Some( grammar ) = parameters.get( "grammar" )
      {
        if !grammar.is_null()
        {
          match grammar.as_str()
          {
            Some( "json" ) => config.grammar_mode = Some( GrammarMode::Json ),
            Some( other ) => return Err( GatewayError::invalid_argument( format!( "unknown grammar mode '{other}'" ) ) ),
            None => return Err( GatewayError::invalid_argument( "parameter 'grammar' must be a string or null" ) ),
          }
        }
      }

      config.validate( bounds )?;
      Ok( config )
    }

    /// Validate against configured bounds
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` naming the offending parameter.
    pub fn validate( &self, bounds : &SamplingBounds ) -> GatewayResult< () >
    {
      if self.temperature < 0.0 || self.temperature > bounds.max_temperature
      {
        return Err( GatewayError::invalid_argument
        (
          format!( "temperature {} out of range [0, {}]", self.temperature, bounds.max_temperature )
        ) );
      }
      if self.top_p < 0.0 || self.top_p > 1.0
      {
        return Err( GatewayError::invalid_argument( format!( "top_p {} out of range [0, 1]", self.top_p ) ) );
      }
      if self.max_tokens == 0 || self.max_tokens > bounds.max_tokens_cap
      {
        return Err( GatewayError::invalid_argument
        (
          format!( "max_tokens {} out of range [1, {}]", self.max_tokens, bounds.max_tokens_cap )
        ) );
      }
      if self.repetition_penalty <= 0.0
      {
        return Err( GatewayError::invalid_argument( "repetition_penalty must be > 0" ) );
      }
      Ok( () )
    }

    /// Re-encode the config as raw request parameters
    ///
    /// Used by the sampling plugin to write the normalized values back so a
    /// second derivation sees exactly what the first produced.
    #[ must_use ]
    pub fn to_parameters( &self ) -> HashMap< String, serde_json::Value >
    {
      let mut parameters = HashMap::new();
      parameters.insert( "temperature".to_string(), serde_json::json!( self.temperature ) );
      parameters.insert( "top_k".to_string(), serde_json::json!( self.top_k ) );
      parameters.insert( "top_p".to_string(), serde_json::json!( self.top_p ) );
      parameters.insert( "repetition_penalty".to_string(), serde_json::json!( self.repetition_penalty ) );
      parameters.insert( "presence_penalty".to_string(), serde_json::json!( self.presence_penalty ) );
      parameters.insert( "max_tokens".to_string(), serde_json::json!( self.max_tokens ) );
      parameters.insert( "stop".to_string(), serde_json::json!( self.stop_tokens ) );
      match self.grammar_mode
      {
        Some( GrammarMode::Json ) => parameters.insert( "grammar".to_string(), serde_json::json!( "json" ) ),
        None => parameters.insert( "grammar".to_string(), serde_json::Value::Null ),
      };
      parameters
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn derivation_is_idempotent()
    {
      let mut parameters = HashMap::new();
      parameters.insert( "temperature".to_string(), serde_json::json!( 0.2 ) );
      parameters.insert( "max_tokens".to_string(), serde_json::json!( 64 ) );

      let bounds = SamplingBounds::default();
      let first = SamplingConfig::derive( &parameters, &bounds ).unwrap();
      let second = SamplingConfig::derive( &first.to_parameters(), &bounds ).unwrap();
      assert_eq!( first, second );
    }

    #[ test ]
    fn out_of_range_temperature_is_rejected()
    {
      let mut parameters = HashMap::new();
      parameters.insert( "temperature".to_string(), serde_json::json!( 5.0 ) );
      let result = SamplingConfig::derive( &parameters, &SamplingBounds::default() );
      assert!( result.is_err() );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    GrammarMode,
    SamplingBounds,
    SamplingConfig,
  };
}

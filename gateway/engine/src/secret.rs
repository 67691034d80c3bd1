//! Secret handling for provider credentials

mod private
{
  use crate::error::{ GatewayError, GatewayResult };

  /// Opaque API key for a remote provider
  ///
  /// The value never appears in `Debug` output, logs or serialized metadata.
  ///
  /// # Examples
  ///
  /// ```
  /// use gateway_engine::ApiKey;
  ///
  /// let key = ApiKey::new( "sk-live-example".to_string() ).unwrap();
  /// assert_eq!( format!( "{key:?}" ), "ApiKey(< REDACTED >)" );
  ///
  /// // Empty keys are rejected
  /// assert!( ApiKey::new( "  ".to_string() ).is_err() );
  /// ```
  #[ derive( Clone ) ]
  pub struct ApiKey
  {
    value : String,
  }

  impl std::fmt::Debug for ApiKey
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      write!( f, "ApiKey(< REDACTED >)" )
    }
  }

  impl ApiKey
  {
    /// Create a new API key
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or whitespace-only.
    pub fn new( value : String ) -> GatewayResult< Self >
    {
      if value.trim().is_empty()
      {
        return Err( GatewayError::invalid_argument( "API key cannot be empty" ) );
      }
      Ok( Self { value } )
    }

    /// Load the key from an environment variable
    ///
    /// # Errors
    ///
    /// Returns `UNAUTHENTICATED` if the variable is absent or empty, naming
    /// the variable so the operator knows what to set.
    pub fn from_env( variable : &str ) -> GatewayResult< Self >
    {
      match std::env::var( variable )
      {
        Ok( value ) if !value.trim().is_empty() => Ok( Self { value } ),
        _ => Err( GatewayError::unauthenticated
        (
          format!( "secret not found : set the {variable} environment variable" )
        ) ),
      }
    }

    /// Expose the raw value for request signing
    pub fn expose( &self ) -> &str
    {
      &self.value
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ApiKey,
  };
}

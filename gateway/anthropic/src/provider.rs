//! Provider SPI implementation
//!
//! Translates engine requests into messages-API bodies and back. Serves the
//! `claude-*` model class plus any explicitly configured model ids.

mod private
{
  use std::time::Instant;
  use gateway_engine::
  {
    GatewayError,
    GatewayResult,
    HealthReport,
    InferenceRequest,
    Provider,
    ProviderCapabilities,
    ProviderConfig,
    ProviderProfile,
    ProviderResponse,
    Role,
    SamplingConfig,
    TenantContext,
    Usage,
  };
  use crate::client::{ AnthropicClient, PROVIDER_ID };
  use crate::types::{ MessagesRequest, WireMessage };

  /// Anthropic-style remote provider
  #[ derive( Debug, Default ) ]
  pub struct AnthropicProvider
  {
    client : Option< AnthropicClient >,
    extra_models : Vec< String >,
  }

  impl AnthropicProvider
  {
    /// Create an unconfigured provider
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    fn client( &self ) -> GatewayResult< &AnthropicClient >
    {
      self.client.as_ref()
        .ok_or_else( || GatewayError::internal( "provider 'anthropic' used before initialize" ) )
    }

    /// Map an engine request onto the wire format
    ///
    /// System turns are folded into the `system` field; tool turns are
    /// represented as user turns because the messages endpoint has no
    /// free-standing tool role for plain text.
    #[ must_use ]
    pub fn to_wire( request : &InferenceRequest, sampling : &SamplingConfig ) -> MessagesRequest
    {
      let mut system_parts = Vec::new();
      let mut messages = Vec::new();
      for message in &request.messages
      {
        match message.role
        {
          Role::System => system_parts.push( message.content.clone() ),
          Role::Assistant => messages.push( WireMessage
          {
            role : "assistant".to_string(),
            content : message.content.clone(),
          } ),
          Role::User | Role::Tool => messages.push( WireMessage
          {
            role : "user".to_string(),
            content : message.content.clone(),
          } ),
        }
      }

      MessagesRequest
      {
        model : request.model_id.clone(),
        max_tokens : sampling.max_tokens,
        messages,
        system : if system_parts.is_empty() { None } else { Some( system_parts.join( "\n\n" ) ) },
        temperature : Some( sampling.temperature ),
        top_k : if sampling.top_k == 0 { None } else { Some( sampling.top_k ) },
        top_p : Some( sampling.top_p ),
        stop_sequences : sampling.stop_tokens.clone(),
        stream : None,
      }
    }
  }

  #[ async_trait::async_trait ]
  impl Provider for AnthropicProvider
  {
    fn id( &self ) -> &str
    {
      PROVIDER_ID
    }

    fn capabilities( &self ) -> ProviderCapabilities
    {
      ProviderCapabilities
      {
        streaming : cfg!( feature = "streaming" ),
        tool_calling : true,
        multimodal : true,
        embeddings : false,
        max_context_tokens : 200_000,
        supported_formats : Vec::new(),
        supported_devices : Vec::new(),
      }
    }

    fn profile( &self ) -> ProviderProfile
    {
      ProviderProfile
      {
        performance : 0.9,
        cost_per_1k_tokens : 6.0,
        expected_latency_ms : 1500,
      }
    }

    fn supports( &self, model_id : &str, _tenant : &TenantContext ) -> bool
    {
      model_id.starts_with( "claude-" )
        || self.extra_models.iter().any( | model | model == model_id )
    }

    async fn initialize( &mut self, config : ProviderConfig ) -> GatewayResult< () >
    {
      self.client = Some( AnthropicClient::from_config( &config )? );
      if let Some( models ) = config.get( "models" ).and_then( | value | value.as_array() )
      {
        self.extra_models = models.iter()
          .filter_map( | value | value.as_str().map( str::to_string ) )
          .collect();
      }
      Ok( () )
    }

    async fn infer( &self, request : &InferenceRequest, sampling : &SamplingConfig ) -> GatewayResult< ProviderResponse >
    {
      let client = self.client()?;
      let wire = Self::to_wire( request, sampling );
      let response = client.create_message( &wire ).await?;

      Ok( ProviderResponse
      {
        model : response.model.clone(),
        content : response.text(),
        usage : Usage
        {
          input_tokens : response.usage.input_tokens,
          output_tokens : response.usage.output_tokens,
        },
      } )
    }

    #[ cfg( feature = "streaming" ) ]
    async fn stream
    (
      &self,
      request : &InferenceRequest,
      sampling : &SamplingConfig,
    ) -> GatewayResult< gateway_engine::ProviderEventStream >
    {
      let client = self.client()?;
      let wire = Self::to_wire( request, sampling );
      client.create_message_stream( &wire ).await
    }

    async fn health( &self ) -> HealthReport
    {
      let started = Instant::now();
      match self.client()
      {
        Ok( client ) => match client.probe().await
        {
          Ok( () ) => HealthReport::healthy( started.elapsed().as_millis() as u64 ),
          Err( error ) => HealthReport::unhealthy( started.elapsed().as_millis() as u64, error.to_string() ),
        },
        Err( error ) => HealthReport::unhealthy( 0, error.to_string() ),
      }
    }

    async fn shutdown( &self ) -> GatewayResult< () >
    {
      Ok( () )
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    AnthropicProvider,
  };
}

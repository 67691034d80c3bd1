//! Provider SPI implementation
//!
//! Serves the `gpt-*` and `o*` model classes by default; a configured model
//! list widens that for OpenAI-compatible local endpoints serving arbitrary
//! names.

mod private
{
  use std::time::Instant;
  use gateway_engine::
  {
    GatewayError,
    GatewayResult,
    GrammarMode,
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
  use crate::client::{ OpenAiClient, PROVIDER_ID };
  use crate::types::{ ChatRequest, ResponseFormat, WireMessage };

  /// OpenAI-compatible remote provider
  #[ derive( Debug, Default ) ]
  pub struct OpenAiProvider
  {
    client : Option< OpenAiClient >,
    extra_models : Vec< String >,
  }

  impl OpenAiProvider
  {
    /// Create an unconfigured provider
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    fn client( &self ) -> GatewayResult< &OpenAiClient >
    {
      self.client.as_ref()
        .ok_or_else( || GatewayError::internal( "provider 'openai' used before initialize" ) )
    }

    /// Map an engine request onto the wire format
    #[ must_use ]
    pub fn to_wire( request : &InferenceRequest, sampling : &SamplingConfig ) -> ChatRequest
    {
      let messages = request.messages.iter()
        .map( | message | WireMessage
        {
          role : match message.role
          {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
          }.to_string(),
          content : message.content.clone(),
        } )
        .collect();

      ChatRequest
      {
        model : request.model_id.clone(),
        messages,
        temperature : Some( sampling.temperature ),
        top_p : Some( sampling.top_p ),
        max_tokens : Some( sampling.max_tokens ),
        presence_penalty : Some( sampling.presence_penalty ),
        stop : sampling.stop_tokens.clone(),
        response_format : match sampling.grammar_mode
        {
          Some( GrammarMode::Json ) => Some( ResponseFormat { kind : "json_object".to_string() } ),
          None => None,
        },
        stream : None,
        stream_options : None,
      }
    }
  }

  #[ async_trait::async_trait ]
  impl Provider for OpenAiProvider
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
        embeddings : true,
        max_context_tokens : 128_000,
        supported_formats : Vec::new(),
        supported_devices : Vec::new(),
      }
    }

    fn profile( &self ) -> ProviderProfile
    {
      ProviderProfile
      {
        performance : 0.85,
        cost_per_1k_tokens : 5.0,
        expected_latency_ms : 1200,
      }
    }

    fn supports( &self, model_id : &str, _tenant : &TenantContext ) -> bool
    {
      model_id.starts_with( "gpt-" )
        || model_id.starts_with( "o1" )
        || model_id.starts_with( "o3" )
        || self.extra_models.iter().any( | model | model == model_id )
    }

    async fn initialize( &mut self, config : ProviderConfig ) -> GatewayResult< () >
    {
      self.client = Some( OpenAiClient::from_config( &config )? );
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
      let response = client.chat( &wire ).await?;
      let usage = response.usage.unwrap_or_default();

      Ok( ProviderResponse
      {
        model : if response.model.is_empty() { request.model_id.clone() } else { response.model.clone() },
        content : response.text(),
        usage : Usage
        {
          input_tokens : usage.prompt_tokens,
          output_tokens : usage.completion_tokens,
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
      client.chat_stream( &wire ).await
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
    OpenAiProvider,
  };
}

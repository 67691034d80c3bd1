//! Chat completions HTTP client

mod private
{
  use std::time::Duration;
  use gateway_engine::{ ApiKey, GatewayError, GatewayResult, ProviderConfig, config_str, config_u64, classify_status };
  use crate::types::{ ApiErrorBody, ChatRequest, ChatResponse };

  /// Default API endpoint
  pub const DEFAULT_BASE_URL : &str = "https://api.openai.com/v1";
  /// Environment variable consulted when `api.key` is absent
  pub const API_KEY_ENV : &str = "OPENAI_API_KEY";
  /// Provider id used in error attribution
  pub const PROVIDER_ID : &str = "openai";

  /// Chat completions client
  #[ derive( Debug, Clone ) ]
  pub struct OpenAiClient
  {
    http : reqwest::Client,
    base_url : String,
    api_key : ApiKey,
    timeout : Duration,
  }

  impl OpenAiClient
  {
    /// Build a client from the enumerated provider config keys
    ///
    /// Recognized keys : `api.key` (falls back to `OPENAI_API_KEY`),
    /// `api.base-url`, `timeout.seconds`.
    ///
    /// # Errors
    ///
    /// `UNAUTHENTICATED` without a key, `INTERNAL` when the HTTP client
    /// cannot be constructed.
    pub fn from_config( config : &ProviderConfig ) -> GatewayResult< Self >
    {
      let api_key = match config_str( config, "api.key" )
      {
        Some( key ) => ApiKey::new( key )?,
        None => ApiKey::from_env( API_KEY_ENV )?,
      };
      let base_url = config_str( config, "api.base-url" )
        .unwrap_or_else( || DEFAULT_BASE_URL.to_string() );
      let timeout = Duration::from_secs( config_u64( config, "timeout.seconds" ).unwrap_or( 60 ) );

      let http = reqwest::Client::builder()
        .timeout( timeout )
        .build()
        .map_err( | e | GatewayError::internal( format!( "failed to build HTTP client : {e}" ) ) )?;

      Ok( Self
      {
        http,
        base_url : base_url.trim_end_matches( '/' ).to_string(),
        api_key,
        timeout,
      } )
    }

    /// Configured endpoint
    pub fn base_url( &self ) -> &str
    {
      &self.base_url
    }

    /// Configured request timeout
    pub fn timeout( &self ) -> Duration
    {
      self.timeout
    }

    async fn classify_failure( response : reqwest::Response ) -> GatewayError
    {
      let status = response.status().as_u16();
      let body = response.text().await.unwrap_or_default();
      let message = serde_json::from_str::< ApiErrorBody >( &body )
        .map( | parsed | parsed.error.message )
        .unwrap_or( body );
      classify_status( PROVIDER_ID, status, &message )
    }

    /// Create a chat completion
    ///
    /// # Errors
    ///
    /// Classified transport and API failures.
    pub async fn chat( &self, request : &ChatRequest ) -> GatewayResult< ChatResponse >
    {
      let response = self.http
        .post( format!( "{}/chat/completions", self.base_url ) )
        .bearer_auth( self.api_key.expose() )
        .json( request )
        .send()
        .await
        .map_err( | e | GatewayError::provider_transient( format!( "request failed : {e}" ) ).with_provider( PROVIDER_ID ) )?;

      if !response.status().is_success()
      {
        return Err( Self::classify_failure( response ).await );
      }
      response.json::< ChatResponse >().await
        .map_err( | e | GatewayError::provider_transient( format!( "malformed response body : {e}" ) ).with_provider( PROVIDER_ID ) )
    }

    /// Probe the endpoint with a models listing
    ///
    /// # Errors
    ///
    /// Classified transport and API failures.
    pub async fn probe( &self ) -> GatewayResult< () >
    {
      let response = self.http
        .get( format!( "{}/models", self.base_url ) )
        .bearer_auth( self.api_key.expose() )
        .send()
        .await
        .map_err( | e | GatewayError::provider_transient( format!( "probe failed : {e}" ) ).with_provider( PROVIDER_ID ) )?;

      if !response.status().is_success()
      {
        return Err( Self::classify_failure( response ).await );
      }
      Ok( () )
    }

    /// Create a chat completion with SSE delivery
    ///
    /// The wire protocol is `data:` lines terminated by `data: [DONE]`;
    /// usage arrives in the last data chunk when `stream_options` asks for
    /// it.
    ///
    /// # Errors
    ///
    /// Classified transport and API failures on setup; later failures arrive
    /// through the stream.
    #[ cfg( feature = "streaming" ) ]
    pub async fn chat_stream( &self, request : &ChatRequest ) -> GatewayResult< gateway_engine::ProviderEventStream >
    {
      use futures_util::StreamExt;
      use gateway_engine::{ ProviderEvent, Usage };
      use crate::types::StreamOptions;

      let mut body = request.clone();
      body.stream = Some( true );
      body.stream_options = Some( StreamOptions { include_usage : true } );

      let http = reqwest::Client::builder()
        .connect_timeout( self.timeout )
        .build()
        .map_err( | e | GatewayError::internal( format!( "failed to build HTTP client : {e}" ) ) )?;

      let response = http
        .post( format!( "{}/chat/completions", self.base_url ) )
        .bearer_auth( self.api_key.expose() )
        .header( "accept", "text/event-stream" )
        .json( &body )
        .send()
        .await
        .map_err( | e | GatewayError::provider_transient( format!( "stream request failed : {e}" ) ).with_provider( PROVIDER_ID ) )?;

      if !response.status().is_success()
      {
        return Err( Self::classify_failure( response ).await );
      }

      struct State< B >
      {
        bytes : B,
        buffer : String,
        pending : std::collections::VecDeque< GatewayResult< ProviderEvent > >,
        usage : Usage,
        done : bool,
      }

      let state = State
      {
        // Boxed so the unfold state is Unpin and can be polled with next().
        bytes : Box::pin( response.bytes_stream() ),
        buffer : String::new(),
        pending : std::collections::VecDeque::new(),
        usage : Usage::default(),
        done : false,
      };

      let stream = futures_util::stream::unfold( state, | mut state | async move
      {
        loop
        {
          if let Some( event ) = state.pending.pop_front()
          {
            return Some( ( event, state ) );
          }
          if state.done
          {
            return None;
          }
          match state.bytes.next().await
          {
            Some( Ok( chunk ) ) =>
            {
              state.buffer.push_str( &String::from_utf8_lossy( &chunk ) );
              while let Some( boundary ) = state.buffer.find( '\n' )
              {
                let line : String = state.buffer.drain( ..=boundary ).collect();
                let Some( data ) = line.trim().strip_prefix( "data:" ) else { continue };
                let data = data.trim();

                if data == "[DONE]"
                {
                  state.pending.push_back( Ok( ProviderEvent::Completed { usage : state.usage } ) );
                  state.done = true;
                  break;
                }
                if let Ok( parsed ) = serde_json::from_str::< ChatResponse >( data )
                {
                  if let Some( usage ) = parsed.usage
                  {
                    state.usage = Usage
                    {
                      input_tokens : usage.prompt_tokens,
                      output_tokens : usage.completion_tokens,
                    };
                  }
                  if let Some( text ) = parsed.delta_text()
                  {
                    if !text.is_empty()
                    {
                      state.pending.push_back( Ok( ProviderEvent::Delta( text.to_string() ) ) );
                    }
                  }
                }
              }
            },
            Some( Err( e ) ) =>
            {
              state.done = true;
              return Some( ( Err
              (
                GatewayError::provider_transient( format!( "stream transport failed : {e}" ) )
                  .with_provider( PROVIDER_ID )
              ), state ) );
            },
            None =>
            {
              state.done = true;
              return Some( ( Err
              (
                GatewayError::provider_transient( "stream ended without [DONE]" )
                  .with_provider( PROVIDER_ID )
              ), state ) );
            },
          }
        }
      } );

      Ok( Box::pin( stream ) )
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    API_KEY_ENV,
    DEFAULT_BASE_URL,
    OpenAiClient,
    PROVIDER_ID,
  };
}

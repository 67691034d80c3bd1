//! Messages API HTTP client
//!
//! Transparent client : one method per endpoint, failures classified into
//! the gateway taxonomy, no retry or breaker logic of its own.

mod private
{
  use std::time::Duration;
  use gateway_engine::{ ApiKey, GatewayError, GatewayResult, ProviderConfig, config_str, config_u64, classify_status };
  use crate::types::{ ApiErrorBody, MessagesRequest, MessagesResponse };

  /// Default API endpoint
  pub const DEFAULT_BASE_URL : &str = "https://api.anthropic.com";
  /// Default API version header value
  pub const DEFAULT_API_VERSION : &str = "2023-06-01";
  /// Environment variable consulted when `api.key` is absent
  pub const API_KEY_ENV : &str = "ANTHROPIC_API_KEY";
  /// Provider id used in error attribution
  pub const PROVIDER_ID : &str = "anthropic";

  /// Messages API client
  #[ derive( Debug, Clone ) ]
  pub struct AnthropicClient
  {
    http : reqwest::Client,
    base_url : String,
    api_key : ApiKey,
    api_version : String,
    timeout : Duration,
  }

  impl AnthropicClient
  {
    /// Build a client from the enumerated provider config keys
    ///
    /// Recognized keys : `api.key` (falls back to `ANTHROPIC_API_KEY`),
    /// `api.base-url`, `api.version`, `timeout.seconds`.
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
      let api_version = config_str( config, "api.version" )
        .unwrap_or_else( || DEFAULT_API_VERSION.to_string() );
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
        api_version,
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

    fn request( &self, client : &reqwest::Client, body : &MessagesRequest ) -> reqwest::RequestBuilder
    {
      client
        .post( format!( "{}/v1/messages", self.base_url ) )
        .header( "x-api-key", self.api_key.expose() )
        .header( "anthropic-version", &self.api_version )
        .header( "content-type", "application/json" )
        .json( body )
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

    /// Create a message
    ///
    /// # Errors
    ///
    /// Classified transport and API failures.
    pub async fn create_message( &self, request : &MessagesRequest ) -> GatewayResult< MessagesResponse >
    {
      let response = self.request( &self.http, request )
        .send()
        .await
        .map_err( | e | GatewayError::provider_transient( format!( "request failed : {e}" ) ).with_provider( PROVIDER_ID ) )?;

      if !response.status().is_success()
      {
        return Err( Self::classify_failure( response ).await );
      }
      response.json::< MessagesResponse >().await
        .map_err( | e | GatewayError::provider_transient( format!( "malformed response body : {e}" ) ).with_provider( PROVIDER_ID ) )
    }

    /// Probe the endpoint with a lightweight models listing
    ///
    /// # Errors
    ///
    /// Classified transport and API failures.
    pub async fn probe( &self ) -> GatewayResult< () >
    {
      let response = self.http
        .get( format!( "{}/v1/models", self.base_url ) )
        .header( "x-api-key", self.api_key.expose() )
        .header( "anthropic-version", &self.api_version )
        .send()
        .await
        .map_err( | e | GatewayError::provider_transient( format!( "probe failed : {e}" ) ).with_provider( PROVIDER_ID ) )?;

      if !response.status().is_success()
      {
        return Err( Self::classify_failure( response ).await );
      }
      Ok( () )
    }

    /// Create a message with SSE delivery
    ///
    /// The returned stream yields text deltas and exactly one completion
    /// event carrying the accumulated usage.
    ///
    /// # Errors
    ///
    /// Classified transport and API failures on setup; later failures arrive
    /// through the stream.
    #[ cfg( feature = "streaming" ) ]
    pub async fn create_message_stream( &self, request : &MessagesRequest ) -> GatewayResult< gateway_engine::ProviderEventStream >
    {
      use futures_util::StreamExt;
      use gateway_engine::{ ProviderEvent, Usage };
      use crate::sse::SseParser;
      use crate::types::StreamEventBody;

      let mut body = request.clone();
      body.stream = Some( true );

      // A total timeout would kill long generations; the streaming client
      // only bounds the connect phase.
      let http = reqwest::Client::builder()
        .connect_timeout( self.timeout )
        .build()
        .map_err( | e | GatewayError::internal( format!( "failed to build HTTP client : {e}" ) ) )?;

      let response = self.request( &http, &body )
        .header( "accept", "text/event-stream" )
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
        parser : SseParser,
        pending : std::collections::VecDeque< GatewayResult< ProviderEvent > >,
        usage : Usage,
        done : bool,
      }

      let state = State
      {
        // Boxed so the unfold state is Unpin and can be polled with next().
        bytes : Box::pin( response.bytes_stream() ),
        parser : SseParser::new(),
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
              for frame in state.parser.feed( &chunk )
              {
                match frame.event.as_str()
                {
                  "message_start" =>
                  {
                    if let Ok( body ) = serde_json::from_str::< StreamEventBody >( &frame.data )
                    {
                      if let Some( message ) = body.message
                      {
                        state.usage.input_tokens = message.usage.input_tokens;
                      }
                    }
                  },
                  "content_block_delta" =>
                  {
                    if let Ok( body ) = serde_json::from_str::< StreamEventBody >( &frame.data )
                    {
                      if let Some( delta ) = body.delta
                      {
                        if delta.kind == "text_delta" && !delta.text.is_empty()
                        {
                          state.pending.push_back( Ok( ProviderEvent::Delta( delta.text ) ) );
                        }
                      }
                    }
                  },
                  "message_delta" =>
                  {
                    if let Ok( body ) = serde_json::from_str::< StreamEventBody >( &frame.data )
                    {
                      if let Some( usage ) = body.usage
                      {
                        state.usage.output_tokens = usage.output_tokens;
                      }
                    }
                  },
                  "message_stop" =>
                  {
                    state.pending.push_back( Ok( ProviderEvent::Completed { usage : state.usage } ) );
                    state.done = true;
                  },
                  "error" =>
                  {
                    state.pending.push_back( Err
                    (
                      GatewayError::provider_transient( format!( "stream error event : {}", frame.data ) )
                        .with_provider( PROVIDER_ID )
                    ) );
                    state.done = true;
                  },
                  // ping, content_block_start, content_block_stop
                  _ => {},
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
                GatewayError::provider_transient( "stream ended without message_stop" )
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
    AnthropicClient,
    API_KEY_ENV,
    DEFAULT_API_VERSION,
    DEFAULT_BASE_URL,
    PROVIDER_ID,
  };
}

//! Chat completions wire types

mod private
{
  use serde::{ Serialize, Deserialize };

  /// One chat turn on the wire
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct WireMessage
  {
    /// `system`, `user`, `assistant` or `tool`
    pub role : String,
    /// Text content
    pub content : String,
  }

  /// Chat completions request body
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ChatRequest
  {
    /// Model identifier
    pub model : String,
    /// Conversation turns
    pub messages : Vec< WireMessage >,
    /// Softmax temperature
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub temperature : Option< f64 >,
    /// Nucleus mass
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub top_p : Option< f64 >,
    /// Output token budget
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub max_tokens : Option< u32 >,
    /// Presence penalty
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub presence_penalty : Option< f64 >,
    /// Stop sequences
    #[ serde( skip_serializing_if = "Vec::is_empty", default ) ]
    pub stop : Vec< String >,
    /// JSON response mode
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub response_format : Option< ResponseFormat >,
    /// Request SSE delivery
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub stream : Option< bool >,
    /// Ask for usage in the final SSE chunk
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub stream_options : Option< StreamOptions >,
  }

  /// `response_format` wire object
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct ResponseFormat
  {
    /// Format tag, `json_object` for constrained JSON
    #[ serde( rename = "type" ) ]
    pub kind : String,
  }

  /// `stream_options` wire object
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct StreamOptions
  {
    /// Include usage in the terminal chunk
    pub include_usage : bool,
  }

  /// Token accounting on the wire
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default ) ]
  pub struct WireUsage
  {
    /// Prompt tokens
    #[ serde( default ) ]
    pub prompt_tokens : u64,
    /// Generated tokens
    #[ serde( default ) ]
    pub completion_tokens : u64,
  }

  /// One completion choice
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ChatChoice
  {
    /// Full message of a non-streaming response
    #[ serde( default ) ]
    pub message : Option< WireMessage >,
    /// Incremental delta of a streaming chunk
    #[ serde( default ) ]
    pub delta : Option< ChatDelta >,
    /// Why generation stopped
    #[ serde( default ) ]
    pub finish_reason : Option< String >,
  }

  /// Incremental content of a streaming chunk
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize, Default ) ]
  pub struct ChatDelta
  {
    /// Incremental text
    #[ serde( default ) ]
    pub content : Option< String >,
  }

  /// Chat completions response body, shared by full and chunk shapes
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ChatResponse
  {
    /// Server-assigned completion id
    #[ serde( default ) ]
    pub id : String,
    /// Model that produced the response
    #[ serde( default ) ]
    pub model : String,
    /// Completion choices, first one used
    #[ serde( default ) ]
    pub choices : Vec< ChatChoice >,
    /// Token accounting; absent in mid-stream chunks
    #[ serde( default ) ]
    pub usage : Option< WireUsage >,
  }

  impl ChatResponse
  {
    /// Text of the first choice
    #[ must_use ]
    pub fn text( &self ) -> String
    {
      self.choices.first()
        .and_then( | choice | choice.message.as_ref() )
        .map( | message | message.content.clone() )
        .unwrap_or_default()
    }

    /// Incremental text of the first choice of a chunk
    #[ must_use ]
    pub fn delta_text( &self ) -> Option< &str >
    {
      self.choices.first()
        .and_then( | choice | choice.delta.as_ref() )
        .and_then( | delta | delta.content.as_deref() )
    }
  }

  /// Error body returned by the API
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ApiErrorBody
  {
    /// Error detail
    pub error : ApiErrorDetail,
  }

  /// Error detail of [`ApiErrorBody`]
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ApiErrorDetail
  {
    /// Human-readable message
    pub message : String,
    /// Error type tag
    #[ serde( rename = "type", default ) ]
    pub kind : Option< String >,
  }
}

crate::mod_interface!
{
  exposed use
  {
    ApiErrorBody,
    ApiErrorDetail,
    ChatChoice,
    ChatDelta,
    ChatRequest,
    ChatResponse,
    ResponseFormat,
    StreamOptions,
    WireMessage,
    WireUsage,
  };
}

//! Messages API wire types
//!
//! One-to-one serde mappings for the request, response and streaming event
//! shapes the messages endpoint speaks.

mod private
{
  use serde::{ Serialize, Deserialize };

  /// One turn of the conversation on the wire
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct WireMessage
  {
    /// `user` or `assistant`
    pub role : String,
    /// Plain-text content
    pub content : String,
  }

  /// Messages endpoint request body
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct MessagesRequest
  {
    /// Model identifier
    pub model : String,
    /// Output token budget, required by the API
    pub max_tokens : u32,
    /// Conversation turns, system turns extracted into `system`
    pub messages : Vec< WireMessage >,
    /// System prompt
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub system : Option< String >,
    /// Softmax temperature
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub temperature : Option< f64 >,
    /// Top-k cutoff
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub top_k : Option< u32 >,
    /// Nucleus mass
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub top_p : Option< f64 >,
    /// Stop sequences
    #[ serde( skip_serializing_if = "Vec::is_empty", default ) ]
    pub stop_sequences : Vec< String >,
    /// Request SSE delivery
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    pub stream : Option< bool >,
  }

  /// One block of response content
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ContentBlock
  {
    /// Block type, `text` for generations
    #[ serde( rename = "type" ) ]
    pub kind : String,
    /// Text payload
    #[ serde( default ) ]
    pub text : String,
  }

  /// Token accounting on the wire
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default ) ]
  pub struct WireUsage
  {
    /// Prompt tokens
    #[ serde( default ) ]
    pub input_tokens : u64,
    /// Generated tokens
    #[ serde( default ) ]
    pub output_tokens : u64,
  }

  /// Messages endpoint response body
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct MessagesResponse
  {
    /// Server-assigned message id
    pub id : String,
    /// Model that produced the response
    pub model : String,
    /// Content blocks, concatenated by the provider
    pub content : Vec< ContentBlock >,
    /// Why generation stopped
    #[ serde( default ) ]
    pub stop_reason : Option< String >,
    /// Token accounting
    #[ serde( default ) ]
    pub usage : WireUsage,
  }

  impl MessagesResponse
  {
    /// Concatenated text of all text blocks
    #[ must_use ]
    pub fn text( &self ) -> String
    {
      self.content.iter()
        .filter( | block | block.kind == "text" )
        .map( | block | block.text.as_str() )
        .collect()
    }
  }

  /// Payload of a `content_block_delta` stream event
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct StreamDelta
  {
    /// Delta type, `text_delta` for text
    #[ serde( rename = "type" ) ]
    pub kind : String,
    /// Incremental text
    #[ serde( default ) ]
    pub text : String,
  }

  /// Nested message of a `message_start` event
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct StreamMessageStart
  {
    /// Prompt-side token accounting
    #[ serde( default ) ]
    pub usage : WireUsage,
  }

  /// Stream event bodies the provider cares about
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct StreamEventBody
  {
    /// Delta payload of `content_block_delta` events
    #[ serde( default ) ]
    pub delta : Option< StreamDelta >,
    /// Usage payload of `message_delta` events
    #[ serde( default ) ]
    pub usage : Option< WireUsage >,
    /// Message payload of `message_start` events
    #[ serde( default ) ]
    pub message : Option< StreamMessageStart >,
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
    /// Error type tag
    #[ serde( rename = "type" ) ]
    pub kind : String,
    /// Human-readable message
    pub message : String,
  }
}

crate::mod_interface!
{
  exposed use
  {
    ApiErrorBody,
    ApiErrorDetail,
    ContentBlock,
    MessagesRequest,
    MessagesResponse,
    StreamDelta,
    StreamEventBody,
    StreamMessageStart,
    WireMessage,
    WireUsage,
  };
}

//! Request and response model for the inference gateway
//!
//! `InferenceRequest` is immutable after admission: the orchestrator takes it
//! by value, validates it once and never hands out mutable access. Sampling
//! parameters arrive as a raw key/value map and are normalized into a
//! [`crate::sampling::SamplingConfig`] during PRE_PROCESSING.

mod private
{
  use std::collections::HashMap;
  use serde::{ Serialize, Deserialize };
  use crate::error::{ GatewayError, GatewayResult };

  /// Role of a chat message
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum Role
  {
    /// System instruction
    System,
    /// End-user turn
    User,
    /// Model turn
    Assistant,
    /// Tool result turn
    Tool,
  }

  /// A single tool invocation requested by the model
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ToolCall
  {
    /// Tool call identifier assigned by the provider
    pub id : String,
    /// Name of the tool to invoke
    pub name : String,
    /// JSON-encoded arguments
    pub arguments : serde_json::Value,
  }

  /// Declaration of a tool the model may call
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ToolDefinition
  {
    /// Tool name
    pub name : String,
    /// Human-readable description
    pub description : String,
    /// JSON schema of the parameters
    pub parameters : serde_json::Value,
  }

  /// One message of the conversation
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ChatMessage
  {
    /// Message role
    pub role : Role,
    /// Text content
    pub content : String,
    /// Tool calls attached to an assistant turn
    #[ serde( default, skip_serializing_if = "Option::is_none" ) ]
    pub tool_calls : Option< Vec< ToolCall > >,
  }

  impl ChatMessage
  {
    /// Create a plain message
    #[ must_use ]
    pub fn new( role : Role, content : impl Into< String > ) -> Self
    {
      Self { role, content : content.into(), tool_calls : None }
    }

    /// Create a user message
    #[ must_use ]
    pub fn user( content : impl Into< String > ) -> Self
    {
      Self::new( Role::User, content )
    }

    /// Create a system message
    #[ must_use ]
    pub fn system( content : impl Into< String > ) -> Self
    {
      Self::new( Role::System, content )
    }

    /// Create an assistant message
    #[ must_use ]
    pub fn assistant( content : impl Into< String > ) -> Self
    {
      Self::new( Role::Assistant, content )
    }
  }

  /// Scheduling priority of a request
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum Priority
  {
    /// Background work, first to shed
    Low,
    /// Default priority
    #[ default ]
    Normal,
    /// Interactive traffic
    High,
  }

  /// An inference request as admitted by the orchestrator
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct InferenceRequest
  {
    /// Opaque request identifier, unique within the dedup window
    pub request_id : String,
    /// Tenant the request is billed to
    pub tenant_id : String,
    /// Requested model identifier
    pub model_id : String,
    /// Conversation so far
    pub messages : Vec< ChatMessage >,
    /// Tools the model may call
    #[ serde( default, skip_serializing_if = "Option::is_none" ) ]
    pub tools : Option< Vec< ToolDefinition > >,
    /// Raw sampling parameters, normalized during PRE_PROCESSING
    #[ serde( default ) ]
    pub parameters : HashMap< String, serde_json::Value >,
    /// Whether the caller wants incremental chunks
    #[ serde( default ) ]
    pub streaming : bool,
    /// Scheduling priority
    #[ serde( default ) ]
    pub priority : Priority,
    /// Caller-supplied deadline in milliseconds, capped by the server maximum
    #[ serde( default, skip_serializing_if = "Option::is_none" ) ]
    pub deadline_ms : Option< u64 >,
  }

  impl InferenceRequest
  {
    /// Start building a request
    #[ must_use ]
    pub fn builder() -> InferenceRequestBuilder
    {
      InferenceRequestBuilder::new()
    }

    /// Validate structural invariants
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` for an empty id, model, message list or
    /// message content, or for a tool message without preceding tool calls.
    pub fn validate( &self ) -> GatewayResult< () >
    {
      if self.request_id.trim().is_empty()
      {
        return Err( GatewayError::invalid_argument( "request_id cannot be empty" ) );
      }
      if self.tenant_id.trim().is_empty()
      {
        return Err( GatewayError::invalid_argument( "tenant_id cannot be empty" ) );
      }
      if self.model_id.trim().is_empty()
      {
        return Err( GatewayError::invalid_argument( "model_id cannot be empty" ) );
      }
      if self.messages.is_empty()
      {
        return Err( GatewayError::invalid_argument( "messages cannot be empty" ) );
      }
      for ( index, message ) in self.messages.iter().enumerate()
      {
        if message.content.is_empty() && message.tool_calls.is_none()
        {
          return Err( GatewayError::invalid_argument
          (
            format!( "message {index} has neither content nor tool calls" )
          ) );
        }
      }
      Ok( () )
    }

    /// Total characters across message contents, a cheap size proxy
    #[ must_use ]
    pub fn content_len( &self ) -> usize
    {
      self.messages.iter().map( | message | message.content.len() ).sum()
    }
  }

  /// Builder for [`InferenceRequest`]
  #[ derive( Debug, Default ) ]
  pub struct InferenceRequestBuilder
  {
    request_id : Option< String >,
    tenant_id : Option< String >,
    model_id : Option< String >,
    messages : Vec< ChatMessage >,
    tools : Option< Vec< ToolDefinition > >,
    parameters : HashMap< String, serde_json::Value >,
    streaming : bool,
    priority : Priority,
    deadline_ms : Option< u64 >,
  }

  impl InferenceRequestBuilder
  {
    /// Create an empty builder
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Set the request id; generated if omitted
    #[ must_use ]
    pub fn request_id( mut self, request_id : impl Into< String > ) -> Self
    {
      self.request_id = Some( request_id.into() );
      self
    }

    /// Set the tenant id
    #[ must_use ]
    pub fn tenant( mut self, tenant_id : impl Into< String > ) -> Self
    {
      self.tenant_id = Some( tenant_id.into() );
      self
    }

    /// Set the model id
    #[ must_use ]
    pub fn model( mut self, model_id : impl Into< String > ) -> Self
    {
      self.model_id = Some( model_id.into() );
      self
    }

    /// Append a message
    #[ must_use ]
    pub fn message( mut self, message : ChatMessage ) -> Self
    {
      self.messages.push( message );
      self
    }

    /// Append a user message
    #[ must_use ]
    pub fn user_message( self, content : impl Into< String > ) -> Self
    {
      self.message( ChatMessage::user( content ) )
    }

    /// Attach tool definitions
    #[ must_use ]
    pub fn tools( mut self, tools : Vec< ToolDefinition > ) -> Self
    {
      self.tools = Some( tools );
      self
    }

    /// Set a raw sampling parameter
    #[ must_use ]
    pub fn parameter( mut self, key : impl Into< String >, value : serde_json::Value ) -> Self
    {
      self.parameters.insert( key.into(), value );
      self
    }

    /// Request streaming delivery
    #[ must_use ]
    pub fn streaming( mut self, streaming : bool ) -> Self
    {
      self.streaming = streaming;
      self
    }

    /// Set the scheduling priority
    #[ must_use ]
    pub fn priority( mut self, priority : Priority ) -> Self
    {
      self.priority = priority;
      self
    }

    /// Set the caller deadline
    #[ must_use ]
    pub fn deadline_ms( mut self, deadline_ms : u64 ) -> Self
    {
      self.deadline_ms = Some( deadline_ms );
      self
    }

    /// Finish the request
    ///
    /// Missing ids are generated; missing tenant defaults to `"default"`.
    #[ must_use ]
    pub fn build( self ) -> InferenceRequest
    {
      InferenceRequest
      {
        request_id : self.request_id.unwrap_or_else( || uuid::Uuid::new_v4().to_string() ),
        tenant_id : self.tenant_id.unwrap_or_else( || "default".to_string() ),
        model_id : self.model_id.unwrap_or_default(),
        messages : self.messages,
        tools : self.tools,
        parameters : self.parameters,
        streaming : self.streaming,
        priority : self.priority,
        deadline_ms : self.deadline_ms,
      }
    }
  }

  /// Token accounting of a completed call
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default ) ]
  pub struct Usage
  {
    /// Tokens consumed by the prompt
    pub input_tokens : u64,
    /// Tokens produced by the model
    pub output_tokens : u64,
  }

  impl Usage
  {
    /// Total tokens charged against quota
    #[ inline ]
    #[ must_use ]
    pub fn total( &self ) -> u64
    {
      self.input_tokens + self.output_tokens
    }
  }

  /// A completed inference response
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct InferenceResponse
  {
    /// Request the response answers
    pub request_id : String,
    /// Model that produced the response
    pub model : String,
    /// Final text content
    pub content : String,
    /// Tool calls extracted from the output, if any
    #[ serde( default, skip_serializing_if = "Vec::is_empty" ) ]
    pub tool_calls : Vec< ToolCall >,
    /// Token accounting
    pub usage : Usage,
    /// Wall-clock duration of the request in milliseconds
    pub duration_ms : u64,
    /// Diagnostics surfaced to the caller (warnings, routing info)
    #[ serde( default ) ]
    pub metadata : HashMap< String, String >,
  }

  impl InferenceResponse
  {
    /// Tokens consumed, input plus output
    #[ inline ]
    #[ must_use ]
    pub fn tokens_used( &self ) -> u64
    {
      self.usage.total()
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ChatMessage,
    InferenceRequest,
    InferenceRequestBuilder,
    InferenceResponse,
    Priority,
    Role,
    ToolCall,
    ToolDefinition,
    Usage,
  };
}

//! Request/response wire mapping tests

use super::*;
use gateway_engine::{ ChatMessage, InferenceRequest, SamplingConfig };
use the_module::{ AnthropicProvider, MessagesResponse };

fn request_with_system() -> InferenceRequest
{
  InferenceRequest::builder()
    .request_id( "r1" )
    .tenant( "t1" )
    .model( "claude-sonnet-4" )
    .message( ChatMessage::system( "be terse" ) )
    .message( ChatMessage::user( "hi" ) )
    .message( ChatMessage::assistant( "hello" ) )
    .message( ChatMessage::user( "continue" ) )
    .build()
}

#[ test ]
fn system_turns_fold_into_the_system_field()
{
  let sampling = SamplingConfig::default();
  let wire = AnthropicProvider::to_wire( &request_with_system(), &sampling );

  assert_eq!( wire.model, "claude-sonnet-4" );
  assert_eq!( wire.system.as_deref(), Some( "be terse" ) );
  assert_eq!( wire.messages.len(), 3 );
  assert_eq!( wire.messages[ 0 ].role, "user" );
  assert_eq!( wire.messages[ 1 ].role, "assistant" );
}

#[ test ]
fn sampling_maps_onto_wire_parameters()
{
  let mut sampling = SamplingConfig::default();
  sampling.temperature = 0.3;
  sampling.top_k = 0;
  sampling.max_tokens = 512;
  sampling.stop_tokens = vec![ "END".to_string() ];

  let wire = AnthropicProvider::to_wire( &request_with_system(), &sampling );
  assert_eq!( wire.max_tokens, 512 );
  assert_eq!( wire.temperature, Some( 0.3 ) );
  // top_k of zero means "disabled" and stays off the wire.
  assert_eq!( wire.top_k, None );
  assert_eq!( wire.stop_sequences, vec![ "END".to_string() ] );
}

#[ test ]
fn response_text_concatenates_text_blocks()
{
  let raw = r#"{
    "id" : "msg_01",
    "model" : "claude-sonnet-4",
    "content" : [
      { "type" : "text", "text" : "Hello" },
      { "type" : "tool_use", "text" : "" },
      { "type" : "text", "text" : " world" }
    ],
    "stop_reason" : "end_turn",
    "usage" : { "input_tokens" : 12, "output_tokens" : 5 }
  }"#;
  let response : MessagesResponse = serde_json::from_str( raw ).unwrap();
  assert_eq!( response.text(), "Hello world" );
  assert_eq!( response.usage.input_tokens, 12 );
}

#[ test ]
fn request_serialization_skips_absent_fields()
{
  let sampling = SamplingConfig::default();
  let wire = AnthropicProvider::to_wire( &request_with_system(), &sampling );
  let encoded = serde_json::to_value( &wire ).unwrap();

  assert!( encoded.get( "stream" ).is_none() );
  assert!( encoded.get( "stop_sequences" ).is_none() );
  assert!( encoded.get( "system" ).is_some() );
}

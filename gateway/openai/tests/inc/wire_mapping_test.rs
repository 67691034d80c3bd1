//! Request/response wire mapping tests

use super::*;
use gateway_engine::{ ChatMessage, GrammarMode, InferenceRequest, SamplingConfig };
use the_module::{ ChatResponse, OpenAiProvider };

fn conversation() -> InferenceRequest
{
  InferenceRequest::builder()
    .request_id( "r1" )
    .tenant( "t1" )
    .model( "gpt-4o-mini" )
    .message( ChatMessage::system( "be terse" ) )
    .message( ChatMessage::user( "hi" ) )
    .build()
}

#[ test ]
fn roles_map_one_to_one()
{
  let wire = OpenAiProvider::to_wire( &conversation(), &SamplingConfig::default() );
  assert_eq!( wire.model, "gpt-4o-mini" );
  assert_eq!( wire.messages.len(), 2 );
  assert_eq!( wire.messages[ 0 ].role, "system" );
  assert_eq!( wire.messages[ 1 ].role, "user" );
}

#[ test ]
fn json_grammar_mode_becomes_response_format()
{
  let mut sampling = SamplingConfig::default();
  sampling.grammar_mode = Some( GrammarMode::Json );
  let wire = OpenAiProvider::to_wire( &conversation(), &sampling );
  assert_eq!( wire.response_format.unwrap().kind, "json_object" );

  let plain = OpenAiProvider::to_wire( &conversation(), &SamplingConfig::default() );
  assert!( plain.response_format.is_none() );
}

#[ test ]
fn full_response_text_and_usage_parse()
{
  let raw = r#"{
    "id" : "chatcmpl-1",
    "model" : "gpt-4o-mini",
    "choices" : [
      { "message" : { "role" : "assistant", "content" : "Hello!" }, "finish_reason" : "stop" }
    ],
    "usage" : { "prompt_tokens" : 10, "completion_tokens" : 3 }
  }"#;
  let response : ChatResponse = serde_json::from_str( raw ).unwrap();
  assert_eq!( response.text(), "Hello!" );
  assert_eq!( response.usage.unwrap().completion_tokens, 3 );
}

#[ test ]
fn stream_chunk_delta_parses()
{
  let raw = r#"{
    "id" : "chatcmpl-1",
    "model" : "gpt-4o-mini",
    "choices" : [ { "delta" : { "content" : "Hel" } } ]
  }"#;
  let chunk : ChatResponse = serde_json::from_str( raw ).unwrap();
  assert_eq!( chunk.delta_text(), Some( "Hel" ) );
  assert!( chunk.usage.is_none() );
}

#[ test ]
fn usage_only_terminal_chunk_parses()
{
  let raw = r#"{
    "id" : "chatcmpl-1",
    "model" : "gpt-4o-mini",
    "choices" : [],
    "usage" : { "prompt_tokens" : 7, "completion_tokens" : 9 }
  }"#;
  let chunk : ChatResponse = serde_json::from_str( raw ).unwrap();
  assert!( chunk.delta_text().is_none() );
  assert_eq!( chunk.usage.unwrap().prompt_tokens, 7 );
}

//! SSE parsing tests against recorded event sequences

use super::*;
use the_module::{ SseParser, StreamEventBody };

#[ test ]
fn recorded_stream_round_trips()
{
  let recorded = concat!
  (
    "event: message_start\n",
    "data: {\"message\":{\"usage\":{\"input_tokens\":9,\"output_tokens\":0}}}\n",
    "\n",
    "event: content_block_delta\n",
    "data: {\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n",
    "\n",
    "event: content_block_delta\n",
    "data: {\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n",
    "\n",
    "event: message_delta\n",
    "data: {\"usage\":{\"output_tokens\":2}}\n",
    "\n",
    "event: message_stop\n",
    "data: {}\n",
    "\n",
  );

  let mut parser = SseParser::new();
  let frames = parser.feed( recorded.as_bytes() );
  assert_eq!( frames.len(), 5 );

  let start : StreamEventBody = serde_json::from_str( &frames[ 0 ].data ).unwrap();
  assert_eq!( start.message.unwrap().usage.input_tokens, 9 );

  let delta : StreamEventBody = serde_json::from_str( &frames[ 1 ].data ).unwrap();
  assert_eq!( delta.delta.unwrap().text, "Hel" );

  let usage : StreamEventBody = serde_json::from_str( &frames[ 3 ].data ).unwrap();
  assert_eq!( usage.usage.unwrap().output_tokens, 2 );
}

#[ test ]
fn frames_survive_arbitrary_chunk_boundaries()
{
  let recorded = "event: content_block_delta\ndata: {\"delta\":{\"type\":\"text_delta\",\"text\":\"xy\"}}\n\n";
  // Feed one byte at a time : only the final byte completes the frame.
  let mut parser = SseParser::new();
  let mut frames = Vec::new();
  for byte in recorded.as_bytes()
  {
    frames.extend( parser.feed( &[ *byte ] ) );
  }
  assert_eq!( frames.len(), 1 );
  assert_eq!( frames[ 0 ].event, "content_block_delta" );
}

#[ test ]
fn ping_frames_are_parsed_but_carry_no_delta()
{
  let mut parser = SseParser::new();
  let frames = parser.feed( b"event: ping\ndata: {}\n\n" );
  assert_eq!( frames.len(), 1 );
  let body : StreamEventBody = serde_json::from_str( &frames[ 0 ].data ).unwrap();
  assert!( body.delta.is_none() );
  assert!( body.usage.is_none() );
}

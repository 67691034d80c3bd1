//! Minimal SSE frame parsing
//!
//! The messages endpoint streams `event:`/`data:` frames separated by blank
//! lines. The parser is incremental : bytes are appended as they arrive and
//! complete frames are drained.

#[ cfg( feature = "streaming" ) ]
mod private
{
  /// One parsed SSE frame
  #[ derive( Debug, Clone, PartialEq, Eq ) ]
  pub struct SseFrame
  {
    /// `event:` field, empty when absent
    pub event : String,
    /// Concatenated `data:` lines
    pub data : String,
  }

  /// Incremental SSE frame accumulator
  #[ derive( Debug, Default ) ]
  pub struct SseParser
  {
    buffer : String,
  }

  impl SseParser
  {
    /// Create an empty parser
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Append raw bytes and drain every complete frame
    pub fn feed( &mut self, bytes : &[ u8 ] ) -> Vec< SseFrame >
    {
      self.buffer.push_str( &String::from_utf8_lossy( bytes ) );
      let mut frames = Vec::new();

      // Frames are separated by a blank line.
      while let Some( boundary ) = self.buffer.find( "\n\n" )
      {
        let raw : String = self.buffer.drain( ..boundary + 2 ).collect();
        if let Some( frame ) = Self::parse_frame( &raw )
        {
          frames.push( frame );
        }
      }
      frames
    }

    fn parse_frame( raw : &str ) -> Option< SseFrame >
    {
      let mut event = String::new();
      let mut data = String::new();
      for line in raw.lines()
      {
        if let Some( value ) = line.strip_prefix( "event:" )
        {
          event = value.trim().to_string();
        }
        else if let Some( value ) = line.strip_prefix( "data:" )
        {
          if !data.is_empty()
          {
            data.push( '\n' );
          }
          data.push_str( value.trim() );
        }
      }
      if event.is_empty() && data.is_empty()
      {
        None
      }
      else
      {
        Some( SseFrame { event, data } )
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn frames_split_on_blank_lines()
    {
      let mut parser = SseParser::new();
      let frames = parser.feed( b"event: content_block_delta\ndata: {\"a\":1}\n\nevent: message_stop\ndata: {}\n\n" );
      assert_eq!( frames.len(), 2 );
      assert_eq!( frames[ 0 ].event, "content_block_delta" );
      assert_eq!( frames[ 0 ].data, "{\"a\":1}" );
      assert_eq!( frames[ 1 ].event, "message_stop" );
    }

    #[ test ]
    fn partial_frames_wait_for_more_bytes()
    {
      let mut parser = SseParser::new();
      assert!( parser.feed( b"event: message_start\ndata: {\"x\"" ).is_empty() );
      let frames = parser.feed( b":2}\n\n" );
      assert_eq!( frames.len(), 1 );
      assert_eq!( frames[ 0 ].data, "{\"x\":2}" );
    }
  }
}

#[ cfg( feature = "streaming" ) ]
crate::mod_interface!
{
  exposed use
  {
    SseFrame,
    SseParser,
  };
}

#[ cfg( not( feature = "streaming" ) ) ]
mod private {}

#[ cfg( not( feature = "streaming" ) ) ]
crate::mod_interface!
{
}

//! Stream chunk type
//!
//! Sequence numbers are dense from 0 per request and exactly one chunk of a
//! normally terminated stream carries `is_final = true`, as the last element.

#[ cfg( feature = "streaming" ) ]
mod private
{
  use serde::{ Serialize, Deserialize };

  /// One element of an incremental response
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct StreamChunk
  {
    /// Request this chunk belongs to
    pub request_id : String,
    /// Dense, monotonic position starting at 0
    pub sequence_number : u64,
    /// Incremental text, possibly empty on the final chunk
    pub delta : String,
    /// Terminal marker; set on exactly one chunk per successful stream
    pub is_final : bool,
  }

  impl StreamChunk
  {
    /// Create a non-final chunk
    #[ must_use ]
    pub fn delta( request_id : impl Into< String >, sequence_number : u64, delta : impl Into< String > ) -> Self
    {
      Self
      {
        request_id : request_id.into(),
        sequence_number,
        delta : delta.into(),
        is_final : false,
      }
    }

    /// Create the terminal chunk
    #[ must_use ]
    pub fn final_chunk( request_id : impl Into< String >, sequence_number : u64, delta : impl Into< String > ) -> Self
    {
      Self
      {
        request_id : request_id.into(),
        sequence_number,
        delta : delta.into(),
        is_final : true,
      }
    }
  }
}

#[ cfg( feature = "streaming" ) ]
crate::mod_interface!
{
  exposed use
  {
    StreamChunk,
  };
}

#[ cfg( not( feature = "streaming" ) ) ]
crate::mod_interface!
{
}

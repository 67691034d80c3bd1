//! Backpressured chunk streaming

mod private {}

#[ cfg( feature = "streaming" ) ]
crate::mod_interface!
{
  layer types;
  layer emitter;
}

#[ cfg( not( feature = "streaming" ) ) ]
crate::mod_interface!
{
  // Empty when streaming feature is disabled
}

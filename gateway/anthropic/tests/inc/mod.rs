use super::*;

mod wire_mapping_test;
#[ cfg( feature = "streaming" ) ]
mod sse_test;
mod provider_surface_test;

#![ doc( html_root_url = "https://docs.rs/gateway_anthropic/latest/gateway_anthropic/" ) ]
#![ cfg_attr( doc, doc = include_str!( concat!( env!( "CARGO_MANIFEST_DIR" ), "/", "readme.md" ) ) ) ]

// Strategic clippy configuration for the provider crate
#![allow(clippy::missing_inline_in_public_items)]
#![allow(clippy::std_instead_of_core)]
#![allow(clippy::must_use_candidate)]

//! Anthropic-style remote provider
//!
//! Thin messages-API client plus the [`AnthropicProvider`] adapter that
//! plugs it into the gateway engine. The client is transparent : it maps
//! requests one-to-one onto the wire format and classifies HTTP failures
//! into the gateway taxonomy without any retry or breaker logic of its own;
//! the engine's provider adapter owns those concerns.

#[ cfg( feature = "enabled" ) ]
use mod_interface::mod_interface;

mod private {}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  layer types;
  layer client;
  layer provider;
  #[ cfg( feature = "streaming" ) ]
  layer sse;
}

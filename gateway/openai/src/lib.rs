#![ doc( html_root_url = "https://docs.rs/gateway_openai/latest/gateway_openai/" ) ]
#![ cfg_attr( doc, doc = include_str!( concat!( env!( "CARGO_MANIFEST_DIR" ), "/", "readme.md" ) ) ) ]

// Strategic clippy configuration for the provider crate
#![allow(clippy::missing_inline_in_public_items)]
#![allow(clippy::std_instead_of_core)]
#![allow(clippy::must_use_candidate)]

//! OpenAI-compatible remote provider
//!
//! Chat-completions client plus the [`OpenAiProvider`] adapter plugging it
//! into the gateway engine. Because half the local-inference ecosystem
//! speaks this wire format, the provider doubles as the integration point
//! for any OpenAI-compatible endpoint configured via `api.base-url`.

#[ cfg( feature = "enabled" ) ]
use mod_interface::mod_interface;

mod private {}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  layer types;
  layer client;
  layer provider;
}

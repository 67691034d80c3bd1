//! Error handling for the inference gateway
//!
//! Structured error taxonomy shared by the pipeline, the router, the provider
//! adapters and the policy plugins. Every error carries its kind, retryability
//! and a suggested recovery action so the transport façade can translate it
//! without inspecting messages.

mod private {}

crate::mod_interface!
{
  layer core;
  layer classify;
}

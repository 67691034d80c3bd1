#![ doc( html_root_url = "https://docs.rs/gateway_engine/latest/gateway_engine/" ) ]
#![ cfg_attr( doc, doc = include_str!( concat!( env!( "CARGO_MANIFEST_DIR" ), "/", "readme.md" ) ) ) ]

// Strategic clippy configuration for the control plane crate
#![allow(clippy::missing_inline_in_public_items)]
#![allow(clippy::std_instead_of_core)]
#![allow(clippy::must_use_candidate)]

//! Inference control plane for the multi-tenant LLM gateway
//!
//! This crate owns the request lifecycle between the transport façade and the
//! concrete providers. A request is admitted by the [`Orchestrator`], walked
//! through the phased [`PhasePipeline`], routed by the [`Router`] to one of
//! the providers held in the [`ProviderRegistry`], and executed through a
//! [`ProviderAdapter`] that enforces quota, circuit breaking and call
//! timeouts. Local providers draw loaded model instances from the
//! [`WarmPool`]; streaming responses flow through the bounded chunk emitter.
//!
//! # Design Rules
//!
//! - **Explicit lifecycle**: process-wide state ([`EngineContext`]) is created
//!   by `init( config )` and torn down by `shutdown()`. Nothing starts
//!   implicitly.
//! - **One context per request**: every request owns its
//!   [`ExecutionContext`]; plugins receive it mutably and the read-only
//!   [`EngineContext`] by reference. No ambient tenant state.
//! - **Partial-failure semantics**: CLEANUP always runs; CLEANUP errors are
//!   aggregated into metadata and never replace the original error;
//!   POST_PROCESSING errors taint the response without discarding it.
//! - **Runtime-stateful, process-stateless**: breakers, quota windows, warm
//!   pool and job store live and die with the process. Persistence belongs to
//!   external services behind narrow traits.

#[ cfg( feature = "enabled" ) ]
use mod_interface::mod_interface;

mod private {}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  layer error;
  layer secret;
  layer config;
  layer request;
  layer sampling;
  layer context;
  layer provider;
  layer registry;
  layer circuit_breaker;
  layer quota;
  layer health;
  layer adapter;
  layer router;
  layer phase;
  layer pipeline;
  layer retry;
  layer engine;
  layer orchestrator;
  #[ cfg( feature = "streaming" ) ]
  layer streaming;
  #[ cfg( feature = "warm-pool" ) ]
  layer warm_pool;
  #[ cfg( feature = "policy-plugins" ) ]
  layer plugins;
  #[ cfg( feature = "async-jobs" ) ]
  layer jobs;
  #[ cfg( feature = "observability" ) ]
  layer observability;
  #[ cfg( feature = "model-store" ) ]
  layer model_store;
}

/// Serde-related exports.
#[ cfg( feature = "enabled" ) ]
pub mod ser
{
  pub use serde::
  {
    Serialize,
    Deserialize,
  };
}

/// Error-related exports.
#[ cfg( feature = "enabled" ) ]
pub mod error_tools
{
  pub use::error_tools::*;
}

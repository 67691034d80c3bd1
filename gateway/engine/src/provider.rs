//! Provider SPI
//!
//! Every backend able to fulfil an inference request implements [`Provider`]:
//! remote HTTP vendors and local runner wrappers alike. The engine never
//! calls a provider directly; calls go through the
//! [`crate::adapter::ProviderAdapter`] which adds quota, breaker and timeout
//! handling.

mod private
{
  use std::collections::HashMap;
  use std::pin::Pin;
  use serde::{ Serialize, Deserialize };
  use crate::error::{ GatewayError, GatewayResult };
  use crate::request::{ InferenceRequest, Usage };
  use crate::sampling::SamplingConfig;
  use crate::context::TenantContext;
  use crate::health::HealthReport;

  /// Typed configuration map handed to `initialize`
  ///
  /// Keys are dotted strings enumerated per provider, e.g. `api.key`,
  /// `api.base-url`, `timeout.seconds` for remote vendors and `device`,
  /// `threads`, `base-path` for local runners.
  pub type ProviderConfig = HashMap< String, serde_json::Value >;

  /// Lifecycle state of a provider as tracked by its adapter
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  pub enum ProviderState
  {
    /// Constructed, not yet configured
    Uninitialized,
    /// Configured and ready for traffic
    Initialized,
    /// Last health sample succeeded
    Healthy,
    /// Last health sample failed
    Unhealthy,
    /// Shut down, no further calls
    Shutdown,
  }

  /// Capability flags advertised by a provider
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default ) ]
  pub struct ProviderCapabilities
  {
    /// Supports incremental chunk delivery
    pub streaming : bool,
    /// Supports tool calling
    pub tool_calling : bool,
    /// Accepts non-text content
    pub multimodal : bool,
    /// Offers an embeddings surface
    pub embeddings : bool,
    /// Maximum context window in tokens
    pub max_context_tokens : u32,
    /// Model formats a local provider can load (empty for remote vendors)
    pub supported_formats : Vec< String >,
    /// Devices a local provider can bind (empty for remote vendors)
    pub supported_devices : Vec< String >,
  }

  /// Static scoring profile consumed by the router
  #[ derive( Debug, Clone, Copy, PartialEq, Serialize, Deserialize ) ]
  pub struct ProviderProfile
  {
    /// Relative output quality in [0, 1]
    pub performance : f64,
    /// Cost per thousand tokens, normalized by router bounds
    pub cost_per_1k_tokens : f64,
    /// Expected end-to-end latency in milliseconds
    pub expected_latency_ms : u64,
  }

  impl Default for ProviderProfile
  {
    fn default() -> Self
    {
      Self
      {
        performance : 0.5,
        cost_per_1k_tokens : 1.0,
        expected_latency_ms : 1000,
      }
    }
  }

  /// Raw response produced by a provider
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct ProviderResponse
  {
    /// Model that actually served the call
    pub model : String,
    /// Generated text
    pub content : String,
    /// Token accounting reported by the backend
    pub usage : Usage,
  }

  /// One event of a provider-side stream
  ///
  /// Providers emit deltas and exactly one `Completed`; the engine's emitter
  /// turns these into numbered chunks with final-chunk semantics.
  #[ derive( Debug, Clone, PartialEq ) ]
  pub enum ProviderEvent
  {
    /// Incremental text
    Delta( String ),
    /// Successful end of stream with final accounting
    Completed
    {
      /// Token accounting reported by the backend
      usage : Usage,
    },
  }

  /// Lazy sequence of provider events
  pub type ProviderEventStream = Pin< Box< dyn futures_core::Stream< Item = GatewayResult< ProviderEvent > > + Send > >;

  /// A backend able to fulfil inference requests
  #[ async_trait::async_trait ]
  pub trait Provider : Send + Sync
  {
    /// Stable provider identifier, unique within the registry
    fn id( &self ) -> &str;

    /// Capability flags
    fn capabilities( &self ) -> ProviderCapabilities;

    /// Static scoring profile
    fn profile( &self ) -> ProviderProfile
    {
      ProviderProfile::default()
    }

    /// Whether this provider can serve `model_id` for `tenant`
    fn supports( &self, model_id : &str, tenant : &TenantContext ) -> bool;

    /// Apply configuration; called once before registration
    async fn initialize( &mut self, config : ProviderConfig ) -> GatewayResult< () >;

    /// Execute a non-streaming inference call
    async fn infer( &self, request : &InferenceRequest, sampling : &SamplingConfig ) -> GatewayResult< ProviderResponse >;

    /// Execute a streaming inference call
    ///
    /// Default refuses; providers advertise support via `capabilities`.
    async fn stream( &self, request : &InferenceRequest, sampling : &SamplingConfig ) -> GatewayResult< ProviderEventStream >
    {
      let _ = ( request, sampling );
      Err( GatewayError::invalid_argument( format!( "provider '{}' does not support streaming", self.id() ) ) )
    }

    /// Sample current health
    async fn health( &self ) -> HealthReport;

    /// Release resources; further calls are invalid
    async fn shutdown( &self ) -> GatewayResult< () >;
  }

  /// Read a string value from a provider config map
  pub fn config_str( config : &ProviderConfig, key : &str ) -> Option< String >
  {
    config.get( key ).and_then( | value | value.as_str().map( str::to_string ) )
  }

  /// Read an integer value from a provider config map
  pub fn config_u64( config : &ProviderConfig, key : &str ) -> Option< u64 >
  {
    config.get( key ).and_then( serde_json::Value::as_u64 )
  }

  /// Read a required string value from a provider config map
  ///
  /// # Errors
  ///
  /// Returns `INVALID_ARGUMENT` naming the missing key.
  pub fn config_str_required( config : &ProviderConfig, key : &str ) -> GatewayResult< String >
  {
    config_str( config, key )
      .ok_or_else( || GatewayError::invalid_argument( format!( "missing required provider config key '{key}'" ) ) )
  }
}

crate::mod_interface!
{
  exposed use
  {
    Provider,
    ProviderCapabilities,
    ProviderConfig,
    ProviderEvent,
    ProviderEventStream,
    ProviderProfile,
    ProviderResponse,
    ProviderState,
    config_str,
    config_str_required,
    config_u64,
  };
}

//! Local provider over the warm pool
//!
//! Serves registered manifests through pooled runners. Streaming is served
//! by chunking a completed generation : local backends produce text faster
//! than consumers render it, so chunked delivery keeps the contract without
//! a token-level callback surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use parking_lot::RwLock;
use gateway_engine::
{
  GatewayError,
  GatewayResult,
  HealthReport,
  InferenceRequest,
  PoolConfig,
  Provider,
  ProviderCapabilities,
  ProviderConfig,
  ProviderEvent,
  ProviderEventStream,
  ProviderProfile,
  ProviderResponse,
  Role,
  SamplingConfig,
  TenantContext,
  WarmPool,
};
use crate::backend::{ LocalRunner, LocalRunnerFactory, RunnerBackend, TemplateBackend };
use crate::device::RunnerSettings;
use crate::manifest::ModelManifest;

/// Provider id of the local runner provider
pub const PROVIDER_ID : &str = "local";

/// Local runner provider
pub struct LocalProvider
{
  backends : HashMap< String, Arc< dyn RunnerBackend > >,
  manifests : Arc< RwLock< HashMap< String, ModelManifest > > >,
  // model_id -> manifest_id of the active version
  models : Arc< RwLock< HashMap< String, String > > >,
  default_backend : String,
  pool_config : PoolConfig,
  settings : RunnerSettings,
  pool : Option< Arc< WarmPool< LocalRunner > > >,
}

impl std::fmt::Debug for LocalProvider
{
  fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    f.debug_struct( "LocalProvider" )
      .field( "backends", &self.backends.keys().collect::< Vec< _ > >() )
      .field( "models", &self.models.read().len() )
      .finish_non_exhaustive()
  }
}

impl Default for LocalProvider
{
  fn default() -> Self
  {
    Self::new()
  }
}

impl LocalProvider
{
  /// Create a provider with the template backend registered
  #[ must_use ]
  pub fn new() -> Self
  {
    let template : Arc< dyn RunnerBackend > = Arc::new( TemplateBackend::new() );
    let mut backends : HashMap< String, Arc< dyn RunnerBackend > > = HashMap::new();
    let default_backend = template.name().to_string();
    backends.insert( default_backend.clone(), template );
    Self
    {
      backends,
      manifests : Arc::new( RwLock::new( HashMap::new() ) ),
      models : Arc::new( RwLock::new( HashMap::new() ) ),
      default_backend,
      pool_config : PoolConfig::default(),
      settings : RunnerSettings::default(),
      pool : None,
    }
  }

  /// Register an additional backend and make it the default
  #[ must_use ]
  pub fn with_backend( mut self, backend : Arc< dyn RunnerBackend > ) -> Self
  {
    self.default_backend = backend.name().to_string();
    self.backends.insert( backend.name().to_string(), backend );
    self
  }

  /// Override the warm pool sizing
  #[ must_use ]
  pub fn with_pool_config( mut self, pool_config : PoolConfig ) -> Self
  {
    self.pool_config = pool_config;
    self
  }

  /// Register a manifest; the latest registration per model wins
  pub fn register_manifest( &self, manifest : ModelManifest )
  {
    self.models.write().insert( manifest.model_id.clone(), manifest.manifest_id() );
    self.manifests.write().insert( manifest.manifest_id(), manifest );
  }

  /// The warm pool, available after `initialize`
  ///
  /// # Errors
  ///
  /// Returns `INTERNAL` before initialization.
  pub fn pool( &self ) -> GatewayResult< &Arc< WarmPool< LocalRunner > > >
  {
    self.pool.as_ref()
      .ok_or_else( || GatewayError::internal( "provider 'local' used before initialize" ) )
  }

  fn manifest_for( &self, model_id : &str ) -> GatewayResult< ModelManifest >
  {
    let manifest_id = self.models.read().get( model_id ).cloned()
      .ok_or_else( || GatewayError::provider_unavailable( format!( "no local manifest for model '{model_id}'" ) ) )?;
    self.manifests.read().get( &manifest_id ).cloned()
      .ok_or_else( || GatewayError::internal( format!( "manifest '{manifest_id}' vanished" ) ) )
  }

  /// Flatten the conversation into a plain prompt
  #[ must_use ]
  pub fn build_prompt( request : &InferenceRequest ) -> String
  {
    let mut prompt = String::new();
    for message in &request.messages
    {
      let role = match message.role
      {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
      };
      prompt.push_str( role );
      prompt.push_str( ": " );
      prompt.push_str( &message.content );
      prompt.push( '\n' );
    }
    prompt
  }

  async fn run( &self, request : &InferenceRequest, sampling : &SamplingConfig ) -> GatewayResult< ProviderResponse >
  {
    let pool = self.pool()?;
    let manifest = self.manifest_for( &request.model_id )?;
    let key = manifest.runner_key( &self.default_backend );
    let runner = pool.get_or_create( &key ).await?;

    let prompt = Self::build_prompt( request );
    let ( content, usage ) = runner.generate( &prompt, sampling ).await?;
    Ok( ProviderResponse
    {
      model : request.model_id.clone(),
      content,
      usage,
    } )
  }
}

#[ async_trait::async_trait ]
impl Provider for LocalProvider
{
  fn id( &self ) -> &str
  {
    PROVIDER_ID
  }

  fn capabilities( &self ) -> ProviderCapabilities
  {
    ProviderCapabilities
    {
      streaming : true,
      tool_calling : false,
      multimodal : false,
      embeddings : false,
      max_context_tokens : 32_768,
      supported_formats : vec!
      [
        "gguf".to_string(),
        "onnx".to_string(),
        "torch".to_string(),
        "safetensors".to_string(),
      ],
      supported_devices : vec![ "CPU".to_string(), "CUDA".to_string(), "METAL".to_string() ],
    }
  }

  fn profile( &self ) -> ProviderProfile
  {
    ProviderProfile
    {
      performance : 0.5,
      cost_per_1k_tokens : 0.1,
      expected_latency_ms : 400,
    }
  }

  fn supports( &self, model_id : &str, _tenant : &TenantContext ) -> bool
  {
    self.models.read().contains_key( model_id )
  }

  async fn initialize( &mut self, config : ProviderConfig ) -> GatewayResult< () >
  {
    self.settings = RunnerSettings::from_config( &config )?;
    let factory = LocalRunnerFactory::new
    (
      self.backends.clone(),
      self.manifests.clone(),
      self.settings.clone(),
    );
    let pool = Arc::new( WarmPool::new( self.pool_config.clone(), Arc::new( factory ) ) );
    if self.pool_config.warmup_enabled
    {
      let keys : Vec< _ > = self.manifests.read().values()
        .map( | manifest | manifest.runner_key( &self.default_backend ) )
        .collect();
      pool.prewarm( &keys ).await;
    }
    self.pool = Some( pool );
    Ok( () )
  }

  async fn infer( &self, request : &InferenceRequest, sampling : &SamplingConfig ) -> GatewayResult< ProviderResponse >
  {
    self.run( request, sampling ).await
  }

  async fn stream( &self, request : &InferenceRequest, sampling : &SamplingConfig ) -> GatewayResult< ProviderEventStream >
  {
    let response = self.run( request, sampling ).await?;
    let usage = response.usage;

    // Words become deltas; the completion event carries the real usage.
    let mut events : Vec< GatewayResult< ProviderEvent > > = response.content
      .split_inclusive( ' ' )
      .map( | word | Ok( ProviderEvent::Delta( word.to_string() ) ) )
      .collect();
    events.push( Ok( ProviderEvent::Completed { usage } ) );
    Ok( Box::pin( futures_util::stream::iter( events ) ) )
  }

  async fn health( &self ) -> HealthReport
  {
    let started = Instant::now();
    match &self.pool
    {
      Some( _pool ) => HealthReport::healthy( started.elapsed().as_millis() as u64 ),
      None => HealthReport::unhealthy( 0, "provider not initialized" ),
    }
  }

  async fn shutdown( &self ) -> GatewayResult< () >
  {
    if let Some( pool ) = &self.pool
    {
      pool.shutdown().await;
    }
    Ok( () )
  }
}

//! Runner backends and the warm-pool factory
//!
//! A backend knows how to load a manifest into a live session; the factory
//! resolves `( manifest, backend )` keys for the engine warm pool; the
//! [`LocalRunner`] wraps a session with the runner state machine and an
//! exclusive-borrow lock around the forward pass.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::{ Mutex, RwLock };
use gateway_engine::
{
  GatewayError,
  GatewayResult,
  ModelFormat,
  Runner,
  RunnerFactory,
  RunnerKey,
  RunnerState,
  SamplingConfig,
  Usage,
};
use crate::device::RunnerSettings;
use crate::manifest::ModelManifest;

/// A live model session produced by a backend
#[ async_trait::async_trait ]
pub trait RunnerSession : Send + Sync + std::fmt::Debug
{
  /// Run one forward pass over the prompt
  async fn generate( &self, prompt : &str, sampling : &SamplingConfig ) -> GatewayResult< ( String, Usage ) >;

  /// Release native and file resources
  async fn close( &self ) -> GatewayResult< () >;
}

/// Loads manifests into live sessions
#[ async_trait::async_trait ]
pub trait RunnerBackend : Send + Sync + std::fmt::Debug
{
  /// Backend name used in runner keys, e.g. `gguf-cpu`
  fn name( &self ) -> &str;

  /// Formats this backend can load
  fn supported_formats( &self ) -> Vec< ModelFormat >;

  /// Load a manifest into a session
  async fn load( &self, manifest : &ModelManifest, settings : &RunnerSettings ) -> GatewayResult< Box< dyn RunnerSession > >;
}

/// A pooled model instance bound to a device
///
/// The session lock makes the runner an exclusive borrow during a forward
/// pass; the state mirrors that as `Ready ↔ Busy`.
pub struct LocalRunner
{
  key : RunnerKey,
  state : Mutex< RunnerState >,
  session : tokio::sync::Mutex< Box< dyn RunnerSession > >,
}

impl std::fmt::Debug for LocalRunner
{
  fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    f.debug_struct( "LocalRunner" )
      .field( "key", &self.key )
      .field( "state", &*self.state.lock() )
      .finish_non_exhaustive()
  }
}

impl LocalRunner
{
  /// Wrap a freshly loaded session
  #[ must_use ]
  pub fn new( key : RunnerKey, session : Box< dyn RunnerSession > ) -> Self
  {
    Self
    {
      key,
      state : Mutex::new( RunnerState::Ready ),
      session : tokio::sync::Mutex::new( session ),
    }
  }

  /// Identity of this runner in the pool
  pub fn key( &self ) -> &RunnerKey
  {
    &self.key
  }

  /// Run one forward pass, claiming the runner exclusively
  ///
  /// # Errors
  ///
  /// `PROVIDER_UNAVAILABLE` once closed, or the session's failure.
  pub async fn generate( &self, prompt : &str, sampling : &SamplingConfig ) -> GatewayResult< ( String, Usage ) >
  {
    let session = self.session.lock().await;
    {
      let mut state = self.state.lock();
      if *state == RunnerState::Closed
      {
        return Err( GatewayError::provider_unavailable( format!( "runner '{}' is closed", self.key ) ) );
      }
      *state = RunnerState::Busy;
    }

    let outcome = session.generate( prompt, sampling ).await;

    {
      let mut state = self.state.lock();
      if *state == RunnerState::Busy
      {
        *state = RunnerState::Ready;
      }
    }
    outcome
  }
}

#[ async_trait::async_trait ]
impl Runner for LocalRunner
{
  fn state( &self ) -> RunnerState
  {
    *self.state.lock()
  }

  async fn close( &self ) -> GatewayResult< () >
  {
    // Wait for an in-flight forward pass before releasing resources.
    let session = self.session.lock().await;
    *self.state.lock() = RunnerState::Closed;
    session.close().await
  }
}

/// Resolves warm-pool keys to loaded runners
pub struct LocalRunnerFactory
{
  backends : HashMap< String, Arc< dyn RunnerBackend > >,
  manifests : Arc< RwLock< HashMap< String, ModelManifest > > >,
  settings : RunnerSettings,
}

impl std::fmt::Debug for LocalRunnerFactory
{
  fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    f.debug_struct( "LocalRunnerFactory" )
      .field( "backends", &self.backends.keys().collect::< Vec< _ > >() )
      .field( "settings", &self.settings )
      .finish_non_exhaustive()
  }
}

impl LocalRunnerFactory
{
  /// Create a factory over shared manifests
  #[ must_use ]
  pub fn new
  (
    backends : HashMap< String, Arc< dyn RunnerBackend > >,
    manifests : Arc< RwLock< HashMap< String, ModelManifest > > >,
    settings : RunnerSettings,
  ) -> Self
  {
    Self { backends, manifests, settings }
  }
}

#[ async_trait::async_trait ]
impl RunnerFactory< LocalRunner > for LocalRunnerFactory
{
  async fn load( &self, key : &RunnerKey ) -> GatewayResult< Arc< LocalRunner > >
  {
    let manifest = self.manifests.read().get( &key.manifest_id ).cloned()
      .ok_or_else( || GatewayError::invalid_argument( format!( "no manifest registered for '{}'", key.manifest_id ) ) )?;
    let backend = self.backends.get( &key.runner_name )
      .ok_or_else( || GatewayError::invalid_argument( format!( "no backend named '{}'", key.runner_name ) ) )?;

    if !backend.supported_formats().contains( &manifest.format )
    {
      return Err( GatewayError::invalid_argument
      (
        format!( "backend '{}' cannot load {:?} artifacts", backend.name(), manifest.format )
      ) );
    }

    let session = backend.load( &manifest, &self.settings ).await?;
    Ok( Arc::new( LocalRunner::new( key.clone(), session ) ) )
  }
}

/// Deterministic reference backend
///
/// Produces a canned completion derived from the prompt tail : enough to
/// exercise the pool, the provider and the streaming path without model
/// weights. Accepts every format and never touches the artifact beyond the
/// manifest checksum verification.
#[ derive( Debug, Default ) ]
pub struct TemplateBackend
{
  verify_checksums : bool,
}

impl TemplateBackend
{
  /// Create the backend without checksum verification
  #[ must_use ]
  pub fn new() -> Self
  {
    Self::default()
  }

  /// Verify manifest checksums at load time
  #[ must_use ]
  pub fn with_checksum_verification( mut self ) -> Self
  {
    self.verify_checksums = true;
    self
  }
}

/// Session of the [`TemplateBackend`]
#[ derive( Debug ) ]
pub struct TemplateSession
{
  model_id : String,
}

#[ async_trait::async_trait ]
impl RunnerSession for TemplateSession
{
  async fn generate( &self, prompt : &str, sampling : &SamplingConfig ) -> GatewayResult< ( String, Usage ) >
  {
    let tail : String = prompt.lines().last().unwrap_or( "" ).chars().take( 120 ).collect();
    let mut text = format!( "[{}] {}", self.model_id, tail );

    // Honor stop tokens and the output budget the way a real decoder would.
    for stop in &sampling.stop_tokens
    {
      if let Some( position ) = text.find( stop.as_str() )
      {
        text.truncate( position );
      }
    }
    let words : Vec< &str > = text.split_whitespace().collect();
    let budget = sampling.max_tokens as usize;
    let output : Vec< &str > = words.into_iter().take( budget ).collect();
    let text = output.join( " " );

    let usage = Usage
    {
      input_tokens : prompt.split_whitespace().count() as u64,
      output_tokens : output.len() as u64,
    };
    Ok( ( text, usage ) )
  }

  async fn close( &self ) -> GatewayResult< () >
  {
    Ok( () )
  }
}

#[ async_trait::async_trait ]
impl RunnerBackend for TemplateBackend
{
  fn name( &self ) -> &str
  {
    "template"
  }

  fn supported_formats( &self ) -> Vec< ModelFormat >
  {
    vec![ ModelFormat::Gguf, ModelFormat::Onnx, ModelFormat::Torch, ModelFormat::Safetensors ]
  }

  async fn load( &self, manifest : &ModelManifest, settings : &RunnerSettings ) -> GatewayResult< Box< dyn RunnerSession > >
  {
    if self.verify_checksums
    {
      manifest.verify( &settings.base_path )?;
    }
    Ok( Box::new( TemplateSession { model_id : manifest.model_id.clone() } ) )
  }
}

//! Model manifests
//!
//! A manifest pins one loadable artifact : model id, version, on-disk
//! format, path and a sha256 checksum. Runner keys derive from the manifest
//! identity, so two versions of a model never share a pooled instance.

use std::path::{ Path, PathBuf };
use serde::{ Serialize, Deserialize };
use sha2::{ Digest, Sha256 };
use gateway_engine::{ GatewayError, GatewayResult, ModelFormat, RunnerKey };

/// Identity and integrity of one local model artifact
#[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
pub struct ModelManifest
{
  /// Model identifier requests name
  pub model_id : String,
  /// Version label
  pub version : String,
  /// On-disk format
  pub format : ModelFormat,
  /// Artifact path, resolved against the provider base path when relative
  pub path : PathBuf,
  /// `sha256:<hex>` content checksum
  pub checksum : String,
  /// Artifact size in bytes
  pub size_bytes : u64,
}

impl ModelManifest
{
  /// Manifest identity used in runner keys, `model_id@version`
  #[ must_use ]
  pub fn manifest_id( &self ) -> String
  {
    format!( "{}@{}", self.model_id, self.version )
  }

  /// Runner key for this manifest under the named backend
  #[ must_use ]
  pub fn runner_key( &self, runner_name : &str ) -> RunnerKey
  {
    RunnerKey::new( self.manifest_id(), runner_name )
  }

  /// Build a manifest by hashing the artifact on disk
  ///
  /// # Errors
  ///
  /// Returns `INVALID_ARGUMENT` when the file cannot be read.
  pub fn inspect
  (
    model_id : impl Into< String >,
    version : impl Into< String >,
    format : ModelFormat,
    path : impl Into< PathBuf >,
  ) -> GatewayResult< Self >
  {
    let path = path.into();
    let bytes = std::fs::read( &path )
      .map_err( | e | GatewayError::invalid_argument( format!( "cannot read model artifact {} : {e}", path.display() ) ) )?;
    let digest = Sha256::digest( &bytes );
    Ok( Self
    {
      model_id : model_id.into(),
      version : version.into(),
      format,
      checksum : format!( "sha256:{digest:x}" ),
      size_bytes : bytes.len() as u64,
      path,
    } )
  }

  /// Re-hash the artifact and compare against the recorded checksum
  ///
  /// # Errors
  ///
  /// `INVALID_ARGUMENT` when the file cannot be read, `PROVIDER_PERMANENT`
  /// when the content does not match : a corrupt artifact will not load
  /// correctly on any attempt.
  pub fn verify( &self, base_path : &Path ) -> GatewayResult< () >
  {
    let resolved = self.resolved_path( base_path );
    let bytes = std::fs::read( &resolved )
      .map_err( | e | GatewayError::invalid_argument( format!( "cannot read model artifact {} : {e}", resolved.display() ) ) )?;
    let digest = Sha256::digest( &bytes );
    let actual = format!( "sha256:{digest:x}" );
    if actual != self.checksum
    {
      return Err( GatewayError::provider_permanent
      (
        format!( "checksum mismatch for {} : manifest {}, artifact {}", self.manifest_id(), self.checksum, actual )
      ) );
    }
    Ok( () )
  }

  /// The artifact path resolved against the provider base path
  #[ must_use ]
  pub fn resolved_path( &self, base_path : &Path ) -> PathBuf
  {
    if self.path.is_absolute()
    {
      self.path.clone()
    }
    else
    {
      base_path.join( &self.path )
    }
  }
}

//! Model registry entry contract
//!
//! The persistent model registry lives outside the engine; this layer fixes
//! the record shape and the storage URI layout so every backend agrees:
//! `{prefix}/{tenant}/{model}/{version}` under a `file://`, `s3://` or
//! `gs://` root, with the tenant id sanitized to `[A-Za-z0-9_-]`.

#[ cfg( feature = "model-store" ) ]
mod private
{
  use serde::{ Serialize, Deserialize };
  use crate::error::{ GatewayError, GatewayResult };

  /// On-disk model format
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum ModelFormat
  {
    /// Quantized GGUF single file
    Gguf,
    /// ONNX graph
    Onnx,
    /// PyTorch checkpoint
    Torch,
    /// Safetensors weights
    Safetensors,
  }

  /// One version of a model owned by a tenant
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct ModelEntry
  {
    /// Model identifier
    pub model_id : String,
    /// Version label
    pub version : String,
    /// Owning tenant
    pub tenant_id : String,
    /// Stored format
    pub format : ModelFormat,
    /// Where the artifact lives
    pub storage_uri : String,
    /// Content checksum, `sha256:<hex>`
    pub checksum : String,
    /// Artifact size in bytes
    pub size_bytes : u64,
    /// Creation timestamp, epoch milliseconds
    pub created_at_ms : i64,
    /// Last update timestamp, epoch milliseconds
    pub updated_at_ms : i64,
  }

  /// Replace every character outside `[A-Za-z0-9_-]`
  ///
  /// Applied to tenant ids before they become path components, so a tenant
  /// name can never escape its prefix.
  #[ must_use ]
  pub fn sanitize_tenant( tenant_id : &str ) -> String
  {
    tenant_id.chars()
      .map( | c | if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' } )
      .collect()
  }

  /// Supported storage URI schemes
  pub const STORAGE_SCHEMES : [ &str; 3 ] = [ "file://", "s3://", "gs://" ];

  /// Build the canonical storage URI for a model version
  ///
  /// # Errors
  ///
  /// Returns `INVALID_ARGUMENT` when the root does not carry a supported
  /// scheme or a component is empty.
  pub fn storage_uri( root : &str, prefix : &str, tenant_id : &str, model_id : &str, version : &str ) -> GatewayResult< String >
  {
    if !STORAGE_SCHEMES.iter().any( | scheme | root.starts_with( scheme ) )
    {
      return Err( GatewayError::invalid_argument
      (
        format!( "storage root '{root}' must use one of file://, s3://, gs://" )
      ) );
    }
    if model_id.is_empty() || version.is_empty() || tenant_id.is_empty()
    {
      return Err( GatewayError::invalid_argument( "storage uri components cannot be empty" ) );
    }
    let tenant = sanitize_tenant( tenant_id );
    let root = root.trim_end_matches( '/' );
    let uri = if prefix.is_empty()
    {
      format!( "{root}/{tenant}/{model_id}/{version}" )
    }
    else
    {
      let prefix = prefix.trim_matches( '/' );
      format!( "{root}/{prefix}/{tenant}/{model_id}/{version}" )
    };
    Ok( uri )
  }

  impl ModelEntry
  {
    /// Create an entry stamped now
    ///
    /// # Errors
    ///
    /// Propagates storage URI validation failures.
    pub fn new
    (
      model_id : impl Into< String >,
      version : impl Into< String >,
      tenant_id : impl Into< String >,
      format : ModelFormat,
      storage_root : &str,
      prefix : &str,
      checksum : impl Into< String >,
      size_bytes : u64,
    ) -> GatewayResult< Self >
    {
      let model_id = model_id.into();
      let version = version.into();
      let tenant_id = tenant_id.into();
      let storage_uri = storage_uri( storage_root, prefix, &tenant_id, &model_id, &version )?;
      let now_ms = chrono::Utc::now().timestamp_millis();
      Ok( Self
      {
        model_id,
        version,
        tenant_id,
        format,
        storage_uri,
        checksum : checksum.into(),
        size_bytes,
        created_at_ms : now_ms,
        updated_at_ms : now_ms,
      } )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn tenant_is_sanitized_into_the_path()
    {
      let uri = storage_uri( "s3://models", "prod", "acme/../etc", "m1", "v2" ).unwrap();
      assert_eq!( uri, "s3://models/prod/acme____etc/m1/v2" );
    }

    #[ test ]
    fn unknown_scheme_is_rejected()
    {
      assert!( storage_uri( "ftp://models", "", "t", "m", "v" ).is_err() );
    }
  }
}

#[ cfg( feature = "model-store" ) ]
crate::mod_interface!
{
  exposed use
  {
    ModelEntry,
    ModelFormat,
    STORAGE_SCHEMES,
    sanitize_tenant,
    storage_uri,
  };
}

#[ cfg( not( feature = "model-store" ) ) ]
mod private {}

#[ cfg( not( feature = "model-store" ) ) ]
crate::mod_interface!
{
}

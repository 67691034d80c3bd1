use super::*;

mod backend_test;
mod provider_test;

use std::io::Write;
use gateway_engine::ModelFormat;
use the_module::ModelManifest;

/// Write a fake artifact and return its manifest plus the temp dir guard
pub fn fake_artifact( model_id : &str, version : &str, content : &[ u8 ] ) -> ( tempfile::TempDir, ModelManifest )
{
  let dir = tempfile::tempdir().expect( "temp dir" );
  let path = dir.path().join( format!( "{model_id}.gguf" ) );
  let mut file = std::fs::File::create( &path ).expect( "artifact file" );
  file.write_all( content ).expect( "artifact bytes" );

  let manifest = ModelManifest::inspect( model_id, version, ModelFormat::Gguf, &path )
    .expect( "manifest" );
  ( dir, manifest )
}

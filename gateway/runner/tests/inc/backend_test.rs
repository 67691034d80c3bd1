//! Template backend and local runner tests

use super::*;
use gateway_engine::{ Runner, RunnerState, SamplingConfig };
use the_module::{ LocalRunner, RunnerBackend, RunnerSettings, TemplateBackend };

async fn loaded_runner( manifest : &the_module::ModelManifest ) -> LocalRunner
{
  let backend = TemplateBackend::new();
  let session = backend.load( manifest, &RunnerSettings::default() ).await.unwrap();
  LocalRunner::new( manifest.runner_key( backend.name() ), session )
}

#[ tokio::test ]
async fn generation_is_deterministic()
{
  let ( _dir, manifest ) = fake_artifact( "m-cpu", "v1", b"bytes" );
  let runner = loaded_runner( &manifest ).await;

  let sampling = SamplingConfig::default();
  let ( first, usage ) = runner.generate( "user: hi there", &sampling ).await.unwrap();
  let ( second, _ ) = runner.generate( "user: hi there", &sampling ).await.unwrap();

  assert_eq!( first, second );
  assert!( first.contains( "m-cpu" ) );
  assert!( usage.output_tokens > 0 );
  assert_eq!( usage.input_tokens, 3 );
}

#[ tokio::test ]
async fn stop_tokens_truncate_the_output()
{
  let ( _dir, manifest ) = fake_artifact( "m-cpu", "v1", b"bytes" );
  let runner = loaded_runner( &manifest ).await;

  let mut sampling = SamplingConfig::default();
  sampling.stop_tokens = vec![ "hi".to_string() ];
  let ( text, _usage ) = runner.generate( "user: hi there", &sampling ).await.unwrap();
  assert!( !text.contains( "hi" ) );
}

#[ tokio::test ]
async fn max_tokens_bound_the_output()
{
  let ( _dir, manifest ) = fake_artifact( "m-cpu", "v1", b"bytes" );
  let runner = loaded_runner( &manifest ).await;

  let mut sampling = SamplingConfig::default();
  sampling.max_tokens = 2;
  let ( text, usage ) = runner.generate( "user: one two three four five six", &sampling ).await.unwrap();
  assert_eq!( text.split_whitespace().count(), 2 );
  assert_eq!( usage.output_tokens, 2 );
}

#[ tokio::test ]
async fn closed_runners_refuse_work()
{
  let ( _dir, manifest ) = fake_artifact( "m-cpu", "v1", b"bytes" );
  let runner = loaded_runner( &manifest ).await;

  assert_eq!( runner.state(), RunnerState::Ready );
  runner.close().await.unwrap();
  assert_eq!( runner.state(), RunnerState::Closed );

  let error = runner.generate( "user: hi", &SamplingConfig::default() ).await.unwrap_err();
  assert_eq!( error.kind(), gateway_engine::ErrorKind::ProviderUnavailable );
}

#[ tokio::test ]
async fn checksum_verification_blocks_corrupted_loads()
{
  let ( dir, manifest ) = fake_artifact( "m-cpu", "v1", b"bytes" );
  std::fs::write( &manifest.path, b"tampered" ).unwrap();

  let backend = TemplateBackend::new().with_checksum_verification();
  let mut settings = RunnerSettings::default();
  settings.base_path = dir.path().to_path_buf();

  let error = backend.load( &manifest, &settings ).await.unwrap_err();
  assert_eq!( error.kind(), gateway_engine::ErrorKind::ProviderPermanent );
}

//! Devices and runner settings
//!
//! Parsed from the enumerated local provider config keys
//! `{ device, threads, base-path }`.

use std::path::PathBuf;
use serde::{ Serialize, Deserialize };
use gateway_engine::{ GatewayError, GatewayResult, ProviderConfig, config_str, config_u64 };

/// Compute device a runner binds to
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default ) ]
#[ serde( rename_all = "UPPERCASE" ) ]
pub enum Device
{
  /// Host CPU
  #[ default ]
  Cpu,
  /// NVIDIA GPU
  Cuda,
  /// Apple GPU
  Metal,
}

impl Device
{
  /// Parse the config spelling, case-insensitive
  ///
  /// # Errors
  ///
  /// Returns `INVALID_ARGUMENT` naming the unknown device.
  pub fn parse( value : &str ) -> GatewayResult< Self >
  {
    match value.to_ascii_uppercase().as_str()
    {
      "CPU" => Ok( Self::Cpu ),
      "CUDA" => Ok( Self::Cuda ),
      "METAL" => Ok( Self::Metal ),
      other => Err( GatewayError::invalid_argument( format!( "unknown device '{other}', expected CPU, CUDA or METAL" ) ) ),
    }
  }

  /// Stable uppercase name
  #[ must_use ]
  pub fn as_str( self ) -> &'static str
  {
    match self
    {
      Self::Cpu => "CPU",
      Self::Cuda => "CUDA",
      Self::Metal => "METAL",
    }
  }
}

impl std::fmt::Display for Device
{
  fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    write!( f, "{}", self.as_str() )
  }
}

/// Where and how local runners execute
#[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
pub struct RunnerSettings
{
  /// Compute device
  pub device : Device,
  /// Worker threads per runner
  pub threads : usize,
  /// Root directory for relative manifest paths
  pub base_path : PathBuf,
}

impl Default for RunnerSettings
{
  fn default() -> Self
  {
    Self
    {
      device : Device::Cpu,
      threads : 4,
      base_path : PathBuf::from( "." ),
    }
  }
}

impl RunnerSettings
{
  /// Parse the enumerated config keys, defaults for missing ones
  ///
  /// # Errors
  ///
  /// Returns `INVALID_ARGUMENT` for an unknown device or zero threads.
  pub fn from_config( config : &ProviderConfig ) -> GatewayResult< Self >
  {
    let mut settings = Self::default();
    if let Some( device ) = config_str( config, "device" )
    {
      settings.device = Device::parse( &device )?;
    }
    if let Some( threads ) = config_u64( config, "threads" )
    {
      if threads == 0
      {
        return Err( GatewayError::invalid_argument( "threads must be > 0" ) );
      }
      settings.threads = threads as usize;
    }
    if let Some( base_path ) = config_str( config, "base-path" )
    {
      settings.base_path = PathBuf::from( base_path );
    }
    Ok( settings )
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn device_parsing_is_case_insensitive()
  {
    assert_eq!( Device::parse( "cpu" ).unwrap(), Device::Cpu );
    assert_eq!( Device::parse( "Cuda" ).unwrap(), Device::Cuda );
    assert_eq!( Device::parse( "METAL" ).unwrap(), Device::Metal );
    assert!( Device::parse( "tpu" ).is_err() );
  }

  #[ test ]
  fn settings_parse_from_config_keys()
  {
    let mut config = ProviderConfig::new();
    config.insert( "device".to_string(), serde_json::json!( "CUDA" ) );
    config.insert( "threads".to_string(), serde_json::json!( 8 ) );
    config.insert( "base-path".to_string(), serde_json::json!( "/models" ) );

    let settings = RunnerSettings::from_config( &config ).unwrap();
    assert_eq!( settings.device, Device::Cuda );
    assert_eq!( settings.threads, 8 );
    assert_eq!( settings.base_path, PathBuf::from( "/models" ) );
  }
}

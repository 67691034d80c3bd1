#![ doc( html_root_url = "https://docs.rs/gateway_runner/latest/gateway_runner/" ) ]
#![ cfg_attr( doc, doc = include_str!( concat!( env!( "CARGO_MANIFEST_DIR" ), "/", "readme.md" ) ) ) ]

// Strategic clippy configuration for the local runner crate
#![allow(clippy::missing_inline_in_public_items)]
#![allow(clippy::std_instead_of_core)]
#![allow(clippy::must_use_candidate)]

//! Local runner provider
//!
//! Runs models on the gateway host. A [`manifest::ModelManifest`] names the
//! artifact, a [`device::RunnerSettings`] names where it runs, a
//! [`backend::RunnerBackend`] knows how to load it, and the engine's warm
//! pool owns the loaded instance. The [`provider::LocalProvider`] glues
//! these behind the provider SPI.

/// Model manifests : artifact identity, checksums, verification
pub mod manifest;

/// Devices and runner settings parsed from provider config
pub mod device;

/// Runner backends, sessions and the warm-pool factory
pub mod backend;

/// The provider SPI implementation over the warm pool
pub mod provider;

pub use backend::{ LocalRunner, LocalRunnerFactory, RunnerBackend, RunnerSession, TemplateBackend };
pub use device::{ Device, RunnerSettings };
pub use manifest::ModelManifest;
pub use provider::LocalProvider;

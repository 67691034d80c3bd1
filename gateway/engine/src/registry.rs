//! Process-wide provider catalogue
//!
//! Readers proceed concurrently; register/unregister take the write lock.
//! Lookups hand out `Arc` references, so an active request keeps its provider
//! alive across a concurrent unregister.

mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;
  use parking_lot::RwLock;
  use crate::adapter::ProviderAdapter;
  use crate::context::TenantContext;
  use crate::error::{ GatewayError, GatewayResult };
  use crate::provider::ProviderCapabilities;

  /// Catalogue of registered provider adapters
  #[ derive( Debug, Default ) ]
  pub struct ProviderRegistry
  {
    entries : RwLock< HashMap< String, Arc< ProviderAdapter > > >,
  }

  impl ProviderRegistry
  {
    /// Create an empty registry
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Add an adapter under its provider id
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` if the id is already registered.
    pub fn register( &self, adapter : Arc< ProviderAdapter > ) -> GatewayResult< () >
    {
      let id = adapter.id().to_string();
      let mut entries = self.entries.write();
      if entries.contains_key( &id )
      {
        return Err( GatewayError::invalid_argument( format!( "provider '{id}' is already registered" ) ) );
      }
      entries.insert( id, adapter );
      Ok( () )
    }

    /// Remove an adapter, returning it for shutdown
    ///
    /// Requests already holding the adapter are unaffected until they finish.
    pub fn unregister( &self, provider_id : &str ) -> Option< Arc< ProviderAdapter > >
    {
      self.entries.write().remove( provider_id )
    }

    /// Look up an adapter by provider id
    pub fn get( &self, provider_id : &str ) -> Option< Arc< ProviderAdapter > >
    {
      self.entries.read().get( provider_id ).cloned()
    }

    /// Registered provider ids, sorted for determinism
    pub fn ids( &self ) -> Vec< String >
    {
      let mut ids : Vec< String > = self.entries.read().keys().cloned().collect();
      ids.sort();
      ids
    }

    /// Snapshot of all adapters, ordered by provider id
    pub fn all( &self ) -> Vec< Arc< ProviderAdapter > >
    {
      let entries = self.entries.read();
      let mut adapters : Vec< Arc< ProviderAdapter > > = entries.values().cloned().collect();
      adapters.sort_by( | a, b | a.id().cmp( b.id() ) );
      adapters
    }

    /// Adapters whose capabilities satisfy `predicate`, ordered by id
    pub fn with_capability( &self, predicate : impl Fn( &ProviderCapabilities ) -> bool ) -> Vec< Arc< ProviderAdapter > >
    {
      self.all().into_iter()
        .filter( | adapter | predicate( &adapter.capabilities() ) )
        .collect()
    }

    /// Adapters claiming support for `model_id` under `tenant`, ordered by id
    pub fn candidates_for( &self, model_id : &str, tenant : &TenantContext ) -> Vec< Arc< ProviderAdapter > >
    {
      self.all().into_iter()
        .filter( | adapter | adapter.supports( model_id, tenant ) )
        .collect()
    }

    /// Number of registered providers
    pub fn len( &self ) -> usize
    {
      self.entries.read().len()
    }

    /// Whether the registry is empty
    pub fn is_empty( &self ) -> bool
    {
      self.entries.read().is_empty()
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ProviderRegistry,
  };
}

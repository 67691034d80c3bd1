//! Provider registry tests

use super::*;
use the_module::{ ProviderAdapter, ProviderRegistry, InMemoryQuotaService, CircuitBreakerConfig };

fn adapter_for( provider : MockProvider ) -> Arc< ProviderAdapter >
{
  let quota = Arc::new( InMemoryQuotaService::new( the_module::QuotaWindowConfig::default() ) );
  Arc::new( ProviderAdapter::new
  (
    Arc::new( provider ),
    quota,
    CircuitBreakerConfig::default(),
    1000,
  ) )
}

#[ test ]
fn duplicate_registration_is_rejected()
{
  let registry = ProviderRegistry::new();
  registry.register( adapter_for( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();
  let error = registry.register( adapter_for( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap_err();
  assert_eq!( error.kind(), the_module::ErrorKind::InvalidArgument );
  assert_eq!( registry.len(), 1 );
}

#[ test ]
fn unregister_leaves_existing_references_alive()
{
  let registry = ProviderRegistry::new();
  registry.register( adapter_for( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let held = registry.get( "pA" ).unwrap();
  let removed = registry.unregister( "pA" ).unwrap();
  assert!( registry.get( "pA" ).is_none() );

  // Both references still answer; the adapter only dies when dropped.
  assert_eq!( held.id(), "pA" );
  assert_eq!( removed.id(), "pA" );
}

#[ test ]
fn candidates_are_ordered_by_id()
{
  let registry = ProviderRegistry::new();
  registry.register( adapter_for( MockProvider::new( "pB", &[ "m" ] ) ) ).unwrap();
  registry.register( adapter_for( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();
  registry.register( adapter_for( MockProvider::new( "pC", &[ "other" ] ) ) ).unwrap();

  let candidates = registry.candidates_for( "m", &tenant() );
  let ids : Vec< &str > = candidates.iter().map( | adapter | adapter.id() ).collect();
  assert_eq!( ids, vec![ "pA", "pB" ] );
}

#[ test ]
fn capability_filter_selects_streaming_providers()
{
  let registry = ProviderRegistry::new();
  registry.register( adapter_for( MockProvider::new( "pA", &[ "m" ] ) ) ).unwrap();

  let streaming = registry.with_capability( | caps | caps.streaming );
  assert_eq!( streaming.len(), 1 );
  let embeddings = registry.with_capability( | caps | caps.embeddings );
  assert!( embeddings.is_empty() );
}

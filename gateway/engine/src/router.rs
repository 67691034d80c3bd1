//! Provider routing
//!
//! Picks a provider for `(model, tenant, request)`. Routing never fails on
//! "no provider": the decision carries `provider_id = None` and the EXECUTE
//! phase surfaces `PROVIDER_UNAVAILABLE`. Selection is deterministic: given
//! the same registry snapshot and inputs, the same provider wins (score
//! ties break on lexicographic provider id).

mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;
  use serde::{ Serialize, Deserialize };
  use crate::adapter::ProviderAdapter;
  use crate::context::TenantContext;
  use crate::error::{ GatewayError, GatewayResult };
  use crate::registry::ProviderRegistry;
  use crate::request::Priority;

  /// Relative importance of the scoring components; must sum to 1
  #[ derive( Debug, Clone, Copy, PartialEq, Serialize, Deserialize ) ]
  pub struct RouterWeights
  {
    /// Output quality
    pub performance : f64,
    /// Inverted normalized cost
    pub cost : f64,
    /// Inverted normalized latency
    pub latency : f64,
    /// Observed success ratio
    pub reliability : f64,
  }

  impl Default for RouterWeights
  {
    fn default() -> Self
    {
      Self
      {
        performance : 0.4,
        cost : 0.2,
        latency : 0.2,
        reliability : 0.2,
      }
    }
  }

  /// Normalization bounds for raw profile values; values outside clamp
  #[ derive( Debug, Clone, Copy, PartialEq, Serialize, Deserialize ) ]
  pub struct RouterBounds
  {
    /// Cost per thousand tokens mapping to a normalized 1.0
    pub max_cost_per_1k_tokens : f64,
    /// Latency mapping to a normalized 1.0 (milliseconds)
    pub max_latency_ms : u64,
  }

  impl Default for RouterBounds
  {
    fn default() -> Self
    {
      Self
      {
        max_cost_per_1k_tokens : 10.0,
        max_latency_ms : 10_000,
      }
    }
  }

  /// A model-prefix fallback rule consulted when no provider matches exactly
  #[ derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize ) ]
  pub struct PrefixRule
  {
    /// Model id prefix, e.g. `gpt-` or `claude-`
    pub prefix : String,
    /// Provider that serves the class
    pub provider_id : String,
  }

  /// Router configuration
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize, Default ) ]
  pub struct RouterConfig
  {
    /// Scoring weights
    pub weights : RouterWeights,
    /// Normalization bounds
    pub bounds : RouterBounds,
    /// Known model-prefix classes
    pub prefix_rules : Vec< PrefixRule >,
    /// Per-tenant score multipliers keyed `tenant -> provider -> factor`
    pub tenant_preferences : HashMap< String, HashMap< String, f64 > >,
  }

  impl RouterConfig
  {
    /// Validate weights sum and bounds
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` when weights do not sum to 1 or a bound is
    /// not positive.
    pub fn validate( &self ) -> GatewayResult< () >
    {
      let sum = self.weights.performance + self.weights.cost + self.weights.latency + self.weights.reliability;
      if ( sum - 1.0 ).abs() > 1e-6
      {
        return Err( GatewayError::invalid_argument( format!( "router weights must sum to 1, got {sum}" ) ) );
      }
      for weight in [ self.weights.performance, self.weights.cost, self.weights.latency, self.weights.reliability ]
      {
        if !( 0.0..=1.0 ).contains( &weight )
        {
          return Err( GatewayError::invalid_argument( "router weights must lie in [0, 1]" ) );
        }
      }
      if self.bounds.max_cost_per_1k_tokens <= 0.0 || self.bounds.max_latency_ms == 0
      {
        return Err( GatewayError::invalid_argument( "router bounds must be positive" ) );
      }
      Ok( () )
    }
  }

  /// Caller preference hint shifting the scoring weights
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum RoutePreference
  {
    /// Favor cheaper providers
    Cost,
    /// Favor faster providers
    Latency,
  }

  /// Optional context hints for a routing decision
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default ) ]
  pub struct RouteHints
  {
    /// Scheduling priority of the request
    pub priority : Priority,
    /// Request size in characters, for diagnostics
    pub request_size : usize,
    /// Cost/latency preference
    pub preference : Option< RoutePreference >,
  }

  /// The outcome of routing one request
  #[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
  pub struct RoutingDecision
  {
    /// Model the request asked for
    pub model_id : String,
    /// Chosen provider; `None` iff no candidate survived filtering
    pub provider_id : Option< String >,
    /// Request the decision belongs to
    pub request_id : String,
    /// Winning score in [0, 1]; 0 when no provider was chosen
    pub score : f64,
    /// Providers that supported the model before filtering, ordered by id
    pub candidates : Vec< String >,
    /// Decision timestamp, epoch milliseconds
    pub timestamp_ms : i64,
    /// Rationale details (filter counts, applied preference)
    pub metadata : HashMap< String, String >,
  }

  /// Scores providers and picks one per request
  #[ derive( Debug, Clone, Default ) ]
  pub struct Router
  {
    config : RouterConfig,
  }

  impl Router
  {
    /// Create a router with the given configuration
    #[ must_use ]
    pub fn new( config : RouterConfig ) -> Self
    {
      Self { config }
    }

    fn effective_weights( &self, hints : &RouteHints ) -> RouterWeights
    {
      let mut weights = self.config.weights;
      match hints.preference
      {
        Some( RoutePreference::Cost ) => weights.cost += 0.25,
        Some( RoutePreference::Latency ) => weights.latency += 0.25,
        None => return weights,
      }
      let sum = weights.performance + weights.cost + weights.latency + weights.reliability;
      weights.performance /= sum;
      weights.cost /= sum;
      weights.latency /= sum;
      weights.reliability /= sum;
      weights
    }

    fn score( &self, adapter : &ProviderAdapter, weights : &RouterWeights ) -> f64
    {
      let profile = adapter.profile();
      let performance = profile.performance.clamp( 0.0, 1.0 );
      let cost_norm = ( profile.cost_per_1k_tokens / self.config.bounds.max_cost_per_1k_tokens ).clamp( 0.0, 1.0 );
      let latency_norm = ( profile.expected_latency_ms as f64 / self.config.bounds.max_latency_ms as f64 ).clamp( 0.0, 1.0 );
      let reliability = adapter.reliability().clamp( 0.0, 1.0 );

      weights.performance * performance
        + weights.cost * ( 1.0 - cost_norm )
        + weights.latency * ( 1.0 - latency_norm )
        + weights.reliability * reliability
    }

    fn preference_factor( &self, tenant_id : &str, provider_id : &str ) -> f64
    {
      self.config.tenant_preferences
        .get( tenant_id )
        .and_then( | providers | providers.get( provider_id ) )
        .copied()
        .unwrap_or( 1.0 )
    }

    /// Candidates supporting the model : exact support first, then prefix rules
    fn candidates
    (
      &self,
      registry : &ProviderRegistry,
      model_id : &str,
      tenant : &TenantContext,
    ) -> Vec< Arc< ProviderAdapter > >
    {
      let direct = registry.candidates_for( model_id, tenant );
      if !direct.is_empty()
      {
        return direct;
      }
      let mut matched = Vec::new();
      for rule in &self.config.prefix_rules
      {
        if model_id.starts_with( &rule.prefix )
        {
          if let Some( adapter ) = registry.get( &rule.provider_id )
          {
            matched.push( adapter );
          }
        }
      }
      matched.sort_by( | a, b | a.id().cmp( b.id() ) );
      matched.dedup_by( | a, b | a.id() == b.id() );
      matched
    }

    /// Pick a provider for the request
    ///
    /// Filters candidates whose breaker rejects calls, whose quota window is
    /// exhausted for the tenant or whose last health sample was unhealthy,
    /// then scores the survivors.
    pub async fn select
    (
      &self,
      registry : &ProviderRegistry,
      model_id : &str,
      tenant : &TenantContext,
      request_id : &str,
      hints : &RouteHints,
    ) -> RoutingDecision
    {
      let candidates = self.candidates( registry, model_id, tenant );
      let candidate_ids : Vec< String > = candidates.iter().map( | adapter | adapter.id().to_string() ).collect();
      let mut metadata = HashMap::new();
      let mut filtered_breaker = 0usize;
      let mut filtered_quota = 0usize;
      let mut filtered_health = 0usize;

      let mut survivors = Vec::new();
      for adapter in candidates
      {
        if !adapter.breaker_permits()
        {
          filtered_breaker += 1;
          continue;
        }
        if !adapter.health().is_routable()
        {
          filtered_health += 1;
          continue;
        }
        match adapter.quota_remaining( &tenant.tenant_id ).await
        {
          Ok( 0 ) =>
          {
            filtered_quota += 1;
            continue;
          },
          Ok( _remaining ) => {},
          // An unreadable quota counter must not take the provider out.
          Err( _error ) => {},
        }
        survivors.push( adapter );
      }

      metadata.insert( "filtered.breaker".to_string(), filtered_breaker.to_string() );
      metadata.insert( "filtered.quota".to_string(), filtered_quota.to_string() );
      metadata.insert( "filtered.health".to_string(), filtered_health.to_string() );
      if let Some( preference ) = hints.preference
      {
        metadata.insert( "preference".to_string(), format!( "{preference:?}" ).to_lowercase() );
      }

      let weights = self.effective_weights( hints );
      let mut best : Option< ( f64, Arc< ProviderAdapter > ) > = None;
      for adapter in survivors
      {
        let raw = self.score( &adapter, &weights );
        let scored = ( raw * self.preference_factor( &tenant.tenant_id, adapter.id() ) ).clamp( 0.0, 1.0 );
        let better = match &best
        {
          None => true,
          Some( ( best_score, best_adapter ) ) =>
          {
            scored > *best_score
              || ( ( scored - *best_score ).abs() < f64::EPSILON && adapter.id() < best_adapter.id() )
          },
        };
        if better
        {
          best = Some( ( scored, adapter ) );
        }
      }

      match best
      {
        Some( ( score, adapter ) ) => RoutingDecision
        {
          model_id : model_id.to_string(),
          provider_id : Some( adapter.id().to_string() ),
          request_id : request_id.to_string(),
          score,
          candidates : candidate_ids,
          timestamp_ms : chrono::Utc::now().timestamp_millis(),
          metadata,
        },
        None => RoutingDecision
        {
          model_id : model_id.to_string(),
          provider_id : None,
          request_id : request_id.to_string(),
          score : 0.0,
          candidates : candidate_ids,
          timestamp_ms : chrono::Utc::now().timestamp_millis(),
          metadata,
        },
      }
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    PrefixRule,
    RouteHints,
    RoutePreference,
    Router,
    RouterBounds,
    RouterConfig,
    RouterWeights,
    RoutingDecision,
  };
}

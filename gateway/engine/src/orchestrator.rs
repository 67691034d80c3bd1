//! Request orchestration
//!
//! Single entry point of the control plane: `infer` and `stream` drive a
//! request through the phased pipeline, enforce the deadline, retry the
//! EXECUTE phase on retryable failures and guarantee CLEANUP on every path.
//! The built-in ROUTE and EXECUTE plugins live here too: ROUTE stores a
//! routing decision, EXECUTE resolves it to an adapter and calls through.

mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;
  use std::time::{ Duration, Instant };
  use parking_lot::Mutex;
  use tokio_util::sync::CancellationToken;
  use crate::context::
  {
    ExecutionContext,
    TenantContext,
    VAR_EXECUTE_RESPONSE,
    VAR_INJECTED_MESSAGES,
    VAR_ROUTING_DECISION,
    VAR_SAMPLING_CONFIG,
  };
  use crate::engine::EngineContext;
  use crate::error::{ ErrorKind, GatewayError, GatewayResult };
  use crate::phase::{ Phase, PhasePlugin };
  use crate::pipeline::{ PhasePipeline, PhasePipelineBuilder };
  use crate::request::{ ChatMessage, InferenceRequest, InferenceResponse };
  use crate::retry::BackoffSchedule;
  use crate::router::RouteHints;
  use crate::sampling::SamplingConfig;

  #[ cfg( feature = "streaming" ) ]
  use futures_util::StreamExt;
  #[ cfg( feature = "streaming" ) ]
  use crate::adapter::StreamSettlement;
  #[ cfg( feature = "streaming" ) ]
  use crate::provider::{ ProviderEvent, ProviderEventStream };
  #[ cfg( feature = "streaming" ) ]
  use crate::streaming::{ ChunkEmitter, ChunkStream, chunk_channel };
  #[ cfg( feature = "observability" ) ]
  use crate::observability::labeled;
  #[ cfg( feature = "logging" ) ]
  use tracing::{ debug, warn };

  /// Built-in ROUTE plugin : consults the router and stores the decision
  #[ derive( Debug, Default ) ]
  pub struct RoutePlugin;

  #[ async_trait::async_trait ]
  impl PhasePlugin for RoutePlugin
  {
    fn id( &self ) -> &str
    {
      "route"
    }

    fn phase( &self ) -> Phase
    {
      Phase::Route
    }

    async fn execute( &self, ctx : &mut ExecutionContext, engine : &EngineContext ) -> GatewayResult< () >
    {
      let request = ctx.request();
      let hints = RouteHints
      {
        priority : request.priority,
        request_size : request.content_len(),
        preference : None,
      };
      let decision = engine.router().select
      (
        engine.registry(),
        &request.model_id,
        ctx.tenant(),
        &request.request_id,
        &hints,
      ).await;

      #[ cfg( feature = "observability" ) ]
      if let Some( provider_id ) = &decision.provider_id
      {
        engine.metrics().increment( labeled( "router.selected", "provider_id", provider_id ) );
      }
      #[ cfg( feature = "logging" ) ]
      debug!
      (
        request_id = %decision.request_id,
        provider = decision.provider_id.as_deref().unwrap_or( "<none>" ),
        score = decision.score,
        "routing decision"
      );

      if let Some( provider_id ) = &decision.provider_id
      {
        ctx.set_metadata( "routing.provider", provider_id.clone() );
      }
      ctx.set_variable( VAR_ROUTING_DECISION, &decision )
    }
  }

  /// Built-in EXECUTE plugin : resolves the decision and calls the adapter
  #[ derive( Debug, Default ) ]
  pub struct ExecutePlugin;

  #[ async_trait::async_trait ]
  impl PhasePlugin for ExecutePlugin
  {
    fn id( &self ) -> &str
    {
      "execute"
    }

    fn phase( &self ) -> Phase
    {
      Phase::Execute
    }

    async fn execute( &self, ctx : &mut ExecutionContext, engine : &EngineContext ) -> GatewayResult< () >
    {
      let ( adapter, request, sampling ) = resolve_execution( ctx, engine )?;

      // The call runs in its own task so that quota and breaker accounting
      // settle even when this request stops waiting at its deadline.
      let budget = ctx.remaining_budget().unwrap_or( Duration::from_millis( engine.config().provider_call_timeout_ms ) );
      let handle = tokio::spawn( async move
      {
        adapter.infer( &request, &sampling ).await
      } );

      let response = match tokio::time::timeout( budget, handle ).await
      {
        Ok( Ok( outcome ) ) => outcome?,
        Ok( Err( join_error ) ) =>
          return Err( GatewayError::internal( format!( "execute task failed : {join_error}" ) ) ),
        Err( _elapsed ) =>
          return Err( GatewayError::deadline_exceeded( "request deadline elapsed during provider call" ) ),
      };

      let response = InferenceResponse
      {
        request_id : ctx.request().request_id.clone(),
        model : response.model,
        content : response.content,
        tool_calls : Vec::new(),
        usage : response.usage,
        duration_ms : 0,
        metadata : HashMap::new(),
      };
      ctx.set_variable( VAR_EXECUTE_RESPONSE, &response )
    }
  }

  /// Resolve the routing decision into an adapter plus the effective call
  fn resolve_execution( ctx : &ExecutionContext, engine : &EngineContext )
    -> GatewayResult< ( Arc< crate::adapter::ProviderAdapter >, InferenceRequest, SamplingConfig ) >
  {
    let decision : crate::router::RoutingDecision = ctx.variable( VAR_ROUTING_DECISION )
      .ok_or_else( || GatewayError::internal( "EXECUTE reached without a routing decision" ) )?;
    let provider_id = decision.provider_id
      .ok_or_else( || GatewayError::provider_unavailable
      (
        format!( "no provider passed routing for model '{}'", ctx.request().model_id )
      ).with_request( &ctx.request().request_id ) )?;
    let adapter = engine.registry().get( &provider_id )
      .ok_or_else( || GatewayError::provider_unavailable
      (
        format!( "provider '{provider_id}' disappeared after routing" )
      ) )?;
    let sampling : SamplingConfig = ctx.variable( VAR_SAMPLING_CONFIG ).unwrap_or_default();
    Ok( ( adapter, effective_request( ctx ), sampling ) )
  }

  /// The request as sent to the provider : memory-injected context prepended
  fn effective_request( ctx : &ExecutionContext ) -> InferenceRequest
  {
    let mut request = ctx.request().clone();
    if let Some( injected ) = ctx.variable::< Vec< ChatMessage > >( VAR_INJECTED_MESSAGES )
    {
      if !injected.is_empty()
      {
        let mut messages = injected;
        messages.extend( request.messages );
        request.messages = messages;
      }
    }
    request
  }

  #[ cfg( feature = "streaming" ) ]
  enum StreamOutcome
  {
    Completed( crate::request::Usage ),
    Failed( GatewayError ),
    Cancelled,
  }

  /// Drives requests through the pipeline
  #[ derive( Debug, Clone ) ]
  pub struct Orchestrator
  {
    engine : Arc< EngineContext >,
    pipeline : Arc< PhasePipeline >,
    inflight : Arc< Mutex< HashMap< String, Instant > > >,
  }

  impl Orchestrator
  {
    /// Create an orchestrator with the built-in ROUTE and EXECUTE plugins only
    #[ must_use ]
    pub fn new( engine : Arc< EngineContext > ) -> Self
    {
      let pipeline = Self::default_pipeline().build();
      Self::with_pipeline( engine, pipeline )
    }

    /// Create an orchestrator over a custom pipeline
    ///
    /// Use [`Self::default_pipeline`] as the starting point so the built-in
    /// ROUTE and EXECUTE plugins stay registered.
    #[ must_use ]
    pub fn with_pipeline( engine : Arc< EngineContext >, pipeline : PhasePipeline ) -> Self
    {
      Self
      {
        engine,
        pipeline : Arc::new( pipeline ),
        inflight : Arc::new( Mutex::new( HashMap::new() ) ),
      }
    }

    /// Pipeline builder pre-loaded with the built-in plugins
    #[ must_use ]
    pub fn default_pipeline() -> PhasePipelineBuilder
    {
      PhasePipeline::builder()
        .plugin( Arc::new( RoutePlugin ) )
        .plugin( Arc::new( ExecutePlugin ) )
    }

    /// Engine handle
    pub fn engine( &self ) -> &Arc< EngineContext >
    {
      &self.engine
    }

    fn effective_deadline( &self, request : &InferenceRequest ) -> Duration
    {
      let config = self.engine.config();
      let requested = request.deadline_ms.unwrap_or( config.default_deadline_ms );
      Duration::from_millis( requested.min( config.max_deadline_ms ) )
    }

    /// Reject duplicate request ids seen within the dedup window
    fn admit( &self, request : &InferenceRequest ) -> GatewayResult< () >
    {
      let window = Duration::from_millis( self.engine.config().dedup_window_ms );
      let mut inflight = self.inflight.lock();
      inflight.retain( | _id, seen | seen.elapsed() < window );
      if inflight.contains_key( &request.request_id )
      {
        return Err( GatewayError::invalid_argument
        (
          format!( "request id '{}' was already admitted within the dedup window", request.request_id )
        ) );
      }
      inflight.insert( request.request_id.clone(), Instant::now() );
      Ok( () )
    }

    /// Execute a request to completion
    ///
    /// # Errors
    ///
    /// See the gateway error taxonomy; CLEANUP has run whenever this returns.
    pub async fn infer( &self, request : InferenceRequest, tenant : TenantContext ) -> GatewayResult< InferenceResponse >
    {
      self.infer_cancellable( request, tenant, CancellationToken::new() ).await
    }

    /// Execute a request with an external cancellation signal
    ///
    /// # Errors
    ///
    /// As [`Self::infer`]; firing `cancel` surfaces `CANCELLED`.
    pub async fn infer_cancellable
    (
      &self,
      request : InferenceRequest,
      tenant : TenantContext,
      cancel : CancellationToken,
    ) -> GatewayResult< InferenceResponse >
    {
      let started = Instant::now();
      request.validate()?;
      self.admit( &request )?;

      let deadline = self.effective_deadline( &request );
      let mut ctx = ExecutionContext::new( request, tenant, &self.engine );
      ctx.set_deadline( started + deadline );
      ctx.mark_running();

      let outcome = self.run_phases( &mut ctx, &cancel ).await;
      self.pipeline.run_cleanup( &mut ctx, &self.engine ).await;
      self.settle( ctx, started, outcome )
    }

    /// Record a phase duration against the soft budget
    ///
    /// Soft budgets are observability only; nothing is enforced here.
    fn observe_phase( &self, phase : Phase, started : Instant )
    {
      let elapsed_ms = started.elapsed().as_millis() as u64;
      #[ cfg( feature = "observability" ) ]
      self.engine.metrics().observe_ms( labeled( "orchestrator.phase_duration", "phase", phase.as_str() ), elapsed_ms );
      #[ cfg( feature = "logging" ) ]
      if elapsed_ms > self.engine.config().phase_soft_budget_ms
      {
        warn!( phase = %phase, elapsed_ms, "phase exceeded its soft budget" );
      }
      #[ cfg( not( any( feature = "observability", feature = "logging" ) ) ) ]
      let _ = ( phase, elapsed_ms );
    }

    /// Walk VALIDATE through POST_PROCESSING with EXECUTE retries
    async fn run_phases( &self, ctx : &mut ExecutionContext, cancel : &CancellationToken ) -> GatewayResult< () >
    {
      for phase in [ Phase::Validate, Phase::Authorize, Phase::Route, Phase::PreProcessing ]
      {
        ctx.check_deadline()?;
        let phase_started = Instant::now();
        self.pipeline.run_phase( phase, ctx, &self.engine, cancel ).await?;
        self.observe_phase( phase, phase_started );
      }

      self.run_execute_with_retry( ctx, cancel ).await?;

      // POST errors taint the response but never replace a successful payload.
      ctx.check_deadline()?;
      let post_started = Instant::now();
      if let Err( error ) = self.pipeline.run_phase( Phase::PostProcessing, ctx, &self.engine, cancel ).await
      {
        if error.kind() == ErrorKind::Cancelled
        {
          return Err( error );
        }
        #[ cfg( feature = "logging" ) ]
        warn!( %error, "post-processing failed, response tainted" );
        ctx.push_warning( format!( "post_processing : {error}" ) );
      }
      self.observe_phase( Phase::PostProcessing, post_started );
      Ok( () )
    }

    async fn run_execute_with_retry( &self, ctx : &mut ExecutionContext, cancel : &CancellationToken ) -> GatewayResult< () >
    {
      let config = self.engine.config();
      let schedule = BackoffSchedule::new( config.retry_base_ms, config.retry_max_backoff_ms );

      loop
      {
        ctx.check_deadline()?;
        match self.pipeline.run_phase( Phase::Execute, ctx, &self.engine, cancel ).await
        {
          Ok( () ) => return Ok( () ),
          Err( error ) =>
          {
            let attempt = ctx.token().attempt;
            if !error.is_retryable() || attempt >= config.max_attempts
            {
              return Err( error );
            }
            let delay = schedule.delay_after_error( attempt, &error );
            match ctx.remaining_budget()
            {
              Some( remaining ) if remaining <= delay => return Err( error ),
              _ => {},
            }

            #[ cfg( feature = "observability" ) ]
            self.engine.metrics().increment( "orchestrator.execute.retry" );
            #[ cfg( feature = "logging" ) ]
            debug!( attempt, delay_ms = delay.as_millis() as u64, %error, "retrying EXECUTE" );

            tokio::select!
            {
              () = cancel.cancelled() =>
              {
                return Err( GatewayError::cancelled( "cancelled during retry backoff" ) );
              },
              () = tokio::time::sleep( delay ) => {},
            }
            ctx.next_attempt();
            // A fresh routing decision lets the router skip the provider
            // whose breaker just opened.
            self.pipeline.run_phase( Phase::Route, ctx, &self.engine, cancel ).await?;
          },
        }
      }
    }

    /// Convert the pipeline outcome into the caller-visible result
    fn settle
    (
      &self,
      mut ctx : ExecutionContext,
      started : Instant,
      outcome : GatewayResult< () >,
    ) -> GatewayResult< InferenceResponse >
    {
      match outcome
      {
        Ok( () ) =>
        {
          let mut response : InferenceResponse = match ctx.variable( VAR_EXECUTE_RESPONSE )
          {
            Some( response ) => response,
            None =>
            {
              let error = GatewayError::internal( "pipeline succeeded without a response" )
                .with_request( &ctx.token().request_id );
              ctx.mark_failed( error.clone() );
              return Err( error );
            },
          };
          ctx.mark_succeeded();
          response.duration_ms = started.elapsed().as_millis() as u64;
          for ( key, value ) in ctx.metadata()
          {
            response.metadata.insert( key.clone(), value.clone() );
          }
          response.metadata.insert( "attempts".to_string(), ctx.token().attempt.to_string() );

          #[ cfg( feature = "observability" ) ]
          {
            self.engine.metrics().increment( "orchestrator.requests.succeeded" );
            self.engine.metrics().observe_ms( "orchestrator.request_duration", response.duration_ms );
          }
          Ok( response )
        },
        Err( error ) =>
        {
          let error = error.with_request( &ctx.token().request_id );
          if error.kind() == ErrorKind::Cancelled
          {
            ctx.mark_cancelled();
          }
          else
          {
            ctx.mark_failed( error.clone() );
          }

          #[ cfg( feature = "observability" ) ]
          self.engine.metrics().increment( labeled
          (
            "orchestrator.requests.failed",
            "kind",
            &error.kind().to_string(),
          ) );
          Err( error )
        },
      }
    }
  }

  #[ cfg( feature = "streaming" ) ]
  impl Orchestrator
  {
    /// Execute a streaming request
    ///
    /// The returned stream is lazy, finite and non-restartable. The first
    /// chunk may arrive before POST_PROCESSING runs; POST and CLEANUP run
    /// when the stream completes, fails or is cancelled. Once a chunk has
    /// been emitted the stream never falls back to another provider.
    ///
    /// # Errors
    ///
    /// Admission and pre-EXECUTE phase errors surface immediately; later
    /// failures arrive through the stream.
    pub async fn stream( &self, request : InferenceRequest, tenant : TenantContext ) -> GatewayResult< ChunkStream >
    {
      let started = Instant::now();
      request.validate()?;
      self.admit( &request )?;

      let deadline = self.effective_deadline( &request );
      let capacity = self.engine.config().streaming.capacity;
      let cancel = CancellationToken::new();
      let mut ctx = ExecutionContext::new( request, tenant, &self.engine );
      ctx.set_deadline( started + deadline );
      ctx.mark_running();

      for phase in [ Phase::Validate, Phase::Authorize, Phase::Route, Phase::PreProcessing ]
      {
        let step = match ctx.check_deadline()
        {
          Ok( () ) => self.pipeline.run_phase( phase, &mut ctx, &self.engine, &cancel ).await,
          Err( error ) => Err( error ),
        };
        if let Err( error ) = step
        {
          self.pipeline.run_cleanup( &mut ctx, &self.engine ).await;
          return Err( self.settle_stream_admission( ctx, error ) );
        }
      }

      let ( events, settlement ) = match self.open_stream_with_retry( &mut ctx, &cancel ).await
      {
        Ok( opened ) => opened,
        Err( error ) =>
        {
          self.pipeline.run_cleanup( &mut ctx, &self.engine ).await;
          return Err( self.settle_stream_admission( ctx, error ) );
        },
      };

      let request_id = ctx.token().request_id.clone();
      let ( emitter, chunks ) = chunk_channel( request_id, capacity );
      let driver = StreamDriver
      {
        orchestrator : self.clone(),
        ctx,
        emitter,
        events,
        settlement,
      };
      tokio::spawn( driver.run() );
      Ok( chunks )
    }

    /// Open the provider stream, retrying while nothing has been emitted
    async fn open_stream_with_retry
    (
      &self,
      ctx : &mut ExecutionContext,
      cancel : &CancellationToken,
    ) -> GatewayResult< ( ProviderEventStream, StreamSettlement ) >
    {
      let config = self.engine.config();
      let schedule = BackoffSchedule::new( config.retry_base_ms, config.retry_max_backoff_ms );

      loop
      {
        ctx.check_deadline()?;
        ctx.advance_phase( Phase::Execute );
        let ( adapter, request, sampling ) = resolve_execution( ctx, &self.engine )?;
        match adapter.begin_stream( &request, &sampling ).await
        {
          Ok( opened ) => return Ok( opened ),
          Err( error ) =>
          {
            let attempt = ctx.token().attempt;
            if !error.is_retryable() || attempt >= config.max_attempts
            {
              return Err( error );
            }
            let delay = schedule.delay_after_error( attempt, &error );
            match ctx.remaining_budget()
            {
              Some( remaining ) if remaining <= delay => return Err( error ),
              _ => {},
            }
            tokio::time::sleep( delay ).await;
            ctx.next_attempt();
            self.pipeline.run_phase( Phase::Route, ctx, &self.engine, cancel ).await?;
          },
        }
      }
    }

    fn settle_stream_admission( &self, mut ctx : ExecutionContext, error : GatewayError ) -> GatewayError
    {
      let error = error.with_request( &ctx.token().request_id );
      if error.kind() == ErrorKind::Cancelled
      {
        ctx.mark_cancelled();
      }
      else
      {
        ctx.mark_failed( error.clone() );
      }
      #[ cfg( feature = "observability" ) ]
      self.engine.metrics().increment( labeled
      (
        "orchestrator.requests.failed",
        "kind",
        &error.kind().to_string(),
      ) );
      error
    }
  }

  /// Owns a running stream : forwards provider events into the emitter and
  /// runs POST/CLEANUP when the stream ends on any path.
  #[ cfg( feature = "streaming" ) ]
  struct StreamDriver
  {
    orchestrator : Orchestrator,
    ctx : ExecutionContext,
    emitter : ChunkEmitter,
    events : ProviderEventStream,
    settlement : StreamSettlement,
  }

  #[ cfg( feature = "streaming" ) ]
  impl StreamDriver
  {
    async fn run( mut self )
    {
      let outcome = Self::pump( &mut self.ctx, &mut self.emitter, &mut self.events ).await;
      let engine = self.orchestrator.engine.clone();
      let pipeline = self.orchestrator.pipeline.clone();
      let cancel = CancellationToken::new();

      match outcome
      {
        StreamOutcome::Completed( usage ) =>
        {
          self.settlement.complete( usage ).await;
          if self.emitter.finish().await.is_err()
          {
            // The consumer vanished between the last delta and the final
            // chunk; the stream still counts as completed upstream.
            self.ctx.mark_cancelled();
          }
          // Record the outcome so POST plugins and the tenant quota
          // settlement see what the stream produced. Content already went
          // out as chunks and is not retained.
          let response = InferenceResponse
          {
            request_id : self.ctx.token().request_id.clone(),
            model : self.ctx.request().model_id.clone(),
            content : String::new(),
            tool_calls : Vec::new(),
            usage,
            duration_ms : 0,
            metadata : HashMap::new(),
          };
          self.ctx.set_variable( VAR_EXECUTE_RESPONSE, &response ).ok();
          if let Err( error ) = pipeline.run_phase( Phase::PostProcessing, &mut self.ctx, &engine, &cancel ).await
          {
            self.ctx.push_warning( format!( "post_processing : {error}" ) );
          }
          self.ctx.mark_succeeded();
          #[ cfg( feature = "observability" ) ]
          engine.metrics().increment( "orchestrator.streams.completed" );
        },
        StreamOutcome::Failed( error ) =>
        {
          self.settlement.fail( &error ).await;
          self.ctx.mark_failed( error.clone() );
          self.emitter.fail( error ).await;
          #[ cfg( feature = "observability" ) ]
          engine.metrics().increment( "orchestrator.streams.failed" );
        },
        StreamOutcome::Cancelled =>
        {
          self.settlement.cancel().await;
          self.ctx.mark_cancelled();
          #[ cfg( feature = "observability" ) ]
          engine.metrics().increment( "orchestrator.streams.cancelled" );
        },
      }

      pipeline.run_cleanup( &mut self.ctx, &engine ).await;
    }

    /// Forward provider events until completion, failure, cancel or deadline
    async fn pump
    (
      ctx : &mut ExecutionContext,
      emitter : &mut ChunkEmitter,
      events : &mut ProviderEventStream,
    ) -> StreamOutcome
    {
      loop
      {
        if emitter.is_cancelled()
        {
          return StreamOutcome::Cancelled;
        }
        let budget = match ctx.remaining_budget()
        {
          Some( remaining ) if remaining.is_zero() =>
            return StreamOutcome::Failed( GatewayError::deadline_exceeded( "deadline elapsed mid-stream" ) ),
          Some( remaining ) => remaining,
          None => Duration::from_secs( 3600 ),
        };

        let event = match tokio::time::timeout( budget, events.next() ).await
        {
          Ok( event ) => event,
          Err( _elapsed ) =>
            return StreamOutcome::Failed( GatewayError::deadline_exceeded( "deadline elapsed mid-stream" ) ),
        };

        match event
        {
          Some( Ok( ProviderEvent::Delta( delta ) ) ) =>
          {
            if emitter.emit( delta ).await.is_err()
            {
              return StreamOutcome::Cancelled;
            }
          },
          Some( Ok( ProviderEvent::Completed { usage } ) ) =>
          {
            return StreamOutcome::Completed( usage );
          },
          Some( Err( error ) ) =>
          {
            return StreamOutcome::Failed( error );
          },
          None =>
          {
            return StreamOutcome::Failed( GatewayError::provider_transient
            (
              "provider stream ended without completion"
            ) );
          },
        }
      }
    }
  }

  #[ cfg( feature = "async-jobs" ) ]
  impl Orchestrator
  {
    /// Submit a request for background execution, returning a job id
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` for a structurally invalid request.
    pub fn submit_async( &self, request : InferenceRequest, tenant : TenantContext ) -> GatewayResult< String >
    {
      request.validate()?;
      let job_id = self.engine.jobs().create( &request.request_id, &tenant.tenant_id, None );
      self.spawn_job( job_id.clone(), request, tenant );
      Ok( job_id )
    }

    /// Read a job's status, scoped to the tenant
    ///
    /// # Errors
    ///
    /// `INVALID_ARGUMENT` for an unknown job, `PERMISSION_DENIED` across
    /// tenants.
    pub fn job_status( &self, job_id : &str, tenant : &TenantContext ) -> GatewayResult< crate::jobs::JobStatus >
    {
      self.engine.jobs().status( job_id, &tenant.tenant_id )
    }

    /// Submit a set of requests as one batch, returning the batch id
    ///
    /// Item request ids double as batch custom ids and must stay within 256
    /// characters.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` when the batch is empty or an item is
    /// invalid; no job is created in that case.
    pub fn batch( &self, requests : Vec< InferenceRequest >, tenant : TenantContext ) -> GatewayResult< String >
    {
      if requests.is_empty()
      {
        return Err( GatewayError::invalid_argument( "batch cannot be empty" ) );
      }
      for request in &requests
      {
        request.validate()?;
        if request.request_id.len() > 256
        {
          return Err( GatewayError::invalid_argument
          (
            format!( "request id length {} exceeds the 256 character batch limit", request.request_id.len() )
          ) );
        }
      }

      let batch_id = uuid::Uuid::new_v4().to_string();
      for request in requests
      {
        let job_id = self.engine.jobs().create( &request.request_id, &tenant.tenant_id, Some( &batch_id ) );
        self.spawn_job( job_id, request, tenant.clone() );
      }
      Ok( batch_id )
    }

    /// Read every job of a batch, scoped to the tenant
    ///
    /// # Errors
    ///
    /// `INVALID_ARGUMENT` when the batch is unknown for this tenant.
    pub fn batch_status( &self, batch_id : &str, tenant : &TenantContext ) -> GatewayResult< Vec< crate::jobs::JobStatus > >
    {
      self.engine.jobs().batch_status( batch_id, &tenant.tenant_id )
    }

    fn spawn_job( &self, job_id : String, request : InferenceRequest, tenant : TenantContext )
    {
      let orchestrator = self.clone();
      tokio::spawn( async move
      {
        orchestrator.engine.jobs().mark_running( &job_id );
        match orchestrator.infer( request, tenant ).await
        {
          Ok( response ) => orchestrator.engine.jobs().complete( &job_id, response ),
          Err( error ) => orchestrator.engine.jobs().fail( &job_id, error ),
        }
      } );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ExecutePlugin,
    Orchestrator,
    RoutePlugin,
  };
}

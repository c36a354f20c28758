//! Sequential pipeline executor.
//!
//! Stages run strictly in declaration order. Each stage's prompt is rendered
//! from the run inputs plus the raw output of its context stages, and each
//! completion call is bounded by a timeout. The first failure halts the run;
//! later stages stay pending and nothing is substituted for the failed output.

use super::{Pipeline, PipelineRun};
use crate::cancellation::CancellationToken;
use crate::core::StageResult;
use crate::errors::StageExecutionError;
use crate::events::{types, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::providers::{CompletionProvider, CompletionRequest};
use crate::stages::{ContextEntry, PipelineInput, StageSpec};
use crate::utils::{generate_run_id, iso_timestamp};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout applied to stages that do not set their own.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs pipelines against a completion provider.
///
/// The executor holds only shared, immutable collaborators, so one instance
/// can serve any number of concurrent runs.
#[derive(Clone)]
pub struct PipelineExecutor {
    provider: Arc<dyn CompletionProvider>,
    event_sink: Arc<dyn EventSink>,
    default_timeout: Duration,
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("provider", &self.provider.name())
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    /// Creates an executor for `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            event_sink: Arc::new(NoOpEventSink),
            default_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the timeout for stages without their own.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Runs `pipeline` to completion or to its first failure.
    pub async fn run(&self, pipeline: &Pipeline, input: &PipelineInput) -> PipelineRun {
        self.run_with_cancellation(pipeline, input, &CancellationToken::new())
            .await
    }

    /// Runs `pipeline`, checking `token` before each stage.
    pub async fn run_with_cancellation(
        &self,
        pipeline: &Pipeline,
        input: &PipelineInput,
        token: &CancellationToken,
    ) -> PipelineRun {
        let run_id = generate_run_id();
        let started_at = iso_timestamp();
        let run_timer = SpanTimer::start(pipeline.name());

        info!(
            run_id = %run_id,
            pipeline = %pipeline.name(),
            stages = pipeline.stage_count(),
            "Starting pipeline run"
        );

        let mut results: Vec<StageResult> = pipeline
            .stages()
            .iter()
            .map(|spec| StageResult::pending(&spec.name, &spec.agent.role))
            .collect();
        let mut halt: Option<StageExecutionError> = None;

        for (index, spec) in pipeline.stages().iter().enumerate() {
            if token.is_cancelled() {
                let err = StageExecutionError::Cancelled {
                    stage: spec.name.clone(),
                    reason: token.reason().unwrap_or_else(|| "cancelled".to_string()),
                };
                warn!(run_id = %run_id, stage = %spec.name, "Run cancelled before stage");
                self.event_sink
                    .emit(
                        types::STAGE_FAILED,
                        Some(json!({"run_id": run_id, "stage": spec.name, "error": err.to_string()})),
                    )
                    .await;
                halt = Some(err);
                break;
            }

            let prompt = spec.render_prompt(input, &context_for(spec, pipeline, &results));
            let request = CompletionRequest::new(&spec.agent, prompt, &spec.expected_output);
            let timeout = spec.timeout.unwrap_or(self.default_timeout);

            results[index].start();
            debug!(stage = %spec.name, prompt_chars = request.prompt.len(), "Rendered stage prompt");
            info!(run_id = %run_id, stage = %spec.name, role = %spec.agent.role, "Stage started");
            self.event_sink
                .emit(
                    types::STAGE_STARTED,
                    Some(json!({"run_id": run_id, "stage": spec.name, "role": spec.agent.role})),
                )
                .await;

            let timer = SpanTimer::start(&spec.name);
            let outcome = tokio::time::timeout(timeout, self.provider.complete(&request)).await;
            let duration_ms = timer.finish();

            let err = match outcome {
                Ok(Ok(text)) => {
                    info!(
                        run_id = %run_id,
                        stage = %spec.name,
                        duration_ms,
                        output_chars = text.len(),
                        "Stage completed"
                    );
                    results[index].succeed(text, duration_ms);
                    self.event_sink
                        .emit(
                            types::STAGE_COMPLETED,
                            Some(json!({"run_id": run_id, "stage": spec.name, "duration_ms": duration_ms})),
                        )
                        .await;
                    continue;
                }
                Ok(Err(e)) => StageExecutionError::Provider {
                    stage: spec.name.clone(),
                    reason: e.to_string(),
                },
                Err(_) => StageExecutionError::Timeout {
                    stage: spec.name.clone(),
                    timeout_seconds: timeout.as_secs(),
                },
            };

            warn!(run_id = %run_id, stage = %spec.name, error = %err, "Stage failed, halting run");
            results[index].fail(err.to_string(), duration_ms);
            self.event_sink
                .emit(
                    types::STAGE_FAILED,
                    Some(json!({"run_id": run_id, "stage": spec.name, "error": err.to_string()})),
                )
                .await;
            halt = Some(err);
            break;
        }

        let run = PipelineRun::new(
            run_id,
            pipeline.name(),
            results,
            halt,
            started_at,
            run_timer.finish(),
        );

        info!(
            run_id = %run_id,
            status = %run.status(),
            duration_ms = run.duration_ms(),
            "Pipeline run finished"
        );
        self.event_sink
            .emit(
                types::PIPELINE_COMPLETED,
                Some(json!({"run_id": run_id, "pipeline": run.pipeline(), "status": run.status()})),
            )
            .await;

        run
    }
}

/// Collects the outputs of `spec`'s context stages, in declaration order.
///
/// Context stages always precede `spec` and the run halts on the first
/// failure, so every context stage has output by the time `spec` runs.
fn context_for<'a>(
    spec: &StageSpec,
    pipeline: &'a Pipeline,
    results: &'a [StageResult],
) -> Vec<ContextEntry<'a>> {
    spec.context
        .iter()
        .filter_map(|name| {
            let index = pipeline.position(name)?;
            let result = &results[index];
            Some(ContextEntry {
                stage: &pipeline.stages()[index].name,
                role: result.role(),
                output: result.output()?,
            })
        })
        .collect()
}

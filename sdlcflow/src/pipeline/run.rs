//! The record of one pipeline execution.

use crate::core::{RunStatus, StageResult, StageStatus};
use crate::errors::StageExecutionError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The outcome of one pipeline invocation.
///
/// Stage results are in pipeline order. The run status is derived from the
/// stage results when the record is created and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    run_id: Uuid,
    pipeline: String,
    stages: Vec<StageResult>,
    status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<StageExecutionError>,
    started_at: String,
    duration_ms: f64,
}

impl PipelineRun {
    /// Creates a run record, deriving the run status from the stage results.
    #[must_use]
    pub fn new(
        run_id: Uuid,
        pipeline: impl Into<String>,
        stages: Vec<StageResult>,
        error: Option<StageExecutionError>,
        started_at: impl Into<String>,
        duration_ms: f64,
    ) -> Self {
        let status = derive_status(&stages, error.is_some());
        Self {
            run_id,
            pipeline: pipeline.into(),
            stages,
            status,
            error,
            started_at: started_at.into(),
            duration_ms,
        }
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Returns the stage results in pipeline order.
    #[must_use]
    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    /// Returns the result of a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stages.iter().find(|result| result.name() == name)
    }

    /// Returns the raw output of a stage, if it succeeded.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&str> {
        self.stage(name).and_then(StageResult::output)
    }

    /// Returns the run status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns the error that halted the run, if any.
    #[must_use]
    pub fn error(&self) -> Option<&StageExecutionError> {
        self.error.as_ref()
    }

    /// Returns when the run started (ISO 8601).
    #[must_use]
    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    /// Returns the total run duration.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Returns the stages that failed.
    pub fn failed_stages(&self) -> impl Iterator<Item = &StageResult> {
        self.stages
            .iter()
            .filter(|result| result.status() == StageStatus::Failed)
    }
}

fn derive_status(stages: &[StageResult], halted: bool) -> RunStatus {
    let succeeded = stages.iter().filter(|result| result.is_success()).count();
    if !halted && succeeded == stages.len() {
        RunStatus::Completed
    } else if succeeded > 0 {
        RunStatus::PartiallyFailed
    } else {
        RunStatus::Failed
    }
}

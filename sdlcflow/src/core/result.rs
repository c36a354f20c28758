//! Per-stage execution record.

use super::StageStatus;
use serde::{Deserialize, Serialize};

/// The recorded state of one stage within a pipeline run.
///
/// Only the executor mutates a `StageResult`; once a run is returned the
/// record is read-only to everyone else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage name.
    pub(crate) name: String,
    /// The agent role that ran the stage.
    pub(crate) role: String,
    /// The stage status.
    pub(crate) status: StageStatus,
    /// Raw text produced by the completion provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) raw_output: Option<String>,
    /// Failure reason (for failed stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    /// Wall-clock time spent in the completion call.
    #[serde(default)]
    pub(crate) duration_ms: f64,
}

impl StageResult {
    /// Creates a pending record for a stage.
    #[must_use]
    pub fn pending(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            status: StageStatus::Pending,
            raw_output: None,
            error: None,
            duration_ms: 0.0,
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = StageStatus::Running;
    }

    pub(crate) fn succeed(&mut self, raw_output: String, duration_ms: f64) {
        self.status = StageStatus::Succeeded;
        self.raw_output = Some(raw_output);
        self.error = None;
        self.duration_ms = duration_ms;
    }

    pub(crate) fn fail(&mut self, error: impl Into<String>, duration_ms: f64) {
        self.status = StageStatus::Failed;
        self.raw_output = None;
        self.error = Some(error.into());
        self.duration_ms = duration_ms;
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the agent role that ran the stage.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Returns the stage status.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        self.status
    }

    /// Returns the raw provider text, whatever the status.
    #[must_use]
    pub fn raw_output(&self) -> Option<&str> {
        self.raw_output.as_deref()
    }

    /// Returns the failure reason.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the time spent in the completion call.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Returns the raw output if the stage succeeded.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        if self.status.is_success() {
            self.raw_output.as_deref()
        } else {
            None
        }
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

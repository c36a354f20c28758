//! Error types for sdlcflow.
//!
//! Each failure kind has its own type so callers can decide how far it
//! propagates: stage failures halt a run, malformed payloads degrade to empty
//! sections, tracker item errors stay attached to a single work item, and
//! validation errors reject a pipeline before anything executes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Number of characters kept in a [`MalformedPayload`] preview.
pub const PREVIEW_CHARS: usize = 200;

/// The umbrella error type for the outer surfaces (workflow, store, CLI).
#[derive(Debug, Error)]
pub enum SdlcflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A cycle was detected in the pipeline.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A stage could not be executed.
    #[error("{0}")]
    StageExecution(#[from] StageExecutionError),

    /// Generated text could not be parsed.
    #[error("{0}")]
    MalformedPayload(#[from] MalformedPayload),

    /// A tracker operation failed.
    #[error("{0}")]
    Tracker(#[from] TrackerItemError),

    /// The caller supplied unusable input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A requested artifact does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when a cycle is detected in the stage context graph.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle.
    pub cycle_path: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ContractErrorInfo::new(
            "CONTRACT-CYCLE",
            format!("Stage context forms a cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("A stage may only take context from stages declared before it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

impl From<CycleDetectedError> for PipelineValidationError {
    fn from(err: CycleDetectedError) -> Self {
        PipelineValidationError {
            message: err.to_string(),
            stages: err.cycle_path.clone(),
            error_info: Some(err.error_info),
        }
    }
}

/// Error raised when a stage's completion call fails.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageExecutionError {
    /// The completion provider returned an error.
    #[error("Stage '{stage}' failed: {reason}")]
    Provider {
        /// The stage name.
        stage: String,
        /// The provider's failure reason.
        reason: String,
    },

    /// The completion call did not finish within the stage timeout.
    #[error("Stage '{stage}' timed out after {timeout_seconds}s")]
    Timeout {
        /// The stage name.
        stage: String,
        /// The timeout that elapsed.
        timeout_seconds: u64,
    },

    /// The run was abandoned before the stage started.
    #[error("Stage '{stage}' not started: run cancelled ({reason})")]
    Cancelled {
        /// The first stage that did not run.
        stage: String,
        /// The cancellation reason.
        reason: String,
    },
}

impl StageExecutionError {
    /// Returns the name of the stage the error belongs to.
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::Provider { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Cancelled { stage, .. } => stage,
        }
    }
}

/// Error raised when structured data cannot be extracted from generated text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Malformed payload: {reason} (preview: {preview:?})")]
pub struct MalformedPayload {
    /// Why extraction failed.
    pub reason: String,
    /// The start of the offending text.
    pub preview: String,
}

impl MalformedPayload {
    /// Creates a malformed payload error, keeping a preview of `text`.
    #[must_use]
    pub fn new(reason: impl Into<String>, text: &str) -> Self {
        Self {
            reason: reason.into(),
            preview: text.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Error attached to a single work item during tracker synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerItemError {
    /// The tracker rejected the credentials.
    #[error("Authentication failed: {message}")]
    Auth {
        /// Details from the tracker.
        message: String,
    },

    /// The tracker rejected the issue fields.
    #[error("Validation failed: {message}")]
    Validation {
        /// Details from the tracker.
        message: String,
    },

    /// The tracker is throttling requests.
    #[error("Rate limited by tracker: {message}")]
    RateLimited {
        /// Details from the tracker.
        message: String,
    },

    /// Any other non-success response.
    #[error("Tracker returned HTTP {status}: {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body or summary.
        message: String,
    },

    /// The request never reached the tracker or the response was unreadable.
    #[error("Transport error: {message}")]
    Transport {
        /// Details of the failure.
        message: String,
    },

    /// A story references an epic key that is not in the payload.
    #[error("Story '{story}' references unknown epic '{epic_key}'")]
    UnresolvedParent {
        /// The story's local key.
        story: String,
        /// The unresolved parent key.
        epic_key: String,
    },

    /// A payload entry is not an object and cannot become a work item.
    #[error("Item '{key}' is malformed: {reason}")]
    InvalidItem {
        /// The key assigned to the entry.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A story's parent epic could not be created.
    #[error("Parent epic '{epic_key}' was not created")]
    ParentNotCreated {
        /// The parent's local key.
        epic_key: String,
    },
}

impl TrackerItemError {
    /// Maps an HTTP status and body to the matching error kind.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Auth { message },
            400 | 422 => Self::Validation { message },
            429 => Self::RateLimited { message },
            _ => Self::Remote { status, message },
        }
    }
}

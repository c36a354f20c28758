//! Pipeline building and execution.
//!
//! This module provides:
//! - A builder that validates the stage context graph up front
//! - A sequential executor with context propagation and per-stage timeouts
//! - The [`PipelineRun`] record returned by every execution

mod builder;
mod executor;
mod run;


pub use builder::PipelineBuilder;
pub use executor::{PipelineExecutor, DEFAULT_STAGE_TIMEOUT};
pub use run::PipelineRun;

use crate::stages::StageSpec;

/// A validated, immutable sequence of stages.
///
/// Only [`PipelineBuilder::build`] creates pipelines, so every context
/// reference points at a unique stage declared earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    name: String,
    stages: Vec<StageSpec>,
}

impl Pipeline {
    pub(crate) fn new(name: String, stages: Vec<StageSpec>) -> Self {
        Self { name, stages }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the position of a stage, if present.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|spec| spec.name == name)
    }
}

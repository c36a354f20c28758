//! Agent task descriptors.
//!
//! A [`StageSpec`] describes one step of the pipeline: which agent runs it,
//! the prompt template it renders, and which earlier stages feed it context.

pub mod agents;
mod prompt;

pub use prompt::{ContextEntry, PipelineInput};

use crate::errors::{CycleDetectedError, PipelineValidationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The persona a completion provider is asked to adopt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Job title, e.g. "Senior Business Analyst".
    pub role: String,
    /// What the agent is trying to achieve.
    pub goal: String,
    /// Background that shapes the agent's voice.
    pub backstory: String,
    /// Upper bound on a single completion call, in seconds.
    #[serde(default = "default_max_execution_seconds")]
    pub max_execution_seconds: u64,
}

fn default_max_execution_seconds() -> u64 {
    300
}

impl AgentProfile {
    /// Creates a new agent profile with the default execution bound.
    #[must_use]
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            max_execution_seconds: default_max_execution_seconds(),
        }
    }

    /// Sets the execution bound.
    #[must_use]
    pub fn with_max_execution_seconds(mut self, seconds: u64) -> Self {
        self.max_execution_seconds = seconds;
        self
    }
}

/// Specification for a single stage in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// The agent that runs the stage.
    pub agent: AgentProfile,
    /// Prompt template; `{user_input}`, `{project_key}` and any extra input
    /// keys are substituted at run time.
    pub prompt_template: String,
    /// Description of the expected output, passed to the provider.
    pub expected_output: String,
    /// Names of earlier stages whose output is injected as context, in order.
    pub context: Vec<String>,
    /// Per-stage timeout override.
    pub timeout: Option<Duration>,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        agent: AgentProfile,
        prompt_template: impl Into<String>,
    ) -> Self {
        let timeout = Some(Duration::from_secs(agent.max_execution_seconds));
        Self {
            name: name.into(),
            agent,
            prompt_template: prompt_template.into(),
            expected_output: String::new(),
            context: Vec::new(),
            timeout,
        }
    }

    /// Sets the expected output description.
    #[must_use]
    pub fn with_expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    /// Adds a context stage.
    #[must_use]
    pub fn with_context(mut self, stage: impl Into<String>) -> Self {
        let stage = stage.into();
        if !self.context.contains(&stage) {
            self.context.push(stage);
        }
        self
    }

    /// Sets all context stages.
    #[must_use]
    pub fn with_contexts(mut self, stages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.context.clear();
        for stage in stages {
            self = self.with_context(stage);
        }
        self
    }

    /// Overrides the stage timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates the stage specification on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the stage lists itself as
    /// context.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Stage name cannot be empty or whitespace-only",
            ));
        }
        if self.context.contains(&self.name) {
            return Err(CycleDetectedError::new(vec![self.name.clone(), self.name.clone()]).into());
        }
        Ok(())
    }

    /// Renders the full prompt for this stage.
    #[must_use]
    pub fn render_prompt(&self, input: &PipelineInput, context: &[ContextEntry<'_>]) -> String {
        prompt::render(&self.prompt_template, input, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyst() -> AgentProfile {
        AgentProfile::new("Analyst", "Analyze", "Experienced")
    }

    #[test]
    fn test_stage_spec_creation() {
        let spec = StageSpec::new("design", analyst(), "Design {user_input}")
            .with_contexts(["analysis", "research"])
            .with_expected_output("A design document");

        assert_eq!(spec.name, "design");
        assert_eq!(spec.context, vec!["analysis", "research"]);
        assert_eq!(spec.timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_timeout_follows_agent_bound() {
        let agent = analyst().with_max_execution_seconds(600);
        let spec = StageSpec::new("design", agent, "x");
        assert_eq!(spec.timeout, Some(Duration::from_secs(600)));

        let spec = spec.with_timeout(Duration::from_secs(5));
        assert_eq!(spec.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_duplicate_context_is_ignored() {
        let spec = StageSpec::new("b", analyst(), "x")
            .with_context("a")
            .with_context("a");
        assert_eq!(spec.context.len(), 1);
    }

    #[test]
    fn test_stage_spec_self_context() {
        let spec = StageSpec::new("a", analyst(), "x").with_context("a");
        let err = spec.validate().unwrap_err();
        assert_eq!(err.code(), Some("CONTRACT-CYCLE"));
    }

    #[test]
    fn test_stage_spec_blank_name() {
        assert!(StageSpec::new("  ", analyst(), "x").validate().is_err());
    }

    #[test]
    fn test_agent_profile_deserialize_default_bound() {
        let profile: AgentProfile = serde_json::from_str(
            r#"{"role": "PM", "goal": "Plan", "backstory": "Agile"}"#,
        )
        .unwrap();
        assert_eq!(profile.max_execution_seconds, 300);
    }
}

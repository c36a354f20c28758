//! Default agents and the three-stage requirements pipeline.

use super::{AgentProfile, StageSpec};
use crate::errors::PipelineValidationError;
use crate::pipeline::{Pipeline, PipelineBuilder};
use serde::{Deserialize, Serialize};

/// Name of the business analysis stage.
pub const BUSINESS_ANALYSIS: &str = "business_analysis";
/// Name of the architecture stage.
pub const ARCHITECTURE: &str = "architecture";
/// Name of the project management stage.
pub const PROJECT_MANAGEMENT: &str = "project_management";

/// Prompt for the business analyst.
pub const BUSINESS_ANALYSIS_PROMPT: &str = include_str!("prompts/business_analysis.md");
/// Prompt for the architect.
pub const ARCHITECTURE_PROMPT: &str = include_str!("prompts/architecture.md");
/// Prompt for the project manager.
pub const PROJECT_MANAGEMENT_PROMPT: &str = include_str!("prompts/project_management.md");

/// The three agents of the requirements pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Turns user input into a requirements document.
    #[serde(default = "business_analyst")]
    pub business_analyst: AgentProfile,
    /// Turns requirements into a technical design with diagrams.
    #[serde(default = "architect")]
    pub architect: AgentProfile,
    /// Turns requirements and design into epics and stories.
    #[serde(default = "project_manager")]
    pub project_manager: AgentProfile,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            business_analyst: business_analyst(),
            architect: architect(),
            project_manager: project_manager(),
        }
    }
}

/// The default business analyst.
#[must_use]
pub fn business_analyst() -> AgentProfile {
    AgentProfile::new(
        "Senior Business Analyst",
        "Analyze business requirements and create comprehensive documentation",
        "You are an experienced business analyst with expertise in requirements gathering, \
         stakeholder management, and business process optimization.",
    )
    .with_max_execution_seconds(300)
}

/// The default architect.
#[must_use]
pub fn architect() -> AgentProfile {
    AgentProfile::new(
        "Senior System Architect",
        "Design comprehensive system architecture and create technical documentation with \
         syntactically correct Mermaid diagrams including flowcharts, sequence diagrams, and ER diagrams",
        "You are an expert system architect with 15+ years of experience in designing scalable, \
         secure enterprise systems. You are highly skilled in creating syntactically correct Mermaid \
         diagrams and clear technical documentation that guide development teams. You always \
         validate Mermaid syntax before output.",
    )
    .with_max_execution_seconds(600)
}

/// The default project manager.
#[must_use]
pub fn project_manager() -> AgentProfile {
    AgentProfile::new(
        "Senior Project Manager",
        "Create structured project artifacts including epics and user stories",
        "You are a seasoned project manager with extensive experience in Agile methodologies, \
         story writing, and project planning. Use the business requirements and technical design \
         document to generate crisp user stories.",
    )
    .with_max_execution_seconds(300)
}

/// Builds the analyst -> architect -> project manager pipeline.
///
/// # Errors
///
/// Returns an error only if the stage definitions are inconsistent.
pub fn default_pipeline(agents: &AgentsConfig) -> Result<Pipeline, PipelineValidationError> {
    PipelineBuilder::new("requirements-to-backlog")
        .stage(
            StageSpec::new(
                BUSINESS_ANALYSIS,
                agents.business_analyst.clone(),
                BUSINESS_ANALYSIS_PROMPT,
            )
            .with_expected_output(
                "Structured business requirements document with functional and non-functional requirements",
            ),
        )
        .stage(
            StageSpec::new(ARCHITECTURE, agents.architect.clone(), ARCHITECTURE_PROMPT)
                .with_expected_output(
                    "Technical design document with Mermaid diagrams and C4 architecture",
                )
                .with_context(BUSINESS_ANALYSIS),
        )
        .stage(
            StageSpec::new(
                PROJECT_MANAGEMENT,
                agents.project_manager.clone(),
                PROJECT_MANAGEMENT_PROMPT,
            )
            .with_expected_output(
                "Jira epics and user stories with proper acceptance criteria as a JSON object",
            )
            .with_contexts([BUSINESS_ANALYSIS, ARCHITECTURE]),
        )
        .build()
}

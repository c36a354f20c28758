//! # Sdlcflow
//!
//! Turns free-text product requirements into a requirements document, a
//! technical design with Mermaid diagrams, and a backlog of epics and stories
//! in Jira.
//!
//! Three agents run in a fixed order, each seeing the outputs it declares as
//! context:
//!
//! - **Business analyst**: structures the raw input into requirements
//! - **Architect**: designs the system and draws the diagrams
//! - **Project manager**: breaks the work into a JSON backlog
//!
//! The backlog is then parsed, synchronized with the tracker item by item,
//! and everything is combined into a single [`aggregate::Artifact`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sdlcflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = SdlcConfig::from_env();
//! let provider = Arc::new(ChatCompletionsProvider::new(config.llm.clone())?);
//! let tracker = Arc::new(JiraClient::new(config.tracker.clone())?);
//!
//! let workflow = SdlcWorkflow::new(provider, tracker, &config)?;
//! let artifact = workflow.process("Customers want to book rooms online", None).await?;
//! println!("{}", artifact.jira_artifacts.summary);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod aggregate;
pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod extract;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod stages;
pub mod store;
pub mod testing;
pub mod tracker;
pub mod utils;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregate::{aggregate, Artifact, JiraArtifacts};
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ConfigValidation, LlmConfig, SdlcConfig, TrackerConfig};
    pub use crate::core::{RunStatus, StageResult, StageStatus};
    pub use crate::errors::{
        ContractErrorInfo, CycleDetectedError, MalformedPayload, PipelineValidationError,
        SdlcflowError, StageExecutionError, TrackerItemError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::extract::{extract_diagrams, extract_json, ExtractedDiagram};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineExecutor, PipelineRun};
    #[cfg(feature = "chat-provider")]
    pub use crate::providers::ChatCompletionsProvider;
    pub use crate::providers::{CompletionError, CompletionProvider, CompletionRequest};
    pub use crate::stages::agents::{default_pipeline, AgentsConfig};
    pub use crate::stages::{AgentProfile, PipelineInput, StageSpec};
    pub use crate::store::{LatestResults, OutputStore};
    #[cfg(feature = "jira")]
    pub use crate::tracker::JiraClient;
    pub use crate::tracker::{
        parse_work_items, TrackerClient, TrackerSyncResult, TrackerSynchronizer, WorkItemBatch,
    };
    pub use crate::workflow::SdlcWorkflow;
}

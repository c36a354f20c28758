//! The end-to-end request workflow.

use crate::aggregate::{aggregate, Artifact};
use crate::cancellation::CancellationToken;
use crate::config::SdlcConfig;
use crate::errors::SdlcflowError;
use crate::events::EventSink;
use crate::pipeline::{Pipeline, PipelineExecutor};
use crate::providers::CompletionProvider;
use crate::stages::agents::{default_pipeline, PROJECT_MANAGEMENT};
use crate::stages::PipelineInput;
use crate::tracker::{parse_work_items, TrackerClient, TrackerSyncResult, TrackerSynchronizer};
use std::sync::Arc;
use tracing::{info, warn};

/// Number of input characters echoed into the log.
const LOG_PREVIEW_CHARS: usize = 100;

/// Runs requirements through the pipeline, syncs the resulting work items
/// and assembles the artifact.
///
/// A workflow holds only shared, immutable collaborators; build one per
/// request or share one across requests.
#[derive(Debug, Clone)]
pub struct SdlcWorkflow {
    executor: PipelineExecutor,
    synchronizer: TrackerSynchronizer,
    pipeline: Pipeline,
    default_project_key: String,
}

impl SdlcWorkflow {
    /// Creates a workflow with the default three-agent pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured agents do not form a valid pipeline.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        tracker: Arc<dyn TrackerClient>,
        config: &SdlcConfig,
    ) -> Result<Self, SdlcflowError> {
        let pipeline = default_pipeline(&config.agents)?;
        Ok(Self::with_pipeline(provider, tracker, config, pipeline))
    }

    /// Creates a workflow around a custom pipeline.
    ///
    /// The work item payload is read from the `project_management` stage.
    #[must_use]
    pub fn with_pipeline(
        provider: Arc<dyn CompletionProvider>,
        tracker: Arc<dyn TrackerClient>,
        config: &SdlcConfig,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            executor: PipelineExecutor::new(provider),
            synchronizer: TrackerSynchronizer::new(tracker, config.tracker.clone()),
            pipeline,
            default_project_key: config.tracker.default_project_key.clone(),
        }
    }

    /// Sets the event sink for both the executor and the synchronizer.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.executor = self.executor.with_event_sink(sink.clone());
        self.synchronizer = self.synchronizer.with_event_sink(sink);
        self
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Processes one request.
    ///
    /// # Errors
    ///
    /// Returns [`SdlcflowError::InvalidInput`] for blank requirements. Stage,
    /// extraction and tracker failures never fail the call; they show up in
    /// the artifact's status and diagnostics.
    pub async fn process(
        &self,
        requirements: &str,
        project_key: Option<&str>,
    ) -> Result<Artifact, SdlcflowError> {
        self.process_with_cancellation(requirements, project_key, &CancellationToken::new())
            .await
    }

    /// Processes one request, honoring `token` between stages.
    ///
    /// # Errors
    ///
    /// See [`SdlcWorkflow::process`].
    pub async fn process_with_cancellation(
        &self,
        requirements: &str,
        project_key: Option<&str>,
        token: &CancellationToken,
    ) -> Result<Artifact, SdlcflowError> {
        let requirements = requirements.trim();
        if requirements.is_empty() {
            return Err(SdlcflowError::InvalidInput(
                "requirements must not be empty".to_string(),
            ));
        }
        let project_key = project_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .unwrap_or(self.default_project_key.as_str());

        let preview: String = requirements.chars().take(LOG_PREVIEW_CHARS).collect();
        info!(project_key = %project_key, input = %preview, "Processing requirements");

        let input = PipelineInput::new(requirements, project_key);
        let run = self
            .executor
            .run_with_cancellation(&self.pipeline, &input, token)
            .await;

        let mut diagnostics = Vec::new();
        let sync = match run.output(PROJECT_MANAGEMENT) {
            None => TrackerSyncResult::default(),
            Some(raw) => match parse_work_items(raw) {
                Ok(batch) => self.synchronizer.sync(&batch, project_key).await,
                Err(e) => {
                    warn!(error = %e, "Work item payload unusable; skipping tracker sync");
                    diagnostics.push(format!("Work item payload not parsed: {}", e.reason));
                    TrackerSyncResult::default()
                }
            },
        };

        let mut artifact = aggregate(&run, &sync);
        artifact.diagnostics.extend(diagnostics);
        info!(
            status = %artifact.status,
            summary = %artifact.jira_artifacts.summary,
            diagnostics = artifact.diagnostics.len(),
            "Request processed"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunStatus;
    use crate::errors::TrackerItemError;
    use crate::events::CollectingEventSink;
    use crate::testing::{RecordingTrackerClient, ScriptedProvider};

    const PM_OUTPUT: &str = r#"```json
{"epics": [{"key": "E1", "title": "Accounts"}],
 "stories": [{"key": "S1", "epic_key": "E1", "title": "Sign up", "acceptance_criteria": ["works"]}]}
```"#;

    fn provider(pm_output: &str) -> ScriptedProvider {
        ScriptedProvider::new()
            .respond("Senior Business Analyst", "# Requirements\n\nUsers sign up.")
            .respond(
                "Senior System Architect",
                "# Design\n\n```mermaid\nflowchart LR\n    U[User] --> S[Service]\n```",
            )
            .respond("Senior Project Manager", pm_output)
    }

    fn workflow(provider: ScriptedProvider, tracker: Arc<RecordingTrackerClient>) -> SdlcWorkflow {
        SdlcWorkflow::new(Arc::new(provider), tracker, &SdlcConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let tracker = Arc::new(RecordingTrackerClient::new());
        let sink = Arc::new(CollectingEventSink::new());
        let artifact = workflow(provider(PM_OUTPUT), tracker.clone())
            .with_event_sink(sink.clone())
            .process("Users need accounts", Some("SHOP"))
            .await
            .unwrap();

        assert_eq!(artifact.status, RunStatus::Completed);
        assert_eq!(
            artifact.jira_artifacts.summary,
            "Created 1 epics and 1 stories in Jira"
        );
        assert_eq!(artifact.diagrams.len(), 1);
        assert!(artifact.diagnostics.is_empty());

        let issues = tracker.issues();
        assert_eq!(issues[0].0, "SHOP-1");
        assert_eq!(issues[1].1.parent.as_deref(), Some("SHOP-1"));
        assert_eq!(sink.events_of_type("tracker.item_created").len(), 2);
    }

    #[tokio::test]
    async fn test_project_key_defaults_to_config() {
        let tracker = Arc::new(RecordingTrackerClient::new());
        workflow(provider(PM_OUTPUT), tracker.clone())
            .process("Users need accounts", Some("  "))
            .await
            .unwrap();
        assert_eq!(tracker.issues()[0].0, "BA-1");
    }

    #[tokio::test]
    async fn test_blank_requirements_rejected() {
        let tracker = Arc::new(RecordingTrackerClient::new());
        let err = workflow(provider(PM_OUTPUT), tracker)
            .process("   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SdlcflowError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_malformed_payload_degrades() {
        let tracker = Arc::new(RecordingTrackerClient::new());
        let artifact = workflow(provider("Sorry, no JSON today."), tracker.clone())
            .process("Users need accounts", None)
            .await
            .unwrap();

        assert_eq!(artifact.status, RunStatus::Completed);
        assert_eq!(artifact.jira_artifacts.summary, "Created 0 epics and 0 stories in Jira");
        assert_eq!(artifact.jira_artifacts_raw, "Sorry, no JSON today.");
        assert_eq!(artifact.diagnostics.len(), 1);
        assert!(artifact.diagnostics[0].starts_with("Work item payload not parsed"));
        assert!(tracker.issues().is_empty());
    }

    #[tokio::test]
    async fn test_tracker_failure_is_per_item() {
        let tracker = Arc::new(RecordingTrackerClient::new().fail_on(
            "Accounts",
            TrackerItemError::Auth {
                message: "token expired".to_string(),
            },
        ));
        let artifact = workflow(provider(PM_OUTPUT), tracker)
            .process("Users need accounts", None)
            .await
            .unwrap();

        assert_eq!(artifact.status, RunStatus::Completed);
        assert_eq!(artifact.jira_artifacts.failed_count, 2);
        assert_eq!(artifact.diagnostics.len(), 2);
    }

    #[tokio::test]
    async fn test_stage_failure_skips_tracker() {
        let tracker = Arc::new(RecordingTrackerClient::new());
        let provider = provider(PM_OUTPUT).fail("Senior System Architect", "model overloaded");
        let artifact = workflow(provider, tracker.clone())
            .process("Users need accounts", None)
            .await
            .unwrap();

        assert_eq!(artifact.status, RunStatus::PartiallyFailed);
        assert!(artifact.technical_design.is_empty());
        assert!(tracker.issues().is_empty());
        assert!(artifact.diagnostics[0].contains("model overloaded"));
    }
}

//! Assembly of the final artifact.
//!
//! [`aggregate`] is pure and total: whatever the run and the sync produced,
//! it returns an [`Artifact`], with empty sections where a stage has no
//! output and a diagnostic explaining why.

use crate::core::RunStatus;
use crate::extract::{extract_diagrams, ExtractedDiagram};
use crate::pipeline::PipelineRun;
use crate::stages::agents::{ARCHITECTURE, BUSINESS_ANALYSIS, PROJECT_MANAGEMENT};
use crate::tracker::{CreatedItem, FailedItem, TrackerSyncResult};
use serde::{Deserialize, Serialize};

/// What happened in the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraArtifacts {
    /// E.g. "Created 2 epics and 5 stories in Jira".
    pub summary: String,
    /// Number of epics in the tracker.
    pub epics_created: usize,
    /// Number of stories in the tracker.
    pub stories_created: usize,
    /// Number of work items that failed.
    pub failed_count: usize,
    /// Items that exist in the tracker.
    #[serde(default)]
    pub created: Vec<CreatedItem>,
    /// Items that failed, with reasons.
    #[serde(default)]
    pub failed: Vec<FailedItem>,
}

impl From<&TrackerSyncResult> for JiraArtifacts {
    fn from(result: &TrackerSyncResult) -> Self {
        let counts = result.counts();
        Self {
            summary: result.summary(),
            epics_created: counts.epics_created,
            stories_created: counts.stories_created,
            failed_count: counts.failed,
            created: result.created.clone(),
            failed: result.failed.clone(),
        }
    }
}

/// The combined outcome of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Status of the pipeline run.
    pub status: RunStatus,
    /// Business analyst output.
    pub business_requirements: String,
    /// Architect output.
    pub technical_design: String,
    /// Tracker synchronization summary.
    pub jira_artifacts: JiraArtifacts,
    /// Project manager output as generated.
    pub jira_artifacts_raw: String,
    /// Diagrams found in the technical design.
    pub diagrams: Vec<ExtractedDiagram>,
    /// Human-readable notes about anything that degraded.
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

impl Artifact {
    /// Appends a diagnostic.
    #[must_use]
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostics.push(diagnostic.into());
        self
    }
}

/// Combines a pipeline run and a tracker sync into an [`Artifact`].
#[must_use]
pub fn aggregate(run: &PipelineRun, sync: &TrackerSyncResult) -> Artifact {
    let output = |stage: &str| run.output(stage).unwrap_or_default().to_string();
    let technical_design = output(ARCHITECTURE);

    let mut diagnostics: Vec<String> = run
        .failed_stages()
        .map(|stage| {
            stage.error().map_or_else(
                || format!("Stage '{}' failed", stage.name()),
                str::to_string,
            )
        })
        .collect();
    if let Some(err) = run.error() {
        let already_listed = run
            .stage(err.stage())
            .is_some_and(|stage| stage.error().is_some());
        if !already_listed {
            diagnostics.push(err.to_string());
        }
    }
    diagnostics.extend(sync.failed.iter().map(|item| {
        format!(
            "Work item '{}' ({}) not created: {}",
            item.draft.local_key, item.draft.kind, item.error
        )
    }));

    Artifact {
        status: run.status(),
        business_requirements: output(BUSINESS_ANALYSIS),
        diagrams: extract_diagrams(&technical_design),
        technical_design,
        jira_artifacts: JiraArtifacts::from(sync),
        jira_artifacts_raw: output(PROJECT_MANAGEMENT),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageResult;
    use crate::errors::{StageExecutionError, TrackerItemError};
    use crate::tracker::WorkItemDraft;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    const DESIGN: &str = "# Design\n\n```mermaid\ngraph TD\n    A[Client] --> B[API]\n```\n";

    fn stage(name: &str, output: Option<&str>) -> StageResult {
        let mut result = StageResult::pending(name, "role");
        if let Some(text) = output {
            result.succeed(text.to_string(), 1.0);
        }
        result
    }

    fn completed_run() -> PipelineRun {
        PipelineRun::new(
            Uuid::new_v4(),
            "requirements-to-backlog",
            vec![
                stage(BUSINESS_ANALYSIS, Some("# Requirements")),
                stage(ARCHITECTURE, Some(DESIGN)),
                stage(PROJECT_MANAGEMENT, Some("{\"epics\": []}")),
            ],
            None,
            "2024-01-01T00:00:00.000000+00:00",
            3.0,
        )
    }

    fn created(kind_epic: bool, key: &str, id: &str) -> CreatedItem {
        let draft = if kind_epic {
            WorkItemDraft::epic(key, key)
        } else {
            WorkItemDraft::story(key, key)
        };
        CreatedItem {
            draft,
            external_id: id.to_string(),
            reused: false,
        }
    }

    #[test]
    fn test_all_succeeded_two_epics_created() {
        let sync = TrackerSyncResult {
            created: vec![created(true, "E1", "BA-1"), created(true, "E2", "BA-2")],
            failed: Vec::new(),
        };
        let artifact = aggregate(&completed_run(), &sync);

        assert_eq!(artifact.status, RunStatus::Completed);
        assert_eq!(artifact.business_requirements, "# Requirements");
        assert_eq!(artifact.jira_artifacts_raw, "{\"epics\": []}");
        assert_eq!(
            artifact.jira_artifacts.summary,
            "Created 2 epics and 0 stories in Jira"
        );
        assert_eq!(artifact.jira_artifacts.epics_created, 2);
        assert_eq!(artifact.jira_artifacts.failed_count, 0);
        assert_eq!(artifact.diagrams.len(), 1);
        assert_eq!(artifact.diagrams[0].title, "Diagram 1");
        assert!(artifact.diagnostics.is_empty());
    }

    #[test]
    fn test_failed_stage_contributes_empty_sections() {
        let mut failed = StageResult::pending(ARCHITECTURE, "role");
        failed.fail("Stage 'architecture' timed out after 600s", 600_000.0);
        let run = PipelineRun::new(
            Uuid::new_v4(),
            "requirements-to-backlog",
            vec![
                stage(BUSINESS_ANALYSIS, Some("# Requirements")),
                failed,
                stage(PROJECT_MANAGEMENT, None),
            ],
            Some(StageExecutionError::Timeout {
                stage: ARCHITECTURE.to_string(),
                timeout_seconds: 600,
            }),
            "t",
            1.0,
        );

        let artifact = aggregate(&run, &TrackerSyncResult::default());

        assert_eq!(artifact.status, RunStatus::PartiallyFailed);
        assert_eq!(artifact.technical_design, "");
        assert_eq!(artifact.jira_artifacts_raw, "");
        assert!(artifact.diagrams.is_empty());
        assert_eq!(
            artifact.diagnostics,
            vec!["Stage 'architecture' timed out after 600s"]
        );
        assert_eq!(
            artifact.jira_artifacts.summary,
            "Created 0 epics and 0 stories in Jira"
        );
    }

    #[test]
    fn test_cancellation_is_reported() {
        let run = PipelineRun::new(
            Uuid::new_v4(),
            "p",
            vec![stage(BUSINESS_ANALYSIS, None)],
            Some(StageExecutionError::Cancelled {
                stage: BUSINESS_ANALYSIS.to_string(),
                reason: "shutdown".to_string(),
            }),
            "t",
            0.0,
        );
        let artifact = aggregate(&run, &TrackerSyncResult::default());
        assert_eq!(artifact.status, RunStatus::Failed);
        assert_eq!(artifact.diagnostics.len(), 1);
        assert!(artifact.diagnostics[0].contains("shutdown"));
    }

    #[test]
    fn test_tracker_failures_become_diagnostics() {
        let sync = TrackerSyncResult {
            created: vec![created(false, "S1", "BA-5")],
            failed: vec![FailedItem {
                draft: WorkItemDraft::story("S2", "Orphan"),
                error: TrackerItemError::UnresolvedParent {
                    story: "S2".to_string(),
                    epic_key: "E9".to_string(),
                },
            }],
        };
        let artifact = aggregate(&completed_run(), &sync);

        assert_eq!(artifact.jira_artifacts.stories_created, 1);
        assert_eq!(artifact.jira_artifacts.failed_count, 1);
        assert_eq!(
            artifact.diagnostics,
            vec!["Work item 'S2' (story) not created: Story 'S2' references unknown epic 'E9'"]
        );
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let sync = TrackerSyncResult::default();
        assert_eq!(
            aggregate(&completed_run(), &sync).diagrams,
            aggregate(&completed_run(), &sync).diagrams
        );
    }
}

//! Reconciling parsed work items with the tracker.

use super::client::{IssueRequest, TrackerClient};
use super::model::{
    CreatedItem, FailedItem, TrackerSyncResult, WorkItemBatch, WorkItemDraft, WorkItemKind,
};
use crate::config::TrackerConfig;
use crate::errors::TrackerItemError;
use crate::events::{types, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Creates a batch of work items in the tracker.
///
/// Items are created one at a time, epics first. A failure is recorded
/// against its item and the batch carries on; nothing is rolled back.
#[derive(Clone)]
pub struct TrackerSynchronizer {
    client: Arc<dyn TrackerClient>,
    config: TrackerConfig,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for TrackerSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerSynchronizer")
            .field("epic_issue_type", &self.config.epic_issue_type)
            .field("story_issue_type", &self.config.story_issue_type)
            .finish_non_exhaustive()
    }
}

impl TrackerSynchronizer {
    /// Creates a synchronizer.
    #[must_use]
    pub fn new(client: Arc<dyn TrackerClient>, config: TrackerConfig) -> Self {
        Self {
            client,
            config,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Creates every draft of `batch` in `project_key`.
    ///
    /// Every draft of the batch, rejected ones included, ends up in exactly
    /// one of the result lists.
    pub async fn sync(&self, batch: &WorkItemBatch, project_key: &str) -> TrackerSyncResult {
        let timer = SpanTimer::start("tracker.sync");
        let mut result = TrackerSyncResult::default();

        for rejected in &batch.rejected {
            self.record_failure(&mut result, rejected.draft.clone(), rejected.error.clone())
                .await;
        }

        let mut epic_ids: HashMap<&str, String> = HashMap::new();
        for epic in &batch.epics {
            match self.create_one(epic, project_key, None).await {
                Ok(created) => {
                    epic_ids.insert(epic.local_key.as_str(), created.external_id.clone());
                    self.record_created(&mut result, created).await;
                }
                Err(error) => self.record_failure(&mut result, epic.clone(), error).await,
            }
        }

        for story in &batch.stories {
            let parent = match &story.parent_key {
                None => None,
                Some(key) => match epic_ids.get(key.as_str()) {
                    Some(id) => Some(id.clone()),
                    None => {
                        let error = TrackerItemError::ParentNotCreated {
                            epic_key: key.clone(),
                        };
                        self.record_failure(&mut result, story.clone(), error).await;
                        continue;
                    }
                },
            };
            match self.create_one(story, project_key, parent).await {
                Ok(created) => self.record_created(&mut result, created).await,
                Err(error) => self.record_failure(&mut result, story.clone(), error).await,
            }
        }

        let counts = result.counts();
        info!(
            project_key = %project_key,
            epics_created = counts.epics_created,
            stories_created = counts.stories_created,
            failed = counts.failed,
            duration_ms = timer.finish(),
            "Tracker sync finished"
        );
        result
    }

    fn issue_type(&self, kind: WorkItemKind) -> &str {
        match kind {
            WorkItemKind::Epic => &self.config.epic_issue_type,
            WorkItemKind::Story => &self.config.story_issue_type,
        }
    }

    async fn create_one(
        &self,
        draft: &WorkItemDraft,
        project_key: &str,
        parent: Option<String>,
    ) -> Result<CreatedItem, TrackerItemError> {
        let issue_type = self.issue_type(draft.kind);

        // Only refused credentials stop creation; other lookup errors fall through.
        match self
            .client
            .find_issue(project_key, issue_type, &draft.title)
            .await
        {
            Ok(Some(existing)) => {
                return Ok(CreatedItem {
                    draft: draft.clone(),
                    external_id: existing,
                    reused: true,
                });
            }
            Ok(None) => {}
            Err(error @ TrackerItemError::Auth { .. }) => return Err(error),
            Err(error) => {
                warn!(
                    local_key = %draft.local_key,
                    error = %error,
                    "Existing issue lookup failed; creating without it"
                );
            }
        }

        let request = IssueRequest {
            project_key: project_key.to_string(),
            issue_type: issue_type.to_string(),
            summary: draft.title.clone(),
            description: draft.body(),
            priority: Some(
                draft
                    .priority
                    .clone()
                    .unwrap_or_else(|| self.config.priority.clone()),
            ),
            parent,
        };
        let external_id = self.client.create_issue(&request).await?;
        Ok(CreatedItem {
            draft: draft.clone(),
            external_id,
            reused: false,
        })
    }

    async fn record_created(&self, result: &mut TrackerSyncResult, created: CreatedItem) {
        info!(
            kind = %created.draft.kind,
            local_key = %created.draft.local_key,
            external_id = %created.external_id,
            reused = created.reused,
            "Work item synced"
        );
        self.event_sink
            .emit(
                types::TRACKER_ITEM_CREATED,
                Some(json!({
                    "kind": created.draft.kind,
                    "local_key": created.draft.local_key,
                    "external_id": created.external_id,
                    "reused": created.reused,
                })),
            )
            .await;
        result.created.push(created);
    }

    async fn record_failure(
        &self,
        result: &mut TrackerSyncResult,
        draft: WorkItemDraft,
        error: TrackerItemError,
    ) {
        warn!(
            kind = %draft.kind,
            local_key = %draft.local_key,
            error = %error,
            "Work item not created"
        );
        self.event_sink
            .emit(
                types::TRACKER_ITEM_FAILED,
                Some(json!({
                    "kind": draft.kind,
                    "local_key": draft.local_key,
                    "error": error.to_string(),
                })),
            )
            .await;
        result.failed.push(FailedItem { draft, error });
    }
}

//! Work item drafts and synchronization results.

use crate::errors::TrackerItemError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of tracker work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    /// A large body of work grouping stories.
    Epic,
    /// A single user story.
    Story,
}

impl fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epic => write!(f, "epic"),
            Self::Story => write!(f, "story"),
        }
    }
}

/// A work item parsed from generated text, not yet in the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemDraft {
    /// Key used inside the payload to link stories to epics.
    pub local_key: String,
    /// Epic or story.
    pub kind: WorkItemKind,
    /// Issue summary.
    pub title: String,
    /// Issue body.
    #[serde(default)]
    pub description: String,
    /// Acceptance criteria, one per entry.
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// Local key of the parent epic (stories only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    /// Priority name, if the payload gave one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl WorkItemDraft {
    /// Creates an epic draft.
    #[must_use]
    pub fn epic(local_key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            local_key: local_key.into(),
            kind: WorkItemKind::Epic,
            title: title.into(),
            description: String::new(),
            acceptance_criteria: Vec::new(),
            parent_key: None,
            priority: None,
        }
    }

    /// Creates a story draft.
    #[must_use]
    pub fn story(local_key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: WorkItemKind::Story,
            ..Self::epic(local_key, title)
        }
    }

    /// Sets the parent epic.
    #[must_use]
    pub fn with_parent(mut self, parent_key: impl Into<String>) -> Self {
        self.parent_key = Some(parent_key.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the acceptance criteria.
    #[must_use]
    pub fn with_acceptance_criteria(
        mut self,
        criteria: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.acceptance_criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Issue body: the description followed by the acceptance criteria list.
    #[must_use]
    pub fn body(&self) -> String {
        if self.acceptance_criteria.is_empty() {
            return self.description.clone();
        }
        let criteria: Vec<String> = self
            .acceptance_criteria
            .iter()
            .map(|c| format!("- {c}"))
            .collect();
        let list = criteria.join("\n");
        if self.description.is_empty() {
            format!("Acceptance Criteria:\n{list}")
        } else {
            format!("{}\n\nAcceptance Criteria:\n{list}", self.description)
        }
    }
}

/// The parsed tracker payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemBatch {
    /// Epics, in payload order.
    pub epics: Vec<WorkItemDraft>,
    /// Stories whose parent resolved (or that have none), in payload order.
    pub stories: Vec<WorkItemDraft>,
    /// Items rejected while parsing.
    pub rejected: Vec<FailedItem>,
}

impl WorkItemBatch {
    /// Total number of drafts, rejected ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.epics.len() + self.stories.len() + self.rejected.len()
    }

    /// Returns true if the payload had no work items at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A draft that exists in the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedItem {
    /// The draft.
    pub draft: WorkItemDraft,
    /// The tracker's issue key.
    pub external_id: String,
    /// True when an existing issue was found instead of creating one.
    #[serde(default)]
    pub reused: bool,
}

/// A draft that could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    /// The draft.
    pub draft: WorkItemDraft,
    /// Why it failed.
    pub error: TrackerItemError,
}

/// Counts derived from a [`TrackerSyncResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    /// Epics in the tracker after the sync.
    pub epics_created: usize,
    /// Stories in the tracker after the sync.
    pub stories_created: usize,
    /// Drafts that failed.
    pub failed: usize,
}

/// Outcome of one synchronization.
///
/// Every draft of the batch appears in exactly one of the two lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSyncResult {
    /// Drafts that exist in the tracker.
    pub created: Vec<CreatedItem>,
    /// Drafts that failed.
    pub failed: Vec<FailedItem>,
}

impl TrackerSyncResult {
    /// Derives the counts from the list lengths.
    #[must_use]
    pub fn counts(&self) -> SyncCounts {
        let created_of = |kind: WorkItemKind| {
            self.created
                .iter()
                .filter(|item| item.draft.kind == kind)
                .count()
        };
        SyncCounts {
            epics_created: created_of(WorkItemKind::Epic),
            stories_created: created_of(WorkItemKind::Story),
            failed: self.failed.len(),
        }
    }

    /// Human-readable summary, e.g. "Created 2 epics and 5 stories in Jira".
    #[must_use]
    pub fn summary(&self) -> String {
        let counts = self.counts();
        format!(
            "Created {} epics and {} stories in Jira",
            counts.epics_created, counts.stories_created
        )
    }

    /// Returns the tracker key for a local key, if that draft was created.
    #[must_use]
    pub fn external_id(&self, local_key: &str) -> Option<&str> {
        self.created
            .iter()
            .find(|item| item.draft.local_key == local_key)
            .map(|item| item.external_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_with_criteria() {
        let draft = WorkItemDraft::story("S1", "Login")
            .with_description("As a user I want to log in")
            .with_acceptance_criteria(["valid credentials work", "lockout after 5 tries"]);

        assert_eq!(
            draft.body(),
            "As a user I want to log in\n\nAcceptance Criteria:\n- valid credentials work\n- lockout after 5 tries"
        );
    }

    #[test]
    fn test_body_without_criteria() {
        let draft = WorkItemDraft::epic("E1", "Auth").with_description("Authentication");
        assert_eq!(draft.body(), "Authentication");
        assert_eq!(
            WorkItemDraft::story("S", "t").with_acceptance_criteria(["a"]).body(),
            "Acceptance Criteria:\n- a"
        );
    }

    #[test]
    fn test_counts_and_summary() {
        let result = TrackerSyncResult {
            created: vec![
                CreatedItem {
                    draft: WorkItemDraft::epic("E1", "Auth"),
                    external_id: "BA-1".to_string(),
                    reused: false,
                },
                CreatedItem {
                    draft: WorkItemDraft::story("S1", "Login").with_parent("E1"),
                    external_id: "BA-2".to_string(),
                    reused: true,
                },
            ],
            failed: vec![FailedItem {
                draft: WorkItemDraft::story("S2", "Logout"),
                error: TrackerItemError::Transport {
                    message: "connection reset".to_string(),
                },
            }],
        };

        assert_eq!(
            result.counts(),
            SyncCounts {
                epics_created: 1,
                stories_created: 1,
                failed: 1
            }
        );
        assert_eq!(result.summary(), "Created 1 epics and 1 stories in Jira");
        assert_eq!(result.external_id("S1"), Some("BA-2"));
        assert_eq!(result.external_id("S2"), None);
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(serde_json::to_value(WorkItemKind::Epic).unwrap(), "epic");
        assert_eq!(WorkItemKind::Story.to_string(), "story");
    }
}

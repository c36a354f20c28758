//! The tracker client seam.

use crate::errors::TrackerItemError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Fields of an issue to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Target project key.
    pub project_key: String,
    /// Issue type name, e.g. "Epic" or "Story".
    pub issue_type: String,
    /// Issue summary.
    pub summary: String,
    /// Issue body.
    pub description: String,
    /// Priority name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Tracker key of the parent epic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Remote issue tracker operations used by the synchronizer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Looks up an issue with exactly this summary and type.
    ///
    /// Returns the issue key when one exists.
    async fn find_issue(
        &self,
        project_key: &str,
        issue_type: &str,
        summary: &str,
    ) -> Result<Option<String>, TrackerItemError>;

    /// Creates an issue and returns its key.
    async fn create_issue(&self, request: &IssueRequest) -> Result<String, TrackerItemError>;
}

//! In-memory tracker client.

use crate::errors::TrackerItemError;
use crate::tracker::{IssueRequest, TrackerClient};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct State {
    issues: Vec<(String, IssueRequest)>,
    next_id: usize,
}

/// A tracker that keeps issues in memory.
///
/// Keys are `<PROJECT>-<n>`. Summaries registered with
/// [`RecordingTrackerClient::fail_on`] are rejected with the given error.
#[derive(Debug, Default)]
pub struct RecordingTrackerClient {
    state: Mutex<State>,
    failures: HashMap<String, TrackerItemError>,
}

impl RecordingTrackerClient {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects creation of issues with this summary.
    #[must_use]
    pub fn fail_on(mut self, summary: impl Into<String>, error: TrackerItemError) -> Self {
        self.failures.insert(summary.into(), error);
        self
    }

    /// Seeds an existing issue and returns its key.
    pub fn seed(&self, request: IssueRequest) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        let key = format!("{}-{}", request.project_key, state.next_id);
        state.issues.push((key.clone(), request));
        key
    }

    /// Returns every issue, seeded ones included, in creation order.
    #[must_use]
    pub fn issues(&self) -> Vec<(String, IssueRequest)> {
        self.state.lock().issues.clone()
    }
}

#[async_trait]
impl TrackerClient for RecordingTrackerClient {
    async fn find_issue(
        &self,
        project_key: &str,
        issue_type: &str,
        summary: &str,
    ) -> Result<Option<String>, TrackerItemError> {
        Ok(self
            .state
            .lock()
            .issues
            .iter()
            .find(|(_, issue)| {
                issue.project_key == project_key
                    && issue.issue_type == issue_type
                    && issue.summary == summary
            })
            .map(|(key, _)| key.clone()))
    }

    async fn create_issue(&self, request: &IssueRequest) -> Result<String, TrackerItemError> {
        if let Some(error) = self.failures.get(&request.summary) {
            return Err(error.clone());
        }
        Ok(self.seed(request.clone()))
    }
}

//! Issue tracker synchronization.
//!
//! This module provides:
//! - Parsing of the generated work item payload into drafts
//! - The [`TrackerClient`] seam and a Jira implementation
//! - A synchronizer that creates drafts with per-item failure handling

mod client;
#[cfg(feature = "jira")]
mod jira;
mod model;
mod parse;
mod sync;

pub use client::{IssueRequest, TrackerClient};
#[cfg(feature = "jira")]
pub use jira::JiraClient;
pub use model::{
    CreatedItem, FailedItem, SyncCounts, TrackerSyncResult, WorkItemBatch, WorkItemDraft,
    WorkItemKind,
};
pub use parse::parse_work_items;
pub use sync::TrackerSynchronizer;

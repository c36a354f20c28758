//! Lifecycle events.
//!
//! Sinks are injected into the executor and the synchronizer; there is no
//! process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names.
pub mod types {
    /// A stage is about to call its provider.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage produced output.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage failed, timed out, or was cancelled.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// A run finished, whatever its status.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A work item exists in the tracker.
    pub const TRACKER_ITEM_CREATED: &str = "tracker.item_created";
    /// A work item could not be created.
    pub const TRACKER_ITEM_FAILED: &str = "tracker.item_failed";
}

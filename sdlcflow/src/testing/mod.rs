//! Test doubles for the provider and tracker seams.
//!
//! These are public so downstream crates (the server, benchmarks) can drive
//! the whole workflow without network access.

mod provider;
mod tracker;

pub use provider::ScriptedProvider;
pub use tracker::RecordingTrackerClient;

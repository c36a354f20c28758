//! Core domain model types for sdlcflow.
//!
//! This module contains the fundamental types shared by the pipeline and
//! the aggregator:
//! - Stage and run status enums
//! - The per-stage execution record

mod result;
mod status;

pub use result::StageResult;
pub use status::{RunStatus, StageStatus};

//! Structured data extraction from generated text.
//!
//! This module provides:
//! - Mermaid diagram extraction with a keyword fallback for unfenced output
//! - JSON payload extraction through a layered fence fallback chain

mod diagrams;
mod json;

pub use diagrams::{extract_diagrams, ExtractedDiagram, MIN_DIAGRAM_CHARS};
pub use json::{extract_json, extract_json_as};

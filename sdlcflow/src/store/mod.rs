//! File-based artifact store.
//!
//! Each request overwrites the same three files, so the directory always
//! holds the latest results.

use crate::aggregate::Artifact;
use crate::errors::SdlcflowError;
use crate::extract::{extract_diagrams, extract_json, ExtractedDiagram};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Business analyst output file.
pub const BUSINESS_REQUIREMENTS_FILE: &str = "business_requirements.md";
/// Architect output file.
pub const TECHNICAL_DESIGN_FILE: &str = "technical_design.md";
/// Project manager output file.
pub const JIRA_ARTIFACTS_FILE: &str = "jira_artifacts.json";

/// The latest results as read back from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestResults {
    /// Business requirements, if the file exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_requirements: Option<String>,
    /// Technical design, if the file exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_design: Option<String>,
    /// Work item payload; raw text when it is not valid JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jira_artifacts: Option<Value>,
    /// Diagrams re-extracted from the technical design.
    #[serde(default)]
    pub diagrams: Vec<ExtractedDiagram>,
}

/// Reads and writes artifacts under one directory.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the artifact's three documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a file cannot be written.
    pub async fn persist(&self, artifact: &Artifact) -> Result<(), SdlcflowError> {
        fs::create_dir_all(&self.root).await?;
        for (name, content) in [
            (BUSINESS_REQUIREMENTS_FILE, &artifact.business_requirements),
            (TECHNICAL_DESIGN_FILE, &artifact.technical_design),
            (JIRA_ARTIFACTS_FILE, &artifact.jira_artifacts_raw),
        ] {
            fs::write(self.root.join(name), content).await?;
        }
        info!(dir = %self.root.display(), "Artifacts persisted");
        Ok(())
    }

    /// Reads back whichever of the three documents exist.
    ///
    /// # Errors
    ///
    /// Returns an error on any IO failure other than a missing file.
    pub async fn load_latest(&self) -> Result<LatestResults, SdlcflowError> {
        let business_requirements = self.read_optional(BUSINESS_REQUIREMENTS_FILE).await?;
        let technical_design = self.read_optional(TECHNICAL_DESIGN_FILE).await?;
        let jira_artifacts = self
            .read_optional(JIRA_ARTIFACTS_FILE)
            .await?
            .map(|raw| match extract_json(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "Stored work item payload is not JSON; returning raw text");
                    Value::String(raw)
                }
            });
        let diagrams = technical_design
            .as_deref()
            .map(extract_diagrams)
            .unwrap_or_default();

        Ok(LatestResults {
            business_requirements,
            technical_design,
            jira_artifacts,
            diagrams,
        })
    }

    /// Lists the stored `.md` and `.json` files, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub async fn list(&self) -> Result<Vec<String>, SdlcflowError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if (name.ends_with(".md") || name.ends_with(".json"))
                && entry.file_type().await?.is_file()
            {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Reads one stored file by name.
    ///
    /// # Errors
    ///
    /// Returns [`SdlcflowError::InvalidInput`] for names that could escape the
    /// store directory and [`SdlcflowError::NotFound`] for missing files.
    pub async fn read(&self, name: &str) -> Result<String, SdlcflowError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(SdlcflowError::InvalidInput(format!(
                "invalid file name '{name}'"
            )));
        }
        self.read_optional(name)
            .await?
            .ok_or_else(|| SdlcflowError::NotFound(format!("file '{name}'")))
    }

    async fn read_optional(&self, name: &str) -> Result<Option<String>, SdlcflowError> {
        match fs::read_to_string(self.root.join(name)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

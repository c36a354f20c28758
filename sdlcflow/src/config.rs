//! Runtime configuration.
//!
//! Every section deserializes with per-field defaults, so a partial JSON
//! document or an empty environment still yields a usable configuration.
//! Credentials are the only values without a default; [`SdlcConfig::validate`]
//! reports which ones are missing.

use crate::stages::agents::AgentsConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tracker (Jira) connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base URL of the Jira instance.
    #[serde(default)]
    pub server: String,
    /// Account used for basic auth.
    #[serde(default)]
    pub username: String,
    /// API token used for basic auth.
    #[serde(default, skip_serializing)]
    pub api_token: String,
    /// Project key used when a request does not name one.
    #[serde(default = "default_project_key")]
    pub default_project_key: String,
    /// Issue type name for epics.
    #[serde(default = "default_epic_issue_type")]
    pub epic_issue_type: String,
    /// Issue type name for stories.
    #[serde(default = "default_story_issue_type")]
    pub story_issue_type: String,
    /// Priority applied when a work item has none.
    #[serde(default = "default_priority")]
    pub priority: String,
    /// Request timeout in seconds.
    #[serde(default = "default_tracker_timeout")]
    pub timeout_seconds: u64,
}

fn default_project_key() -> String {
    "BA".to_string()
}

fn default_epic_issue_type() -> String {
    "Epic".to_string()
}

fn default_story_issue_type() -> String {
    "Story".to_string()
}

fn default_priority() -> String {
    "Medium".to_string()
}

fn default_tracker_timeout() -> u64 {
    30
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            username: String::new(),
            api_token: String::new(),
            default_project_key: default_project_key(),
            epic_issue_type: default_epic_issue_type(),
            story_issue_type: default_story_issue_type(),
            priority: default_priority(),
            timeout_seconds: default_tracker_timeout(),
        }
    }
}

impl TrackerConfig {
    /// Gets the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Returns true if server and credentials are all set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.server.is_empty() && !self.username.is_empty() && !self.api_token.is_empty()
    }
}

/// Completion service settings for the chat-completions provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Optional completion length limit.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// HTTP timeout in seconds. Stage timeouts apply on top of this.
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_llm_timeout() -> u64 {
    600
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_seconds: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    /// Gets the HTTP timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdlcConfig {
    /// Tracker settings.
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Agent personas and execution bounds.
    #[serde(default)]
    pub agents: AgentsConfig,
    /// Directory the artifact store writes to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

impl Default for SdlcConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            llm: LlmConfig::default(),
            agents: AgentsConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Outcome of [`SdlcConfig::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValidation {
    /// False when a required key is missing.
    pub valid: bool,
    /// Environment keys that must be set.
    pub missing_keys: Vec<String>,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
}

impl SdlcConfig {
    /// Reads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(server) = get("JIRA_SERVER") {
            config.tracker.server = server.trim_end_matches('/').to_string();
        }
        if let Some(username) = get("JIRA_USERNAME") {
            config.tracker.username = username;
        }
        if let Some(token) = get("JIRA_API_TOKEN") {
            config.tracker.api_token = token;
        }
        if let Some(project_key) = get("JIRA_PROJECT_KEY") {
            config.tracker.default_project_key = project_key;
        }
        if let Some(base_url) = get("LLM_BASE_URL") {
            config.llm.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.llm.api_key = get("LLM_API_KEY").or_else(|| get("OPENAI_API_KEY"));
        if let Some(model) = get("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Some(dir) = get("SDLCFLOW_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        config
    }

    /// Checks that the required credentials are present.
    #[must_use]
    pub fn validate(&self) -> ConfigValidation {
        let mut result = ConfigValidation {
            valid: true,
            ..ConfigValidation::default()
        };

        for (key, value) in [
            ("JIRA_SERVER", &self.tracker.server),
            ("JIRA_USERNAME", &self.tracker.username),
            ("JIRA_API_TOKEN", &self.tracker.api_token),
        ] {
            if value.is_empty() {
                result.missing_keys.push(key.to_string());
                result.valid = false;
            }
        }

        let server = &self.tracker.server;
        if !server.is_empty() && !server.starts_with("http://") && !server.starts_with("https://")
        {
            result
                .warnings
                .push("JIRA_SERVER should include protocol (http:// or https://)".to_string());
        }

        if self.llm.api_key.is_none() {
            result
                .warnings
                .push("LLM_API_KEY is not set; completion calls will fail".to_string());
        }

        result
    }
}

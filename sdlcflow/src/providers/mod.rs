//! Completion providers.
//!
//! The pipeline never talks to a model directly; each stage hands a
//! [`CompletionRequest`] to a [`CompletionProvider`] and gets text back.

#[cfg(feature = "chat-provider")]
mod chat;

#[cfg(feature = "chat-provider")]
pub use chat::ChatCompletionsProvider;

use crate::stages::AgentProfile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One completion call: the agent persona plus the rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Agent role.
    pub role: String,
    /// Agent goal.
    pub goal: String,
    /// Agent backstory.
    pub backstory: String,
    /// Rendered prompt, context section included.
    pub prompt: String,
    /// Description of the expected output.
    pub expected_output: String,
}

impl CompletionRequest {
    /// Creates a request for `agent`.
    #[must_use]
    pub fn new(
        agent: &AgentProfile,
        prompt: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            role: agent.role.clone(),
            goal: agent.goal.clone(),
            backstory: agent.backstory.clone(),
            prompt: prompt.into(),
            expected_output: expected_output.into(),
        }
    }

    /// Builds the system message describing the persona.
    #[must_use]
    pub fn system_prompt(&self) -> String {
        format!(
            "You are a {}. {}\n\nYour goal: {}",
            self.role, self.backstory, self.goal
        )
    }

    /// Builds the user message: the prompt followed by the expected output.
    #[must_use]
    pub fn user_prompt(&self) -> String {
        if self.expected_output.is_empty() {
            self.prompt.clone()
        } else {
            format!("{}\n\nExpected output: {}", self.prompt, self.expected_output)
        }
    }
}

/// Errors raised by completion providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// No API key configured.
    #[error("{provider}: API key not configured")]
    MissingApiKey {
        /// The provider name.
        provider: String,
    },

    /// The request never completed.
    #[error("Network error: {message}")]
    Network {
        /// Details of the failure.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The response body was not understood.
    #[error("Failed to parse response: {message}")]
    Parse {
        /// Details of the failure.
        message: String,
    },

    /// The response carried no text.
    #[error("Provider returned an empty completion")]
    EmptyResponse,

    /// Any other provider-specific failure.
    #[error("{0}")]
    Other(String),
}

/// A capability that turns a request into generated text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the provider name used in logs.
    fn name(&self) -> &str;

    /// Produces a completion for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

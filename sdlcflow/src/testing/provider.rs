//! Deterministic completion provider.

use crate::providers::{CompletionError, CompletionProvider, CompletionRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Script {
    reply: Reply,
    delay: Option<Duration>,
}

/// A provider that answers from a script keyed by agent role.
///
/// Records every request so tests can inspect the rendered prompts.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: HashMap<String, Script>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    /// Creates an empty script. Unscripted roles fail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `role` with `text`.
    #[must_use]
    pub fn respond(mut self, role: impl Into<String>, text: impl Into<String>) -> Self {
        self.scripts.insert(
            role.into(),
            Script {
                reply: Reply::Text(text.into()),
                delay: None,
            },
        );
        self
    }

    /// Answers `role` with `text` after `delay`.
    #[must_use]
    pub fn respond_after(
        mut self,
        role: impl Into<String>,
        text: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.scripts.insert(
            role.into(),
            Script {
                reply: Reply::Text(text.into()),
                delay: Some(delay),
            },
        );
        self
    }

    /// Fails `role` with `reason`.
    #[must_use]
    pub fn fail(mut self, role: impl Into<String>, reason: impl Into<String>) -> Self {
        self.scripts.insert(
            role.into(),
            Script {
                reply: Reply::Fail(reason.into()),
                delay: None,
            },
        );
        self
    }

    /// Answers every unscripted role with `text`.
    #[must_use]
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Returns every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Returns the prompts received, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|request| request.prompt.clone())
            .collect()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().push(request.clone());

        let Some(script) = self.scripts.get(&request.role) else {
            return self.fallback.clone().ok_or_else(|| {
                CompletionError::Other(format!("no scripted response for role '{}'", request.role))
            });
        };

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }
        match &script.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(reason) => Err(CompletionError::Other(reason.clone())),
        }
    }
}

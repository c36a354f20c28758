//! OpenAI-compatible chat completions provider.

use super::{CompletionError, CompletionProvider, CompletionRequest};
use crate::config::LlmConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const PROVIDER_NAME: &str = "chat-completions";

/// Calls `POST {base_url}/chat/completions` with a system and a user message.
#[derive(Debug, Clone)]
pub struct ChatCompletionsProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl ChatCompletionsProvider {
    /// Creates a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: LlmConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CompletionError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Returns the configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                {"role": "system", "content": request.system_prompt()},
                {"role": "user", "content": request.user_prompt()},
            ],
        });
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| CompletionError::MissingApiKey {
                provider: PROVIDER_NAME.to_string(),
            })?;

        let body = self.build_request_body(request);
        debug!(
            model = %self.config.model,
            role = %request.role,
            prompt_chars = request.prompt.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Network {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| CompletionError::Network {
            message: e.to_string(),
        })?;

        if !(200..300).contains(&status) {
            return Err(CompletionError::Http {
                status,
                message: body_text,
            });
        }

        parse_completion(&body_text)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn parse_completion(body: &str) -> Result<String, CompletionError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Parse {
            message: e.to_string(),
        })?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(CompletionError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::AgentProfile;

    fn provider(max_tokens: Option<u32>) -> ChatCompletionsProvider {
        ChatCompletionsProvider::new(LlmConfig {
            base_url: "http://localhost:9999/v1/".to_string(),
            max_tokens,
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            provider(None).endpoint(),
            "http://localhost:9999/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body() {
        let request = CompletionRequest::new(&AgentProfile::new("PM", "Plan", "Agile"), "Plan it", "");
        let body = provider(Some(2048)).build_request_body(&request);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Plan it");
        assert_eq!(body["max_tokens"], 2048);

        let body = provider(None).build_request_body(&request);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_completion() {
        let body = r##"{"choices": [{"message": {"role": "assistant", "content": "# Requirements"}}]}"##;
        assert_eq!(parse_completion(body).unwrap(), "# Requirements");
    }

    #[test]
    fn test_parse_completion_empty() {
        assert_eq!(
            parse_completion(r#"{"choices": []}"#).unwrap_err(),
            CompletionError::EmptyResponse
        );
        assert_eq!(
            parse_completion(r#"{"choices": [{"message": {"content": "  "}}]}"#).unwrap_err(),
            CompletionError::EmptyResponse
        );
        assert!(matches!(
            parse_completion("<html>").unwrap_err(),
            CompletionError::Parse { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let request = CompletionRequest::new(&AgentProfile::new("PM", "Plan", "Agile"), "p", "");
        let err = provider(None).complete(&request).await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey { .. }));
    }
}

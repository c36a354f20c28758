//! Jira REST tracker client.

use super::client::{IssueRequest, TrackerClient};
use crate::config::TrackerConfig;
use crate::errors::{TrackerItemError, PREVIEW_CHARS};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Search endpoints, newest first. Jira Cloud serves the enhanced JQL search
/// and retires the classic one; Server and Data Center only have the classic.
const SEARCH_PATHS: [&str; 2] = ["/rest/api/3/search/jql", "/rest/api/2/search"];

/// Characters with a meaning in Jira text search.
const TEXT_SEARCH_RESERVED: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '~', '*', '?', '\\', ':', '"',
    '/',
];

/// Talks to Jira with basic auth (username + API token).
#[derive(Debug, Clone)]
pub struct JiraClient {
    config: TrackerConfig,
    client: reqwest::Client,
}

impl JiraClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error when server or credentials are missing, or the HTTP
    /// client cannot be built.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerItemError> {
        if !config.is_configured() {
            return Err(TrackerItemError::Auth {
                message: "Jira server, username and API token must all be set".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TrackerItemError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.server.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, TrackerItemError> {
        let response = request
            .basic_auth(&self.config.username, Some(&self.config.api_token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TrackerItemError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TrackerItemError::Transport {
            message: e.to_string(),
        })?;

        if !(200..300).contains(&status) {
            return Err(TrackerItemError::from_status(status, error_message(&body)));
        }
        serde_json::from_str(&body).map_err(|e| TrackerItemError::Transport {
            message: format!("unreadable Jira response: {e}"),
        })
    }
}

#[async_trait]
impl TrackerClient for JiraClient {
    async fn find_issue(
        &self,
        project_key: &str,
        issue_type: &str,
        summary: &str,
    ) -> Result<Option<String>, TrackerItemError> {
        let Some(jql) = search_jql(project_key, issue_type, summary) else {
            return Ok(None);
        };
        debug!(jql = %jql, "Searching for existing issue");

        let mut body = None;
        for path in SEARCH_PATHS {
            let request = self.client.get(self.url(path)).query(&[
                ("jql", jql.as_str()),
                ("maxResults", "20"),
                ("fields", "summary"),
            ]);
            match self.send(request).await {
                Ok(found) => {
                    body = Some(found);
                    break;
                }
                Err(error) if is_missing_endpoint(&error) => {
                    debug!(path, "Search endpoint unavailable");
                }
                Err(error) => return Err(error),
            }
        }
        let Some(body) = body else {
            return Err(TrackerItemError::Remote {
                status: 404,
                message: "no issue search endpoint available".to_string(),
            });
        };
        let page: SearchPage =
            serde_json::from_value(body).map_err(|e| TrackerItemError::Transport {
                message: format!("unexpected search response: {e}"),
            })?;

        // `~` is a fuzzy text match; keep exact summaries only.
        Ok(page
            .issues
            .into_iter()
            .find(|issue| issue.fields.summary.trim() == summary.trim())
            .map(|issue| issue.key))
    }

    async fn create_issue(&self, request: &IssueRequest) -> Result<String, TrackerItemError> {
        let body = self
            .send(
                self.client
                    .post(self.url("/rest/api/2/issue"))
                    .json(&create_body(request)),
            )
            .await?;

        body.get("key")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TrackerItemError::Transport {
                message: "Jira response carried no issue key".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    issues: Vec<SearchIssue>,
}

#[derive(Debug, Deserialize)]
struct SearchIssue {
    key: String,
    fields: SearchFields,
}

#[derive(Debug, Deserialize)]
struct SearchFields {
    #[serde(default)]
    summary: String,
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Text search drops reserved characters rather than escaping them; results
/// are compared against the exact summary afterwards.
fn search_term(summary: &str) -> String {
    summary
        .split(|c: char| c.is_whitespace() || TEXT_SEARCH_RESERVED.contains(&c))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns `None` when the summary has nothing searchable left.
fn search_jql(project_key: &str, issue_type: &str, summary: &str) -> Option<String> {
    let term = search_term(summary);
    (!term.is_empty()).then(|| {
        format!(
            "project = {} AND issuetype = {} AND summary ~ {}",
            quote(project_key),
            quote(issue_type),
            quote(&term)
        )
    })
}

fn is_missing_endpoint(error: &TrackerItemError) -> bool {
    matches!(error, TrackerItemError::Remote { status: 404 | 410, .. })
}

fn create_body(request: &IssueRequest) -> Value {
    let mut fields = json!({
        "project": {"key": request.project_key},
        "summary": request.summary,
        "description": request.description,
        "issuetype": {"name": request.issue_type},
    });
    if let Some(priority) = &request.priority {
        fields["priority"] = json!({"name": priority});
    }
    if let Some(parent) = &request.parent {
        fields["parent"] = json!({"key": parent});
    }
    json!({"fields": fields})
}

/// Flattens Jira's `{"errorMessages": [...], "errors": {...}}` error shape.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let mut parts: Vec<String> = value
            .get("errorMessages")
            .and_then(Value::as_array)
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(errors) = value.get("errors").and_then(Value::as_object) {
            parts.extend(
                errors
                    .iter()
                    .map(|(field, msg)| format!("{field}: {}", msg.as_str().unwrap_or_default())),
            );
        }
        if !parts.is_empty() {
            return parts.join("; ");
        }
    }
    body.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_credentials() {
        assert!(matches!(
            JiraClient::new(TrackerConfig::default()).unwrap_err(),
            TrackerItemError::Auth { .. }
        ));

        let client = JiraClient::new(TrackerConfig {
            server: "https://example.atlassian.net/".to_string(),
            username: "bot".to_string(),
            api_token: "token".to_string(),
            ..TrackerConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.url("/rest/api/2/issue"),
            "https://example.atlassian.net/rest/api/2/issue"
        );
    }

    #[test]
    fn test_search_jql_quotes_fields() {
        assert_eq!(
            search_jql("BA", "Story", "Sign up").as_deref(),
            Some(r#"project = "BA" AND issuetype = "Story" AND summary ~ "Sign up""#)
        );
        assert_eq!(
            search_jql("BA", r#"Sub "task""#, "Sign up").as_deref(),
            Some(r#"project = "BA" AND issuetype = "Sub \"task\"" AND summary ~ "Sign up""#)
        );
    }

    #[test]
    fn test_search_term_drops_reserved_characters() {
        assert_eq!(search_term(r#"Say "hi" (v2) - OAuth/SSO: login?"#), "Say hi v2 OAuth SSO login");
        assert_eq!(search_term("C:\\temp && [draft]"), "C temp draft");
        assert_eq!(search_jql("BA", "Story", "?? -- !!"), None);
    }

    #[test]
    fn test_retired_search_endpoint_is_skipped() {
        let gone = TrackerItemError::from_status(410, "use /search/jql");
        let missing = TrackerItemError::from_status(404, "not found");
        let refused = TrackerItemError::from_status(401, "bad token");

        assert!(is_missing_endpoint(&gone));
        assert!(is_missing_endpoint(&missing));
        assert!(!is_missing_endpoint(&refused));
        assert_eq!(SEARCH_PATHS[0], "/rest/api/3/search/jql");
    }

    #[test]
    fn test_create_body() {
        let request = IssueRequest {
            project_key: "BA".to_string(),
            issue_type: "Story".to_string(),
            summary: "Sign up".to_string(),
            description: "As a visitor".to_string(),
            priority: Some("High".to_string()),
            parent: Some("BA-1".to_string()),
        };
        let body = create_body(&request);

        assert_eq!(body["fields"]["project"]["key"], "BA");
        assert_eq!(body["fields"]["issuetype"]["name"], "Story");
        assert_eq!(body["fields"]["priority"]["name"], "High");
        assert_eq!(body["fields"]["parent"]["key"], "BA-1");
    }

    #[test]
    fn test_create_body_without_optional_fields() {
        let request = IssueRequest {
            project_key: "BA".to_string(),
            issue_type: "Epic".to_string(),
            summary: "Accounts".to_string(),
            description: String::new(),
            priority: None,
            parent: None,
        };
        let body = create_body(&request);
        assert!(body["fields"].get("priority").is_none());
        assert!(body["fields"].get("parent").is_none());
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"errorMessages": ["Issue type is invalid"], "errors": {"priority": "not allowed"}}"#;
        assert_eq!(
            error_message(body),
            "Issue type is invalid; priority: not allowed"
        );
        assert_eq!(error_message("Service Unavailable"), "Service Unavailable");
    }
}

//! JSON payload extraction.
//!
//! Generated text is unreliable about fencing, so extraction walks a chain of
//! strategies and only gives up when every one of them fails:
//!
//! 1. the text starts with a ```` ```json ```` fence,
//! 2. a ```` ```json ```` fence appears somewhere in the text,
//! 3. the whole text is JSON.

use crate::errors::MalformedPayload;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;

const JSON_FENCE: &str = "```json";

#[allow(clippy::expect_used)]
static JSON_FENCE_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```json[^\n]*\n").expect("json fence opener pattern is valid")
});

/// Extracts the first JSON value from generated text.
///
/// # Errors
///
/// Returns [`MalformedPayload`] with a preview of `text` when no strategy
/// yields valid JSON.
pub fn extract_json(text: &str) -> Result<Value, MalformedPayload> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MalformedPayload::new("payload is empty", text));
    }

    if let Some(value) = leading_fence(trimmed) {
        return Ok(value);
    }
    if let Some(value) = embedded_fence(trimmed) {
        return Ok(value);
    }

    serde_json::from_str(trimmed).map_err(|e| {
        tracing::warn!(error = %e, "No JSON payload found in generated text");
        MalformedPayload::new(format!("no JSON payload found: {e}"), text)
    })
}

/// Extracts JSON and deserializes it into `T`.
///
/// # Errors
///
/// Returns [`MalformedPayload`] when extraction fails or the value does not
/// have the shape of `T`.
pub fn extract_json_as<T: DeserializeOwned>(text: &str) -> Result<T, MalformedPayload> {
    let value = extract_json(text)?;
    serde_json::from_value(value)
        .map_err(|e| MalformedPayload::new(format!("unexpected payload shape: {e}"), text))
}

/// Strategy 1: the text opens with a JSON fence. A missing closing fence is
/// tolerated, and anything after the first complete value is ignored.
fn leading_fence(trimmed: &str) -> Option<Value> {
    let rest = trimmed.strip_prefix(JSON_FENCE)?;
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    first_value(body)
}

/// Strategy 2: the first JSON fence anywhere in the text that holds a value.
fn embedded_fence(trimmed: &str) -> Option<Value> {
    JSON_FENCE_OPENER
        .find_iter(trimmed)
        .find_map(|opener| first_value(&trimmed[opener.end()..]))
}

/// Parses one JSON value from the start of `body`.
///
/// The value is read as a stream, so fences quoted inside JSON strings do not
/// end the body early.
fn first_value(body: &str) -> Option<Value> {
    serde_json::Deserializer::from_str(body)
        .into_iter::<Value>()
        .next()?
        .ok()
}

//! Parsing of the project manager's work item payload.
//!
//! The expected shape is `{"epics": [...], "stories": [...]}`, but field
//! names drift between generations, so the common synonyms are accepted.

use super::model::{FailedItem, WorkItemBatch, WorkItemDraft};
use crate::errors::{MalformedPayload, TrackerItemError};
use crate::extract::extract_json_as;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    #[serde(default)]
    epics: Vec<Value>,
    #[serde(default)]
    stories: Vec<Value>,
}

/// One payload entry with synonyms resolved and scalars coerced to text.
#[derive(Debug, Default)]
struct RawItem {
    key: Option<String>,
    title: Option<String>,
    description: Option<String>,
    epic_key: Option<String>,
    acceptance_criteria: Vec<String>,
    priority: Option<String>,
}

impl RawItem {
    /// Objects are read field by field; a bare string is taken as a title.
    fn from_value(value: &Value) -> Result<Self, &'static str> {
        match value {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            Value::String(title) => Ok(Self {
                title: Some(title.clone()),
                ..Self::default()
            }),
            Value::Null => Err("entry is null"),
            Value::Array(_) => Err("entry is a list, expected an object"),
            Value::Bool(_) | Value::Number(_) => Err("entry is a scalar, expected an object"),
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            key: field(fields, &["key", "id"]).and_then(scalar_text),
            title: field(fields, &["title", "summary", "name"]).and_then(scalar_text),
            description: field(fields, &["description"]).and_then(entry_text),
            epic_key: field(fields, &["epic_key", "epic", "parent", "epic_id"])
                .and_then(scalar_text),
            acceptance_criteria: field(fields, &["acceptance_criteria"])
                .map(criteria_lines)
                .unwrap_or_default(),
            priority: field(fields, &["priority"]).and_then(priority_name),
        }
    }
}

fn field<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| fields.get(*name).filter(|value| !value.is_null()))
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Renders any value as one line of text. Objects become `key: value` pairs.
fn entry_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(entry_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(fields) => fields
            .iter()
            .filter_map(|(name, value)| entry_text(value).map(|text| format!("{name}: {text}")))
            .collect::<Vec<_>>()
            .join("; "),
        scalar => return scalar_text(scalar),
    };
    (!text.is_empty()).then_some(text)
}

/// Acceptance criteria arrive as a list or as one newline-separated string.
fn criteria_lines(value: &Value) -> Vec<String> {
    let lines: Vec<String> = match value {
        Value::Array(entries) => entries.iter().filter_map(entry_text).collect(),
        Value::String(text) => text.lines().map(str::to_string).collect(),
        other => entry_text(other).into_iter().collect(),
    };
    lines
        .iter()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Numeric priorities follow Jira's default scheme, 1 being the highest.
fn priority_name(value: &Value) -> Option<String> {
    let name = match value.as_u64() {
        Some(1) => "Highest",
        Some(2) => "High",
        Some(3) => "Medium",
        Some(4) => "Low",
        Some(5) => "Lowest",
        _ => return scalar_text(value),
    };
    Some(name.to_string())
}

/// Parses generated text into a batch of work item drafts.
///
/// Epics without a key become `EPIC-<n>` and stories without one become
/// `STORY-<n>` (1-based payload position). A story's parent reference is
/// matched against epic keys first and epic titles second; a story whose
/// reference matches neither lands in [`WorkItemBatch::rejected`]. A title
/// that is missing falls back to the item key.
///
/// Entries are read leniently and one at a time: scalar fields are coerced to
/// text, and an entry that is not an object is rejected on its own without
/// affecting the rest of the batch.
///
/// # Errors
///
/// Returns [`MalformedPayload`] when no JSON object with the expected shape
/// can be extracted.
pub fn parse_work_items(text: &str) -> Result<WorkItemBatch, MalformedPayload> {
    let payload: RawPayload = extract_json_as(text)?;
    let mut batch = WorkItemBatch::default();
    let mut rejected = Vec::new();

    for (index, value) in payload.epics.iter().enumerate() {
        let fallback = format!("EPIC-{}", index + 1);
        match RawItem::from_value(value) {
            Ok(raw) => {
                let key = raw.key.clone().unwrap_or(fallback);
                let mut draft = WorkItemDraft::epic(&key, title_or(raw.title.clone(), &key));
                fill(&mut draft, raw);
                batch.epics.push(draft);
            }
            Err(reason) => {
                rejected.push(invalid(WorkItemDraft::epic(&fallback, &fallback), reason));
            }
        }
    }

    let epic_keys: HashSet<&str> = batch.epics.iter().map(|e| e.local_key.as_str()).collect();
    let rejected_epics: HashSet<String> =
        rejected.iter().map(|f| f.draft.local_key.clone()).collect();
    let mut stories = Vec::new();

    for (index, value) in payload.stories.iter().enumerate() {
        let fallback = format!("STORY-{}", index + 1);
        let raw = match RawItem::from_value(value) {
            Ok(raw) => raw,
            Err(reason) => {
                rejected.push(invalid(WorkItemDraft::story(&fallback, &fallback), reason));
                continue;
            }
        };

        let key = raw.key.clone().unwrap_or(fallback);
        let mut draft = WorkItemDraft::story(&key, title_or(raw.title.clone(), &key));
        let reference = raw.epic_key.clone();
        fill(&mut draft, raw);

        let Some(reference) = reference else {
            stories.push(draft);
            continue;
        };
        let resolved = if epic_keys.contains(reference.as_str()) {
            Some(reference.clone())
        } else {
            batch
                .epics
                .iter()
                .find(|epic| epic.title.eq_ignore_ascii_case(&reference))
                .map(|epic| epic.local_key.clone())
        };
        match resolved {
            Some(parent) => stories.push(draft.with_parent(parent)),
            None if rejected_epics.contains(&reference) => {
                rejected.push(FailedItem {
                    error: TrackerItemError::ParentNotCreated {
                        epic_key: reference.clone(),
                    },
                    draft: draft.with_parent(reference),
                });
            }
            None => {
                tracing::warn!(story = %key, epic_key = %reference, "Story references unknown epic");
                rejected.push(FailedItem {
                    error: TrackerItemError::UnresolvedParent {
                        story: key,
                        epic_key: reference.clone(),
                    },
                    draft: draft.with_parent(reference),
                });
            }
        }
    }

    batch.stories = stories;
    batch.rejected = rejected;
    Ok(batch)
}

fn invalid(draft: WorkItemDraft, reason: &str) -> FailedItem {
    tracing::warn!(
        key = %draft.local_key,
        kind = %draft.kind,
        reason,
        "Skipping malformed work item"
    );
    FailedItem {
        error: TrackerItemError::InvalidItem {
            key: draft.local_key.clone(),
            reason: reason.to_string(),
        },
        draft,
    }
}

fn title_or(title: Option<String>, key: &str) -> String {
    title.filter(|t| !t.is_empty()).unwrap_or_else(|| key.to_string())
}

fn fill(draft: &mut WorkItemDraft, raw: RawItem) {
    draft.description = raw.description.map(|d| d.trim().to_string()).unwrap_or_default();
    draft.acceptance_criteria = raw.acceptance_criteria;
    draft.priority = raw.priority;
}

//! Prompt rendering with context injection.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("placeholder pattern is valid")
});

const CONTEXT_HEADING: &str = "## Context from previous stages";

/// Inputs shared by every stage of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineInput {
    /// The free-text requirements.
    pub user_input: String,
    /// Tracker project key the work items are destined for.
    pub project_key: String,
    /// Additional template variables.
    pub extra: HashMap<String, String>,
}

impl PipelineInput {
    /// Creates a new pipeline input.
    #[must_use]
    pub fn new(user_input: impl Into<String>, project_key: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            project_key: project_key.into(),
            extra: HashMap::new(),
        }
    }

    /// Adds an extra template variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "user_input" => Some(&self.user_input),
            "project_key" => Some(&self.project_key),
            _ => self.extra.get(key).map(String::as_str),
        }
    }
}

/// Output of an earlier stage injected into a later stage's prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextEntry<'a> {
    /// The context stage name.
    pub stage: &'a str,
    /// The agent role of the context stage.
    pub role: &'a str,
    /// The raw output of the context stage.
    pub output: &'a str,
}

/// Substitutes known placeholders and appends the context section.
///
/// Unknown placeholders are left untouched so literal braces in templates
/// (JSON examples, for instance) survive rendering.
pub(crate) fn render(template: &str, input: &PipelineInput, context: &[ContextEntry<'_>]) -> String {
    let mut prompt = PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            input
                .lookup(&caps[1])
                .map_or_else(|| caps[0].to_string(), str::to_string)
        })
        .into_owned();

    if !context.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(CONTEXT_HEADING);
        for entry in context {
            prompt.push_str(&format!(
                "\n\n### {} ({})\n\n{}",
                entry.role,
                entry.stage,
                entry.output.trim()
            ));
        }
    }

    prompt
}

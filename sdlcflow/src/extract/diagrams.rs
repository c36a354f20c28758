//! Mermaid diagram extraction.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Diagram bodies with this many characters or fewer are treated as noise.
pub const MIN_DIAGRAM_CHARS: usize = 10;

#[allow(clippy::expect_used)]
static FENCED_MERMAID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```mermaid[^\n]*\n(.*?)```").expect("fenced mermaid pattern is valid")
});

#[allow(clippy::expect_used)]
static DIAGRAM_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:graph|flowchart)\s+(?:TB|TD|BT|RL|LR)\b|sequenceDiagram\b|erDiagram\b|stateDiagram(?:-v2)?\b)",
    )
    .expect("diagram keyword pattern is valid")
});

/// A diagram pulled out of generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDiagram {
    /// Sequential title ("Diagram 1", "Diagram 2", ...).
    pub title: String,
    /// Raw diagram source, trimmed.
    pub code: String,
}

/// Extracts every diagram from `text`, in order of appearance.
///
/// Fenced ```` ```mermaid ```` blocks are preferred. When the text contains
/// none, bodies starting with a known diagram keyword are picked up instead,
/// each running until the next blank line, heading or diagram keyword.
#[must_use]
pub fn extract_diagrams(text: &str) -> Vec<ExtractedDiagram> {
    let mut bodies = fenced_bodies(text);
    if bodies.is_empty() {
        bodies = keyword_bodies(text);
    }

    let diagrams: Vec<ExtractedDiagram> = bodies
        .into_iter()
        .map(|body| body.trim().to_string())
        .filter(|code| code.chars().count() > MIN_DIAGRAM_CHARS)
        .enumerate()
        .map(|(index, code)| ExtractedDiagram {
            title: format!("Diagram {}", index + 1),
            code,
        })
        .collect();

    tracing::debug!(count = diagrams.len(), "Extracted diagrams");
    diagrams
}

fn fenced_bodies(text: &str) -> Vec<String> {
    FENCED_MERMAID
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn keyword_bodies(text: &str) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if DIAGRAM_KEYWORD.is_match(trimmed) {
            if let Some(done) = current.take() {
                bodies.push(done.join("\n"));
            }
            current = Some(vec![line]);
            continue;
        }

        if let Some(lines) = current.as_mut() {
            if trimmed.is_empty() || trimmed.starts_with('#') {
                bodies.push(lines.join("\n"));
                current = None;
            } else {
                lines.push(line);
            }
        }
    }

    if let Some(done) = current {
        bodies.push(done.join("\n"));
    }

    bodies
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DESIGN: &str = "# Technical Design\n\n\
        ## Flow\n\n\
        ```mermaid\n\
        graph TD\n    A[Client] --> B[API]\n\
        ```\n\n\
        Some prose between diagrams.\n\n\
        ```mermaid\n\
        sequenceDiagram\n    Client->>API: POST /orders\n\
        ```\n\n\
        ```mermaid\n\
        erDiagram\n    ORDER ||--o{ LINE : contains\n\
        ```\n";

    #[test]
    fn test_fenced_blocks_in_source_order() {
        let diagrams = extract_diagrams(DESIGN);

        assert_eq!(diagrams.len(), 3);
        assert_eq!(diagrams[0].title, "Diagram 1");
        assert!(diagrams[0].code.starts_with("graph TD"));
        assert!(diagrams[1].code.starts_with("sequenceDiagram"));
        assert!(diagrams[2].code.starts_with("erDiagram"));
        assert_eq!(diagrams[2].title, "Diagram 3");
    }

    #[test]
    fn test_fenced_blocks_are_trimmed() {
        let text = "```mermaid\n\n   graph LR\n  A --> B   \n\n```";
        let diagrams = extract_diagrams(text);

        assert_eq!(diagrams.len(), 1);
        assert_eq!(diagrams[0].code, "graph LR\n  A --> B");
    }

    #[test]
    fn test_keyword_fallback_single_body() {
        let text = "Here is the flow:\n\n\
            sequenceDiagram\n    User->>App: login\n    App-->>User: token\n\n\
            That concludes the design.";
        let diagrams = extract_diagrams(text);

        assert_eq!(diagrams.len(), 1);
        assert_eq!(
            diagrams[0].code,
            "sequenceDiagram\n    User->>App: login\n    App-->>User: token"
        );
    }

    #[test]
    fn test_keyword_fallback_stops_at_heading_and_next_keyword() {
        let text = "graph TD\n    A --> B\n## Data model\nerDiagram\n    USER ||--o{ ORDER : places\nstateDiagram-v2\n    [*] --> Draft\n";
        let diagrams = extract_diagrams(text);

        assert_eq!(diagrams.len(), 3);
        assert_eq!(diagrams[0].code, "graph TD\n    A --> B");
        assert_eq!(diagrams[1].code, "erDiagram\n    USER ||--o{ ORDER : places");
        assert_eq!(diagrams[2].code, "stateDiagram-v2\n    [*] --> Draft");
    }

    #[test]
    fn test_fallback_ignored_when_fences_present() {
        let text = "graph TD\n    X --> Y\n\n```mermaid\nflowchart LR\n    A --> B\n```";
        let diagrams = extract_diagrams(text);

        assert_eq!(diagrams.len(), 1);
        assert!(diagrams[0].code.starts_with("flowchart LR"));
    }

    #[test]
    fn test_short_bodies_are_discarded() {
        let text = "```mermaid\ngraph TD\n```\n\n```mermaid\ngraph TD\n    A --> B\n```";
        let diagrams = extract_diagrams(text);

        assert_eq!(diagrams.len(), 1);
        assert_eq!(diagrams[0].title, "Diagram 1");
    }

    #[test]
    fn test_fenced_and_fallback_bodies_share_filtering() {
        let fenced = extract_diagrams("```mermaid\n  erDiagram\n    A ||--o{ B : has\n```");
        let bare = extract_diagrams("  erDiagram\n    A ||--o{ B : has\n");

        assert_eq!(fenced, bare);
        assert_eq!(fenced[0].code, "erDiagram\n    A ||--o{ B : has");
    }

    #[test]
    fn test_no_diagrams() {
        assert!(extract_diagrams("").is_empty());
        assert!(extract_diagrams("Just a paragraph about graphs.").is_empty());
    }

    #[test]
    fn test_extraction_is_repeatable() {
        assert_eq!(extract_diagrams(DESIGN), extract_diagrams(DESIGN));
    }
}

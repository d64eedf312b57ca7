//! Validation of free-form markdown documents (architecture, UX, data model)
//!
//! A document is rejected when it is empty, when it opens with a refusal,
//! when it opens with commentary about the document instead of the document
//! itself, or when it is shorter than the minimum line count.

use regex::Regex;
use std::sync::LazyLock;

use crate::ValidationError;
use crate::canonical::canonicalize;

/// Patterns that indicate meta-commentary rather than actual content
static META_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // "I have created the architecture above"
        Regex::new(r"(?i)^.{0,50}I('ve| have) (created|generated|produced|written|designed|made)")
            .unwrap(),
        Regex::new(r"(?i)^(Perfect!|Great!|Excellent!|Certainly!|Sure!|Absolutely!)").unwrap(),
        Regex::new(r"(?i)^.{0,50}(here is|below is|the following is) (a |the |an )?(comprehensive|detailed|complete)")
            .unwrap(),
        Regex::new(r"(?i)^.{0,30}I('ll| will) (create|generate|write|produce|design)").unwrap(),
        Regex::new(r"(?i)^.{0,80}(the|your) (architecture|design|document|specification) (is|has been) (above|attached|complete)")
            .unwrap(),
    ]
});

/// Openings that mean the model declined the task
static REFUSAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)^(I'm sorry|I am sorry|Sorry,|Unfortunately,)").unwrap(),
        Regex::new(r"(?i)^I (cannot|can't|can not|am unable to|'m unable to|won't)").unwrap(),
        Regex::new(r"(?i)^As an AI\b").unwrap(),
    ]
});

/// Shape requirements for one kind of document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRules {
    pub label: &'static str,
    pub min_lines: usize,
}

impl DocumentRules {
    pub const ARCHITECTURE: Self = Self {
        label: "architecture",
        min_lines: 3,
    };

    pub const UX_DESIGN: Self = Self {
        label: "UX design",
        min_lines: 3,
    };

    pub const DATA_MODEL: Self = Self {
        label: "data model",
        min_lines: 3,
    };
}

/// Validate and canonicalize a document reply.
///
/// Returns the canonical text on success. Blank lines do not count towards
/// the minimum.
pub fn validate_document(raw: &str, rules: DocumentRules) -> Result<String, ValidationError> {
    let content = canonicalize(raw);
    if content.is_empty() {
        return Err(ValidationError::Empty {
            document: rules.label,
        });
    }

    let prefix: String = content.chars().take(200).collect();

    if let Some(m) = first_match(&REFUSAL_PATTERNS, &prefix) {
        return Err(ValidationError::Refusal { pattern: m });
    }
    if let Some(m) = first_match(&META_PATTERNS, &prefix) {
        return Err(ValidationError::MetaSummaryDetected { pattern: m });
    }

    let line_count = content.lines().filter(|l| !l.trim().is_empty()).count();
    if line_count < rules.min_lines {
        return Err(ValidationError::TooShort {
            document: rules.label,
            actual: line_count,
            minimum: rules.min_lines,
        });
    }

    Ok(content)
}

fn first_match(patterns: &[Regex], prefix: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.find(prefix))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaforge_utils::error::MalformedKind;

    const ARCH: &str = "# System Architecture\n\n## Components\n- API server (Express)\n- SPA (React)\n\n## Data Flow\nClient calls REST endpoints.";

    #[test]
    fn test_valid_architecture_passes_and_is_canonical() {
        let raw = format!("```markdown\n{ARCH}\n```\n\n");
        assert_eq!(validate_document(&raw, DocumentRules::ARCHITECTURE).unwrap(), ARCH);
    }

    #[test]
    fn test_empty_document() {
        let err = validate_document("```\n```", DocumentRules::UX_DESIGN).unwrap_err();
        assert!(matches!(err, ValidationError::Empty { document: "UX design" }));
        assert_eq!(err.kind(), MalformedKind::UnparsableOutput);
    }

    #[test]
    fn test_meta_summary_rejected() {
        let raw = "I have created the architecture above.\nIt covers everything.\nLet me know.";
        assert!(matches!(
            validate_document(raw, DocumentRules::ARCHITECTURE),
            Err(ValidationError::MetaSummaryDetected { .. })
        ));

        let raw = "Here is the complete UX specification.\n\n# Screens\n- Home";
        assert!(matches!(
            validate_document(raw, DocumentRules::UX_DESIGN),
            Err(ValidationError::MetaSummaryDetected { .. })
        ));
    }

    #[test]
    fn test_refusal_rejected() {
        let raw = "I'm sorry, but I can't help with that request.\nPlease try again.\nThanks.";
        assert!(matches!(
            validate_document(raw, DocumentRules::ARCHITECTURE),
            Err(ValidationError::Refusal { .. })
        ));
    }

    #[test]
    fn test_too_short() {
        let err = validate_document("# Architecture\n\nMonolith.", DocumentRules::ARCHITECTURE)
            .unwrap_err();
        match err {
            ValidationError::TooShort {
                actual, minimum, ..
            } => {
                assert_eq!(actual, 2);
                assert_eq!(minimum, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_heading_starting_with_i_is_not_meta() {
        let raw = "# Interface Design\n\nIt has three screens.\n- Home\n- Detail";
        assert!(validate_document(raw, DocumentRules::UX_DESIGN).is_ok());
    }
}

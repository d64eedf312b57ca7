//! Requirements-stage response parsing
//!
//! The requirements prompt asks for one JSON object:
//!
//! ```json
//! {"sufficient": true, "guidance": "", "refined_requirements": "...", "user_stories": [...]}
//! ```
//!
//! Models often surround the object with prose or a code fence, so the object
//! is located by taking everything from the first `{` to the last `}`.

use serde::{Deserialize, Serialize};

use crate::ValidationError;
use crate::canonical::canonicalize;

/// One user story produced alongside the refined requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStory {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub business_value: String,
    #[serde(default)]
    pub story_points: Option<u32>,
}

/// Validated output of the requirements stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementsAnalysis {
    pub refined_requirements: String,
    pub user_stories: Vec<UserStory>,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    sufficient: Option<bool>,
    #[serde(default)]
    guidance: serde_json::Value,
    #[serde(default)]
    refined_requirements: Option<String>,
    #[serde(default)]
    user_stories: Option<serde_json::Value>,
}

/// Slice of `text` from the first `{` to the last `}` inclusive
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Validate a requirements-stage reply.
///
/// # Errors
///
/// - [`ValidationError::InsufficientInput`] when the model reports
///   `sufficient: false`; the error carries the model's guidance
/// - [`ValidationError::Unparsable`] when no object can be decoded, when
///   `sufficient` is missing, when `refined_requirements` is empty, or when
///   `user_stories` is present but not an array of stories
pub fn validate_requirements(raw: &str) -> Result<RequirementsAnalysis, ValidationError> {
    let json = extract_json_object(raw).ok_or_else(|| ValidationError::Unparsable {
        reason: "no JSON object found in response".to_string(),
    })?;

    let parsed: RawAnalysis =
        serde_json::from_str(json).map_err(|e| ValidationError::Unparsable {
            reason: format!("response JSON could not be decoded: {e}"),
        })?;

    let sufficient = parsed.sufficient.ok_or_else(|| ValidationError::Unparsable {
        reason: "response is missing the 'sufficient' flag".to_string(),
    })?;

    if !sufficient {
        return Err(ValidationError::InsufficientInput {
            guidance: guidance_text(&parsed.guidance),
        });
    }

    let refined = parsed
        .refined_requirements
        .as_deref()
        .map(canonicalize)
        .unwrap_or_default();
    if refined.is_empty() {
        return Err(ValidationError::Unparsable {
            reason: "refined_requirements is empty".to_string(),
        });
    }

    let user_stories = match parsed.user_stories {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(value @ serde_json::Value::Array(_)) => {
            serde_json::from_value(value).map_err(|e| ValidationError::Unparsable {
                reason: format!("user_stories entries are malformed: {e}"),
            })?
        }
        Some(_) => {
            return Err(ValidationError::Unparsable {
                reason: "user_stories must be an array".to_string(),
            });
        }
    };

    Ok(RequirementsAnalysis {
        refined_requirements: refined,
        user_stories,
    })
}

/// Guidance may come back as a string or as a list of questions
fn guidance_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|q| format!("- {}", q.trim()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

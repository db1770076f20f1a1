//! crates/explorer_core/src/outline.rs
//!
//! Outline sections, their normalization, and validation of JSON-authored outlines.

use crate::domain::local_id;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Skeleton shown in the JSON editor of a fresh outline form.
pub const DEFAULT_OUTLINE_JSON: &str = r#"{
  "sections": [
    {
      "title": "Introduction",
      "subsections": [
        "Hook",
        "Background",
        "Thesis"
      ]
    }
  ]
}"#;

/// Validation failures of an outline submission.
///
/// The messages are shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutlineError {
    #[error("Add a topic first.")]
    MissingTopic,
    #[error("Add at least one section.")]
    NoSections,
    #[error("Paste JSON with sections and subsections.")]
    EmptyJson,
    #[error("JSON must include a sections array.")]
    MissingSections,
    #[error("Each JSON section needs a title.")]
    MissingTitle,
    #[error("{0}")]
    InvalidJson(String),
    #[error("Report generation did not finish.")]
    Incomplete,
}

/// One normalized outline section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub title: String,
    #[serde(default)]
    pub subsections: Vec<String>,
}

impl OutlineSection {
    pub fn new<S: Into<String>>(title: impl Into<String>, subsections: impl IntoIterator<Item = S>) -> Self {
        Self {
            title: title.into(),
            subsections: subsections.into_iter().map(Into::into).collect(),
        }
    }
}

/// An editable row of the manual outline editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSection {
    pub id: String,
    pub title: String,
    pub subsections: Vec<String>,
}

impl DraftSection {
    /// A blank row with a single empty subsection line.
    pub fn empty() -> Self {
        Self {
            id: local_id(),
            title: String::new(),
            subsections: vec![String::new()],
        }
    }
}

/// Trims titles and subsections, drops untitled sections and empty subsections,
/// and removes sections whose title repeats an earlier one (case-insensitive).
pub fn normalize_outline_sections<'a, I>(sections: I) -> Vec<OutlineSection>
where
    I: IntoIterator<Item = (&'a str, Vec<&'a str>)>,
{
    let mut seen = HashSet::new();
    sections
        .into_iter()
        .filter_map(|(title, subsections)| {
            let title = title.trim();
            if title.is_empty() {
                return None;
            }
            let subsections = subsections
                .into_iter()
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect();
            Some(OutlineSection {
                title: title.to_string(),
                subsections,
            })
        })
        .filter(|section| seen.insert(section.title.to_lowercase()))
        .collect()
}

pub fn normalize_drafts(drafts: &[DraftSection]) -> Vec<OutlineSection> {
    normalize_outline_sections(drafts.iter().map(|draft| {
        (
            draft.title.as_str(),
            draft.subsections.iter().map(String::as_str).collect(),
        )
    }))
}

pub fn normalize_sections(sections: &[OutlineSection]) -> Vec<OutlineSection> {
    normalize_outline_sections(sections.iter().map(|section| {
        (
            section.title.as_str(),
            section.subsections.iter().map(String::as_str).collect(),
        )
    }))
}

/// Normalizes loosely shaped JSON: either `{"sections": [...]}` or a bare array.
/// Non-string titles and subsection entries are treated as empty.
pub fn normalize_outline_value(candidate: &Value) -> Vec<OutlineSection> {
    let sections = candidate
        .get("sections")
        .and_then(Value::as_array)
        .or_else(|| candidate.as_array());
    let Some(sections) = sections else {
        return Vec::new();
    };
    normalize_outline_sections(sections.iter().map(|section| {
        let title = section.get("title").and_then(Value::as_str).unwrap_or("");
        let subsections = section
            .get("subsections")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        (title, subsections)
    }))
}

/// Result of validating the JSON outline editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOutlineValidation {
    pub trimmed_input: String,
    pub sections: Vec<OutlineSection>,
    pub error: Option<OutlineError>,
}

/// Validates raw JSON outline text.
///
/// Empty input is not an error here (the form is simply not submittable yet).
pub fn validate_outline_json(input: &str) -> JsonOutlineValidation {
    let trimmed_input = input.trim().to_string();
    let invalid = |trimmed_input: String, error: OutlineError| JsonOutlineValidation {
        trimmed_input,
        sections: Vec::new(),
        error: Some(error),
    };
    if trimmed_input.is_empty() {
        return JsonOutlineValidation {
            trimmed_input,
            sections: Vec::new(),
            error: None,
        };
    }

    let parsed: Value = match serde_json::from_str(&trimmed_input) {
        Ok(parsed) => parsed,
        Err(e) => return invalid(trimmed_input, OutlineError::InvalidJson(e.to_string())),
    };

    let Some(raw_sections) = parsed.get("sections").and_then(Value::as_array) else {
        return invalid(trimmed_input, OutlineError::MissingSections);
    };
    let sections = normalize_outline_value(&Value::Array(raw_sections.clone()));
    if raw_sections.is_empty() || sections.is_empty() {
        return invalid(trimmed_input, OutlineError::MissingSections);
    }

    let has_invalid_section = raw_sections.iter().any(|section| {
        let title_ok = section
            .get("title")
            .and_then(Value::as_str)
            .is_some_and(|title| !title.trim().is_empty());
        let subsections_ok = section.get("subsections").is_some_and(Value::is_array);
        !(title_ok && subsections_ok)
    });
    if has_invalid_section {
        return invalid(trimmed_input, OutlineError::MissingTitle);
    }

    JsonOutlineValidation {
        trimmed_input,
        sections,
        error: None,
    }
}

/// Human-readable summary of a manually authored outline, used as the user message.
pub fn describe_outline(topic: &str, sections: &[OutlineSection]) -> String {
    let structure = sections
        .iter()
        .map(|section| {
            let lines = section
                .subsections
                .iter()
                .map(|entry| format!("- {}", entry))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{}\n{}", section.title, lines)
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Outline topic: {}\n\nStructure:\n\n{}", topic, structure)
}

/// Summary of a JSON-authored outline, quoting the JSON as entered.
pub fn describe_json_outline(topic: &str, trimmed_json: &str) -> String {
    format!("Outline topic: {}\n\nUse this JSON:\n{}", topic, trimmed_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalization_trims_and_deduplicates_case_insensitively() {
        let sections = vec![
            OutlineSection::new("  Intro ", [" Hook ", "", "Thesis"]),
            OutlineSection::new("", ["orphan"]),
            OutlineSection::new("INTRO", ["duplicate"]),
            OutlineSection::new("Body", Vec::<String>::new()),
        ];
        let normalized = normalize_sections(&sections);
        assert_eq!(
            normalized,
            vec![
                OutlineSection::new("Intro", ["Hook", "Thesis"]),
                OutlineSection::new("Body", Vec::<String>::new()),
            ]
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let sections = vec![
            OutlineSection::new(" A ", ["  x", " "]),
            OutlineSection::new("a", ["y"]),
            OutlineSection::new("B", ["z "]),
        ];
        let once = normalize_sections(&sections);
        let twice = normalize_sections(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_sections_array_is_rejected() {
        let validation = validate_outline_json(r#"{"sections":[]}"#);
        assert_eq!(validation.error, Some(OutlineError::MissingSections));
        assert_eq!(
            validation.error.unwrap().to_string(),
            "JSON must include a sections array."
        );
    }

    #[test]
    fn minimal_valid_outline_passes() {
        let validation = validate_outline_json(r#"{"sections":[{"title":"A","subsections":[]}]}"#);
        assert_eq!(validation.error, None);
        assert_eq!(validation.sections, vec![OutlineSection::new("A", Vec::<String>::new())]);
    }

    #[test]
    fn section_without_subsections_array_needs_a_title_message() {
        let validation = validate_outline_json(
            r#"{"sections":[{"title":"A","subsections":[]},{"title":"B"}]}"#,
        );
        assert_eq!(validation.error, Some(OutlineError::MissingTitle));
    }

    #[test]
    fn all_untitled_sections_report_missing_sections() {
        let validation = validate_outline_json(r#"{"sections":[{"title":" ","subsections":[]}]}"#);
        assert_eq!(validation.error, Some(OutlineError::MissingSections));
    }

    #[test]
    fn syntax_errors_are_distinguishable() {
        let validation = validate_outline_json("{\"sections\": [");
        assert!(matches!(validation.error, Some(OutlineError::InvalidJson(_))));
    }

    #[test]
    fn blank_input_has_no_error_and_no_sections() {
        let validation = validate_outline_json("   ");
        assert_eq!(validation.error, None);
        assert!(validation.sections.is_empty());
        assert_eq!(validation.trimmed_input, "");
    }

    #[test]
    fn default_skeleton_is_valid() {
        let validation = validate_outline_json(DEFAULT_OUTLINE_JSON);
        assert_eq!(validation.error, None);
        assert_eq!(validation.sections[0].subsections.len(), 3);
    }

    #[test]
    fn manual_outline_summary_lists_subsections() {
        let summary = describe_outline("Ports", &[OutlineSection::new("Intro", ["Hook"])]);
        assert_eq!(summary, "Outline topic: Ports\n\nStructure:\n\nIntro\n- Hook");
    }
}

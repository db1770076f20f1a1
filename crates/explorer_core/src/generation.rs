//! crates/explorer_core/src/generation.rs
//!
//! Report generation request payloads and the events streamed back while a
//! report is being written.

use crate::domain::UserProfile;
use crate::outline::OutlineSection;
use crate::presets::ModelsPayload;
use crate::report::ReportPayload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    GenerateReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    Report,
    ReportWithOutline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlinePayload {
    pub report_title: String,
    pub sections: Vec<OutlineSection>,
}

/// Body of a report generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub mode: GenerationMode,
    #[serde(rename = "return")]
    pub return_kind: ReturnKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Requested number of sections for topic-only requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<OutlinePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelsPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub subject_exclusions: Vec<String>,
    pub subject_inclusions: Vec<String>,
}

impl GenerateRequest {
    pub fn for_topic(topic: impl Into<String>, section_count: u32) -> Self {
        Self {
            mode: GenerationMode::GenerateReport,
            return_kind: ReturnKind::Report,
            topic: Some(topic.into()),
            sections: Some(section_count),
            outline: None,
            models: None,
            user_email: None,
            username: None,
            subject_exclusions: Vec::new(),
            subject_inclusions: Vec::new(),
        }
    }

    pub fn for_outline(topic: impl Into<String>, sections: Vec<OutlineSection>) -> Self {
        Self {
            mode: GenerationMode::GenerateReport,
            return_kind: ReturnKind::ReportWithOutline,
            topic: None,
            sections: None,
            outline: Some(OutlinePayload {
                report_title: topic.into(),
                sections,
            }),
            models: None,
            user_email: None,
            username: None,
            subject_exclusions: Vec::new(),
            subject_inclusions: Vec::new(),
        }
    }

    pub fn with_models(mut self, models: Option<ModelsPayload>) -> Self {
        self.models = models;
        self
    }

    pub fn with_subjects(mut self, exclusions: Vec<String>, inclusions: Vec<String>) -> Self {
        self.subject_exclusions = exclusions;
        self.subject_inclusions = inclusions;
        self
    }

    /// Attaches the identity, if any. Blank fields are left out of the body.
    pub fn with_user(mut self, user: &UserProfile) -> Self {
        self.user_email = user.email().map(str::to_string);
        self.username = user.username().map(str::to_string);
        self
    }
}

/// One event of a report generation stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// Progress information (e.g. "writing section 2 of 5").
    Status {
        #[serde(default)]
        stage: String,
        #[serde(default)]
        message: String,
    },
    /// A chunk of report text to append to the assistant message.
    Delta { text: String },
    /// The final report.
    Complete { report: ReportPayload },
    Error {
        #[serde(default)]
        detail: String,
    },
    /// Unknown event type, ignored for forward compatibility.
    #[serde(other)]
    Unknown,
}

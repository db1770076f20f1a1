//! crates/explorer_core/src/report.rs
//!
//! Report payloads as they arrive from different places (backend events, saved
//! reports, transcript messages) and their mapping onto one canonical record.

use crate::domain::{local_id, Message, SavedReport, DEFAULT_REPORT_TITLE};
use crate::text::{summarize_with, SummaryLimits};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A loosely shaped report. Several alternate field names are accepted;
/// `canonicalize` decides between them with a fixed precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportPayload {
    pub id: Option<String>,
    pub content: Option<String>,
    #[serde(alias = "reportText")]
    pub report_text: Option<String>,
    pub title: Option<String>,
    #[serde(alias = "reportTitle")]
    pub report_title: Option<String>,
    pub topic: Option<String>,
    #[serde(alias = "reportTopic")]
    pub report_topic: Option<String>,
    #[serde(alias = "summary")]
    pub preview: Option<String>,
    pub outline: Option<Value>,
    pub sections: Option<Value>,
}

/// The report currently shown in the report view.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveReport {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub preview: String,
    pub content: String,
    pub outline: Option<Value>,
    pub sections: Option<Value>,
}

/// A successfully generated report, handed to the saved-data controller.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedReport {
    pub topic: String,
    pub title: String,
    pub content: String,
    pub outline: Option<Value>,
}

fn first_filled<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
}

fn non_empty_trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl ReportPayload {
    /// `content` > `reportText`.
    pub fn resolved_content(&self) -> String {
        first_filled([self.content.as_deref(), self.report_text.as_deref()])
            .unwrap_or_default()
            .to_string()
    }

    /// `title` > `reportTitle` > `topic` > default title.
    pub fn resolved_title(&self) -> String {
        let candidate = first_filled([
            self.title.as_deref(),
            self.report_title.as_deref(),
            self.topic.as_deref(),
        ]);
        non_empty_trimmed(candidate).unwrap_or_else(|| DEFAULT_REPORT_TITLE.to_string())
    }

    /// `topic` > `reportTopic` > resolved title.
    pub fn resolved_topic(&self) -> String {
        let title = self.resolved_title();
        let candidate = first_filled([
            self.topic.as_deref(),
            self.report_topic.as_deref(),
            Some(title.as_str()),
        ]);
        non_empty_trimmed(candidate).unwrap_or_else(|| DEFAULT_REPORT_TITLE.to_string())
    }

    /// `outline` > `sections.outline`.
    pub fn resolved_outline(&self) -> Option<Value> {
        self.outline
            .clone()
            .filter(|outline| !outline.is_null())
            .or_else(|| {
                self.sections
                    .as_ref()
                    .and_then(|sections| sections.get("outline"))
                    .filter(|outline| !outline.is_null())
                    .cloned()
            })
    }

    pub fn canonicalize(&self, limits: &SummaryLimits) -> ActiveReport {
        let content = self.resolved_content();
        let title = self.resolved_title();
        let topic = self.resolved_topic();
        let summary = summarize_with(&content, limits);
        let preview = first_filled([self.preview.as_deref(), Some(summary.as_str())])
            .map(str::to_string)
            .unwrap_or_else(|| topic.clone());
        let id = first_filled([self.id.as_deref()])
            .map(str::to_string)
            .unwrap_or_else(local_id);

        ActiveReport {
            id,
            title,
            topic,
            preview,
            content,
            outline: self.resolved_outline(),
            sections: self.sections.clone(),
        }
    }

    /// Converts a completion payload into the record that gets remembered.
    /// `fallback_topic` is the topic the generation was started for.
    pub fn into_finished(self, fallback_topic: &str) -> FinishedReport {
        let with_topic = ReportPayload {
            topic: self
                .topic
                .clone()
                .filter(|topic| !topic.trim().is_empty())
                .or_else(|| Some(fallback_topic.to_string())),
            ..self
        };
        FinishedReport {
            topic: with_topic.resolved_topic(),
            title: with_topic.resolved_title(),
            content: with_topic.resolved_content(),
            outline: with_topic.resolved_outline(),
        }
    }
}

impl From<&SavedReport> for ReportPayload {
    fn from(report: &SavedReport) -> Self {
        Self {
            id: Some(report.id.clone()),
            content: Some(report.content.clone()),
            title: Some(report.title.clone()),
            topic: Some(report.topic.clone()),
            preview: Some(report.preview.clone()),
            outline: report.outline.clone(),
            ..Self::default()
        }
    }
}

impl From<&Message> for ReportPayload {
    fn from(message: &Message) -> Self {
        Self {
            report_text: message
                .report_text
                .clone()
                .or_else(|| Some(message.content.clone())),
            report_topic: message.report_topic.clone(),
            ..Self::default()
        }
    }
}

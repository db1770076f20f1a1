//! crates/explorer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the explorer client.
//! The serde shapes match what the client keeps in local storage; backend
//! wire records are mapped onto these types by the HTTP adapter.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title used whenever a report arrives without any usable title or topic.
pub const DEFAULT_REPORT_TITLE: &str = "Explorer Report";

/// Generates a client-side id for records the backend has not assigned one to.
///
/// The millisecond prefix keeps ids roughly sortable by creation time.
pub fn local_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", millis, &suffix[..12])
}

//=========================================================================================
// User
//=========================================================================================

/// The optional identity of the person using the client.
///
/// An empty email means "no identity": saved items stay local and no
/// user-scoped backend endpoint is called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub username: String,
}

impl UserProfile {
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            username: username.into().trim().to_string(),
        }
    }

    pub fn has_identity(&self) -> bool {
        !self.email.trim().is_empty()
    }

    pub fn email(&self) -> Option<&str> {
        Some(self.email.trim()).filter(|email| !email.is_empty())
    }

    pub fn username(&self) -> Option<&str> {
        Some(self.username.trim()).filter(|name| !name.is_empty())
    }
}

//=========================================================================================
// Transcript
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageVariant {
    Outline,
}

/// A single entry of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<MessageVariant>,
    /// Set on assistant messages that carry (or will carry) a generated report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_topic: Option<String>,
    /// The final report text, only present once generation completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_text: Option<String>,
    /// Id of the saved report this message produced, once it is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

impl Message {
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            variant: None,
            report_topic: None,
            report_text: None,
            report_id: None,
        }
    }

    /// An empty assistant message that streamed output will be written into.
    pub fn assistant_placeholder(id: impl Into<String>, report_topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: String::new(),
            variant: None,
            report_topic: Some(report_topic.into()),
            report_text: None,
            report_id: None,
        }
    }

    pub fn with_variant(mut self, variant: MessageVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn is_assistant_report(&self) -> bool {
        self.role == Role::Assistant && self.report_topic.is_some()
    }

    /// Whether this message shows the saved report `report_id`. Messages that were
    /// never linked to a saved report fall back to comparing the report topic.
    pub fn shows_report(&self, report_id: &str, report_topic: &str) -> bool {
        match self.report_id.as_deref() {
            Some(id) => id == report_id,
            None => self.report_topic.as_deref() == Some(report_topic),
        }
    }
}

//=========================================================================================
// Saved items
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTopic {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub collection_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedReport {
    pub id: String,
    pub topic: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub outline: Option<serde_json::Value>,
    #[serde(default)]
    pub preview: String,
}

/// A user-defined folder grouping saved topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub topic_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCollection {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl NewCollection {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A partial edit of a collection. Only `Some` fields are sent to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl CollectionUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.icon.is_none()
            && self.position.is_none()
    }
}

//! crates/explorer_core/src/ports.rs
//!
//! Defines the service contracts (traits) the controllers depend on.
//! The backend API, local persistence and the "leave while running" warning
//! are all external collaborators reached only through these ports.

use crate::domain::{
    Collection, CollectionUpdate, NewCollection, SavedReport, SavedTopic, UserProfile,
};
use crate::generation::{GenerateRequest, GenerationEvent};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Raised before any network call when a user-scoped endpoint has no email to send.
    #[error("User email is required for this action.")]
    MissingIdentity,
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// The request was superseded or stopped. Never shown to the user.
    #[error("Request cancelled")]
    Cancelled,
    /// Rejected locally before any request was made.
    #[error("{0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PortError::Cancelled)
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The stream of events produced by one report generation request.
pub type GenerationStream = Pin<Box<dyn Stream<Item = PortResult<GenerationEvent>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Parameters of a suggestion request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionQuery {
    /// The focused topic, empty for home-screen exploration.
    pub topic: String,
    /// Saved topics and report topics used to seed exploration.
    pub seeds: Vec<String>,
    pub include_report_headings: bool,
    pub model: Option<String>,
}

#[async_trait]
pub trait ExplorerBackend: Send + Sync {
    // --- Suggestions ---
    async fn fetch_suggestions(&self, query: &SuggestionQuery) -> PortResult<Vec<String>>;

    // --- Saved Topics ---
    async fn list_saved_topics(&self, user: &UserProfile) -> PortResult<Vec<SavedTopic>>;

    async fn create_saved_topic(
        &self,
        user: &UserProfile,
        title: &str,
        collection_id: Option<&str>,
    ) -> PortResult<SavedTopic>;

    /// Moves a topic into a collection, or out of every collection with `None`.
    async fn update_saved_topic(
        &self,
        user: &UserProfile,
        topic_id: &str,
        collection_id: Option<&str>,
    ) -> PortResult<SavedTopic>;

    async fn delete_saved_topic(&self, user: &UserProfile, topic_id: &str) -> PortResult<()>;

    // --- Reports ---
    async fn list_reports(
        &self,
        user: &UserProfile,
        include_content: bool,
    ) -> PortResult<Vec<SavedReport>>;

    async fn delete_report(&self, user: &UserProfile, report_id: &str) -> PortResult<()>;

    // --- Collections ---
    async fn list_collections(&self, user: &UserProfile) -> PortResult<Vec<Collection>>;

    async fn create_collection(
        &self,
        user: &UserProfile,
        collection: &NewCollection,
    ) -> PortResult<Collection>;

    async fn update_collection(
        &self,
        user: &UserProfile,
        collection_id: &str,
        update: &CollectionUpdate,
    ) -> PortResult<Collection>;

    async fn delete_collection(&self, user: &UserProfile, collection_id: &str) -> PortResult<()>;

    // --- Generation ---
    /// Starts a report generation. Dropping the returned stream abandons the request.
    async fn generate_report(&self, request: &GenerateRequest) -> PortResult<GenerationStream>;
}

/// Synchronous string key/value persistence (the browser's local storage, a file, memory).
///
/// Implementations never panic and swallow write failures after logging them.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Warns the user before leaving while a report is still generating.
pub trait LeaveGuard: Send + Sync {
    fn arm(&self, message: &str);
    fn disarm(&self);
}

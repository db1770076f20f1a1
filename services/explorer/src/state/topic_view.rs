//! services/explorer/src/state/topic_view.rs
//!
//! The focused-topic surface: its suggestions, inline rename and bulk selection.

use crate::state::suggestions::{SelectionScope, SuggestionFeed, SuggestionTicket};
use explorer_core::text::parse_topics_list;
use explorer_core::{ExplorerBackend, SuggestionQuery};
use std::sync::Arc;
use tracing::debug;

/// Keys the inline topic editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Escape,
    Enter,
    Other,
}

/// What "Generate" on the topic view asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicGeneration {
    pub topic: String,
    pub avoid: Vec<String>,
    pub include: Vec<String>,
}

pub struct TopicView {
    active_topic: String,
    draft_topic: String,
    is_editing: bool,
    skip_next_commit: bool,
    pub feed: SuggestionFeed,
    pub selection: SelectionScope,
    pub avoid_topics: String,
    pub include_topics: String,
}

impl TopicView {
    pub fn new(backend: Arc<dyn ExplorerBackend>) -> Self {
        Self {
            active_topic: String::new(),
            draft_topic: String::new(),
            is_editing: false,
            skip_next_commit: false,
            feed: SuggestionFeed::new(backend),
            selection: SelectionScope::default(),
            avoid_topics: String::new(),
            include_topics: String::new(),
        }
    }

    pub fn active_topic(&self) -> Option<&str> {
        Some(self.active_topic.as_str()).filter(|topic| !topic.is_empty())
    }

    pub fn is_open(&self) -> bool {
        !self.active_topic.is_empty()
    }

    pub fn draft_topic(&self) -> &str {
        &self.draft_topic
    }

    pub fn set_draft_topic(&mut self, draft: impl Into<String>) {
        self.draft_topic = draft.into();
    }

    pub fn is_editing(&self) -> bool {
        self.is_editing
    }

    /// Shows `topic`, which the caller has already normalized.
    pub fn open(&mut self, topic: &str, pause_suggestions: bool) {
        let topic = topic.trim();
        if topic.is_empty() {
            return;
        }
        debug!(topic, pause_suggestions, "Opening topic view");
        self.active_topic = topic.to_string();
        self.draft_topic = topic.to_string();
        self.is_editing = false;
        self.selection.clear();
        self.feed.reset(pause_suggestions);
    }

    pub fn close(&mut self) {
        self.active_topic.clear();
        self.draft_topic.clear();
        self.is_editing = false;
        self.selection.clear();
        self.feed.reset(false);
        self.feed.cancel();
        self.avoid_topics.clear();
        self.include_topics.clear();
    }

    //=====================================================================================
    // Suggestions
    //=====================================================================================

    pub fn suggestion_query(&self, model: &str) -> Option<SuggestionQuery> {
        let topic = self.active_topic()?;
        Some(SuggestionQuery {
            topic: topic.to_string(),
            seeds: Vec::new(),
            include_report_headings: false,
            model: Some(model.to_string()).filter(|model| !model.trim().is_empty()),
        })
    }

    pub fn begin_suggestions(&mut self, model: &str) -> Option<SuggestionTicket> {
        let query = self.suggestion_query(model)?;
        self.feed.begin(query)
    }

    pub async fn load_suggestions(&mut self, model: &str) -> bool {
        match self.suggestion_query(model) {
            Some(query) => self.feed.load(query).await,
            None => false,
        }
    }

    //=====================================================================================
    // Inline rename
    //=====================================================================================

    pub fn start_editing(&mut self) {
        if self.active_topic.is_empty() {
            return;
        }
        self.skip_next_commit = false;
        self.draft_topic = self.active_topic.clone();
        self.is_editing = true;
    }

    /// Abandons the edit and swallows the blur-commit that follows it.
    pub fn cancel_editing(&mut self) {
        self.skip_next_commit = true;
        self.draft_topic = self.active_topic.clone();
        self.is_editing = false;
    }

    /// Promotes the draft when it is non-empty and different. Returns `true` when the
    /// active topic changed, in which case suggestions need reloading.
    pub fn commit_edit(&mut self) -> bool {
        if self.skip_next_commit {
            self.skip_next_commit = false;
            return false;
        }
        self.is_editing = false;
        let normalized = self.draft_topic.trim().to_string();
        if normalized.is_empty() || normalized == self.active_topic {
            self.draft_topic = self.active_topic.clone();
            return false;
        }
        self.active_topic = normalized.clone();
        self.draft_topic = normalized;
        self.selection.clear();
        self.feed.reset(false);
        true
    }

    pub fn on_editor_key(&mut self, key: EditorKey) -> bool {
        match key {
            EditorKey::Escape => {
                self.cancel_editing();
                false
            }
            EditorKey::Enter => self.commit_edit(),
            EditorKey::Other => false,
        }
    }

    pub fn on_editor_blur(&mut self) -> bool {
        self.commit_edit()
    }

    //=====================================================================================
    // Generation
    //=====================================================================================

    /// Closes the view and returns what to generate. `None` when nothing is open
    /// or a generation is already running.
    pub fn take_generation(&mut self, is_running: bool) -> Option<TopicGeneration> {
        if is_running {
            return None;
        }
        let topic = self.active_topic()?.to_string();
        let generation = TopicGeneration {
            topic,
            avoid: parse_topics_list(&self.avoid_topics),
            include: parse_topics_list(&self.include_topics),
        };
        self.close();
        Some(generation)
    }
}

//! services/explorer/src/state/explore.rs
//!
//! Home-screen exploration, seeded by the saved topics and reports.

use crate::state::suggestions::{SelectionScope, SuggestionFeed, SuggestionTicket};
use explorer_core::{ExplorerBackend, SavedReport, SavedTopic, SuggestionQuery};
use std::sync::Arc;

pub struct Explore {
    pub feed: SuggestionFeed,
    pub selection: SelectionScope,
}

/// Saved topic prompts followed by saved report topics.
pub fn explore_seeds(topics: &[SavedTopic], reports: &[SavedReport]) -> Vec<String> {
    topics
        .iter()
        .map(|topic| topic.prompt.clone())
        .chain(reports.iter().map(|report| report.topic.clone()))
        .collect()
}

impl Explore {
    pub fn new(backend: Arc<dyn ExplorerBackend>) -> Self {
        Self {
            feed: SuggestionFeed::new(backend),
            selection: SelectionScope::default(),
        }
    }

    pub fn query(topics: &[SavedTopic], reports: &[SavedReport], model: &str) -> SuggestionQuery {
        SuggestionQuery {
            topic: String::new(),
            seeds: explore_seeds(topics, reports),
            include_report_headings: true,
            model: Some(model.to_string()).filter(|model| !model.trim().is_empty()),
        }
    }

    /// Starts a fetch for the current seeds. Any pending selection is dropped.
    pub fn begin(
        &mut self,
        topics: &[SavedTopic],
        reports: &[SavedReport],
        model: &str,
    ) -> Option<SuggestionTicket> {
        self.selection.clear_selection();
        self.feed.begin(Self::query(topics, reports, model))
    }

    pub async fn load(&mut self, topics: &[SavedTopic], reports: &[SavedReport], model: &str) -> bool {
        match self.begin(topics, reports, model) {
            Some(ticket) => {
                let outcome = ticket.fetch().await;
                self.feed.apply(outcome)
            }
            None => false,
        }
    }
}

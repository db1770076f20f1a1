//! services/explorer/src/state/suggestions.rs
//!
//! The suggestion-fetch lifecycle and the bulk-selection scope shared by the
//! topic view and the home-screen explore panel.

use explorer_core::{ExplorerBackend, PortError, SuggestionQuery};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

//=========================================================================================
// Fetch lifecycle
//=========================================================================================

/// A cancelable list of suggestions.
///
/// Fetching is best-effort: failures produce an empty list, never an error.
pub struct SuggestionFeed {
    backend: Arc<dyn ExplorerBackend>,
    suggestions: Vec<String>,
    is_loading: bool,
    paused: bool,
    nonce: u64,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

pub struct SuggestionTicket {
    generation: u64,
    token: CancellationToken,
    query: SuggestionQuery,
    backend: Arc<dyn ExplorerBackend>,
}

pub struct SuggestionOutcome {
    generation: u64,
    suggestions: Option<Vec<String>>,
}

impl SuggestionTicket {
    pub fn query(&self) -> &SuggestionQuery {
        &self.query
    }

    pub async fn fetch(self) -> SuggestionOutcome {
        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(PortError::Cancelled),
            result = self.backend.fetch_suggestions(&self.query) => result,
        };
        let suggestions = match result {
            Ok(suggestions) => Some(suggestions),
            Err(PortError::Cancelled) => None,
            Err(e) => {
                warn!(error = %e, topic = %self.query.topic, "Suggestion fetch failed");
                Some(Vec::new())
            }
        };
        SuggestionOutcome {
            generation: self.generation,
            suggestions,
        }
    }
}

impl SuggestionFeed {
    pub fn new(backend: Arc<dyn ExplorerBackend>) -> Self {
        Self {
            backend,
            suggestions: Vec::new(),
            is_loading: false,
            paused: false,
            nonce: 0,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Bumped by every manual refresh.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Drops the current list and any request in flight. A paused feed waits for a refresh.
    pub fn reset(&mut self, paused: bool) {
        self.cancel();
        self.suggestions.clear();
        self.paused = paused;
        self.is_loading = !paused;
    }

    /// Clears the pause so the next `begin` fetches again.
    pub fn refresh(&mut self) {
        self.paused = false;
        self.nonce += 1;
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.is_loading = false;
    }

    /// Starts a fetch, superseding the previous one. Returns `None` while paused.
    pub fn begin(&mut self, query: SuggestionQuery) -> Option<SuggestionTicket> {
        if self.paused {
            debug!("Suggestions paused; skipping fetch");
            return None;
        }
        self.cancel();
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        self.is_loading = true;
        Some(SuggestionTicket {
            generation: self.generation,
            token,
            query,
            backend: self.backend.clone(),
        })
    }

    /// Applies a finished fetch. Returns `false` when it was superseded.
    pub fn apply(&mut self, outcome: SuggestionOutcome) -> bool {
        if outcome.generation != self.generation {
            return false;
        }
        let Some(suggestions) = outcome.suggestions else {
            return false;
        };
        self.suggestions = suggestions;
        self.is_loading = false;
        self.in_flight = None;
        true
    }

    pub async fn load(&mut self, query: SuggestionQuery) -> bool {
        match self.begin(query) {
            Some(ticket) => {
                let outcome = ticket.fetch().await;
                self.apply(outcome)
            }
            None => false,
        }
    }
}

//=========================================================================================
// Selection scope
//=========================================================================================

/// Where a pointer-down landed relative to a selection scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    SuggestionsPanel,
    SelectToggle,
    Outside,
}

/// Bulk selection of suggestions. Interaction outside the scope dismisses it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionScope {
    active: bool,
    selected: Vec<String>,
}

impl SelectionScope {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, title: &str) -> bool {
        self.selected.iter().any(|entry| entry == title.trim())
    }

    pub fn toggle_item(&mut self, title: &str) {
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        match self.selected.iter().position(|entry| entry == title) {
            Some(index) => {
                self.selected.remove(index);
            }
            None => self.selected.push(title.to_string()),
        }
    }

    /// Ends selection and hands back the batch to save, if there is one.
    pub fn take_selection(&mut self) -> Option<Vec<String>> {
        if self.selected.is_empty() {
            return None;
        }
        self.active = false;
        Some(std::mem::take(&mut self.selected))
    }

    /// Entering clears any old selection. Leaving with items returns them for saving.
    pub fn toggle_mode(&mut self) -> Option<Vec<String>> {
        if !self.active {
            self.selected.clear();
            self.active = true;
            return None;
        }
        if let Some(batch) = self.take_selection() {
            return Some(batch);
        }
        self.clear();
        None
    }

    /// Returns `true` when the pointer dismissed an active selection.
    pub fn pointer_down(&mut self, target: PointerTarget) -> bool {
        if !self.active || target != PointerTarget::Outside {
            return false;
        }
        self.clear();
        true
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.selected.clear();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }
}

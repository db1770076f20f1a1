//! services/explorer/src/state/collections.rs
//!
//! Topic folders and their sidebar UI state.
//!
//! Loading follows a ticket protocol: `begin_load` cancels the previous request
//! and bumps the request generation, `CollectionsTicket::fetch` talks to the
//! backend without borrowing the controller, and `apply_load` discards any
//! outcome whose generation is no longer current.

use explorer_core::{
    Collection, CollectionUpdate, ExplorerBackend, NewCollection, PortError, PortResult,
    SavedTopic, UserProfile,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub struct Collections {
    backend: Arc<dyn ExplorerBackend>,
    collections: Vec<Collection>,
    is_loading: bool,
    expanded: BTreeSet<String>,
    editing_id: Option<String>,
    is_creating: bool,
    pub new_collection_name: String,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

/// A collections request that may be superseded before it resolves.
pub struct CollectionsTicket {
    generation: u64,
    token: CancellationToken,
    user: UserProfile,
    backend: Arc<dyn ExplorerBackend>,
}

pub struct CollectionsOutcome {
    generation: u64,
    result: PortResult<Vec<Collection>>,
}

impl CollectionsTicket {
    pub async fn fetch(self) -> CollectionsOutcome {
        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(PortError::Cancelled),
            result = self.backend.list_collections(&self.user) => result,
        };
        CollectionsOutcome {
            generation: self.generation,
            result,
        }
    }
}

impl Collections {
    pub fn new(backend: Arc<dyn ExplorerBackend>) -> Self {
        Self {
            backend,
            collections: Vec::new(),
            is_loading: false,
            expanded: BTreeSet::new(),
            editing_id: None,
            is_creating: false,
            new_collection_name: String::new(),
            generation: 0,
            in_flight: None,
        }
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_expanded(&self, collection_id: &str) -> bool {
        self.expanded.contains(collection_id)
    }

    pub fn expanded(&self) -> &BTreeSet<String> {
        &self.expanded
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing_id.as_deref()
    }

    pub fn is_creating(&self) -> bool {
        self.is_creating
    }

    //=====================================================================================
    // Loading
    //=====================================================================================

    /// Starts a new load, cancelling any load still in flight.
    /// Without an identity the list is cleared and no request is made.
    pub fn begin_load(&mut self, user: &UserProfile) -> Option<CollectionsTicket> {
        self.generation += 1;
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        if !user.has_identity() {
            self.collections.clear();
            self.is_loading = false;
            return None;
        }

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        self.is_loading = true;
        Some(CollectionsTicket {
            generation: self.generation,
            token,
            user: user.clone(),
            backend: self.backend.clone(),
        })
    }

    /// Applies a finished load. Stale or cancelled outcomes change nothing.
    pub fn apply_load(&mut self, outcome: CollectionsOutcome) -> PortResult<()> {
        if outcome.generation != self.generation {
            debug!(
                generation = outcome.generation,
                current = self.generation,
                "Discarding stale collections load"
            );
            return Ok(());
        }
        self.is_loading = false;
        self.in_flight = None;
        match outcome.result {
            Ok(collections) => {
                self.collections = collections;
                Ok(())
            }
            Err(PortError::Cancelled) => Ok(()),
            Err(e) => {
                error!(error = %e, "Failed to load collections");
                Err(e)
            }
        }
    }

    pub async fn load(&mut self, user: &UserProfile) -> PortResult<()> {
        match self.begin_load(user) {
            Some(ticket) => {
                let outcome = ticket.fetch().await;
                self.apply_load(outcome)
            }
            None => Ok(()),
        }
    }

    //=====================================================================================
    // CRUD
    //=====================================================================================

    /// Creates a collection from `name`, or from the pending name when `name` is blank.
    /// The new folder starts expanded.
    pub async fn create(&mut self, user: &UserProfile, name: &str) -> PortResult<Collection> {
        if !user.has_identity() {
            return Err(PortError::Invalid(
                "Set a user email in Settings to create collections.".to_string(),
            ));
        }
        let name = match name.trim() {
            "" => self.new_collection_name.trim().to_string(),
            name => name.to_string(),
        };
        if name.is_empty() {
            return Err(PortError::Invalid("Collection name is required.".to_string()));
        }

        let collection = self
            .backend
            .create_collection(user, &NewCollection::named(name))
            .await?;
        info!(collection_id = %collection.id, "Collection created");
        self.expanded.insert(collection.id.clone());
        self.collections.push(collection.clone());
        self.new_collection_name.clear();
        self.is_creating = false;
        Ok(collection)
    }

    pub async fn update(
        &mut self,
        user: &UserProfile,
        collection_id: &str,
        update: &CollectionUpdate,
    ) -> PortResult<Option<Collection>> {
        if !user.has_identity() {
            debug!(collection_id, "No identity; collection update skipped");
            return Ok(None);
        }
        let updated = self
            .backend
            .update_collection(user, collection_id, update)
            .await?;
        if let Some(slot) = self
            .collections
            .iter_mut()
            .find(|collection| collection.id == collection_id)
        {
            *slot = updated.clone();
        }
        self.editing_id = None;
        Ok(Some(updated))
    }

    /// Deletes a folder. Its topics are left alone and show up as uncategorized.
    /// Returns `false` without an identity, when nothing was sent.
    pub async fn delete(&mut self, user: &UserProfile, collection_id: &str) -> PortResult<bool> {
        if !user.has_identity() {
            debug!(collection_id, "No identity; collection delete skipped");
            return Ok(false);
        }
        self.backend.delete_collection(user, collection_id).await?;
        self.collections
            .retain(|collection| collection.id != collection_id);
        self.expanded.remove(collection_id);
        if self.editing_id.as_deref() == Some(collection_id) {
            self.editing_id = None;
        }
        Ok(true)
    }

    /// Moves a topic into a folder (or out of all folders with `None`).
    /// Returns the backend's updated topic; the caller patches its own list.
    /// Without an identity nothing is sent and `None` comes back.
    pub async fn move_topic(
        &self,
        user: &UserProfile,
        topic_id: &str,
        collection_id: Option<&str>,
    ) -> PortResult<Option<SavedTopic>> {
        if !user.has_identity() {
            debug!(topic_id, "No identity; topic move skipped");
            return Ok(None);
        }
        self.backend
            .update_saved_topic(user, topic_id, collection_id)
            .await
            .map(Some)
    }

    //=====================================================================================
    // Sidebar UI state
    //=====================================================================================

    pub fn toggle_expanded(&mut self, collection_id: &str) {
        if !self.expanded.remove(collection_id) {
            self.expanded.insert(collection_id.to_string());
        }
    }

    pub fn start_creating(&mut self) {
        self.is_creating = true;
        self.new_collection_name.clear();
    }

    pub fn cancel_creating(&mut self) {
        self.is_creating = false;
        self.new_collection_name.clear();
    }

    pub fn start_editing(&mut self, collection_id: &str) {
        self.editing_id = Some(collection_id.to_string());
    }

    pub fn cancel_editing(&mut self) {
        self.editing_id = None;
    }

    /// Topics grouped by folder in folder order, followed by the uncategorized ones.
    pub fn group_topics<'a>(
        &'a self,
        topics: &'a [SavedTopic],
    ) -> (Vec<(&'a Collection, Vec<&'a SavedTopic>)>, Vec<&'a SavedTopic>) {
        let mut ordered: Vec<&Collection> = self.collections.iter().collect();
        ordered.sort_by_key(|collection| collection.position);
        let grouped = ordered
            .into_iter()
            .map(|collection| {
                let members = topics
                    .iter()
                    .filter(|topic| topic.collection_id.as_deref() == Some(collection.id.as_str()))
                    .collect();
                (collection, members)
            })
            .collect();
        let uncategorized = topics
            .iter()
            .filter(|topic| match topic.collection_id.as_deref() {
                None => true,
                Some(id) => !self.collections.iter().any(|collection| collection.id == id),
            })
            .collect();
        (grouped, uncategorized)
    }
}

//! crates/explorer_core/src/persistence.rs
//!
//! Storage keys and JSON helpers on top of the `KeyValueStore` port.
//! Reads degrade to `None`/empty on missing or corrupt data.

use crate::ports::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

pub const API_BASE_KEY: &str = "explorer-api-base";
pub const SAVED_TOPICS_KEY: &str = "explorer-saved-topics";
pub const SAVED_REPORTS_KEY: &str = "explorer-saved-reports";
pub const MODEL_PRESETS_KEY: &str = "explorer-model-presets";
pub const ACTIVE_PRESET_KEY: &str = "explorer-active-model-preset";
pub const SUGGESTION_MODEL_KEY: &str = "explorer-suggestion-model";
pub const USER_EMAIL_KEY: &str = "explorer-user-email";
pub const USERNAME_KEY: &str = "explorer-username";

/// Reads and deserializes a JSON value.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Ignoring corrupt stored value");
            None
        }
    }
}

/// Reads a stored JSON list; anything but a list of valid entries yields an empty list.
pub fn load_list<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    load_json(store, key).unwrap_or_default()
}

pub fn persist_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(e) => warn!(key, error = %e, "Failed to serialize value for storage"),
    }
}

/// Stores a trimmed string, removing the key when it is blank.
pub fn persist_optional(store: &dyn KeyValueStore, key: &str, value: &str) {
    match value.trim() {
        "" => store.remove(key),
        trimmed => store.set(key, trimmed),
    }
}

/// A process-local store. Used when no persistent store is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<K: Into<String>, V: Into<String>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SavedTopic;

    #[test]
    fn corrupt_lists_degrade_to_empty() {
        let store = MemoryStore::with_entries([(SAVED_TOPICS_KEY, "{not json")]);
        let topics: Vec<SavedTopic> = load_list(&store, SAVED_TOPICS_KEY);
        assert!(topics.is_empty());
    }

    #[test]
    fn non_list_values_degrade_to_empty() {
        let store = MemoryStore::with_entries([(SAVED_TOPICS_KEY, r#"{"id": "1"}"#)]);
        let topics: Vec<SavedTopic> = load_list(&store, SAVED_TOPICS_KEY);
        assert!(topics.is_empty());
    }

    #[test]
    fn lists_round_trip_through_the_store() {
        let store = MemoryStore::new();
        let topics = vec![SavedTopic {
            id: "t1".into(),
            prompt: "Tides".into(),
            collection_id: None,
        }];
        persist_json(&store, SAVED_TOPICS_KEY, &topics);
        assert_eq!(load_list::<SavedTopic>(&store, SAVED_TOPICS_KEY), topics);
    }

    #[test]
    fn blank_optional_values_remove_the_key() {
        let store = MemoryStore::with_entries([(USER_EMAIL_KEY, "old@example.com")]);
        persist_optional(&store, USER_EMAIL_KEY, "   ");
        assert_eq!(store.get(USER_EMAIL_KEY), None);
        persist_optional(&store, USER_EMAIL_KEY, " new@example.com ");
        assert_eq!(store.get(USER_EMAIL_KEY).as_deref(), Some("new@example.com"));
    }
}

//! services/explorer/src/state/saved.rs
//!
//! Saved topics and reports. With a user identity the backend is the source of
//! truth and lists are reloaded after writes; without one everything stays in
//! the local key/value store under synthetic ids.

use crate::config::SavedLimits;
use explorer_core::persistence::{load_list, persist_json, SAVED_REPORTS_KEY, SAVED_TOPICS_KEY};
use explorer_core::text::summarize_with;
use explorer_core::{
    local_id, ExplorerBackend, FinishedReport, KeyValueStore, PortError, SavedReport, SavedTopic,
    SummaryLimits, UserProfile, DEFAULT_REPORT_TITLE,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct SavedData {
    backend: Arc<dyn ExplorerBackend>,
    store: Arc<dyn KeyValueStore>,
    limits: SavedLimits,
    summary_limits: SummaryLimits,
    topics: Vec<SavedTopic>,
    reports: Vec<SavedReport>,
    is_syncing: bool,
    /// The last failure of a saved-items operation, shown in the sidebar.
    pub error: Option<String>,
}

fn message_or(err: &PortError, fallback: &str) -> String {
    match err.to_string() {
        message if message.trim().is_empty() => fallback.to_string(),
        message => message,
    }
}

impl SavedData {
    pub fn new(
        backend: Arc<dyn ExplorerBackend>,
        store: Arc<dyn KeyValueStore>,
        limits: SavedLimits,
        summary_limits: SummaryLimits,
    ) -> Self {
        Self {
            backend,
            store,
            limits,
            summary_limits,
            topics: Vec::new(),
            reports: Vec::new(),
            is_syncing: false,
            error: None,
        }
    }

    pub fn topics(&self) -> &[SavedTopic] {
        &self.topics
    }

    pub fn reports(&self) -> &[SavedReport] {
        &self.reports
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing
    }

    pub fn is_topic_saved(&self, prompt: &str) -> bool {
        self.topics.iter().any(|topic| topic.prompt == prompt)
    }

    fn persist_local(&self, user: &UserProfile) {
        if user.has_identity() {
            return;
        }
        persist_json(self.store.as_ref(), SAVED_TOPICS_KEY, &self.topics);
        persist_json(self.store.as_ref(), SAVED_REPORTS_KEY, &self.reports);
    }

    //=====================================================================================
    // Loading
    //=====================================================================================

    pub async fn load_topics(&mut self, user: &UserProfile) -> Result<(), PortError> {
        let mut topics = self.backend.list_saved_topics(user).await?;
        topics.truncate(self.limits.max_topics);
        self.topics = topics;
        Ok(())
    }

    pub async fn load_reports(&mut self, user: &UserProfile) -> Result<(), PortError> {
        let mut reports = self.backend.list_reports(user, true).await?;
        reports.truncate(self.limits.max_reports);
        self.reports = reports;
        Ok(())
    }

    /// Re-syncs both lists. Without an identity the locally persisted lists are loaded.
    pub async fn refresh(&mut self, user: &UserProfile) {
        if !user.has_identity() {
            let mut topics: Vec<SavedTopic> = load_list(self.store.as_ref(), SAVED_TOPICS_KEY);
            let mut reports: Vec<SavedReport> = load_list(self.store.as_ref(), SAVED_REPORTS_KEY);
            topics.truncate(self.limits.max_topics);
            reports.truncate(self.limits.max_reports);
            self.topics = topics;
            self.reports = reports;
            self.error = None;
            self.is_syncing = false;
            return;
        }

        self.is_syncing = true;
        let (topics, reports) = futures::join!(
            self.backend.list_saved_topics(user),
            self.backend.list_reports(user, true)
        );
        match (topics, reports) {
            (Ok(mut topics), Ok(mut reports)) => {
                topics.truncate(self.limits.max_topics);
                reports.truncate(self.limits.max_reports);
                info!(
                    topics = topics.len(),
                    reports = reports.len(),
                    "Saved items synced"
                );
                self.topics = topics;
                self.reports = reports;
                self.error = None;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to sync saved items");
                self.error = Some(message_or(&e, "Failed to sync saved items."));
            }
        }
        self.is_syncing = false;
    }

    //=====================================================================================
    // Reports
    //=====================================================================================

    fn local_report(&self, report: &FinishedReport) -> SavedReport {
        let title = match report.title.trim() {
            "" => DEFAULT_REPORT_TITLE.to_string(),
            title => title.to_string(),
        };
        let topic = match report.topic.trim() {
            "" => title.clone(),
            topic => topic.to_string(),
        };
        let preview_source = if report.content.is_empty() {
            title.as_str()
        } else {
            report.content.as_str()
        };
        SavedReport {
            id: local_id(),
            preview: summarize_with(preview_source, &self.summary_limits),
            topic,
            title,
            content: report.content.clone(),
            outline: report.outline.clone(),
        }
    }

    fn insert_report(&mut self, report: SavedReport) {
        self.reports.insert(0, report);
        self.reports.truncate(self.limits.max_reports);
    }

    /// Records a finished report and returns the id it is saved under. The backend
    /// stores generated reports itself, so with an identity the list is reloaded and
    /// the newest entry for the topic is taken; only a failed reload inserts locally.
    pub async fn remember_report(
        &mut self,
        user: &UserProfile,
        report: &FinishedReport,
    ) -> Option<String> {
        if !user.has_identity() {
            let saved = self.local_report(report);
            let id = saved.id.clone();
            self.insert_report(saved);
            self.persist_local(user);
            return Some(id);
        }

        match self.load_reports(user).await {
            Ok(()) => {
                self.error = None;
                let topic = report.topic.trim();
                self.reports
                    .iter()
                    .find(|saved| saved.topic == topic)
                    .map(|saved| saved.id.clone())
            }
            Err(e) => {
                error!(error = %e, "Failed to refresh reports");
                let saved = self.local_report(report);
                let id = saved.id.clone();
                self.insert_report(saved);
                self.error = Some(message_or(&e, "Failed to refresh saved reports."));
                Some(id)
            }
        }
    }

    /// Removes a report right away. A failed backend delete is recorded, not rolled back.
    pub async fn forget_report(&mut self, user: &UserProfile, id: &str) -> Option<SavedReport> {
        let index = self.reports.iter().position(|report| report.id == id)?;
        let removed = self.reports.remove(index);

        if !user.has_identity() {
            self.persist_local(user);
            return Some(removed);
        }
        if let Err(e) = self.backend.delete_report(user, id).await {
            error!(error = %e, report_id = id, "Failed to delete report");
            self.error = Some(message_or(&e, "Failed to delete report."));
        }
        Some(removed)
    }

    //=====================================================================================
    // Topics
    //=====================================================================================

    /// Puts saved topics in front, then keeps older entries that share neither an id
    /// nor a prompt with them. The backend answers a repeated title with the existing
    /// record, so an id already in the list moves to the front instead of vanishing.
    fn merge_topics(&mut self, created: Vec<SavedTopic>) {
        let mut ids = HashSet::new();
        let mut prompts = HashSet::new();
        let mut merged: Vec<SavedTopic> = Vec::with_capacity(created.len() + self.topics.len());
        for topic in created {
            if ids.contains(&topic.id) || prompts.contains(&topic.prompt) {
                continue;
            }
            ids.insert(topic.id.clone());
            prompts.insert(topic.prompt.clone());
            merged.push(topic);
        }

        merged.extend(
            self.topics
                .drain(..)
                .filter(|topic| !ids.contains(&topic.id) && !prompts.contains(&topic.prompt)),
        );
        merged.truncate(self.limits.max_topics);
        self.topics = merged;
    }

    pub async fn remember_topics<S: AsRef<str>>(&mut self, user: &UserProfile, prompts: &[S]) {
        let mut seen = HashSet::new();
        let prompts: Vec<&str> = prompts
            .iter()
            .map(|prompt| prompt.as_ref().trim())
            .filter(|prompt| !prompt.is_empty() && seen.insert(*prompt))
            .collect();
        if prompts.is_empty() {
            return;
        }

        if !user.has_identity() {
            let created = prompts
                .iter()
                .map(|prompt| SavedTopic {
                    id: local_id(),
                    prompt: prompt.to_string(),
                    collection_id: None,
                })
                .collect();
            self.merge_topics(created);
            self.persist_local(user);
            return;
        }

        let backend = self.backend.clone();
        let results = futures::future::join_all(
            prompts
                .iter()
                .map(|prompt| backend.create_saved_topic(user, prompt, None)),
        )
        .await;

        let mut created = Vec::new();
        for (prompt, result) in prompts.iter().zip(results) {
            match result {
                Ok(topic) => created.push(topic),
                Err(e) => error!(error = %e, prompt, "Failed to save topic"),
            }
        }

        if !created.is_empty() {
            info!(count = created.len(), "Topics saved");
            self.merge_topics(created);
            self.error = None;
            return;
        }
        match self.load_topics(user).await {
            Ok(()) => self.error = None,
            Err(e) => self.error = Some(message_or(&e, "Failed to save topics.")),
        }
    }

    pub async fn remember_topic(&mut self, user: &UserProfile, prompt: &str) {
        self.remember_topics(user, &[prompt]).await;
    }

    /// Removes a topic right away. A failed backend delete is only recorded.
    pub async fn forget_topic(&mut self, user: &UserProfile, id: &str) {
        let before = self.topics.len();
        self.topics.retain(|topic| topic.id != id);
        if self.topics.len() == before {
            return;
        }

        if !user.has_identity() {
            self.persist_local(user);
            return;
        }
        match self.backend.delete_saved_topic(user, id).await {
            Ok(()) => self.error = None,
            Err(e) => {
                error!(error = %e, topic_id = id, "Failed to delete topic");
                self.error = Some(message_or(&e, "Failed to delete topic."));
            }
        }
    }

    /// Applies a collection move that the backend already accepted.
    pub fn update_topic_collection(&mut self, topic_id: &str, collection_id: Option<String>) {
        if let Some(topic) = self.topics.iter_mut().find(|topic| topic.id == topic_id) {
            topic.collection_id = collection_id;
        }
    }
}

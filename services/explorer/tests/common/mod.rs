//! Shared fakes for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use explorer_core::{
    Collection, CollectionUpdate, ExplorerBackend, GenerateRequest, GenerationEvent,
    GenerationStream, KeyValueStore, LeaveGuard, MemoryStore, NewCollection, PortError,
    PortResult, ReportPayload, SavedReport, SavedTopic, SummaryLimits, SuggestionQuery,
    UserProfile,
};
use explorer_lib::config::SavedLimits;
use explorer_lib::state::{Explorer, ExplorerDeps};
use futures::channel::mpsc::{unbounded, UnboundedSender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type EventSender = UnboundedSender<PortResult<GenerationEvent>>;

/// In-memory backend that records every call it receives.
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<String>>,
    pub topics: Mutex<Vec<SavedTopic>>,
    pub reports: Mutex<Vec<SavedReport>>,
    pub collections: Mutex<Vec<Collection>>,
    pub suggestions: Mutex<Vec<String>>,
    pub created_topics: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
    pub fail_lists: AtomicBool,
    pub fail_deletes: AtomicBool,
    next_id: AtomicUsize,
    generation: Mutex<Option<GenerationStream>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| call.as_str() == name).count()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Prepares the next generation; events sent on the returned channel are streamed.
    pub fn stream_generation(&self) -> EventSender {
        let (sender, receiver) = unbounded();
        self.set_generation(Box::pin(receiver));
        sender
    }

    /// Prepares the next generation with a hand-built event stream.
    pub fn set_generation(&self, stream: GenerationStream) {
        *self.generation.lock().unwrap() = Some(stream);
    }

    pub fn set_collections(&self, collections: Vec<Collection>) {
        *self.collections.lock().unwrap() = collections;
    }
}

pub fn collection(id: &str, name: &str, position: i64) -> Collection {
    Collection {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        color: None,
        icon: None,
        position,
        topic_count: 0,
    }
}

pub fn report(id: &str, topic: &str) -> SavedReport {
    SavedReport {
        id: id.to_string(),
        topic: topic.to_string(),
        title: topic.to_string(),
        content: format!("All about {}.", topic),
        outline: None,
        preview: format!("All about {}.", topic),
    }
}

pub fn complete_event(topic: &str, content: &str) -> PortResult<GenerationEvent> {
    Ok(GenerationEvent::Complete {
        report: ReportPayload {
            topic: Some(topic.to_string()),
            title: Some(topic.to_string()),
            content: Some(content.to_string()),
            ..ReportPayload::default()
        },
    })
}

pub fn delta_event(text: &str) -> PortResult<GenerationEvent> {
    Ok(GenerationEvent::Delta {
        text: text.to_string(),
    })
}

#[async_trait]
impl ExplorerBackend for FakeBackend {
    async fn fetch_suggestions(&self, _query: &SuggestionQuery) -> PortResult<Vec<String>> {
        self.record("fetch_suggestions");
        Ok(self.suggestions.lock().unwrap().clone())
    }

    async fn list_saved_topics(&self, _user: &UserProfile) -> PortResult<Vec<SavedTopic>> {
        self.record("list_saved_topics");
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(PortError::Http {
                status: 500,
                message: "Failed to load saved topics (500).".to_string(),
            });
        }
        Ok(self.topics.lock().unwrap().clone())
    }

    async fn create_saved_topic(
        &self,
        _user: &UserProfile,
        title: &str,
        collection_id: Option<&str>,
    ) -> PortResult<SavedTopic> {
        self.record("create_saved_topic");
        self.created_topics.lock().unwrap().push(title.to_string());
        let mut topics = self.topics.lock().unwrap();
        if let Some(existing) = topics.iter().find(|topic| topic.prompt == title) {
            return Ok(existing.clone());
        }
        let topic = SavedTopic {
            id: self.next_id("topic"),
            prompt: title.to_string(),
            collection_id: collection_id.map(str::to_string),
        };
        topics.insert(0, topic.clone());
        Ok(topic)
    }

    async fn update_saved_topic(
        &self,
        _user: &UserProfile,
        topic_id: &str,
        collection_id: Option<&str>,
    ) -> PortResult<SavedTopic> {
        self.record("update_saved_topic");
        let mut topics = self.topics.lock().unwrap();
        let topic = topics
            .iter_mut()
            .find(|topic| topic.id == topic_id)
            .ok_or_else(|| PortError::NotFound(topic_id.to_string()))?;
        topic.collection_id = collection_id.map(str::to_string);
        Ok(topic.clone())
    }

    async fn delete_saved_topic(&self, _user: &UserProfile, topic_id: &str) -> PortResult<()> {
        self.record("delete_saved_topic");
        self.topics.lock().unwrap().retain(|topic| topic.id != topic_id);
        Ok(())
    }

    async fn list_reports(
        &self,
        _user: &UserProfile,
        _include_content: bool,
    ) -> PortResult<Vec<SavedReport>> {
        self.record("list_reports");
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(PortError::Http {
                status: 500,
                message: "Failed to load reports (500).".to_string(),
            });
        }
        Ok(self.reports.lock().unwrap().clone())
    }

    async fn delete_report(&self, _user: &UserProfile, report_id: &str) -> PortResult<()> {
        self.record("delete_report");
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PortError::Http {
                status: 500,
                message: "Failed to delete report (500).".to_string(),
            });
        }
        self.reports.lock().unwrap().retain(|report| report.id != report_id);
        Ok(())
    }

    async fn list_collections(&self, _user: &UserProfile) -> PortResult<Vec<Collection>> {
        self.record("list_collections");
        Ok(self.collections.lock().unwrap().clone())
    }

    async fn create_collection(
        &self,
        _user: &UserProfile,
        new: &NewCollection,
    ) -> PortResult<Collection> {
        self.record("create_collection");
        let mut collections = self.collections.lock().unwrap();
        let created = collection(&self.next_id("folder"), &new.name, collections.len() as i64);
        collections.push(created.clone());
        Ok(created)
    }

    async fn update_collection(
        &self,
        _user: &UserProfile,
        collection_id: &str,
        update: &CollectionUpdate,
    ) -> PortResult<Collection> {
        self.record("update_collection");
        let mut collections = self.collections.lock().unwrap();
        let entry = collections
            .iter_mut()
            .find(|collection| collection.id == collection_id)
            .ok_or_else(|| PortError::NotFound(collection_id.to_string()))?;
        if let Some(name) = &update.name {
            entry.name = name.clone();
        }
        Ok(entry.clone())
    }

    async fn delete_collection(&self, _user: &UserProfile, collection_id: &str) -> PortResult<()> {
        self.record("delete_collection");
        self.collections
            .lock()
            .unwrap()
            .retain(|collection| collection.id != collection_id);
        Ok(())
    }

    async fn generate_report(&self, request: &GenerateRequest) -> PortResult<GenerationStream> {
        self.record("generate_report");
        self.requests.lock().unwrap().push(request.clone());
        match self.generation.lock().unwrap().take() {
            Some(stream) => Ok(stream),
            None => Err(PortError::Unexpected("no generation prepared".to_string())),
        }
    }
}

/// Counts arm/disarm calls and tracks whether the guard is currently armed.
#[derive(Default)]
pub struct RecordingGuard {
    pub arms: AtomicUsize,
    pub disarms: AtomicUsize,
    armed: AtomicBool,
}

impl RecordingGuard {
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

impl LeaveGuard for RecordingGuard {
    fn arm(&self, _message: &str) {
        self.arms.fetch_add(1, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    fn disarm(&self) {
        self.disarms.fetch_add(1, Ordering::SeqCst);
        self.armed.store(false, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub explorer: Explorer,
    pub backend: Arc<FakeBackend>,
    pub store: Arc<MemoryStore>,
    pub guard: Arc<RecordingGuard>,
}

/// An explorer over fresh fakes. An empty email means "no identity".
pub fn harness(email: &str) -> Harness {
    let backend = FakeBackend::new();
    let store = Arc::new(MemoryStore::new());
    let guard = Arc::new(RecordingGuard::default());
    let explorer = Explorer::new(ExplorerDeps {
        backend: backend.clone(),
        store: store.clone() as Arc<dyn KeyValueStore>,
        leave_guard: guard.clone(),
        limits: SavedLimits::default(),
        summary_limits: SummaryLimits::default(),
        fallback_user: UserProfile::new(email, ""),
    });
    Harness {
        explorer,
        backend,
        store,
        guard,
    }
}

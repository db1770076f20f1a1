//! services/explorer/src/state/explorer.rs
//!
//! The composition root. Owns every controller and implements the flows that
//! span more than one of them. No method returns an error: failures land in
//! the scoped error fields (`saved.error`, `outline` error, chat error).

use crate::config::SavedLimits;
use crate::state::chat::{ChatController, GenerationOutcome};
use crate::state::collections::Collections;
use crate::state::derived::{MainViewState, ViewInputs};
use crate::state::explore::Explore;
use crate::state::outline_form::OutlineForm;
use crate::state::saved::SavedData;
use crate::state::settings::Settings;
use crate::state::suggestions::PointerTarget;
use crate::state::topic_view::TopicView;
use crate::state::view::{ComposerMode, OpenTopicOptions, ViewState};
use explorer_core::text::parse_topics_list;
use explorer_core::{
    local_id, Collection, CollectionUpdate, ExplorerBackend, GenerateRequest, KeyValueStore,
    LeaveGuard, Message, PortError, ReportPayload, SummaryLimits, UserProfile,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Collaborators and limits the explorer is built from.
pub struct ExplorerDeps {
    pub backend: Arc<dyn ExplorerBackend>,
    pub store: Arc<dyn KeyValueStore>,
    pub leave_guard: Arc<dyn LeaveGuard>,
    pub limits: SavedLimits,
    pub summary_limits: SummaryLimits,
    /// Used for profile fields that were never stored.
    pub fallback_user: UserProfile,
}

pub struct Explorer {
    pub view: ViewState,
    pub settings: Settings,
    pub saved: SavedData,
    pub collections: Collections,
    pub chat: ChatController,
    pub topic_view: TopicView,
    pub explore: Explore,
    pub outline: OutlineForm,
}

fn port_message(err: &PortError, fallback: &str) -> Option<String> {
    if err.is_cancelled() {
        return None;
    }
    match err.to_string() {
        message if message.trim().is_empty() => Some(fallback.to_string()),
        message => Some(message),
    }
}

impl Explorer {
    pub fn new(deps: ExplorerDeps) -> Self {
        let ExplorerDeps {
            backend,
            store,
            leave_guard,
            limits,
            summary_limits,
            fallback_user,
        } = deps;

        Self {
            view: ViewState::load(store.clone(), &fallback_user, summary_limits),
            settings: Settings::load(store.clone()),
            saved: SavedData::new(backend.clone(), store, limits, summary_limits),
            collections: Collections::new(backend.clone()),
            chat: ChatController::new(backend.clone(), leave_guard),
            topic_view: TopicView::new(backend.clone()),
            explore: Explore::new(backend),
            outline: OutlineForm::default(),
        }
    }

    pub fn user(&self) -> &UserProfile {
        self.view.user()
    }

    fn record_error(&mut self, err: &PortError, fallback: &str) {
        if let Some(message) = port_message(err, fallback) {
            self.saved.error = Some(message);
        }
    }

    //=====================================================================================
    // Sync & identity
    //=====================================================================================

    /// Reloads saved items and collections for the current user.
    pub async fn sync(&mut self) {
        self.saved.refresh(self.view.user()).await;
        if let Err(e) = self.collections.load(self.view.user()).await {
            self.record_error(&e, "Failed to load collections.");
        }
    }

    pub async fn set_user(&mut self, user: UserProfile) {
        info!(has_identity = user.has_identity(), "User profile changed");
        self.view.set_user(user);
        self.sync().await;
    }

    /// Saved-data syncing or a collections load in flight.
    pub fn is_sidebar_syncing(&self) -> bool {
        self.saved.is_syncing() || self.collections.is_loading()
    }

    //=====================================================================================
    // Navigation
    //=====================================================================================

    /// Opens the topic view. Blank topics are ignored and `false` is returned.
    pub fn open_topic(&mut self, topic: &str, options: OpenTopicOptions) -> bool {
        let Some(topic) = self.view.open_topic(topic, options) else {
            return false;
        };
        self.topic_view.open(&topic, options.pause_suggestions);
        true
    }

    pub async fn load_topic_suggestions(&mut self) -> bool {
        self.topic_view
            .load_suggestions(self.settings.suggestion_model())
            .await
    }

    /// Manual refresh: clears a pause and fetches again.
    pub async fn refresh_topic_suggestions(&mut self) -> bool {
        self.topic_view.feed.refresh();
        self.load_topic_suggestions().await
    }

    /// Opens the topic typed into the sidebar bar and clears the bar.
    pub fn submit_topic_bar(&mut self) -> bool {
        let value = self.view.topic_bar_value.trim().to_string();
        if value.is_empty() {
            return false;
        }
        let opened = self.open_topic(&value, OpenTopicOptions::default());
        self.view.topic_bar_value.clear();
        opened
    }

    pub fn open_report(&mut self, payload: &ReportPayload) {
        self.topic_view.close();
        self.view.open_report(payload);
    }

    pub fn open_saved_report(&mut self, report_id: &str) -> bool {
        let Some(report) = self.saved.reports().iter().find(|report| report.id == report_id) else {
            return false;
        };
        let payload = ReportPayload::from(report);
        self.open_report(&payload);
        true
    }

    pub fn close_report(&mut self) {
        self.view.close_report();
    }

    /// Back to home. The transcript is kept while a generation is running.
    pub async fn reset(&mut self) {
        self.topic_view.close();
        self.view.reset_to_home();
        if !self.chat.is_running().await {
            self.chat.clear_messages().await;
        }
    }

    /// Shows the transcript of the report being generated.
    pub fn select_generating_report(&mut self) {
        self.view.clear_active_report();
        self.topic_view.close();
        self.view.set_home_view(false);
    }

    //=====================================================================================
    // Generation
    //=====================================================================================

    async fn remember_generated(
        &mut self,
        outcome: &GenerationOutcome,
        assistant_id: &str,
        topic: Option<&str>,
    ) {
        let GenerationOutcome::Completed(report) = outcome else {
            return;
        };
        if let Some(report_id) = self.saved.remember_report(self.view.user(), report).await {
            self.chat.link_report(assistant_id, &report_id).await;
        }
        if let Some(topic) = topic {
            self.saved.remember_topic(self.view.user(), topic).await;
        }
    }

    /// Generates a report for a plain topic. `None` when the topic is blank or
    /// a generation is already running.
    pub async fn run_topic_prompt(
        &mut self,
        topic: &str,
        avoid: Vec<String>,
        include: Vec<String>,
    ) -> Option<GenerationOutcome> {
        let topic = topic.trim().to_string();
        if topic.is_empty() || self.chat.is_running().await {
            return None;
        }

        let assistant_id = local_id();
        self.chat
            .append_message(Message::user(format!("{}-user", assistant_id), topic.clone()))
            .await;
        self.chat
            .append_message(Message::assistant_placeholder(assistant_id.clone(), topic.clone()))
            .await;
        self.view.clear_active_report();
        self.view.set_home_view(false);

        let request = GenerateRequest::for_topic(topic.clone(), self.view.section_count)
            .with_models(Some(self.settings.models_payload()))
            .with_subjects(avoid, include)
            .with_user(self.view.user());
        let outcome = self.chat.run_report_flow(request, &assistant_id, &topic).await;
        self.remember_generated(&outcome, &assistant_id, Some(&topic)).await;
        Some(outcome)
    }

    /// Submits the chat composer, clearing it and its avoid/include lists.
    pub async fn submit_composer(&mut self) -> Option<GenerationOutcome> {
        let prompt = self.view.composer_value.trim().to_string();
        if prompt.is_empty() || self.chat.is_running().await {
            return None;
        }
        self.view.composer_value.clear();
        self.view.set_home_view(false);
        let avoid = parse_topics_list(&self.view.chat_avoid_topics);
        let include = parse_topics_list(&self.view.chat_include_topics);
        let outcome = self.run_topic_prompt(&prompt, avoid, include).await;
        self.view.chat_avoid_topics.clear();
        self.view.chat_include_topics.clear();
        outcome
    }

    /// "Generate" on the topic view: closes it and runs the topic prompt.
    pub async fn generate_from_topic_view(&mut self) -> Option<GenerationOutcome> {
        let is_running = self.chat.is_running().await;
        let generation = self.topic_view.take_generation(is_running)?;
        self.run_topic_prompt(&generation.topic, generation.avoid, generation.include)
            .await
    }

    /// Submits the outline form. Placeholder messages are removed again when
    /// generation fails; the form resets when it succeeds.
    pub async fn submit_outline(&mut self) -> Option<GenerationOutcome> {
        let is_running = self.chat.is_running().await;
        let submission =
            self.outline
                .begin_submit(is_running, self.settings.models_payload(), self.view.user())?;

        self.chat.append_message(submission.user_message.clone()).await;
        self.chat
            .append_message(submission.assistant_message.clone())
            .await;
        self.view.clear_active_report();
        self.view.set_home_view(false);

        let outcome = self
            .chat
            .run_report_flow(
                submission.request.clone(),
                submission.assistant_id(),
                &submission.topic,
            )
            .await;
        let stale = self.outline.finish_submit(&submission, &outcome);
        if !stale.is_empty() {
            self.chat.remove_messages(&stale).await;
        }
        self.remember_generated(&outcome, submission.assistant_id(), None)
            .await;
        Some(outcome)
    }

    pub async fn stop_generation(&self) {
        self.chat.stop_generation().await;
    }

    //=====================================================================================
    // Topic view actions
    //=====================================================================================

    pub async fn save_active_topic(&mut self) {
        let Some(topic) = self.topic_view.active_topic().map(str::to_string) else {
            return;
        };
        self.saved.remember_topic(self.view.user(), &topic).await;
    }

    pub async fn toggle_topic_select_mode(&mut self) {
        if let Some(batch) = self.topic_view.selection.toggle_mode() {
            self.saved.remember_topics(self.view.user(), &batch).await;
        }
    }

    pub async fn save_selected_topic_suggestions(&mut self) {
        if let Some(batch) = self.topic_view.selection.take_selection() {
            self.saved.remember_topics(self.view.user(), &batch).await;
        }
    }

    pub fn topic_pointer_down(&mut self, target: PointerTarget) -> bool {
        self.topic_view.selection.pointer_down(target)
    }

    //=====================================================================================
    // Explore
    //=====================================================================================

    pub async fn load_explore(&mut self) -> bool {
        self.explore
            .load(
                self.saved.topics(),
                self.saved.reports(),
                self.settings.suggestion_model(),
            )
            .await
    }

    pub async fn refresh_explore(&mut self) -> bool {
        self.explore.feed.refresh();
        self.load_explore().await
    }

    pub async fn toggle_explore_select_mode(&mut self) {
        if let Some(batch) = self.explore.selection.toggle_mode() {
            self.saved.remember_topics(self.view.user(), &batch).await;
        }
    }

    pub fn explore_pointer_down(&mut self, target: PointerTarget) -> bool {
        self.explore.selection.pointer_down(target)
    }

    //=====================================================================================
    // Saved items
    //=====================================================================================

    /// Forgets a report. An open report view showing it is closed. If the
    /// transcript shows it and nothing is running, the transcript is cleared;
    /// either way home is shown unless a generation is running.
    pub async fn forget_report(&mut self, report_id: &str) {
        let Some(removed) = self.saved.forget_report(self.view.user(), report_id).await else {
            return;
        };
        let is_running = self.chat.is_running().await;

        let was_open = self
            .view
            .active_report()
            .is_some_and(|report| report.id == report_id);
        if was_open {
            info!(report_id, "Forgot the open report; closing the report view");
            self.view.close_report();
        }

        let in_transcript = !is_running
            && self
                .chat
                .latest_report_message()
                .await
                .is_some_and(|message| message.shows_report(report_id, &removed.topic));
        if in_transcript {
            info!(report_id, "Forgot the displayed report; clearing the transcript");
            self.chat.clear_messages().await;
        }
        if (was_open || in_transcript) && !is_running {
            self.view.set_home_view(true);
        }
    }

    pub async fn forget_topic(&mut self, topic_id: &str) {
        self.saved.forget_topic(self.view.user(), topic_id).await;
    }

    //=====================================================================================
    // Collections
    //=====================================================================================

    pub async fn create_collection(&mut self, name: &str) -> Option<Collection> {
        match self.collections.create(self.view.user(), name).await {
            Ok(collection) => Some(collection),
            Err(e) => {
                warn!(error = %e, "Failed to create collection");
                self.record_error(&e, "Failed to create collection.");
                None
            }
        }
    }

    pub async fn update_collection(
        &mut self,
        collection_id: &str,
        update: &CollectionUpdate,
    ) -> Option<Collection> {
        match self
            .collections
            .update(self.view.user(), collection_id, update)
            .await
        {
            Ok(collection) => collection,
            Err(e) => {
                warn!(error = %e, collection_id, "Failed to update collection");
                self.record_error(&e, "Failed to update collection.");
                None
            }
        }
    }

    pub async fn delete_collection(&mut self, collection_id: &str) -> bool {
        match self.collections.delete(self.view.user(), collection_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(error = %e, collection_id, "Failed to delete collection");
                self.record_error(&e, "Failed to delete collection.");
                false
            }
        }
    }

    /// Moves a topic between folders. The local topic is patched only after
    /// the backend accepted the move; the topic list is not reloaded.
    pub async fn move_topic(&mut self, topic_id: &str, collection_id: Option<&str>) -> bool {
        match self
            .collections
            .move_topic(self.view.user(), topic_id, collection_id)
            .await
        {
            Ok(Some(updated)) => {
                self.saved
                    .update_topic_collection(&updated.id, updated.collection_id.clone());
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, topic_id, "Failed to move topic");
                self.record_error(&e, "Failed to move topic.");
                false
            }
        }
    }

    //=====================================================================================
    // Derived view state
    //=====================================================================================

    /// Derives the presentation flags, switching to home first when nothing
    /// else would be shown.
    pub async fn main_view_state(&mut self) -> MainViewState {
        let chat = self.chat.snapshot().await;
        let derive = |explorer: &Explorer| {
            MainViewState::derive(&ViewInputs {
                is_running: chat.is_running,
                is_home_view: explorer.view.is_home_view(),
                is_report_view_open: explorer.view.is_report_view_open(),
                topic_view_topic: explorer.topic_view.active_topic(),
                messages: &chat.messages,
                saved_topics: explorer.saved.topics(),
                saved_reports: explorer.saved.reports(),
            })
        };

        let state = derive(&*self);
        if !state.should_auto_home {
            return state;
        }
        self.view.set_home_view(true);
        self.view.composer_mode = ComposerMode::Topic;
        derive(&*self)
    }
}

//! services/explorer/src/state/view.rs
//!
//! The top-level view state: which surface is shown, the open report, the
//! composer inputs and the user profile.

use explorer_core::persistence::{persist_optional, USERNAME_KEY, USER_EMAIL_KEY};
use explorer_core::text::clean_heading_for_topic;
use explorer_core::{ActiveReport, KeyValueStore, ReportPayload, SummaryLimits, UserProfile};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_SECTION_COUNT: u32 = 3;

/// The composer tab shown on the home surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComposerMode {
    #[default]
    Topic,
    Outline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenTopicOptions {
    /// Strip outline numbering ("Section 2:") before opening.
    pub normalize_heading: bool,
    /// Open without fetching suggestions until the user refreshes.
    pub pause_suggestions: bool,
}

pub struct ViewState {
    store: Arc<dyn KeyValueStore>,
    summary_limits: SummaryLimits,
    user: UserProfile,
    active_report: Option<ActiveReport>,
    is_home_view: bool,
    pub composer_mode: ComposerMode,
    pub composer_value: String,
    pub topic_bar_value: String,
    pub section_count: u32,
    pub chat_avoid_topics: String,
    pub chat_include_topics: String,
}

impl ViewState {
    /// Loads the stored user profile, using `fallback_user` for fields that were never stored.
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        fallback_user: &UserProfile,
        summary_limits: SummaryLimits,
    ) -> Self {
        let email = store
            .get(USER_EMAIL_KEY)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| fallback_user.email.clone());
        let username = store
            .get(USERNAME_KEY)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| fallback_user.username.clone());

        let view = Self {
            store,
            summary_limits,
            user: UserProfile::new(email, username),
            active_report: None,
            is_home_view: false,
            composer_mode: ComposerMode::Topic,
            composer_value: String::new(),
            topic_bar_value: String::new(),
            section_count: DEFAULT_SECTION_COUNT,
            chat_avoid_topics: String::new(),
            chat_include_topics: String::new(),
        };
        view.persist_user();
        view
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// Replaces the user profile and writes it through to the store.
    pub fn set_user(&mut self, user: UserProfile) {
        self.user = UserProfile::new(user.email, user.username);
        self.persist_user();
    }

    fn persist_user(&self) {
        persist_optional(self.store.as_ref(), USER_EMAIL_KEY, &self.user.email);
        persist_optional(self.store.as_ref(), USERNAME_KEY, &self.user.username);
    }

    pub fn active_report(&self) -> Option<&ActiveReport> {
        self.active_report.as_ref()
    }

    pub fn is_report_view_open(&self) -> bool {
        self.active_report.is_some()
    }

    pub fn is_home_view(&self) -> bool {
        self.is_home_view
    }

    pub fn set_home_view(&mut self, is_home_view: bool) {
        self.is_home_view = is_home_view;
    }

    /// Normalizes a topic for opening. Blank input is a no-op and returns `None`;
    /// otherwise the open report is dropped and the home surface is left.
    pub fn open_topic(&mut self, topic: &str, options: OpenTopicOptions) -> Option<String> {
        let normalized = if options.normalize_heading {
            clean_heading_for_topic(topic)
        } else {
            topic.to_string()
        };
        let safe_topic = normalized.trim();
        if safe_topic.is_empty() {
            return None;
        }
        self.active_report = None;
        self.is_home_view = false;
        Some(safe_topic.to_string())
    }

    /// Opens a loosely shaped report payload in the report view.
    pub fn open_report(&mut self, payload: &ReportPayload) {
        let report = payload.canonicalize(&self.summary_limits);
        debug!(report_id = %report.id, title = %report.title, "Opening report");
        self.active_report = Some(report);
        self.is_home_view = false;
    }

    pub fn close_report(&mut self) {
        self.active_report = None;
    }

    pub fn clear_active_report(&mut self) {
        self.active_report = None;
    }

    /// Forces the home surface with the topic composer tab. Clearing the
    /// transcript is up to the caller.
    pub fn reset_to_home(&mut self) {
        self.active_report = None;
        self.is_home_view = true;
        self.composer_mode = ComposerMode::Topic;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use explorer_core::MemoryStore;

    fn view_with(store: Arc<MemoryStore>) -> ViewState {
        ViewState::load(store, &UserProfile::default(), SummaryLimits::default())
    }

    #[test]
    fn blank_topics_change_nothing() {
        let mut view = view_with(Arc::new(MemoryStore::new()));
        view.open_report(&ReportPayload::default());
        view.set_home_view(true);

        assert_eq!(view.open_topic("   ", OpenTopicOptions::default()), None);
        assert!(view.is_report_view_open());
        assert!(view.is_home_view());
    }

    #[test]
    fn opening_a_topic_leaves_home_and_closes_the_report() {
        let mut view = view_with(Arc::new(MemoryStore::new()));
        view.open_report(&ReportPayload::default());
        view.set_home_view(true);

        let options = OpenTopicOptions {
            normalize_heading: true,
            ..OpenTopicOptions::default()
        };
        assert_eq!(
            view.open_topic("Section 2: Trade routes", options).as_deref(),
            Some("Trade routes")
        );
        assert!(!view.is_report_view_open());
        assert!(!view.is_home_view());
    }

    #[test]
    fn user_profile_prefers_stored_values_and_writes_through() {
        let store = Arc::new(MemoryStore::with_entries([(USER_EMAIL_KEY, "stored@example.com")]));
        let mut view = ViewState::load(
            store.clone(),
            &UserProfile::new("env@example.com", "env-name"),
            SummaryLimits::default(),
        );
        assert_eq!(view.user().email, "stored@example.com");
        assert_eq!(view.user().username, "env-name");
        assert_eq!(store.get(USERNAME_KEY).as_deref(), Some("env-name"));

        view.set_user(UserProfile::new(" ", "someone"));
        assert_eq!(store.get(USER_EMAIL_KEY), None);
        assert!(!view.user().has_identity());
    }

    #[test]
    fn reset_to_home_restores_the_topic_composer() {
        let mut view = view_with(Arc::new(MemoryStore::new()));
        view.composer_mode = ComposerMode::Outline;
        view.open_report(&ReportPayload::default());

        view.reset_to_home();
        assert!(view.is_home_view());
        assert!(!view.is_report_view_open());
        assert_eq!(view.composer_mode, ComposerMode::Topic);
    }
}

//! services/explorer/src/state/derived.rs
//!
//! Flags computed from the controllers for presentation: which surface is
//! shown, the composer lock state and the "generating" sidebar entry.

use explorer_core::{Message, Role, SavedReport, SavedTopic};

pub const STOP_LABEL: &str = "Stop";
pub const GENERATE_LABEL: &str = "Generate Report";

/// The main surface. Exactly one is shown at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Home,
    ReportView,
    TopicView,
    Chat,
}

/// The sidebar entry for a report that is generating or was generated but not saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratingReport {
    pub topic: String,
    pub is_generating: bool,
}

/// Everything the derivation reads.
pub struct ViewInputs<'a> {
    pub is_running: bool,
    pub is_home_view: bool,
    pub is_report_view_open: bool,
    pub topic_view_topic: Option<&'a str>,
    pub messages: &'a [Message],
    pub saved_topics: &'a [SavedTopic],
    pub saved_reports: &'a [SavedReport],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainViewState {
    pub surface: Surface,
    pub has_messages: bool,
    pub is_topic_view_open: bool,
    pub is_topic_saved: bool,
    pub has_completed_report: bool,
    pub should_show_explore: bool,
    pub generating_report: Option<GeneratingReport>,
    pub hide_composer: bool,
    pub composer_locked: bool,
    pub composer_button_label: &'static str,
    /// Nothing to show: the caller should switch to home with the topic composer.
    pub should_auto_home: bool,
}

fn latest_report_topic(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|message| message.is_assistant_report())
        .and_then(|message| message.report_topic.as_deref())
}

impl MainViewState {
    pub fn derive(inputs: &ViewInputs<'_>) -> Self {
        let has_messages = !inputs.messages.is_empty();
        let is_topic_view_open = inputs.topic_view_topic.is_some_and(|topic| !topic.is_empty());
        let is_topic_saved = inputs
            .topic_view_topic
            .is_some_and(|topic| inputs.saved_topics.iter().any(|entry| entry.prompt == topic));
        let has_completed_report = inputs.messages.iter().any(|message| {
            message.role == Role::Assistant
                && message.report_text.as_deref().is_some_and(|text| !text.is_empty())
        });

        let surface = if inputs.is_home_view {
            Surface::Home
        } else if inputs.is_report_view_open {
            Surface::ReportView
        } else if is_topic_view_open {
            Surface::TopicView
        } else if has_messages {
            Surface::Chat
        } else {
            Surface::Home
        };

        let generating_report = if !inputs.is_running && (!has_messages || !inputs.is_home_view) {
            None
        } else {
            latest_report_topic(inputs.messages).and_then(|topic| {
                let is_saved = inputs.saved_reports.iter().any(|report| report.topic == topic);
                if is_saved && !inputs.is_running {
                    return None;
                }
                Some(GeneratingReport {
                    topic: topic.to_string(),
                    is_generating: inputs.is_running,
                })
            })
        };

        let should_auto_home = !inputs.is_running
            && !is_topic_view_open
            && !inputs.is_report_view_open
            && !inputs.is_home_view
            && !has_messages;

        Self {
            surface,
            has_messages,
            is_topic_view_open,
            is_topic_saved,
            has_completed_report,
            should_show_explore: inputs.is_home_view
                || (!is_topic_view_open && !inputs.is_report_view_open && !has_messages),
            generating_report,
            hide_composer: !inputs.is_home_view && inputs.is_running,
            composer_locked: !inputs.is_home_view && !inputs.is_running && has_completed_report,
            composer_button_label: if inputs.is_running { STOP_LABEL } else { GENERATE_LABEL },
            should_auto_home,
        }
    }
}

/// The transcript as shown: empty on the home surface.
pub fn visible_messages(messages: &[Message], is_home_view: bool) -> &[Message] {
    if is_home_view {
        &[]
    } else {
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(messages: &'a [Message], reports: &'a [SavedReport]) -> ViewInputs<'a> {
        ViewInputs {
            is_running: false,
            is_home_view: false,
            is_report_view_open: false,
            topic_view_topic: None,
            messages,
            saved_topics: &[],
            saved_reports: reports,
        }
    }

    fn finished(id: &str, topic: &str) -> Message {
        let mut message = Message::assistant_placeholder(id, topic);
        message.content = "Body".into();
        message.report_text = Some("Body".into());
        message
    }

    #[test]
    fn empty_idle_state_asks_for_home() {
        let state = MainViewState::derive(&inputs(&[], &[]));
        assert!(state.should_auto_home);
        assert_eq!(state.surface, Surface::Home);
        assert!(state.should_show_explore);
    }

    #[test]
    fn running_generation_hides_the_composer() {
        let messages = vec![Message::assistant_placeholder("a1", "Tides")];
        let mut view = inputs(&messages, &[]);
        view.is_running = true;
        let state = MainViewState::derive(&view);
        assert_eq!(state.surface, Surface::Chat);
        assert!(state.hide_composer);
        assert_eq!(state.composer_button_label, STOP_LABEL);
        assert_eq!(
            state.generating_report,
            Some(GeneratingReport {
                topic: "Tides".into(),
                is_generating: true,
            })
        );
    }

    #[test]
    fn completed_report_locks_the_composer_outside_home() {
        let messages = vec![finished("a1", "Tides")];
        let state = MainViewState::derive(&inputs(&messages, &[]));
        assert!(state.has_completed_report);
        assert!(state.composer_locked);
        assert!(!state.should_auto_home);
        assert_eq!(state.composer_button_label, GENERATE_LABEL);
    }

    #[test]
    fn saved_finished_report_is_not_listed_as_generating() {
        let messages = vec![finished("a1", "Tides")];
        let reports = vec![SavedReport {
            id: "r1".into(),
            topic: "Tides".into(),
            title: "Tides".into(),
            content: "Body".into(),
            outline: None,
            preview: "Body".into(),
        }];
        let mut view = inputs(&messages, &reports);
        view.is_home_view = true;
        assert_eq!(MainViewState::derive(&view).generating_report, None);

        let mut unsaved = inputs(&messages, &[]);
        unsaved.is_home_view = true;
        let entry = MainViewState::derive(&unsaved).generating_report.unwrap();
        assert!(!entry.is_generating);
    }

    #[test]
    fn report_view_wins_over_topic_view_and_chat() {
        let messages = vec![finished("a1", "Tides")];
        let mut view = inputs(&messages, &[]);
        view.is_report_view_open = true;
        view.topic_view_topic = Some("Moon");
        assert_eq!(MainViewState::derive(&view).surface, Surface::ReportView);
        assert!(visible_messages(&messages, true).is_empty());
    }
}

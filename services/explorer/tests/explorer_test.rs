//! End-to-end flows through the composed explorer state.

mod common;

use common::{complete_event, harness, report, Harness};
use explorer_core::persistence::USER_EMAIL_KEY;
use explorer_core::{GenerationEvent, KeyValueStore, UserProfile};
use explorer_lib::state::{GenerationOutcome, OpenTopicOptions, PointerTarget, Surface};
use pretty_assertions::assert_eq;

async fn generate(harness: &mut Harness, topic: &str) -> GenerationOutcome {
    let events = harness.backend.stream_generation();
    events.unbounded_send(complete_event(topic, "Body.")).unwrap();
    harness
        .explorer
        .run_topic_prompt(topic, Vec::new(), Vec::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn blank_topic_is_ignored() {
    let mut h = harness("");

    assert!(!h.explorer.open_topic("   ", OpenTopicOptions::default()));

    assert!(!h.explorer.topic_view.is_open());
    let state = h.explorer.main_view_state().await;
    assert_eq!(state.surface, Surface::Home);
    assert!(h.explorer.view.is_home_view());
}

#[tokio::test]
async fn opening_a_heading_strips_the_section_label() {
    let mut h = harness("");
    let options = OpenTopicOptions {
        normalize_heading: true,
        ..OpenTopicOptions::default()
    };

    assert!(h.explorer.open_topic("Section 2: Trade routes", options));

    assert_eq!(h.explorer.topic_view.active_topic(), Some("Trade routes"));
    assert_eq!(h.explorer.main_view_state().await.surface, Surface::TopicView);
}

#[tokio::test]
async fn topic_generation_without_identity_saves_locally() {
    let mut h = harness("");

    let outcome = generate(&mut h, "Tides").await;

    assert!(outcome.is_success());
    let messages = h.explorer.chat.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, format!("{}-user", messages[1].id));
    assert_eq!(messages[1].report_text.as_deref(), Some("Body."));
    assert_eq!(h.explorer.saved.reports()[0].topic, "Tides");
    assert!(h.explorer.saved.is_topic_saved("Tides"));

    let requests = h.backend.requests.lock().unwrap().clone();
    let request = &requests[0];
    assert_eq!(request.topic.as_deref(), Some("Tides"));
    assert_eq!(request.user_email, None);

    let state = h.explorer.main_view_state().await;
    assert_eq!(state.surface, Surface::Chat);
    assert!(state.composer_locked);
}

#[tokio::test]
async fn second_prompt_is_refused_while_running() {
    let mut h = harness("");
    let _events = h.backend.stream_generation();
    let chat = h.explorer.chat.clone();

    let first = tokio::spawn(async move {
        chat.run_report_flow(
            explorer_core::GenerateRequest::for_topic("Tides", 3),
            "a1",
            "Tides",
        )
        .await
    });
    while !h.explorer.chat.is_running().await {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.explorer.run_topic_prompt("Moon", Vec::new(), Vec::new()).await, None);

    h.explorer.stop_generation().await;
    assert_eq!(first.await.unwrap(), GenerationOutcome::Cancelled);
}

#[tokio::test]
async fn forgetting_the_displayed_report_clears_the_transcript() {
    let mut h = harness("a@b.c");
    h.backend.reports.lock().unwrap().extend([report("r1", "Tides"), report("r2", "Moon")]);
    h.explorer.sync().await;
    generate(&mut h, "Tides").await;

    h.explorer.forget_report("r2").await;
    assert_eq!(h.explorer.chat.messages().await.len(), 2);
    assert!(!h.explorer.view.is_home_view());

    h.explorer.forget_report("r1").await;
    assert!(h.explorer.chat.messages().await.is_empty());
    assert!(h.explorer.view.is_home_view());
    assert_eq!(h.backend.count_calls("delete_report"), 2);
}

#[tokio::test]
async fn forgetting_the_open_report_closes_the_report_view() {
    let mut h = harness("a@b.c");
    h.backend.reports.lock().unwrap().extend([report("r1", "Tides"), report("r2", "Moon")]);
    h.explorer.sync().await;

    assert!(h.explorer.open_saved_report("r2"));
    h.explorer.forget_report("r1").await;
    assert!(h.explorer.view.is_report_view_open());

    h.explorer.forget_report("r2").await;

    assert!(!h.explorer.view.is_report_view_open());
    assert!(h.explorer.view.is_home_view());
    assert!(h.explorer.saved.reports().is_empty());
}

#[tokio::test]
async fn forgetting_another_report_on_the_same_topic_keeps_the_transcript() {
    let mut h = harness("a@b.c");
    h.backend
        .reports
        .lock()
        .unwrap()
        .extend([report("r1", "Tides"), report("r0", "Tides")]);
    h.explorer.sync().await;
    generate(&mut h, "Tides").await;

    h.explorer.forget_report("r0").await;

    assert_eq!(h.explorer.chat.messages().await.len(), 2);
    assert!(!h.explorer.view.is_home_view());
    let linked = h.explorer.chat.latest_report_message().await.unwrap();
    assert_eq!(linked.report_id.as_deref(), Some("r1"));
}

#[tokio::test]
async fn failed_outline_generation_removes_its_placeholders() {
    let mut h = harness("");
    let events = h.backend.stream_generation();
    events
        .unbounded_send(Ok(GenerationEvent::Error {
            detail: "Model overloaded".into(),
        }))
        .unwrap();
    h.explorer.outline.set_topic("Harbors");
    h.explorer
        .outline
        .set_input_mode(explorer_lib::state::outline_form::OutlineInputMode::Json);

    let outcome = h.explorer.submit_outline().await.unwrap();

    assert!(!outcome.is_success());
    assert!(h.explorer.chat.messages().await.is_empty());
    assert_eq!(h.explorer.outline.error(), Some("Model overloaded"));
    assert_eq!(h.explorer.outline.topic(), "Harbors");
    assert!(h.explorer.saved.reports().is_empty());
}

#[tokio::test]
async fn leaving_select_mode_saves_the_whole_selection() {
    let mut h = harness("a@b.c");
    *h.backend.suggestions.lock().unwrap() = vec!["Neap tides".into(), "Tidal power".into()];
    assert!(h.explorer.open_topic("Tides", OpenTopicOptions::default()));
    assert!(h.explorer.load_topic_suggestions().await);

    h.explorer.toggle_topic_select_mode().await;
    h.explorer.topic_view.selection.toggle_item("Neap tides");
    h.explorer.topic_view.selection.toggle_item("Tidal power");
    h.explorer.toggle_topic_select_mode().await;

    assert_eq!(
        *h.backend.created_topics.lock().unwrap(),
        vec!["Neap tides".to_string(), "Tidal power".to_string()]
    );
    assert!(!h.explorer.topic_view.selection.is_active());
    assert!(h.explorer.saved.is_topic_saved("Tidal power"));
}

#[tokio::test]
async fn clicking_outside_dismisses_selection_without_saving() {
    let mut h = harness("");
    h.explorer.toggle_explore_select_mode().await;
    h.explorer.explore.selection.toggle_item("Tides");

    assert!(!h.explorer.explore_pointer_down(PointerTarget::SuggestionsPanel));
    assert!(h.explorer.explore_pointer_down(PointerTarget::Outside));

    assert!(!h.explorer.explore.selection.is_active());
    assert!(h.explorer.saved.topics().is_empty());
}

#[tokio::test]
async fn explore_is_seeded_with_saved_items() {
    let mut h = harness("");
    *h.backend.suggestions.lock().unwrap() = vec!["Moon phases".into()];
    h.explorer.saved.remember_topic(&UserProfile::default(), "Tides").await;

    assert!(h.explorer.refresh_explore().await);

    assert_eq!(h.explorer.explore.feed.suggestions(), ["Moon phases".to_string()]);
    assert!(h.explorer.main_view_state().await.should_show_explore);
}

#[tokio::test]
async fn moving_a_topic_updates_only_after_the_backend_accepts() {
    let mut h = harness("a@b.c");
    h.backend.set_collections(vec![common::collection("c1", "Reading", 0)]);
    h.explorer.saved.remember_topic(&UserProfile::new("a@b.c", ""), "Tides").await;
    h.explorer.sync().await;
    let topic_id = h.explorer.saved.topics()[0].id.clone();

    assert!(h.explorer.move_topic(&topic_id, Some("c1")).await);
    assert_eq!(h.explorer.saved.topics()[0].collection_id.as_deref(), Some("c1"));

    assert!(!h.explorer.move_topic("missing", Some("c1")).await);
    assert!(h.explorer.saved.error.is_some());
}

#[tokio::test]
async fn folder_changes_without_identity_leave_no_error() {
    let mut h = harness("");

    assert!(!h.explorer.delete_collection("c1").await);
    assert!(!h.explorer.move_topic("t1", Some("c1")).await);

    assert_eq!(h.explorer.saved.error, None);
}

#[tokio::test]
async fn changing_user_persists_and_resyncs() {
    let mut h = harness("");
    h.backend.reports.lock().unwrap().push(report("r1", "Tides"));

    h.explorer.set_user(UserProfile::new(" a@b.c ", "Ada")).await;

    assert_eq!(h.store.get(USER_EMAIL_KEY).as_deref(), Some("a@b.c"));
    assert_eq!(h.explorer.saved.reports()[0].id, "r1");
    assert_eq!(h.backend.count_calls("list_collections"), 1);
}

#[tokio::test]
async fn reset_clears_an_idle_transcript() {
    let mut h = harness("");
    generate(&mut h, "Tides").await;

    h.explorer.reset().await;

    assert!(h.explorer.chat.messages().await.is_empty());
    assert!(h.explorer.view.is_home_view());
    assert_eq!(h.explorer.main_view_state().await.surface, Surface::Home);
}

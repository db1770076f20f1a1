//! services/explorer/src/state/chat.rs
//!
//! The transcript and the single in-flight report generation.
//!
//! The controller is cheap to clone and shares its state, so a second task
//! (a Ctrl-C handler, a "Stop" button) can call `stop_generation` while
//! `run_report_flow` is awaiting the stream.

use explorer_core::{
    ExplorerBackend, FinishedReport, GenerateRequest, GenerationEvent, LeaveGuard, Message,
    PortError, Role,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const LEAVE_WARNING: &str = "A report is still generating. Leaving will stop it.";
const INCOMPLETE_MESSAGE: &str = "Report generation did not finish.";
const ALREADY_RUNNING_MESSAGE: &str = "A report is already generating.";

/// How a report generation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Completed(FinishedReport),
    /// Stopped by the user. Partial output stays in the transcript.
    Cancelled,
    Failed(String),
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Completed(_))
    }
}

#[derive(Debug, Default)]
struct ChatState {
    messages: Vec<Message>,
    is_running: bool,
    run_id: u64,
    in_flight: Option<CancellationToken>,
    status: Option<String>,
    error: Option<String>,
}

/// A point-in-time copy of the chat state for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub is_running: bool,
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ChatController {
    state: Arc<Mutex<ChatState>>,
    backend: Arc<dyn ExplorerBackend>,
    leave_guard: Arc<dyn LeaveGuard>,
}

enum StreamEnd {
    Completed(FinishedReport),
    Cancelled,
    Failed(String),
    Exhausted,
}

impl ChatController {
    pub fn new(backend: Arc<dyn ExplorerBackend>, leave_guard: Arc<dyn LeaveGuard>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChatState::default())),
            backend,
            leave_guard,
        }
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let state = self.state.lock().await;
        ChatSnapshot {
            messages: state.messages.clone(),
            is_running: state.is_running,
            status: state.status.clone(),
            error: state.error.clone(),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_running
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    //=====================================================================================
    // Transcript primitives
    //=====================================================================================

    pub async fn append_message(&self, message: Message) {
        self.state.lock().await.messages.push(message);
    }

    pub async fn remove_messages(&self, ids: &[String]) {
        self.state
            .lock()
            .await
            .messages
            .retain(|message| !ids.contains(&message.id));
    }

    pub async fn clear_messages(&self) {
        let mut state = self.state.lock().await;
        state.messages.clear();
        state.error = None;
        state.status = None;
    }

    /// Records which saved report the message `message_id` produced.
    pub async fn link_report(&self, message_id: &str, report_id: &str) {
        let mut state = self.state.lock().await;
        if let Some(message) = state.messages.iter_mut().find(|message| message.id == message_id) {
            message.report_id = Some(report_id.to_string());
        }
    }

    /// The newest assistant message that carries a report.
    pub async fn latest_report_message(&self) -> Option<Message> {
        self.state
            .lock()
            .await
            .messages
            .iter()
            .rev()
            .find(|message| message.is_assistant_report())
            .cloned()
    }

    //=====================================================================================
    // Generation
    //=====================================================================================

    /// Runs one generation, streaming its output into the message `assistant_id`.
    ///
    /// Callers check `is_running` first; a second concurrent run is refused.
    pub async fn run_report_flow(
        &self,
        request: GenerateRequest,
        assistant_id: &str,
        topic: &str,
    ) -> GenerationOutcome {
        let (run_id, token) = {
            let mut state = self.state.lock().await;
            if state.is_running {
                warn!("Refusing to start a second report generation");
                return GenerationOutcome::Failed(ALREADY_RUNNING_MESSAGE.to_string());
            }
            let token = CancellationToken::new();
            state.run_id += 1;
            state.is_running = true;
            state.in_flight = Some(token.clone());
            state.error = None;
            state.status = None;
            self.leave_guard.arm(LEAVE_WARNING);
            (state.run_id, token)
        };
        info!(run_id, topic, "Report generation started");

        let end = self.drive(&request, assistant_id, topic, &token).await;
        let outcome = match end {
            StreamEnd::Completed(report) => {
                info!(run_id, title = %report.title, "Report generation completed");
                self.write_final(assistant_id, &report).await;
                GenerationOutcome::Completed(report)
            }
            StreamEnd::Cancelled => {
                info!(run_id, "Report generation stopped");
                GenerationOutcome::Cancelled
            }
            StreamEnd::Failed(message) => {
                error!(run_id, error = %message, "Report generation failed");
                GenerationOutcome::Failed(message)
            }
            StreamEnd::Exhausted => {
                warn!(run_id, "Report stream ended without a final report");
                GenerationOutcome::Failed(INCOMPLETE_MESSAGE.to_string())
            }
        };

        let mut state = self.state.lock().await;
        if let GenerationOutcome::Failed(message) = &outcome {
            state.error = Some(message.clone());
        }
        if state.run_id == run_id && state.is_running {
            state.is_running = false;
            state.in_flight = None;
            state.status = None;
            self.leave_guard.disarm();
        }
        outcome
    }

    async fn drive(
        &self,
        request: &GenerateRequest,
        assistant_id: &str,
        topic: &str,
        token: &CancellationToken,
    ) -> StreamEnd {
        let started = tokio::select! {
            biased;
            _ = token.cancelled() => return StreamEnd::Cancelled,
            started = self.backend.generate_report(request) => started,
        };
        let mut stream = match started {
            Ok(stream) => stream,
            Err(PortError::Cancelled) => return StreamEnd::Cancelled,
            Err(e) => return StreamEnd::Failed(e.to_string()),
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return StreamEnd::Cancelled,
                next = stream.next() => next,
            };
            match next {
                None => return StreamEnd::Exhausted,
                Some(Err(PortError::Cancelled)) => return StreamEnd::Cancelled,
                Some(Err(e)) => return StreamEnd::Failed(e.to_string()),
                Some(Ok(GenerationEvent::Delta { text })) => {
                    let mut state = self.state.lock().await;
                    if token.is_cancelled() {
                        return StreamEnd::Cancelled;
                    }
                    if let Some(message) = find_message(&mut state.messages, assistant_id) {
                        message.content.push_str(&text);
                    }
                }
                Some(Ok(GenerationEvent::Status { stage, message })) => {
                    debug!(%stage, %message, "Generation status");
                    let label = if message.is_empty() { stage } else { message };
                    let mut state = self.state.lock().await;
                    if token.is_cancelled() {
                        return StreamEnd::Cancelled;
                    }
                    state.status = Some(label);
                }
                Some(Ok(GenerationEvent::Complete { report })) => {
                    if token.is_cancelled() {
                        return StreamEnd::Cancelled;
                    }
                    return StreamEnd::Completed(report.into_finished(topic));
                }
                Some(Ok(GenerationEvent::Error { detail })) => {
                    let detail = match detail.trim() {
                        "" => INCOMPLETE_MESSAGE.to_string(),
                        detail => detail.to_string(),
                    };
                    return StreamEnd::Failed(detail);
                }
                Some(Ok(GenerationEvent::Unknown)) => {}
            }
        }
    }

    async fn write_final(&self, assistant_id: &str, report: &FinishedReport) {
        let mut state = self.state.lock().await;
        if let Some(message) = find_message(&mut state.messages, assistant_id) {
            if !report.content.is_empty() {
                message.content = report.content.clone();
            }
            message.report_text = Some(message.content.clone());
        }
    }

    /// Cancels the running generation. Output streamed so far is kept.
    pub async fn stop_generation(&self) {
        let mut state = self.state.lock().await;
        let Some(token) = state.in_flight.take() else {
            return;
        };
        token.cancel();
        state.is_running = false;
        state.status = None;
        self.leave_guard.disarm();
        info!(run_id = state.run_id, "Stop requested");
    }
}

fn find_message<'a>(messages: &'a mut [Message], id: &str) -> Option<&'a mut Message> {
    messages
        .iter_mut()
        .find(|message| message.id == id && message.role == Role::Assistant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completion_counts_as_success() {
        assert!(!GenerationOutcome::Cancelled.is_success());
        assert!(!GenerationOutcome::Failed("x".into()).is_success());
        let report = FinishedReport {
            topic: "T".into(),
            title: "T".into(),
            content: String::new(),
            outline: None,
        };
        assert!(GenerationOutcome::Completed(report).is_success());
    }
}

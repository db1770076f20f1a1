//! services/explorer/src/state/outline_form.rs
//!
//! The outline composer: manual rows or raw JSON, validated into a generation request.
//!
//! Submission is two-phase. `begin_submit` validates and hands back the placeholder
//! messages and request; the caller appends the messages and runs the generation,
//! then reports the outcome to `finish_submit`.

use crate::state::chat::GenerationOutcome;
use explorer_core::outline::{
    describe_json_outline, describe_outline, normalize_drafts, validate_outline_json,
    JsonOutlineValidation, DEFAULT_OUTLINE_JSON,
};
use explorer_core::text::parse_topics_list;
use explorer_core::{
    local_id, DraftSection, GenerateRequest, Message, MessageVariant, ModelsPayload, OutlineError,
    UserProfile,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutlineInputMode {
    #[default]
    Lines,
    Json,
}

/// A validated submission waiting for its generation to run.
#[derive(Debug, Clone)]
pub struct OutlineSubmission {
    pub topic: String,
    pub user_message: Message,
    pub assistant_message: Message,
    pub request: GenerateRequest,
}

impl OutlineSubmission {
    pub fn assistant_id(&self) -> &str {
        &self.assistant_message.id
    }

    fn message_ids(&self) -> Vec<String> {
        vec![self.user_message.id.clone(), self.assistant_message.id.clone()]
    }
}

pub struct OutlineForm {
    topic: String,
    input_mode: OutlineInputMode,
    sections: Vec<DraftSection>,
    json_input: String,
    error: Option<String>,
    pub avoid_topics: String,
    pub include_topics: String,
}

impl Default for OutlineForm {
    fn default() -> Self {
        Self {
            topic: String::new(),
            input_mode: OutlineInputMode::Lines,
            sections: vec![DraftSection::empty()],
            json_input: DEFAULT_OUTLINE_JSON.to_string(),
            error: None,
            avoid_topics: String::new(),
            include_topics: String::new(),
        }
    }
}

impl OutlineForm {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn input_mode(&self) -> OutlineInputMode {
        self.input_mode
    }

    pub fn sections(&self) -> &[DraftSection] {
        &self.sections
    }

    pub fn json_input(&self) -> &str {
        &self.json_input
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.error = None;
        self.topic = topic.into();
    }

    pub fn set_input_mode(&mut self, mode: OutlineInputMode) {
        self.error = None;
        self.input_mode = mode;
    }

    pub fn set_json_input(&mut self, input: impl Into<String>) {
        self.error = None;
        self.json_input = input.into();
    }

    /// Back to one empty row and the JSON skeleton. The input mode is kept.
    pub fn reset(&mut self) {
        *self = Self {
            input_mode: self.input_mode,
            ..Self::default()
        };
    }

    //=====================================================================================
    // Manual rows
    //=====================================================================================

    fn edit_section(&mut self, section_id: &str, edit: impl FnOnce(&mut DraftSection)) {
        self.error = None;
        if let Some(section) = self.sections.iter_mut().find(|section| section.id == section_id) {
            edit(section);
        }
    }

    pub fn add_section(&mut self) {
        self.error = None;
        self.sections.push(DraftSection::empty());
    }

    /// Removes a row. The last remaining row is kept.
    pub fn remove_section(&mut self, section_id: &str) {
        self.error = None;
        if self.sections.len() > 1 {
            self.sections.retain(|section| section.id != section_id);
        }
    }

    pub fn set_section_title(&mut self, section_id: &str, title: &str) {
        self.edit_section(section_id, |section| section.title = title.to_string());
    }

    pub fn set_subsection(&mut self, section_id: &str, index: usize, value: &str) {
        self.edit_section(section_id, |section| {
            if let Some(entry) = section.subsections.get_mut(index) {
                *entry = value.to_string();
            }
        });
    }

    pub fn add_subsection(&mut self, section_id: &str) {
        self.edit_section(section_id, |section| section.subsections.push(String::new()));
    }

    pub fn remove_subsection(&mut self, section_id: &str, index: usize) {
        self.edit_section(section_id, |section| {
            if index < section.subsections.len() {
                section.subsections.remove(index);
            }
        });
    }

    //=====================================================================================
    // Validation
    //=====================================================================================

    pub fn json_validation(&self) -> JsonOutlineValidation {
        validate_outline_json(&self.json_input)
    }

    /// The JSON error to show inline, only in JSON mode.
    pub fn json_validation_error(&self) -> Option<OutlineError> {
        match self.input_mode {
            OutlineInputMode::Json => self.json_validation().error,
            OutlineInputMode::Lines => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        if self.topic.trim().is_empty() {
            return false;
        }
        match self.input_mode {
            OutlineInputMode::Lines => self
                .sections
                .iter()
                .all(|section| !section.title.trim().is_empty()),
            OutlineInputMode::Json => {
                let validation = self.json_validation();
                !validation.trimmed_input.is_empty() && validation.error.is_none()
            }
        }
    }

    fn build(
        &self,
        topic: &str,
        models: ModelsPayload,
        user: &UserProfile,
    ) -> Result<(GenerateRequest, String), OutlineError> {
        let (sections, summary) = match self.input_mode {
            OutlineInputMode::Lines => {
                let sections = normalize_drafts(&self.sections);
                if sections.is_empty() {
                    return Err(OutlineError::NoSections);
                }
                let summary = describe_outline(topic, &sections);
                (sections, summary)
            }
            OutlineInputMode::Json => {
                let validation = self.json_validation();
                if validation.trimmed_input.is_empty() {
                    return Err(OutlineError::EmptyJson);
                }
                if let Some(error) = validation.error {
                    return Err(error);
                }
                if validation.sections.is_empty() {
                    return Err(OutlineError::MissingSections);
                }
                let summary = describe_json_outline(topic, &validation.trimmed_input);
                (validation.sections, summary)
            }
        };

        let request = GenerateRequest::for_outline(topic, sections)
            .with_models(Some(models))
            .with_subjects(
                parse_topics_list(&self.avoid_topics),
                parse_topics_list(&self.include_topics),
            )
            .with_user(user);
        Ok((request, summary))
    }

    //=====================================================================================
    // Submission
    //=====================================================================================

    /// Validates the form. On failure the error is recorded and `None` returned.
    pub fn begin_submit(
        &mut self,
        is_running: bool,
        models: ModelsPayload,
        user: &UserProfile,
    ) -> Option<OutlineSubmission> {
        if is_running {
            return None;
        }
        let topic = self.topic.trim().to_string();
        if topic.is_empty() {
            self.error = Some(OutlineError::MissingTopic.to_string());
            return None;
        }

        let (request, summary) = match self.build(&topic, models, user) {
            Ok(built) => built,
            Err(e) => {
                debug!(error = %e, "Outline submission rejected");
                self.error = Some(e.to_string());
                return None;
            }
        };

        let assistant_id = local_id();
        self.error = None;
        Some(OutlineSubmission {
            user_message: Message::user(format!("{}-user", assistant_id), summary)
                .with_variant(MessageVariant::Outline),
            assistant_message: Message::assistant_placeholder(assistant_id, topic.clone())
                .with_variant(MessageVariant::Outline),
            topic,
            request,
        })
    }

    /// Settles a submission. Returns the placeholder message ids to remove.
    pub fn finish_submit(
        &mut self,
        submission: &OutlineSubmission,
        outcome: &GenerationOutcome,
    ) -> Vec<String> {
        match outcome {
            GenerationOutcome::Completed(_) => {
                self.reset();
                Vec::new()
            }
            GenerationOutcome::Cancelled => Vec::new(),
            GenerationOutcome::Failed(message) => {
                let message = match message.trim() {
                    "" => OutlineError::Incomplete.to_string(),
                    message => message.to_string(),
                };
                self.error = Some(message);
                submission.message_ids()
            }
        }
    }
}

//! services/explorer/src/state/settings.rs
//!
//! Model presets, the current stage-model selection and the suggestion model.

use explorer_core::persistence::{
    load_json, persist_json, persist_optional, ACTIVE_PRESET_KEY, MODEL_PRESETS_KEY,
    SUGGESTION_MODEL_KEY,
};
use explorer_core::presets::{normalize_model_presets, DEFAULT_SUGGESTION_MODEL};
use explorer_core::{KeyValueStore, ModelPresets, ModelStage, ModelsPayload, PresetName, StageModels};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub struct Settings {
    store: Arc<dyn KeyValueStore>,
    presets: ModelPresets,
    default_preset: PresetName,
    selected_preset: PresetName,
    stage_models: StageModels,
    suggestion_model: String,
    pub is_open: bool,
}

impl Settings {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let presets = load_json::<Value>(store.as_ref(), MODEL_PRESETS_KEY)
            .map(|raw| normalize_model_presets(&raw))
            .unwrap_or_default();
        let default_preset = store
            .get(ACTIVE_PRESET_KEY)
            .and_then(|key| PresetName::from_key(&key))
            .unwrap_or_default();
        let suggestion_model = store
            .get(SUGGESTION_MODEL_KEY)
            .map(|model| model.trim().to_string())
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| DEFAULT_SUGGESTION_MODEL.to_string());

        Self {
            stage_models: presets.get(default_preset).clone(),
            store,
            presets,
            default_preset,
            selected_preset: default_preset,
            suggestion_model,
            is_open: false,
        }
    }

    pub fn presets(&self) -> &ModelPresets {
        &self.presets
    }

    pub fn default_preset(&self) -> PresetName {
        self.default_preset
    }

    pub fn selected_preset(&self) -> PresetName {
        self.selected_preset
    }

    pub fn stage_models(&self) -> &StageModels {
        &self.stage_models
    }

    pub fn suggestion_model(&self) -> &str {
        &self.suggestion_model
    }

    /// The `models` object for the next generation request.
    pub fn models_payload(&self) -> ModelsPayload {
        self.stage_models.models_payload()
    }

    pub fn open(&mut self) {
        self.is_open = true;
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    /// Selects a preset for the next generation, replacing any per-stage overrides.
    pub fn select_preset(&mut self, preset: PresetName) {
        self.selected_preset = preset;
        self.stage_models = self.presets.get(preset).clone();
    }

    /// Overrides one stage of the current selection without touching the stored presets.
    pub fn set_stage_model(&mut self, stage: ModelStage, model: &str) {
        self.stage_models.set(stage, model);
    }

    /// Edits a stored preset. The current selection follows when it is that preset.
    pub fn set_preset_model(&mut self, preset: PresetName, stage: ModelStage, model: &str) {
        self.presets.get_mut(preset).set(stage, model);
        if preset == self.selected_preset {
            self.stage_models.set(stage, model);
        }
        persist_json(self.store.as_ref(), MODEL_PRESETS_KEY, &self.presets);
    }

    pub fn set_default_preset(&mut self, preset: PresetName) {
        info!(preset = preset.key(), "Default model preset changed");
        self.default_preset = preset;
        self.store.set(ACTIVE_PRESET_KEY, preset.key());
    }

    pub fn set_suggestion_model(&mut self, model: &str) {
        self.suggestion_model = match model.trim() {
            "" => DEFAULT_SUGGESTION_MODEL.to_string(),
            trimmed => trimmed.to_string(),
        };
        persist_optional(self.store.as_ref(), SUGGESTION_MODEL_KEY, &self.suggestion_model);
    }
}

//! crates/explorer_core/src/presets.rs
//!
//! Model presets: a named choice of model per report pipeline stage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_STAGE_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_SUGGESTION_MODEL: &str = "gpt-4.1-nano";

/// Models offered in the settings pickers, as `(value, label)`.
pub const MODEL_OPTIONS: [(&str, &str); 4] = [
    ("gpt-4.1-nano", "gpt-4.1-nano (fast)"),
    ("gpt-4o-mini", "gpt-4o-mini"),
    ("gpt-4o", "gpt-4o (slower, better)"),
    ("gpt-5-nano", "gpt-5-nano"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStage {
    Outline,
    Writer,
    Editor,
}

impl ModelStage {
    pub const ALL: [ModelStage; 3] = [ModelStage::Outline, ModelStage::Writer, ModelStage::Editor];

    pub fn key(self) -> &'static str {
        match self {
            ModelStage::Outline => "outline",
            ModelStage::Writer => "writer",
            ModelStage::Editor => "editor",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelStage::Outline => "Outline",
            ModelStage::Writer => "Writer",
            ModelStage::Editor => "Editor",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ModelStage::Outline => "Plans the section list.",
            ModelStage::Writer => "Writes each section.",
            ModelStage::Editor => "Edits prose into a transcript suitable for audio format.",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    #[default]
    Fast,
    Slower,
    Slowest,
}

impl PresetName {
    pub const ORDER: [PresetName; 3] = [PresetName::Fast, PresetName::Slower, PresetName::Slowest];

    pub fn key(self) -> &'static str {
        match self {
            PresetName::Fast => "fast",
            PresetName::Slower => "slower",
            PresetName::Slowest => "slowest",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PresetName::Fast => "Fast",
            PresetName::Slower => "Slower",
            PresetName::Slowest => "Slowest",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ORDER
            .into_iter()
            .find(|preset| preset.key().eq_ignore_ascii_case(key.trim()))
    }
}

/// The model identifier chosen for each pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageModels {
    pub outline: String,
    pub writer: String,
    pub editor: String,
}

impl Default for StageModels {
    fn default() -> Self {
        Self::uniform(DEFAULT_STAGE_MODEL)
    }
}

impl StageModels {
    pub fn uniform(model: &str) -> Self {
        Self {
            outline: model.to_string(),
            writer: model.to_string(),
            editor: model.to_string(),
        }
    }

    pub fn get(&self, stage: ModelStage) -> &str {
        match stage {
            ModelStage::Outline => &self.outline,
            ModelStage::Writer => &self.writer,
            ModelStage::Editor => &self.editor,
        }
    }

    /// Sets a stage model; blank values fall back to the default model.
    pub fn set(&mut self, stage: ModelStage, model: &str) {
        let model = match model.trim() {
            "" => DEFAULT_STAGE_MODEL.to_string(),
            trimmed => trimmed.to_string(),
        };
        match stage {
            ModelStage::Outline => self.outline = model,
            ModelStage::Writer => self.writer = model,
            ModelStage::Editor => self.editor = model,
        }
    }

    /// The `models` object attached to report generation requests.
    pub fn models_payload(&self) -> ModelsPayload {
        let model_for = |stage: ModelStage| match self.get(stage).trim() {
            "" => ModelSpec::new(DEFAULT_STAGE_MODEL),
            model => ModelSpec::new(model),
        };
        ModelsPayload {
            outline: model_for(ModelStage::Outline),
            writer: model_for(ModelStage::Writer),
            editor: model_for(ModelStage::Editor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model: String,
}

impl ModelSpec {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsPayload {
    pub outline: ModelSpec,
    pub writer: ModelSpec,
    pub editor: ModelSpec,
}

/// The fixed set of presets, each fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPresets {
    pub fast: StageModels,
    pub slower: StageModels,
    pub slowest: StageModels,
}

impl Default for ModelPresets {
    fn default() -> Self {
        Self {
            fast: StageModels::default(),
            slower: StageModels::uniform("gpt-4o"),
            slowest: StageModels::uniform("gpt-4o"),
        }
    }
}

impl ModelPresets {
    pub fn get(&self, preset: PresetName) -> &StageModels {
        match preset {
            PresetName::Fast => &self.fast,
            PresetName::Slower => &self.slower,
            PresetName::Slowest => &self.slowest,
        }
    }

    pub fn get_mut(&mut self, preset: PresetName) -> &mut StageModels {
        match preset {
            PresetName::Fast => &mut self.fast,
            PresetName::Slower => &mut self.slower,
            PresetName::Slowest => &mut self.slowest,
        }
    }
}

/// Normalizes an arbitrary JSON value into a complete set of stage models.
/// Missing, blank or non-string entries take the default model.
pub fn normalize_preset(raw: &Value) -> StageModels {
    let mut normalized = StageModels::default();
    for stage in ModelStage::ALL {
        let value = raw.get(stage.key()).and_then(Value::as_str).unwrap_or("");
        normalized.set(stage, value);
    }
    normalized
}

/// Normalizes stored presets. Every known preset is present afterwards,
/// unknown presets are dropped.
pub fn normalize_model_presets(raw: &Value) -> ModelPresets {
    let mut presets = ModelPresets::default();
    for name in PresetName::ORDER {
        *presets.get_mut(name) = normalize_preset(raw.get(name.key()).unwrap_or(&Value::Null));
    }
    presets
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn partial_presets_are_filled_with_defaults() {
        let presets = normalize_model_presets(&json!({
            "slower": {"writer": " gpt-4o-mini "},
            "unknown": {"outline": "x"},
        }));
        assert_eq!(presets.fast, StageModels::default());
        assert_eq!(presets.slower.writer, "gpt-4o-mini");
        assert_eq!(presets.slower.outline, DEFAULT_STAGE_MODEL);
        assert_eq!(presets.slowest, StageModels::default());
    }

    #[test]
    fn non_object_input_yields_defaults_per_stage() {
        let presets = normalize_model_presets(&json!("garbage"));
        for name in PresetName::ORDER {
            assert_eq!(presets.get(name), &StageModels::default());
        }
    }

    #[test]
    fn non_string_stage_values_are_ignored() {
        let stage_models = normalize_preset(&json!({"outline": 42, "editor": "gpt-5-nano"}));
        assert_eq!(stage_models.outline, DEFAULT_STAGE_MODEL);
        assert_eq!(stage_models.editor, "gpt-5-nano");
    }

    #[test]
    fn models_payload_wraps_each_stage() {
        let mut stage_models = StageModels::uniform("gpt-4o");
        stage_models.set(ModelStage::Editor, "   ");
        let payload = serde_json::to_value(stage_models.models_payload()).unwrap();
        assert_eq!(
            payload,
            json!({
                "outline": {"model": "gpt-4o"},
                "writer": {"model": "gpt-4o"},
                "editor": {"model": DEFAULT_STAGE_MODEL},
            })
        );
    }

    #[test]
    fn preset_keys_round_trip() {
        assert_eq!(PresetName::from_key("Slowest"), Some(PresetName::Slowest));
        assert_eq!(PresetName::from_key("turbo"), None);
    }
}

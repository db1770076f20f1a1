pub mod domain;
pub mod generation;
pub mod outline;
pub mod persistence;
pub mod ports;
pub mod presets;
pub mod report;
pub mod text;

pub use domain::{
    local_id, Collection, CollectionUpdate, Message, MessageVariant, NewCollection, Role,
    SavedReport, SavedTopic, UserProfile, DEFAULT_REPORT_TITLE,
};
pub use generation::{GenerateRequest, GenerationEvent};
pub use outline::{DraftSection, OutlineError, OutlineSection};
pub use persistence::MemoryStore;
pub use ports::{
    ExplorerBackend, GenerationStream, KeyValueStore, LeaveGuard, PortError, PortResult,
    SuggestionQuery,
};
pub use presets::{ModelPresets, ModelStage, ModelsPayload, PresetName, StageModels};
pub use report::{ActiveReport, FinishedReport, ReportPayload};
pub use text::SummaryLimits;

pub mod chat;
pub mod collections;
pub mod derived;
pub mod explore;
pub mod explorer;
pub mod outline_form;
pub mod saved;
pub mod settings;
pub mod suggestions;
pub mod topic_view;
pub mod view;

pub use chat::{ChatController, ChatSnapshot, GenerationOutcome};
pub use derived::{MainViewState, Surface};
pub use explorer::{Explorer, ExplorerDeps};
pub use suggestions::PointerTarget;
pub use view::{ComposerMode, OpenTopicOptions};

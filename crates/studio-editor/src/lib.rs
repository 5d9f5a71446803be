pub mod error;
pub mod history;
pub mod mutations;
pub mod selection;
pub mod session;
pub mod shortcuts;
pub mod studio;

pub use error::StudioError;
pub use history::{DEFAULT_HISTORY_LIMIT, History, HistoryConfig, HistoryEntry};
pub use mutations::{ComponentPatch, MutationOutcome, PageMutation, apply_mutation};
pub use selection::SelectionState;
pub use session::EditorSession;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use studio::Studio;

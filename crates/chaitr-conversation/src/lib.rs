pub mod controller;
pub mod logs;
pub mod settings;

pub use controller::{ConversationController, SubmitOutcome};
pub use logs::ErrorLog;
pub use settings::{SettingsEditor, SettingsError};

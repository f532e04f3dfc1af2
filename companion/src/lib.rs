//! Terminal chat companion: a controller that streams replies from the
//! companion server into an observable chat state, optionally speaking them.

pub mod config;
pub mod controller;
pub mod render;
pub mod state;

pub use config::CompanionConfig;
pub use controller::{ChatController, SubmitOutcome};
pub use render::TranscriptRenderer;
pub use state::{Action, ChatState, Message, Phase, Rejected, Sender, FAILED_REPLY};

// Database models - Re-exports all domain-specific models
//
// This module is split into focused files by domain:
// - user.rs: Users and their Plaud connection
// - settings.rs: Per-user settings
// - recording.rs: Mirrored recording metadata
// - transcription.rs: Transcription records and their state machine
// - provider_config.rs: AI provider configurations

mod settings;
mod user;
mod recording;
mod transcription;
mod provider_config;

pub use settings::{Setting, SyncSettings};
pub use user::{User, PlaudConnection};
pub use recording::{Recording, RecordingUpsert, UpsertOutcome};
pub use transcription::{Transcription, TranscriptionStatus, TranscriptSource};
pub use provider_config::{ProviderCapability, ProviderConfig, UpsertProviderConfig};

/// Timestamp format used for every TEXT time column (sortable, millisecond precision)
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

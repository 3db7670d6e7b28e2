// Database models - Settings
use serde::{Deserialize, Serialize};

/// A single setting stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub updated_at: String,
}

/// Per-user sync and transcription settings consumed by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// Timer period between automatic syncs
    pub sync_interval_ms: u64,
    /// Floor between any two executed syncs
    pub min_interval_ms: u64,
    pub auto_sync_enabled: bool,
    pub sync_on_mount: bool,
    pub sync_on_visibility_change: bool,
    pub sync_notifications: bool,
    /// Run a backfill sweep after a sync that found new recordings
    pub auto_transcribe: bool,
    /// Language hint for providers; None lets the provider detect
    pub default_transcription_language: Option<String>,
    pub backfill_concurrency: usize,
    /// Prefer the vendor transcript when the remote already has one
    pub import_plaud_transcripts: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            sync_interval_ms: 5 * 60 * 1000,
            min_interval_ms: 60 * 1000,
            auto_sync_enabled: true,
            sync_on_mount: true,
            sync_on_visibility_change: true,
            sync_notifications: true,
            auto_transcribe: false,
            default_transcription_language: None,
            backfill_concurrency: 3,
            import_plaud_transcripts: true,
        }
    }
}

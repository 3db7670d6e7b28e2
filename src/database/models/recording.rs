// Database models - Recording
use serde::{Deserialize, Serialize};

/// A recording mirrored from the remote device catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recording {
    pub id: String,
    pub user_id: String,
    pub remote_id: String,
    pub device_sn: String,
    pub filename: String,
    pub file_md5: String,
    pub filesize: i64,
    pub filetype: String,
    pub duration_ms: i64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub version: i64,
    pub version_ms: i64,
    pub edit_time: i64,
    pub is_trash: bool,
    pub ori_ready: bool,
    pub is_trans: bool,
    pub is_summary: bool,
    pub audio_file_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Recording {
    /// Whether the audio is downloadable and the row is live
    pub fn is_transcribable(&self) -> bool {
        self.ori_ready && !self.is_trash
    }
}

/// Remote-side fields applied by a reconciliation upsert
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RecordingUpsert {
    pub remote_id: String,
    pub device_sn: String,
    pub filename: String,
    pub file_md5: String,
    pub filesize: i64,
    pub filetype: String,
    pub duration_ms: i64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub version: i64,
    pub version_ms: i64,
    pub edit_time: i64,
    pub is_trash: bool,
    pub ori_ready: bool,
    pub is_trans: bool,
    pub is_summary: bool,
}

impl RecordingUpsert {
    /// True when this remote snapshot is strictly newer than the stored one
    pub fn is_newer_than(&self, version: i64, version_ms: i64) -> bool {
        (self.version, self.version_ms) > (version, version_ms)
    }
}

/// What a single upsert did to the local row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting, a new row was created
    Inserted(String),
    /// Remote version was newer, fields were overwritten
    Updated(String),
    /// Remote reported the item trashed, only the trash flag changed
    Trashed(String),
    /// Stale or identical snapshot, nothing written
    Unchanged(String),
}

impl UpsertOutcome {
    /// Local primary key of the affected row
    pub fn recording_id(&self) -> &str {
        match self {
            UpsertOutcome::Inserted(id)
            | UpsertOutcome::Updated(id)
            | UpsertOutcome::Trashed(id)
            | UpsertOutcome::Unchanged(id) => id,
        }
    }
}

// Database module for plaud-mirror
// Provides SQLite persistence for users, settings, recordings, transcriptions, and provider configs

pub mod manager;
pub mod migrations;
pub mod models;
pub mod users_repo;
pub mod settings_repo;
pub mod recordings_repo;
pub mod transcriptions_repo;
pub mod provider_config_repo;

pub use manager::DatabaseManager;
pub use models::*;

#[cfg(test)]
pub(crate) mod test_support {
    use super::{DatabaseManager, RecordingUpsert, User};

    /// Fresh in-memory database with one user already created
    pub fn create_test_db() -> (DatabaseManager, User) {
        let db = DatabaseManager::new_in_memory().unwrap();
        let user = db.get_or_create_user("test@example.com").unwrap();
        (db, user)
    }

    /// A transcribable, live remote recording at the given version
    pub fn sample_upsert(remote_id: &str, version: i64) -> RecordingUpsert {
        RecordingUpsert {
            remote_id: remote_id.to_string(),
            device_sn: "SN-TEST".to_string(),
            filename: format!("{}.opus", remote_id),
            file_md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            filesize: 1024,
            filetype: "opus".to_string(),
            duration_ms: 60_000,
            start_time_ms: 1_700_000_000_000,
            end_time_ms: 1_700_000_060_000,
            version,
            version_ms: 1_700_000_000_000 + version,
            edit_time: 1_700_000_000,
            is_trash: false,
            ori_ready: true,
            is_trans: false,
            is_summary: false,
        }
    }
}

// Settings repository for plaud-mirror
// Handles per-user key-value settings and the typed sync settings view

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use super::models::{now_timestamp, Setting, SyncSettings};
use super::DatabaseManager;

impl DatabaseManager {
    /// Get a single setting by key
    pub fn get_setting(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            get_setting_impl(conn, user_id, key)
        })
    }

    /// Set a single setting
    pub fn set_setting(&self, user_id: &str, key: &str, value: &str, value_type: &str) -> Result<()> {
        self.with_connection(|conn| {
            set_setting_impl(conn, user_id, key, value, value_type)
        })
    }

    /// Get all of a user's settings
    pub fn get_all_settings_list(&self, user_id: &str) -> Result<Vec<Setting>> {
        self.with_connection(|conn| {
            get_all_settings_impl(conn, user_id)
        })
    }

    /// Set a boolean setting
    pub fn set_bool_setting(&self, user_id: &str, key: &str, value: bool) -> Result<()> {
        self.set_setting(user_id, key, if value { "true" } else { "false" }, "boolean")
    }

    /// Get a boolean setting
    pub fn get_bool_setting(&self, user_id: &str, key: &str, default: bool) -> Result<bool> {
        match self.get_setting(user_id, key)? {
            Some(v) => Ok(v == "true"),
            None => Ok(default),
        }
    }

    /// Delete a setting by key
    pub fn delete_setting(&self, user_id: &str, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM settings WHERE user_id = ? AND key = ?",
                params![user_id, key],
            ).context("Failed to delete setting")?;
            Ok(())
        })
    }

    /// Load the sync settings, falling back to defaults for missing keys
    pub fn load_sync_settings(&self, user_id: &str) -> Result<SyncSettings> {
        self.with_connection(|conn| {
            load_sync_settings_impl(conn, user_id)
        })
    }

    /// Persist every sync setting in one transaction
    pub fn save_sync_settings(&self, user_id: &str, settings: &SyncSettings) -> Result<()> {
        self.with_connection(|conn| {
            save_sync_settings_impl(conn, user_id, settings)
        })
    }
}

fn get_setting_impl(conn: &Connection, user_id: &str, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare(
        "SELECT value FROM settings WHERE user_id = ? AND key = ?"
    ).context("Failed to prepare get_setting query")?;

    let result = stmt.query_row(params![user_id, key], |row| row.get(0));

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get setting"),
    }
}

fn set_setting_impl(conn: &Connection, user_id: &str, key: &str, value: &str, value_type: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO settings (user_id, key, value, value_type, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(user_id, key) DO UPDATE SET
            value = excluded.value,
            value_type = excluded.value_type,
            updated_at = excluded.updated_at
        "#,
        params![user_id, key, value, value_type, now_timestamp()],
    ).context("Failed to set setting")?;

    Ok(())
}

fn get_all_settings_impl(conn: &Connection, user_id: &str) -> Result<Vec<Setting>> {
    let mut stmt = conn.prepare(
        "SELECT key, value, value_type, updated_at FROM settings WHERE user_id = ? ORDER BY key"
    ).context("Failed to prepare get_all_settings query")?;

    let settings = stmt.query_map(params![user_id], |row| {
        Ok(Setting {
            key: row.get(0)?,
            value: row.get(1)?,
            value_type: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }).context("Failed to query settings")?;

    settings.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect settings")
}

fn parse_u64(key: &str, value: &str, fallback: u64) -> u64 {
    value.parse().unwrap_or_else(|_| {
        log::warn!("Ignoring non-numeric value {:?} for setting {}", value, key);
        fallback
    })
}

fn load_sync_settings_impl(conn: &Connection, user_id: &str) -> Result<SyncSettings> {
    let mut settings = SyncSettings::default();

    for setting in get_all_settings_impl(conn, user_id)? {
        let value = setting.value;
        match setting.key.as_str() {
            "sync_interval_ms" => settings.sync_interval_ms = parse_u64(&setting.key, &value, settings.sync_interval_ms),
            "min_interval_ms" => settings.min_interval_ms = parse_u64(&setting.key, &value, settings.min_interval_ms),
            "auto_sync_enabled" => settings.auto_sync_enabled = value == "true",
            "sync_on_mount" => settings.sync_on_mount = value == "true",
            "sync_on_visibility_change" => settings.sync_on_visibility_change = value == "true",
            "sync_notifications" => settings.sync_notifications = value == "true",
            "auto_transcribe" => settings.auto_transcribe = value == "true",
            "default_transcription_language" => {
                settings.default_transcription_language = Some(value).filter(|v| !v.is_empty());
            }
            "backfill_concurrency" => {
                let parsed = parse_u64(&setting.key, &value, settings.backfill_concurrency as u64);
                settings.backfill_concurrency = (parsed as usize).max(1);
            }
            "import_plaud_transcripts" => settings.import_plaud_transcripts = value == "true",
            _ => {
                log::debug!("Unknown setting key: {}", setting.key);
            }
        }
    }

    Ok(settings)
}

fn save_sync_settings_impl(conn: &Connection, user_id: &str, settings: &SyncSettings) -> Result<()> {
    let bool_str = |b: bool| if b { "true" } else { "false" };

    let entries: [(&str, String, &str); 10] = [
        ("sync_interval_ms", settings.sync_interval_ms.to_string(), "number"),
        ("min_interval_ms", settings.min_interval_ms.to_string(), "number"),
        ("auto_sync_enabled", bool_str(settings.auto_sync_enabled).to_string(), "boolean"),
        ("sync_on_mount", bool_str(settings.sync_on_mount).to_string(), "boolean"),
        ("sync_on_visibility_change", bool_str(settings.sync_on_visibility_change).to_string(), "boolean"),
        ("sync_notifications", bool_str(settings.sync_notifications).to_string(), "boolean"),
        ("auto_transcribe", bool_str(settings.auto_transcribe).to_string(), "boolean"),
        (
            "default_transcription_language",
            settings.default_transcription_language.clone().unwrap_or_default(),
            "string",
        ),
        ("backfill_concurrency", settings.backfill_concurrency.to_string(), "number"),
        ("import_plaud_transcripts", bool_str(settings.import_plaud_transcripts).to_string(), "boolean"),
    ];

    let tx = conn.unchecked_transaction()
        .context("Failed to start transaction")?;
    for (key, value, value_type) in entries.iter() {
        set_setting_impl(&tx, user_id, key, value, value_type)?;
    }
    tx.commit().context("Failed to commit sync settings")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::create_test_db;

    #[test]
    fn test_set_and_get_setting() {
        let (db, user) = create_test_db();

        db.set_setting(&user.id, "test_key", "test_value", "string").unwrap();
        let value = db.get_setting(&user.id, "test_key").unwrap();
        assert_eq!(value, Some("test_value".to_string()));

        db.delete_setting(&user.id, "test_key").unwrap();
        assert!(db.get_setting(&user.id, "test_key").unwrap().is_none());
    }

    #[test]
    fn test_bool_setting() {
        let (db, user) = create_test_db();

        db.set_bool_setting(&user.id, "test_bool", true).unwrap();
        assert!(db.get_bool_setting(&user.id, "test_bool", false).unwrap());

        db.set_bool_setting(&user.id, "test_bool", false).unwrap();
        assert!(!db.get_bool_setting(&user.id, "test_bool", true).unwrap());
    }

    #[test]
    fn test_settings_are_scoped_per_user() {
        let (db, user) = create_test_db();
        let other = db.get_or_create_user("other@example.com").unwrap();

        db.set_setting(&user.id, "language", "en", "string").unwrap();
        assert!(db.get_setting(&other.id, "language").unwrap().is_none());
    }

    #[test]
    fn test_load_sync_settings_defaults() {
        let (db, user) = create_test_db();
        assert_eq!(db.load_sync_settings(&user.id).unwrap(), SyncSettings::default());
    }

    #[test]
    fn test_sync_settings_persist() {
        let (db, user) = create_test_db();

        let settings = SyncSettings {
            sync_interval_ms: 120_000,
            auto_transcribe: true,
            default_transcription_language: Some("de".to_string()),
            backfill_concurrency: 5,
            ..SyncSettings::default()
        };
        db.save_sync_settings(&user.id, &settings).unwrap();

        assert_eq!(db.load_sync_settings(&user.id).unwrap(), settings);
    }

    #[test]
    fn test_bad_numeric_setting_falls_back() {
        let (db, user) = create_test_db();
        db.set_setting(&user.id, "sync_interval_ms", "soon", "number").unwrap();
        db.set_setting(&user.id, "backfill_concurrency", "0", "number").unwrap();

        let settings = db.load_sync_settings(&user.id).unwrap();
        assert_eq!(settings.sync_interval_ms, SyncSettings::default().sync_interval_ms);
        assert_eq!(settings.backfill_concurrency, 1);
    }
}

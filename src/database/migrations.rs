// Database migrations for plaud-mirror
// Creates and updates the database schema

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    ).unwrap_or(false);

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    ).unwrap_or(0);

    Ok(version)
}

/// Initial schema creation (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v1");

    conn.execute_batch(r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Users: only what header-based user resolution needs
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );

        -- Plaud account credential and server region per user
        CREATE TABLE IF NOT EXISTS plaud_connections (
            user_id TEXT PRIMARY KEY NOT NULL,
            bearer_token TEXT NOT NULL,
            server TEXT NOT NULL DEFAULT 'global',
            device_sn TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        -- Settings: per-user key-value store
        CREATE TABLE IF NOT EXISTS settings (
            user_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            value_type TEXT NOT NULL DEFAULT 'string',
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, key),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        -- Recordings mirrored from the remote catalog
        CREATE TABLE IF NOT EXISTS recordings (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            remote_id TEXT NOT NULL,
            device_sn TEXT NOT NULL DEFAULT '',
            filename TEXT NOT NULL,
            file_md5 TEXT NOT NULL DEFAULT '',
            filesize INTEGER NOT NULL DEFAULT 0,
            filetype TEXT NOT NULL DEFAULT '',
            duration_ms INTEGER NOT NULL DEFAULT 0,
            start_time_ms INTEGER NOT NULL DEFAULT 0,
            end_time_ms INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 0,
            version_ms INTEGER NOT NULL DEFAULT 0,
            edit_time INTEGER NOT NULL DEFAULT 0,
            is_trash INTEGER NOT NULL DEFAULT 0,
            ori_ready INTEGER NOT NULL DEFAULT 0,
            is_trans INTEGER NOT NULL DEFAULT 0,
            is_summary INTEGER NOT NULL DEFAULT 0,
            audio_file_path TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, remote_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        -- Transcriptions: at most one per recording
        CREATE TABLE IF NOT EXISTS transcriptions (
            recording_id TEXT PRIMARY KEY NOT NULL,
            text TEXT,
            language TEXT,
            status TEXT NOT NULL DEFAULT 'none',
            source TEXT NOT NULL DEFAULT 'server',
            provider TEXT,
            last_error TEXT,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (recording_id) REFERENCES recordings(id) ON DELETE CASCADE
        );

        -- AI provider configurations
        CREATE TABLE IF NOT EXISTS provider_configs (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            base_url TEXT,
            api_key TEXT NOT NULL DEFAULT '',
            default_model TEXT,
            is_default_transcription INTEGER NOT NULL DEFAULT 0,
            is_default_enhancement INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        INSERT INTO schema_version (version) VALUES (1);
    "#).context("Failed to run migration v1")?;

    Ok(())
}

/// Indexes for the reconciliation and backfill queries (version 2)
fn migrate_v2(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v2");

    conn.execute_batch(r#"
        CREATE INDEX IF NOT EXISTS idx_recordings_user_start
            ON recordings(user_id, start_time_ms DESC);

        CREATE INDEX IF NOT EXISTS idx_recordings_backfill
            ON recordings(user_id, ori_ready, is_trash);

        CREATE INDEX IF NOT EXISTS idx_transcriptions_status
            ON transcriptions(status);

        CREATE INDEX IF NOT EXISTS idx_provider_configs_user
            ON provider_configs(user_id, updated_at DESC);

        INSERT INTO schema_version (version) VALUES (2);
    "#).context("Failed to run migration v2")?;

    Ok(())
}

// Recordings repository for plaud-mirror
// Keyed upserts of remote recordings plus the reads reconciliation and backfill need

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params};

use super::models::{now_timestamp, Recording, RecordingUpsert, UpsertOutcome};
use super::DatabaseManager;

const RECORDING_COLUMNS: &str = r#"
    id, user_id, remote_id, device_sn, filename, file_md5, filesize, filetype,
    duration_ms, start_time_ms, end_time_ms, version, version_ms, edit_time,
    is_trash, ori_ready, is_trans, is_summary, audio_file_path, created_at, updated_at
"#;

impl DatabaseManager {
    /// Apply one remote snapshot to the local row keyed by (user, remote id).
    ///
    /// Runs as a single transaction: a new remote id is inserted, a strictly
    /// newer version overwrites the remote fields, a trash flag is applied on
    /// its own, and anything else is left untouched.
    pub fn upsert_remote_recording(&self, user_id: &str, upsert: &RecordingUpsert) -> Result<UpsertOutcome> {
        self.with_connection(|conn| {
            upsert_remote_recording_impl(conn, user_id, upsert)
        })
    }

    /// Get a recording by local ID
    pub fn get_recording(&self, id: &str) -> Result<Option<Recording>> {
        self.with_connection(|conn| {
            get_recording_impl(conn, id)
        })
    }

    /// Get a recording by local ID, only if it belongs to the user
    pub fn get_user_recording(&self, user_id: &str, id: &str) -> Result<Option<Recording>> {
        self.with_connection(|conn| {
            Ok(get_recording_impl(conn, id)?.filter(|r| r.user_id == user_id))
        })
    }

    /// Find a recording by its remote ID
    pub fn find_recording_by_remote_id(&self, user_id: &str, remote_id: &str) -> Result<Option<Recording>> {
        self.with_connection(|conn| {
            find_by_remote_id_impl(conn, user_id, remote_id)
        })
    }

    /// All of a user's recordings, newest first
    pub fn list_recordings(&self, user_id: &str, include_trashed: bool) -> Result<Vec<Recording>> {
        self.with_connection(|conn| {
            list_recordings_impl(conn, user_id, include_trashed)
        })
    }

    /// Count a user's recordings (trashed rows included)
    pub fn count_recordings(&self, user_id: &str) -> Result<i64> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM recordings WHERE user_id = ?",
                params![user_id],
                |row| row.get(0),
            ).context("Failed to count recordings")
        })
    }

    /// Recordings with downloadable audio, not trashed, and no usable transcript
    pub fn list_backfill_candidates(&self, user_id: &str) -> Result<Vec<Recording>> {
        self.with_connection(|conn| {
            list_backfill_candidates_impl(conn, user_id)
        })
    }

    /// Record where the audio was stored locally
    pub fn set_recording_audio_path(&self, id: &str, path: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE recordings SET audio_file_path = ?, updated_at = ? WHERE id = ?",
                params![path, now_timestamp(), id],
            ).context("Failed to set recording audio path")?;
            Ok(())
        })
    }
}

fn row_to_recording(row: &Row<'_>) -> rusqlite::Result<Recording> {
    Ok(Recording {
        id: row.get(0)?,
        user_id: row.get(1)?,
        remote_id: row.get(2)?,
        device_sn: row.get(3)?,
        filename: row.get(4)?,
        file_md5: row.get(5)?,
        filesize: row.get(6)?,
        filetype: row.get(7)?,
        duration_ms: row.get(8)?,
        start_time_ms: row.get(9)?,
        end_time_ms: row.get(10)?,
        version: row.get(11)?,
        version_ms: row.get(12)?,
        edit_time: row.get(13)?,
        is_trash: row.get::<_, i32>(14)? != 0,
        ori_ready: row.get::<_, i32>(15)? != 0,
        is_trans: row.get::<_, i32>(16)? != 0,
        is_summary: row.get::<_, i32>(17)? != 0,
        audio_file_path: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

/// Stored version and trash state of an existing row
struct ExistingVersion {
    id: String,
    version: i64,
    version_ms: i64,
    is_trash: bool,
}

fn upsert_remote_recording_impl(conn: &Connection, user_id: &str, upsert: &RecordingUpsert) -> Result<UpsertOutcome> {
    let tx = conn.unchecked_transaction()
        .context("Failed to start transaction")?;

    let existing = tx.query_row(
        "SELECT id, version, version_ms, is_trash FROM recordings WHERE user_id = ? AND remote_id = ?",
        params![user_id, upsert.remote_id],
        |row| Ok(ExistingVersion {
            id: row.get(0)?,
            version: row.get(1)?,
            version_ms: row.get(2)?,
            is_trash: row.get::<_, i32>(3)? != 0,
        }),
    );

    let existing = match existing {
        Ok(found) => Some(found),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e).context("Failed to look up recording by remote id"),
    };

    let now = now_timestamp();
    let outcome = match existing {
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            tx.execute(
                r#"
                INSERT INTO recordings (
                    id, user_id, remote_id, device_sn, filename, file_md5, filesize, filetype,
                    duration_ms, start_time_ms, end_time_ms, version, version_ms, edit_time,
                    is_trash, ori_ready, is_trans, is_summary, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)
                "#,
                params![
                    id,
                    user_id,
                    upsert.remote_id,
                    upsert.device_sn,
                    upsert.filename,
                    upsert.file_md5,
                    upsert.filesize,
                    upsert.filetype,
                    upsert.duration_ms,
                    upsert.start_time_ms,
                    upsert.end_time_ms,
                    upsert.version,
                    upsert.version_ms,
                    upsert.edit_time,
                    upsert.is_trash as i32,
                    upsert.ori_ready as i32,
                    upsert.is_trans as i32,
                    upsert.is_summary as i32,
                    now,
                ],
            ).context("Failed to insert recording")?;
            UpsertOutcome::Inserted(id)
        }
        Some(current) if upsert.is_newer_than(current.version, current.version_ms) => {
            tx.execute(
                r#"
                UPDATE recordings SET
                    device_sn = ?1, filename = ?2, file_md5 = ?3, filesize = ?4, filetype = ?5,
                    duration_ms = ?6, start_time_ms = ?7, end_time_ms = ?8, version = ?9,
                    version_ms = ?10, edit_time = ?11, is_trash = ?12, ori_ready = ?13,
                    is_trans = ?14, is_summary = ?15, updated_at = ?16
                WHERE id = ?17
                "#,
                params![
                    upsert.device_sn,
                    upsert.filename,
                    upsert.file_md5,
                    upsert.filesize,
                    upsert.filetype,
                    upsert.duration_ms,
                    upsert.start_time_ms,
                    upsert.end_time_ms,
                    upsert.version,
                    upsert.version_ms,
                    upsert.edit_time,
                    upsert.is_trash as i32,
                    upsert.ori_ready as i32,
                    upsert.is_trans as i32,
                    upsert.is_summary as i32,
                    now,
                    current.id,
                ],
            ).context("Failed to update recording")?;

            if upsert.is_trash && !current.is_trash {
                UpsertOutcome::Trashed(current.id)
            } else {
                UpsertOutcome::Updated(current.id)
            }
        }
        Some(current) if upsert.is_trash && !current.is_trash => {
            tx.execute(
                "UPDATE recordings SET is_trash = 1, updated_at = ? WHERE id = ?",
                params![now, current.id],
            ).context("Failed to mark recording trashed")?;
            UpsertOutcome::Trashed(current.id)
        }
        Some(current) => UpsertOutcome::Unchanged(current.id),
    };

    tx.commit().context("Failed to commit recording upsert")?;
    Ok(outcome)
}

fn get_recording_impl(conn: &Connection, id: &str) -> Result<Option<Recording>> {
    let query = format!("SELECT {} FROM recordings WHERE id = ?", RECORDING_COLUMNS);
    let result = conn.query_row(&query, params![id], row_to_recording);

    match result {
        Ok(recording) => Ok(Some(recording)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get recording"),
    }
}

fn find_by_remote_id_impl(conn: &Connection, user_id: &str, remote_id: &str) -> Result<Option<Recording>> {
    let query = format!(
        "SELECT {} FROM recordings WHERE user_id = ? AND remote_id = ?",
        RECORDING_COLUMNS
    );
    let result = conn.query_row(&query, params![user_id, remote_id], row_to_recording);

    match result {
        Ok(recording) => Ok(Some(recording)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to find recording by remote id"),
    }
}

fn list_recordings_impl(conn: &Connection, user_id: &str, include_trashed: bool) -> Result<Vec<Recording>> {
    let query = format!(
        r#"
        SELECT {} FROM recordings
        WHERE user_id = ?1 AND (?2 = 1 OR is_trash = 0)
        ORDER BY start_time_ms DESC
        "#,
        RECORDING_COLUMNS
    );

    let mut stmt = conn.prepare(&query).context("Failed to prepare list_recordings query")?;
    let recordings = stmt.query_map(params![user_id, include_trashed as i32], row_to_recording)
        .context("Failed to query recordings")?;

    recordings.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect recordings")
}

fn list_backfill_candidates_impl(conn: &Connection, user_id: &str) -> Result<Vec<Recording>> {
    let columns = RECORDING_COLUMNS
        .split(',')
        .map(|c| format!("r.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        r#"
        SELECT {} FROM recordings r
        LEFT JOIN transcriptions t ON t.recording_id = r.id
        WHERE r.user_id = ?
          AND r.ori_ready = 1
          AND r.is_trash = 0
          AND (t.status IS NULL OR t.status IN ('none', 'failed'))
        ORDER BY r.start_time_ms DESC
        "#,
        columns
    );

    let mut stmt = conn.prepare(&query).context("Failed to prepare backfill candidates query")?;
    let recordings = stmt.query_map(params![user_id], row_to_recording)
        .context("Failed to query backfill candidates")?;

    recordings.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect backfill candidates")
}

// Transcriptions repository for plaud-mirror
// Owns the per-recording transcription record and validates its state transitions

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, Row, params};

use super::models::{now_timestamp, TranscriptSource, Transcription, TranscriptionStatus};
use super::DatabaseManager;

/// Error text written to rows that were mid-flight when the process stopped
pub const INTERRUPTED_ERROR: &str = "interrupted before completion";

impl DatabaseManager {
    /// Get the transcription record for a recording
    pub fn get_transcription(&self, recording_id: &str) -> Result<Option<Transcription>> {
        self.with_connection(|conn| {
            get_transcription_impl(conn, recording_id)
        })
    }

    /// Move a recording's transcription to `queued`
    pub fn queue_transcription(&self, recording_id: &str) -> Result<Transcription> {
        self.with_connection(|conn| {
            transition_impl(conn, recording_id, TranscriptionStatus::Queued, |t| {
                t.last_error = None;
            })
        })
    }

    /// Move a queued transcription to `running` under the given provider
    pub fn start_transcription(&self, recording_id: &str, provider: &str) -> Result<Transcription> {
        self.with_connection(|conn| {
            transition_impl(conn, recording_id, TranscriptionStatus::Running, |t| {
                t.provider = Some(provider.to_string());
            })
        })
    }

    /// Store the transcript text and mark the record `complete`
    pub fn complete_transcription(
        &self,
        recording_id: &str,
        text: &str,
        language: Option<&str>,
        source: TranscriptSource,
    ) -> Result<Transcription> {
        self.with_connection(|conn| {
            transition_impl(conn, recording_id, TranscriptionStatus::Complete, |t| {
                t.text = Some(text.to_string());
                t.language = language.map(str::to_string);
                t.source = source;
                t.last_error = None;
            })
        })
    }

    /// Record the error and mark the record `failed`
    pub fn fail_transcription(&self, recording_id: &str, error: &str) -> Result<Transcription> {
        self.with_connection(|conn| {
            transition_impl(conn, recording_id, TranscriptionStatus::Failed, |t| {
                t.last_error = Some(error.to_string());
            })
        })
    }

    /// Fail every record left `queued` or `running` by a previous process.
    /// Returns how many rows were reset.
    pub fn fail_interrupted_transcriptions(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let count = conn.execute(
                r#"
                UPDATE transcriptions
                SET status = 'failed', last_error = ?1, updated_at = ?2
                WHERE status IN ('queued', 'running')
                "#,
                params![INTERRUPTED_ERROR, now_timestamp()],
            ).context("Failed to reset interrupted transcriptions")?;

            if count > 0 {
                log::warn!("Marked {} interrupted transcription(s) as failed", count);
            }
            Ok(count)
        })
    }
}

fn row_to_transcription(row: &Row<'_>) -> rusqlite::Result<Transcription> {
    let status: String = row.get(3)?;
    let source: String = row.get(4)?;
    Ok(Transcription {
        recording_id: row.get(0)?,
        text: row.get(1)?,
        language: row.get(2)?,
        status: status.parse().unwrap_or_default(),
        source: source.parse().unwrap_or_default(),
        provider: row.get(5)?,
        last_error: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn get_transcription_impl(conn: &Connection, recording_id: &str) -> Result<Option<Transcription>> {
    let result = conn.query_row(
        r#"
        SELECT recording_id, text, language, status, source, provider, last_error, updated_at
        FROM transcriptions WHERE recording_id = ?
        "#,
        params![recording_id],
        row_to_transcription,
    );

    match result {
        Ok(transcription) => Ok(Some(transcription)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get transcription"),
    }
}

/// Read the current record (or the implicit `none` one), check the move is
/// legal, apply `update` and write the whole row back in one transaction.
fn transition_impl<F>(
    conn: &Connection,
    recording_id: &str,
    next: TranscriptionStatus,
    update: F,
) -> Result<Transcription>
where
    F: FnOnce(&mut Transcription),
{
    let tx = conn.unchecked_transaction()
        .context("Failed to start transaction")?;

    let mut transcription = get_transcription_impl(&tx, recording_id)?
        .unwrap_or_else(|| Transcription::empty(recording_id));

    if !transcription.status.can_transition_to(next) {
        bail!(
            "Invalid transcription transition for {}: {} -> {}",
            recording_id,
            transcription.status,
            next
        );
    }

    update(&mut transcription);
    transcription.status = next;
    transcription.updated_at = now_timestamp();

    tx.execute(
        r#"
        INSERT INTO transcriptions (recording_id, text, language, status, source, provider, last_error, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(recording_id) DO UPDATE SET
            text = excluded.text,
            language = excluded.language,
            status = excluded.status,
            source = excluded.source,
            provider = excluded.provider,
            last_error = excluded.last_error,
            updated_at = excluded.updated_at
        "#,
        params![
            transcription.recording_id,
            transcription.text,
            transcription.language,
            transcription.status.as_str(),
            transcription.source.as_str(),
            transcription.provider,
            transcription.last_error,
            transcription.updated_at,
        ],
    ).context("Failed to write transcription")?;

    tx.commit().context("Failed to commit transcription transition")?;

    log::debug!("Transcription {} -> {}", recording_id, next);
    Ok(transcription)
}

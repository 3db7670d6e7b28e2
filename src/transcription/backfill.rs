//! Backfill sweeper
//!
//! Finds every live, downloadable recording without a finished transcript
//! and pushes it through the job manager with bounded concurrency.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::job_manager::JobManager;
use crate::database::{DatabaseManager, SyncSettings, TranscriptionStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillError {
    /// Empty when the sweep could not list its candidates at all
    pub recording_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Transcriptions completed by this sweep
    pub filled: usize,
    pub errors: Vec<BackfillError>,
}

pub struct BackfillSweeper {
    db: Arc<DatabaseManager>,
    jobs: JobManager,
}

impl BackfillSweeper {
    pub fn new(db: Arc<DatabaseManager>, jobs: JobManager) -> Self {
        Self { db, jobs }
    }

    /// Transcribe every eligible recording of a user.
    ///
    /// Never fails outright: per-recording failures, and a candidate list that
    /// could not be read, land in the report's errors.
    pub async fn backfill(&self, user_id: &str) -> BackfillReport {
        let candidates = match self.db.list_backfill_candidates(user_id) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::error!("Could not list backfill candidates for {}: {:#}", user_id, e);
                return BackfillReport {
                    filled: 0,
                    errors: vec![BackfillError {
                        recording_id: String::new(),
                        message: format!("{:#}", e),
                    }],
                };
            }
        };
        if candidates.is_empty() {
            log::debug!("Nothing to backfill for {}", user_id);
            return BackfillReport::default();
        }

        let concurrency = match self.db.load_sync_settings(user_id) {
            Ok(settings) => settings.backfill_concurrency,
            Err(e) => {
                log::warn!("Could not load settings for {}, using defaults: {:#}", user_id, e);
                SyncSettings::default().backfill_concurrency
            }
        }
        .max(1);
        log::info!(
            "Backfilling {} recording(s) for {} with concurrency {}",
            candidates.len(),
            user_id,
            concurrency
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let attempts = candidates.iter().map(|recording| {
            let semaphore = semaphore.clone();
            async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => self.jobs.transcribe(user_id, &recording.id, false).await,
                    Err(e) => return (recording.id.clone(), Err(e.to_string())),
                };
                (recording.id.clone(), outcome.map_err(|e| e.to_string()))
            }
        });

        let mut report = BackfillReport::default();
        for (recording_id, outcome) in join_all(attempts).await {
            match outcome {
                Ok(transcription) if transcription.status == TranscriptionStatus::Complete => report.filled += 1,
                Ok(transcription) => report.errors.push(BackfillError {
                    recording_id,
                    message: format!("Transcription ended as {}", transcription.status),
                }),
                Err(message) => {
                    log::warn!("Backfill of {} failed: {}", recording_id, message);
                    report.errors.push(BackfillError { recording_id, message });
                }
            }
        }

        log::info!(
            "Backfill for {} done: {} filled, {} error(s)",
            user_id,
            report.filled,
            report.errors.len()
        );
        report
    }
}

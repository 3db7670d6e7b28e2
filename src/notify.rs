//! Sync completion listeners
//!
//! The scheduler hands every finished [`SyncResult`] to its listeners.
//! Listeners run on the scheduler loop and must not block; anything slow
//! gets spawned.

use std::sync::Arc;

use crate::database::SyncSettings;
use crate::sync::SyncResult;
use crate::transcription::BackfillSweeper;

pub trait SyncListener: Send + Sync {
    fn on_sync_complete(&self, user_id: &str, result: &SyncResult, settings: &SyncSettings);
}

/// Text shown to the user for a finished sync, if it is worth a notification
pub fn notification_message(result: &SyncResult) -> Option<String> {
    if !result.success {
        let error = result.error.as_deref().unwrap_or("unknown error");
        return Some(format!("Sync failed: {}", error));
    }
    match result.new_recordings {
        0 => None,
        1 => Some("1 new recording".to_string()),
        n => Some(format!("{} new recordings", n)),
    }
}

/// Emits user-facing sync notifications through the log
#[derive(Debug, Default)]
pub struct LoggingNotifier;

impl SyncListener for LoggingNotifier {
    fn on_sync_complete(&self, user_id: &str, result: &SyncResult, settings: &SyncSettings) {
        if !settings.sync_notifications {
            return;
        }
        if let Some(message) = notification_message(result) {
            if result.success {
                log::info!("[notify] {}: {}", user_id, message);
            } else {
                log::warn!("[notify] {}: {}", user_id, message);
            }
        }
    }
}

/// Runs a backfill sweep after a sync that brought in new recordings
pub struct AutoTranscribeListener {
    sweeper: Arc<BackfillSweeper>,
}

impl AutoTranscribeListener {
    pub fn new(sweeper: Arc<BackfillSweeper>) -> Self {
        Self { sweeper }
    }
}

impl SyncListener for AutoTranscribeListener {
    fn on_sync_complete(&self, user_id: &str, result: &SyncResult, settings: &SyncSettings) {
        if !settings.auto_transcribe || result.new_recordings == 0 {
            return;
        }

        let sweeper = self.sweeper.clone();
        let user_id = user_id.to_string();
        log::info!(
            "Auto-transcribing after sync brought {} new recording(s) for {}",
            result.new_recordings,
            user_id
        );
        tokio::spawn(async move {
            let report = sweeper.backfill(&user_id).await;
            log::info!(
                "Auto-transcribe for {} filled {} with {} error(s)",
                user_id,
                report.filled,
                report.errors.len()
            );
        });
    }
}

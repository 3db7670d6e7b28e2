//! Reconciliation engine
//!
//! Walks the remote catalog page by page and folds every item into the
//! recording store. Each invocation produces exactly one [`SyncResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::database::{DatabaseManager, RecordingUpsert, UpsertOutcome};
use crate::plaud::{Cursor, PlaudError, RemoteCatalog};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncResult {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub new_recordings: usize,
    pub updated_recordings: usize,
    pub trashed_recordings: usize,
    pub pages_fetched: usize,
    /// Local ids of the rows inserted by this pass
    pub new_recording_ids: Vec<String>,
    pub error: Option<String>,
}

impl SyncResult {
    fn started() -> Self {
        Self {
            timestamp: Utc::now(),
            success: false,
            new_recordings: 0,
            updated_recordings: 0,
            trashed_recordings: 0,
            pages_fetched: 0,
            new_recording_ids: Vec::new(),
            error: None,
        }
    }

    /// A result for a sync that never reached the remote
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::started()
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum SyncError {
    #[error(transparent)]
    Remote(#[from] PlaudError),
    #[error("Failed to store recording: {0:#}")]
    Store(#[from] anyhow::Error),
    #[error("Sync cancelled")]
    Cancelled,
}

pub struct ReconciliationEngine {
    db: Arc<DatabaseManager>,
}

impl ReconciliationEngine {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Reconcile one user's recordings against the remote catalog.
    ///
    /// A failing page stops the scan but keeps everything applied before it.
    pub async fn sync(
        &self,
        user_id: &str,
        catalog: &dyn RemoteCatalog,
        device_sn: Option<&str>,
        cancel: &CancellationToken,
    ) -> SyncResult {
        let mut result = SyncResult::started();
        log::info!("Starting sync for user {}", user_id);

        match self.scan(user_id, catalog, device_sn, cancel, &mut result).await {
            Ok(()) => {
                result.success = true;
                log::info!(
                    "Sync finished for user {}: {} new, {} updated, {} trashed across {} page(s)",
                    user_id,
                    result.new_recordings,
                    result.updated_recordings,
                    result.trashed_recordings,
                    result.pages_fetched
                );
            }
            Err(e) => {
                log::error!(
                    "Sync failed for user {} after {} page(s): {}",
                    user_id,
                    result.pages_fetched,
                    e
                );
                result.error = Some(e.to_string());
            }
        }

        result.timestamp = Utc::now();
        result
    }

    async fn scan(
        &self,
        user_id: &str,
        catalog: &dyn RemoteCatalog,
        device_sn: Option<&str>,
        cancel: &CancellationToken,
        result: &mut SyncResult,
    ) -> Result<(), SyncError> {
        let mut cursor = Cursor::start();

        loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                page = catalog.list_recordings(device_sn, cursor) => page?,
            };
            result.pages_fetched += 1;

            for item in &page.items {
                if cancel.is_cancelled() {
                    return Err(SyncError::Cancelled);
                }
                if item.id.is_empty() {
                    log::warn!("Skipping remote recording without an id ({})", item.filename);
                    continue;
                }

                match self.db.upsert_remote_recording(user_id, &RecordingUpsert::from(item))? {
                    UpsertOutcome::Inserted(id) => {
                        result.new_recordings += 1;
                        result.new_recording_ids.push(id);
                    }
                    UpsertOutcome::Updated(_) => result.updated_recordings += 1,
                    UpsertOutcome::Trashed(_) => result.trashed_recordings += 1,
                    UpsertOutcome::Unchanged(_) => {}
                }
            }

            match page.next_cursor {
                Some(next) if next > cursor => cursor = next,
                Some(_) => {
                    log::warn!("Remote cursor did not advance at offset {}, ending scan", cursor.offset());
                    return Ok(());
                }
                None => return Ok(()),
            }
        }
    }
}

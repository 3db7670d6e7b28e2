//! Transcription job manager
//!
//! Runs one transcription attempt per recording at a time. A second request
//! for a recording that is already being transcribed waits for the running
//! attempt and receives the same outcome. Every attempt carries its own
//! cancellation token, tracked the way active chat tasks used to be.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::database::{
    DatabaseManager, ProviderCapability, Recording, TranscriptSource, Transcription, TranscriptionStatus,
};
use crate::plaud::types::transcript_text;
use crate::plaud::{CatalogConnector, PlaudError, RemoteCatalog};
use crate::providers::{AudioClip, ProviderError, ProviderGateway, TranscriptionOutput, TranscriptionProvider};

/// Provider name recorded for transcripts imported from Plaud
pub const PLAUD_PROVIDER_NAME: &str = "plaud";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranscribeError {
    #[error("Recording not found: {0}")]
    NotFound(String),
    /// No default transcription provider; nothing was changed
    #[error("No transcription provider configured")]
    NoProviderConfigured,
    #[error("Transcription provider error: {0}")]
    Provider(String),
    #[error("{0}")]
    Remote(String),
    #[error("Transcription cancelled")]
    Cancelled,
    #[error("Storage error: {0}")]
    Store(String),
}

impl From<anyhow::Error> for TranscribeError {
    fn from(e: anyhow::Error) -> Self {
        TranscribeError::Store(format!("{:#}", e))
    }
}

impl From<PlaudError> for TranscribeError {
    fn from(e: PlaudError) -> Self {
        TranscribeError::Remote(e.to_string())
    }
}

impl From<ProviderError> for TranscribeError {
    fn from(e: ProviderError) -> Self {
        TranscribeError::Provider(e.to_string())
    }
}

type SharedAttempt = Shared<BoxFuture<'static, Result<Transcription, TranscribeError>>>;

#[derive(Clone)]
pub struct JobManager {
    db: Arc<DatabaseManager>,
    gateway: Arc<ProviderGateway>,
    connector: Arc<dyn CatalogConnector>,
    audio_dir: Option<PathBuf>,
    /// Running attempts keyed by recording id
    in_flight: Arc<DashMap<String, SharedAttempt>>,
    cancel_tokens: Arc<DashMap<String, CancellationToken>>,
}

impl JobManager {
    pub fn new(
        db: Arc<DatabaseManager>,
        gateway: Arc<ProviderGateway>,
        connector: Arc<dyn CatalogConnector>,
    ) -> Self {
        Self {
            db,
            gateway,
            connector,
            audio_dir: None,
            in_flight: Arc::new(DashMap::new()),
            cancel_tokens: Arc::new(DashMap::new()),
        }
    }

    /// Keep downloaded audio under `dir/<user id>/`
    pub fn with_audio_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.audio_dir = dir;
        self
    }

    /// Transcribe a recording, or join the attempt already running for it.
    ///
    /// A completed transcription is returned as-is unless `force` is set.
    /// Joining callers share the running attempt's outcome; their `force` is
    /// not applied to it.
    pub async fn transcribe(
        &self,
        user_id: &str,
        recording_id: &str,
        force: bool,
    ) -> Result<Transcription, TranscribeError> {
        // Recording ids are unique across users, so after this check the
        // recording id alone names the job.
        if self.db.get_user_recording(user_id, recording_id)?.is_none() {
            return Err(TranscribeError::NotFound(recording_id.to_string()));
        }

        let attempt = match self.in_flight.entry(recording_id.to_string()) {
            Entry::Occupied(entry) => {
                if force {
                    log::info!(
                        "Transcription of {} already running, joining it instead of forcing a new one",
                        recording_id
                    );
                } else {
                    log::debug!("Joining running transcription of {}", recording_id);
                }
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let token = CancellationToken::new();
                self.cancel_tokens.insert(recording_id.to_string(), token.clone());

                let job = self.clone();
                let user_id = user_id.to_string();
                let id = recording_id.to_string();
                let handle = tokio::spawn(async move {
                    let outcome = job.run_attempt(&user_id, &id, force, &token).await;
                    job.in_flight.remove(&id);
                    job.cancel_tokens.remove(&id);
                    outcome
                });

                let attempt = handle
                    .map(|joined| {
                        joined.unwrap_or_else(|e| {
                            Err(TranscribeError::Store(format!("Transcription task aborted: {}", e)))
                        })
                    })
                    .boxed()
                    .shared();
                entry.insert(attempt.clone());
                attempt
            }
        };

        attempt.await
    }

    /// Cancel the running attempt for a recording, if any
    pub fn cancel(&self, recording_id: &str) -> bool {
        match self.cancel_tokens.get(recording_id) {
            Some(token) => {
                log::info!("Cancelling transcription of {}", recording_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every running attempt. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for entry in self.cancel_tokens.iter() {
            entry.value().cancel();
            cancelled += 1;
        }
        if cancelled > 0 {
            log::info!("Cancelled {} running transcription(s)", cancelled);
        }
        cancelled
    }

    pub fn is_running(&self, recording_id: &str) -> bool {
        self.in_flight.contains_key(recording_id)
    }

    pub fn active_jobs(&self) -> usize {
        self.in_flight.len()
    }

    async fn run_attempt(
        &self,
        user_id: &str,
        recording_id: &str,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<Transcription, TranscribeError> {
        let recording = self
            .db
            .get_user_recording(user_id, recording_id)?
            .ok_or_else(|| TranscribeError::NotFound(recording_id.to_string()))?;

        if let Some(existing) = self.db.get_transcription(&recording.id)? {
            if existing.status == TranscriptionStatus::Complete && !force {
                log::debug!("Recording {} already transcribed", recording.id);
                return Ok(existing);
            }
        }

        if !recording.ori_ready {
            return Err(TranscribeError::Remote(format!(
                "Audio for {} is not ready on Plaud yet",
                recording.filename
            )));
        }

        let settings = self.db.load_sync_settings(user_id)?;
        let catalog = self.catalog_for(user_id)?;

        if settings.import_plaud_transcripts && recording.is_trans {
            let imported = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                text = import_vendor_transcript(catalog.as_ref(), &recording) => text,
            };
            if let Some(text) = imported {
                return self.store_vendor_transcript(&recording.id, &text);
            }
            log::info!("No usable Plaud transcript for {}, using the configured provider", recording.id);
        }

        let config = self
            .gateway
            .default_config(user_id, ProviderCapability::Transcription)?
            .ok_or(TranscribeError::NoProviderConfigured)?;
        let provider = self.gateway.transcriber(&config)?;

        if cancel.is_cancelled() {
            return Err(TranscribeError::Cancelled);
        }

        self.db.queue_transcription(&recording.id)?;
        self.db.start_transcription(&recording.id, provider.provider_name())?;
        log::info!("Transcribing {} ({}) with {}", recording.id, recording.filename, provider.provider_name());

        let language = settings.default_transcription_language.as_deref();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TranscribeError::Cancelled),
            output = self.fetch_and_transcribe(user_id, catalog.as_ref(), &recording, provider.as_ref(), language) => output,
        };

        let stored = outcome.and_then(|output| {
            let transcription = self.db.complete_transcription(
                &recording.id,
                &output.text,
                output.language.as_deref(),
                TranscriptSource::Server,
            )?;
            log::info!("Transcription of {} complete ({} chars)", recording.id, output.text.len());
            Ok(transcription)
        });

        // Any failure, including a failed final write, leaves the row `failed`
        // so the next backfill picks it up.
        stored.map_err(|e| {
            log::error!("Transcription of {} failed: {}", recording.id, e);
            if let Err(store) = self.db.fail_transcription(&recording.id, &e.to_string()) {
                log::error!("Could not mark transcription of {} failed: {:#}", recording.id, store);
            }
            e
        })
    }

    fn catalog_for(&self, user_id: &str) -> Result<Arc<dyn RemoteCatalog>, TranscribeError> {
        let connection = self
            .db
            .get_plaud_connection(user_id)?
            .ok_or_else(|| TranscribeError::Remote("No Plaud account connected".to_string()))?;
        Ok(self.connector.connect(&connection)?)
    }

    fn store_vendor_transcript(&self, recording_id: &str, text: &str) -> Result<Transcription, TranscribeError> {
        self.db.queue_transcription(recording_id)?;
        self.db.start_transcription(recording_id, PLAUD_PROVIDER_NAME)?;
        let transcription = self.db.complete_transcription(recording_id, text, None, TranscriptSource::Plaud)?;
        log::info!("Imported Plaud transcript for {}", recording_id);
        Ok(transcription)
    }

    async fn fetch_and_transcribe(
        &self,
        user_id: &str,
        catalog: &dyn RemoteCatalog,
        recording: &Recording,
        provider: &dyn TranscriptionProvider,
        language: Option<&str>,
    ) -> Result<TranscriptionOutput, TranscribeError> {
        let clip = self.load_audio(user_id, catalog, recording).await?;
        let mut output = provider.transcribe(clip, language).await?;
        if output.language.is_none() {
            output.language = language.map(str::to_string);
        }
        Ok(output)
    }

    /// Reuse the stored audio when present, otherwise download (and store) it
    async fn load_audio(
        &self,
        user_id: &str,
        catalog: &dyn RemoteCatalog,
        recording: &Recording,
    ) -> Result<AudioClip, TranscribeError> {
        if let Some(path) = recording.audio_file_path.as_deref().map(Path::new) {
            match tokio::fs::read(path).await {
                Ok(data) => {
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| recording.filename.clone());
                    return Ok(AudioClip::new(data, filename));
                }
                Err(e) => log::warn!("Stored audio {} unreadable ({}), downloading again", path.display(), e),
            }
        }

        let clip = catalog.download_audio(&recording.remote_id).await?;
        log::debug!("Downloaded {} bytes for {}", clip.data.len(), recording.id);

        if let Some(dir) = &self.audio_dir {
            match save_audio(&dir.join(user_id), &clip).await {
                Ok(path) => self.db.set_recording_audio_path(&recording.id, &path.to_string_lossy())?,
                Err(e) => log::warn!("Could not store audio for {}: {}", recording.id, e),
            }
        }

        Ok(clip)
    }
}

/// Pull the vendor transcript text out of the file detail, if there is one
async fn import_vendor_transcript(catalog: &dyn RemoteCatalog, recording: &Recording) -> Option<String> {
    let detail = match catalog.file_detail(&recording.remote_id).await {
        Ok(detail) => detail,
        Err(e) => {
            log::warn!("Could not load Plaud detail for {}: {}", recording.id, e);
            return None;
        }
    };
    let item = detail.transcript_item()?;

    let raw = match detail.pre_downloaded(&item.data_id) {
        Some(content) => content.to_string(),
        None if !item.data_link.is_empty() => match catalog.fetch_content(&item.data_link).await {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Could not fetch Plaud transcript for {}: {}", recording.id, e);
                return None;
            }
        },
        None => return None,
    };

    transcript_text(&raw)
}

async fn save_audio(dir: &Path, clip: &AudioClip) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&clip.filename);
    tokio::fs::write(&path, &clip.data).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{create_test_db, sample_upsert};
    use crate::database::{SyncSettings, UpsertProviderConfig, User};
    use crate::plaud::types::ContentItem;
    use crate::plaud::FileDetail;
    use crate::testing::{FakeCatalog, FakeConnector, FakeFactory, FakeProvider, Gate};

    struct Fixture {
        db: Arc<DatabaseManager>,
        user: User,
        catalog: Arc<FakeCatalog>,
        provider: Arc<FakeProvider>,
        jobs: JobManager,
    }

    fn fixture_with(provider: FakeProvider) -> Fixture {
        let (db, user) = create_test_db();
        let db = Arc::new(db);
        db.upsert_plaud_connection(&user.id, "token", "global", None).unwrap();

        let catalog = Arc::new(FakeCatalog::new(vec![]));
        let provider = Arc::new(provider);
        let gateway = Arc::new(ProviderGateway::new(db.clone(), Arc::new(FakeFactory(provider.clone()))));
        let jobs = JobManager::new(db.clone(), gateway, Arc::new(FakeConnector(catalog.clone())));

        Fixture { db, user, catalog, provider, jobs }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeProvider::new("Fake"))
    }

    impl Fixture {
        fn configure_provider(&self) {
            self.db.upsert_provider_config(&self.user.id, &UpsertProviderConfig {
                provider: "Fake".to_string(),
                is_default_transcription: true,
                ..Default::default()
            }).unwrap();
        }

        fn add_recording(&self, remote_id: &str) -> String {
            self.db
                .upsert_remote_recording(&self.user.id, &sample_upsert(remote_id, 1))
                .unwrap()
                .recording_id()
                .to_string()
        }
    }

    #[tokio::test]
    async fn test_transcribes_with_default_provider() {
        let f = fixture();
        f.configure_provider();
        let id = f.add_recording("r1");

        let transcription = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap();

        assert_eq!(transcription.status, TranscriptionStatus::Complete);
        assert_eq!(transcription.text.as_deref(), Some("transcript of r1.mp3"));
        assert_eq!(transcription.source, TranscriptSource::Server);
        assert_eq!(transcription.provider.as_deref(), Some("Fake"));
        assert_eq!(f.provider.calls(), 1);
        assert_eq!(f.jobs.active_jobs(), 0);
    }

    #[tokio::test]
    async fn test_completed_transcription_is_reused_unless_forced() {
        let f = fixture();
        f.configure_provider();
        let id = f.add_recording("r1");

        let first = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap();
        let again = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(f.provider.calls(), 1);

        let forced = f.jobs.transcribe(&f.user.id, &id, true).await.unwrap();
        assert_eq!(forced.status, TranscriptionStatus::Complete);
        assert_eq!(f.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_provider_leaves_state_untouched() {
        let f = fixture();
        let id = f.add_recording("r1");

        let err = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap_err();

        assert_eq!(err, TranscribeError::NoProviderConfigured);
        assert!(f.db.get_transcription(&id).unwrap().is_none());
        assert_eq!(f.catalog.downloads.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_marks_failed() {
        let f = fixture();
        f.configure_provider();
        let id = f.add_recording("r1");
        f.provider.fail_for("r1");

        let err = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap_err();

        assert!(matches!(err, TranscribeError::Provider(_)));
        let stored = f.db.get_transcription(&id).unwrap().unwrap();
        assert_eq!(stored.status, TranscriptionStatus::Failed);
        assert!(stored.last_error.unwrap().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_download_failure_marks_failed() {
        let f = fixture();
        f.configure_provider();
        let id = f.add_recording("r1");
        f.catalog.failing_audio.lock().unwrap().insert("r1".to_string());

        let err = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap_err();

        assert!(matches!(err, TranscribeError::Remote(_)));
        assert_eq!(f.provider.calls(), 0);
        let stored = f.db.get_transcription(&id).unwrap().unwrap();
        assert_eq!(stored.status, TranscriptionStatus::Failed);
    }

    #[tokio::test]
    async fn test_other_users_recording_is_not_found() {
        let f = fixture();
        f.configure_provider();
        let id = f.add_recording("r1");
        let stranger = f.db.get_or_create_user("stranger@example.com").unwrap();

        let err = f.jobs.transcribe(&stranger.id, &id, false).await.unwrap_err();
        assert_eq!(err, TranscribeError::NotFound(id));

        let err = f.jobs.transcribe(&f.user.id, "missing", false).await.unwrap_err();
        assert_eq!(err, TranscribeError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_attempt() {
        let gate = Arc::new(Gate::default());
        let f = fixture_with(FakeProvider::new("Fake").with_gate(gate.clone()));
        f.configure_provider();
        let id = f.add_recording("r1");

        let jobs = f.jobs.clone();
        let (uid, rid) = (f.user.id.clone(), id.clone());
        let first = tokio::spawn(async move { jobs.transcribe(&uid, &rid, false).await });
        gate.entered.notified().await;
        assert!(f.jobs.is_running(&id));

        let (second, _) = tokio::join!(
            f.jobs.transcribe(&f.user.id, &id, false),
            async { gate.release.notify_one() }
        );
        let first = first.await.unwrap();

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(f.provider.calls(), 1);
        assert!(!f.jobs.is_running(&id));
    }

    #[tokio::test]
    async fn test_cancel_marks_attempt_failed() {
        let gate = Arc::new(Gate::default());
        let f = fixture_with(FakeProvider::new("Fake").with_gate(gate.clone()));
        f.configure_provider();
        let id = f.add_recording("r1");

        let jobs = f.jobs.clone();
        let (uid, rid) = (f.user.id.clone(), id.clone());
        let pending = tokio::spawn(async move { jobs.transcribe(&uid, &rid, false).await });
        gate.entered.notified().await;

        assert!(f.jobs.cancel(&id));
        let err = pending.await.unwrap().unwrap_err();

        assert_eq!(err, TranscribeError::Cancelled);
        let stored = f.db.get_transcription(&id).unwrap().unwrap();
        assert_eq!(stored.status, TranscriptionStatus::Failed);
        assert_eq!(stored.last_error.as_deref(), Some("Transcription cancelled"));
        assert!(!f.jobs.cancel(&id));
    }

    #[tokio::test]
    async fn test_other_user_cannot_join_running_attempt() {
        let gate = Arc::new(Gate::default());
        let f = fixture_with(FakeProvider::new("Fake").with_gate(gate.clone()));
        f.configure_provider();
        let id = f.add_recording("r1");
        let stranger = f.db.get_or_create_user("stranger@example.com").unwrap();

        let jobs = f.jobs.clone();
        let (uid, rid) = (f.user.id.clone(), id.clone());
        let owner = tokio::spawn(async move { jobs.transcribe(&uid, &rid, false).await });
        gate.entered.notified().await;
        assert!(f.jobs.is_running(&id));

        let err = f.jobs.transcribe(&stranger.id, &id, false).await.unwrap_err();
        assert_eq!(err, TranscribeError::NotFound(id.clone()));
        assert!(f.jobs.is_running(&id));

        gate.release.notify_one();
        let owned = owner.await.unwrap().unwrap();
        assert_eq!(owned.status, TranscriptionStatus::Complete);
        assert_eq!(f.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_forced_request_joins_running_attempt() {
        let gate = Arc::new(Gate::default());
        let f = fixture_with(FakeProvider::new("Fake").with_gate(gate.clone()));
        f.configure_provider();
        let id = f.add_recording("r1");

        let jobs = f.jobs.clone();
        let (uid, rid) = (f.user.id.clone(), id.clone());
        let first = tokio::spawn(async move { jobs.transcribe(&uid, &rid, false).await });
        gate.entered.notified().await;

        let (forced, _) = tokio::join!(
            f.jobs.transcribe(&f.user.id, &id, true),
            async { gate.release.notify_one() }
        );

        assert_eq!(forced.unwrap(), first.await.unwrap().unwrap());
        assert_eq!(f.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_final_write_marks_failed() {
        let f = fixture();
        f.configure_provider();
        let id = f.add_recording("r1");
        f.db.with_connection(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER refuse_complete BEFORE UPDATE ON transcriptions
                 WHEN NEW.status = 'complete'
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )?;
            Ok(())
        }).unwrap();

        let err = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap_err();

        assert!(matches!(err, TranscribeError::Store(_)));
        let stored = f.db.get_transcription(&id).unwrap().unwrap();
        assert_eq!(stored.status, TranscriptionStatus::Failed);
        assert!(stored.last_error.unwrap().contains("disk full"));
        assert_eq!(f.jobs.active_jobs(), 0);
    }

    #[tokio::test]
    async fn test_imports_plaud_transcript_without_provider() {
        let f = fixture();
        let mut upsert = sample_upsert("r1", 1);
        upsert.is_trans = true;
        let id = f.db.upsert_remote_recording(&f.user.id, &upsert).unwrap().recording_id().to_string();

        let link = "https://cdn.example/t1.json".to_string();
        f.catalog.details.lock().unwrap().insert("r1".to_string(), FileDetail {
            file_id: "r1".to_string(),
            content_list: vec![ContentItem {
                data_id: "t1".to_string(),
                data_type: "transaction".to_string(),
                data_link: link.clone(),
                ..Default::default()
            }],
            ..Default::default()
        });
        f.catalog.contents.lock().unwrap().insert(
            link,
            r#"[{"speaker":"Ana","content":"hello there","start_time":0,"end_time":900}]"#.to_string(),
        );

        let transcription = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap();

        assert_eq!(transcription.source, TranscriptSource::Plaud);
        assert_eq!(transcription.text.as_deref(), Some("Ana: hello there"));
        assert_eq!(transcription.provider.as_deref(), Some(PLAUD_PROVIDER_NAME));
        assert_eq!(f.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_plaud_transcript_falls_back_to_provider() {
        let f = fixture();
        f.configure_provider();
        let mut upsert = sample_upsert("r1", 1);
        upsert.is_trans = true;
        let id = f.db.upsert_remote_recording(&f.user.id, &upsert).unwrap().recording_id().to_string();

        let transcription = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap();

        assert_eq!(transcription.source, TranscriptSource::Server);
        assert_eq!(f.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_language_hint_comes_from_settings() {
        let f = fixture();
        f.configure_provider();
        f.db.save_sync_settings(&f.user.id, &SyncSettings {
            default_transcription_language: Some("de".to_string()),
            ..SyncSettings::default()
        }).unwrap();
        let id = f.add_recording("r1");

        let transcription = f.jobs.transcribe(&f.user.id, &id, false).await.unwrap();

        assert_eq!(*f.provider.languages_seen.lock().unwrap(), vec![Some("de".to_string())]);
        assert_eq!(transcription.language.as_deref(), Some("de"));
    }

    #[tokio::test]
    async fn test_audio_is_stored_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fixture();
        f.jobs = f.jobs.clone().with_audio_dir(Some(dir.path().to_path_buf()));
        f.configure_provider();
        let id = f.add_recording("r1");

        f.jobs.transcribe(&f.user.id, &id, false).await.unwrap();
        let stored = f.db.get_recording(&id).unwrap().unwrap();
        let path = PathBuf::from(stored.audio_file_path.unwrap());
        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4]);

        f.jobs.transcribe(&f.user.id, &id, true).await.unwrap();
        assert_eq!(f.catalog.downloads.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(f.provider.calls(), 2);
    }
}

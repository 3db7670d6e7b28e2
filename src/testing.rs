// In-memory fakes of the remote catalog and transcription providers

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::database::{PlaudConnection, ProviderConfig};
use crate::plaud::{CatalogConnector, Cursor, FileDetail, PlaudDevice, PlaudError, PlaudRecording, RecordingPage, RemoteCatalog};
use crate::providers::{AudioClip, ProviderError, ProviderFactory, TranscriptionOutput, TranscriptionProvider};

pub fn remote(id: &str, version: i64) -> PlaudRecording {
    PlaudRecording {
        id: id.to_string(),
        filename: format!("{}.mp3", id),
        file_md5: format!("md5-{}", id),
        filetype: "mp3".to_string(),
        filesize: 2048,
        duration: 30_000,
        start_time: 1_700_000_000_000,
        end_time: 1_700_000_030_000,
        version,
        version_ms: 1_700_000_000_000 + version,
        serial_number: "SN1".to_string(),
        ori_ready: true,
        ..Default::default()
    }
}

/// Blocks a call until released, telling the test when it got there
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

pub struct FakeCatalog {
    pub recordings: Mutex<Vec<PlaudRecording>>,
    pub page_size: usize,
    pub list_calls: AtomicUsize,
    /// 1-based list call that fails with a transient error
    pub fail_list_call: Mutex<Option<usize>>,
    pub gate: Option<Arc<Gate>>,
    pub details: Mutex<HashMap<String, FileDetail>>,
    pub contents: Mutex<HashMap<String, String>>,
    pub failing_audio: Mutex<HashSet<String>>,
    pub downloads: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(recordings: Vec<PlaudRecording>) -> Self {
        Self {
            recordings: Mutex::new(recordings),
            page_size: 2,
            list_calls: AtomicUsize::new(0),
            fail_list_call: Mutex::new(None),
            gate: None,
            details: Mutex::new(HashMap::new()),
            contents: Mutex::new(HashMap::new()),
            failing_audio: Mutex::new(HashSet::new()),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_recordings(&self, recordings: Vec<PlaudRecording>) {
        *self.recordings.lock().unwrap() = recordings;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteCatalog for FakeCatalog {
    async fn list_devices(&self) -> Result<Vec<PlaudDevice>, PlaudError> {
        Ok(vec![PlaudDevice {
            sn: "SN1".to_string(),
            name: "Fake NotePin".to_string(),
            ..Default::default()
        }])
    }

    async fn list_recordings(&self, device_sn: Option<&str>, cursor: Cursor) -> Result<RecordingPage, PlaudError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        if *self.fail_list_call.lock().unwrap() == Some(call) {
            return Err(PlaudError::Transient("HTTP 503".to_string()));
        }

        let all = self.recordings.lock().unwrap().clone();
        let skip = cursor.offset() as usize;
        let end = (skip + self.page_size).min(all.len());
        let page: Vec<PlaudRecording> = all.get(skip..end).map(|s| s.to_vec()).unwrap_or_default();
        let fetched = page.len();

        let items = page
            .into_iter()
            .filter(|r| device_sn.map_or(true, |sn| r.serial_number == sn))
            .collect();
        let next_cursor = if end < all.len() { Some(cursor.advanced_by(fetched)) } else { None };

        Ok(RecordingPage { items, next_cursor })
    }

    async fn temp_download_url(&self, recording_id: &str) -> Result<String, PlaudError> {
        Ok(format!("https://cdn.example/{}.mp3", recording_id))
    }

    async fn file_detail(&self, recording_id: &str) -> Result<FileDetail, PlaudError> {
        self.details
            .lock()
            .unwrap()
            .get(recording_id)
            .cloned()
            .ok_or(PlaudError::Api { status: -302, msg: "file not found".to_string() })
    }

    async fn fetch_content(&self, url: &str) -> Result<String, PlaudError> {
        self.contents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(PlaudError::Transient("HTTP 404".to_string()))
    }

    async fn download_audio(&self, recording_id: &str) -> Result<AudioClip, PlaudError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.failing_audio.lock().unwrap().contains(recording_id) {
            return Err(PlaudError::Transient("connection reset".to_string()));
        }
        Ok(AudioClip::new(vec![1, 2, 3, 4], format!("{}.mp3", recording_id)))
    }
}

pub struct FakeProvider {
    pub name: String,
    pub calls: AtomicUsize,
    /// Clip filenames that fail
    pub failing: Mutex<HashSet<String>>,
    pub gate: Option<Arc<Gate>>,
    pub languages_seen: Mutex<Vec<Option<String>>>,
}

impl FakeProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
            gate: None,
            languages_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fail_for(&self, remote_id: &str) {
        self.failing.lock().unwrap().insert(format!("{}.mp3", remote_id));
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionProvider for FakeProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn transcribe(&self, audio: AudioClip, language_hint: Option<&str>) -> Result<TranscriptionOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.languages_seen.lock().unwrap().push(language_hint.map(str::to_string));
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        if self.failing.lock().unwrap().contains(&audio.filename) {
            return Err(ProviderError::RequestFailed("HTTP 500: upstream exploded".to_string()));
        }
        Ok(TranscriptionOutput {
            text: format!("transcript of {}", audio.filename),
            language: Some(language_hint.unwrap_or("en").to_string()),
        })
    }
}

/// Factory that always hands out the same fake
pub struct FakeFactory(pub Arc<FakeProvider>);

impl ProviderFactory for FakeFactory {
    fn create_transcriber(&self, _config: &ProviderConfig) -> Result<Arc<dyn TranscriptionProvider>, ProviderError> {
        Ok(self.0.clone())
    }
}

/// Connector that hands every user the same fake catalog
pub struct FakeConnector(pub Arc<FakeCatalog>);

impl CatalogConnector for FakeConnector {
    fn connect(&self, _connection: &PlaudConnection) -> Result<Arc<dyn RemoteCatalog>, PlaudError> {
        Ok(self.0.clone())
    }
}

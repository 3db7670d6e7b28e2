//! Plaud HTTP client
//!
//! Thin typed wrapper over the Plaud web API. Every call is retried per
//! [`RetryPolicy`]; body-level failures (`status != 0`) surface as
//! [`PlaudError::Api`] without retrying.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::catalog::RemoteCatalog;
use super::error::PlaudError;
use super::retry::{with_retry, RetryPolicy};
use super::types::{
    Cursor, DeviceListResponse, Envelope, FileDetail, FileDetailResponse, PlaudDevice,
    RecordingPage, RecordingsResponse, TempUrlResponse,
};
use crate::providers::AudioClip;

/// Recordings requested per page
pub const PAGE_SIZE: usize = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Audio files can be large; the download gets a longer budget
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub struct PlaudClient {
    client: Client,
    api_base: String,
    bearer_token: String,
    retry: RetryPolicy,
}

impl PlaudClient {
    pub fn new(api_base: impl Into<String>, bearer_token: impl Into<String>) -> Result<Self, PlaudError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("plaud-mirror/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlaudError::Transient(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// GET an API path and unwrap the status envelope
    async fn get_api<T>(&self, what: &str, path: &str, query: &[(&str, String)]) -> Result<T, PlaudError>
    where
        T: DeserializeOwned + Envelope,
    {
        let url = format!("{}{}", self.api_base, path);
        let body: T = with_retry(&self.retry, what, || self.get_json_once(&url, query)).await?;

        if body.status() != 0 {
            return Err(PlaudError::Api {
                status: body.status(),
                msg: body.message().to_string(),
            });
        }
        Ok(body)
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, PlaudError> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("bearer {}", self.bearer_token))
            .query(query)
            .send()
            .await
            .map_err(PlaudError::from_reqwest)?;

        let text = check_status(response)
            .await?
            .text()
            .await
            .map_err(PlaudError::from_reqwest)?;

        serde_json::from_str(&text).map_err(|e| PlaudError::Decode(e.to_string()))
    }

    /// GET a pre-signed URL (no bearer token)
    async fn get_unauthenticated_once(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, PlaudError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(PlaudError::from_reqwest)?;

        let bytes = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(PlaudError::from_reqwest)?;
        Ok(bytes.to_vec())
    }
}

/// Map HTTP status codes onto the error taxonomy
async fn check_status(response: Response) -> Result<Response, PlaudError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        code @ (401 | 403) => Err(PlaudError::Auth(code)),
        429 => {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(PlaudError::RateLimited { retry_after })
        }
        code if status.is_server_error() => Err(PlaudError::Transient(format!("HTTP {}", code))),
        code => {
            let msg = response.text().await.unwrap_or_default();
            Err(PlaudError::Api { status: code as i64, msg })
        }
    }
}

/// File extension of a URL's last path segment
fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        None
    } else {
        Some(ext)
    }
}

#[async_trait]
impl RemoteCatalog for PlaudClient {
    async fn list_devices(&self) -> Result<Vec<PlaudDevice>, PlaudError> {
        let body: DeviceListResponse = self.get_api("list devices", "/device/list", &[]).await?;
        Ok(body.data_devices)
    }

    async fn list_recordings(
        &self,
        device_sn: Option<&str>,
        cursor: Cursor,
    ) -> Result<RecordingPage, PlaudError> {
        let query = [
            ("skip", cursor.offset().to_string()),
            ("limit", PAGE_SIZE.to_string()),
            // 2 = trashed and live items alike, so trash state reconciles
            ("is_trash", "2".to_string()),
            ("sort_by", "start_time".to_string()),
            ("is_desc", "true".to_string()),
        ];
        let body: RecordingsResponse = self
            .get_api("list recordings", "/file/simple/web", &query)
            .await?;

        let fetched = body.data_file_list.len();
        let next = cursor.advanced_by(fetched);
        let exhausted = fetched < PAGE_SIZE
            || (body.data_file_total > 0 && next.offset() >= body.data_file_total as u64);

        let items = match device_sn {
            Some(sn) => body
                .data_file_list
                .into_iter()
                .filter(|r| r.serial_number == sn)
                .collect(),
            None => body.data_file_list,
        };

        log::debug!(
            "Fetched {} recordings at offset {} ({} kept)",
            fetched,
            cursor.offset(),
            items.len()
        );

        Ok(RecordingPage {
            items,
            next_cursor: if exhausted { None } else { Some(next) },
        })
    }

    async fn temp_download_url(&self, recording_id: &str) -> Result<String, PlaudError> {
        let path = format!("/file/temp-url/{}", recording_id);
        let body: TempUrlResponse = self.get_api("get download url", &path, &[]).await?;
        if body.temp_url.is_empty() {
            return Err(PlaudError::Decode("response has no temp_url".to_string()));
        }
        Ok(body.temp_url)
    }

    async fn file_detail(&self, recording_id: &str) -> Result<FileDetail, PlaudError> {
        let path = format!("/file/detail/{}", recording_id);
        let body: FileDetailResponse = self.get_api("get file detail", &path, &[]).await?;
        Ok(body.data)
    }

    async fn fetch_content(&self, url: &str) -> Result<String, PlaudError> {
        let bytes = with_retry(&self.retry, "fetch content", || {
            self.get_unauthenticated_once(url, REQUEST_TIMEOUT)
        }).await?;
        String::from_utf8(bytes).map_err(|e| PlaudError::Decode(e.to_string()))
    }

    async fn download_audio(&self, recording_id: &str) -> Result<AudioClip, PlaudError> {
        let url = self.temp_download_url(recording_id).await?;
        let data = with_retry(&self.retry, "download audio", || {
            self.get_unauthenticated_once(&url, DOWNLOAD_TIMEOUT)
        }).await?;

        let ext = url_extension(&url).unwrap_or("mp3");
        log::info!("Downloaded {} bytes of audio for {}", data.len(), recording_id);
        Ok(AudioClip::new(data, format!("{}.{}", recording_id, ext)))
    }
}

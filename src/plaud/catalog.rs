//! Remote catalog contract
//!
//! The reconciliation engine and the job manager only see this trait, so
//! tests can swap the HTTP client for an in-memory catalog.

use async_trait::async_trait;
use std::sync::Arc;

use super::client::PlaudClient;
use super::error::PlaudError;
use super::retry::RetryPolicy;
use super::servers::{resolve_api_base, PlaudServer};
use super::types::{Cursor, FileDetail, PlaudDevice, RecordingPage};
use crate::database::PlaudConnection;
use crate::providers::AudioClip;

#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Devices bound to the account
    async fn list_devices(&self) -> Result<Vec<PlaudDevice>, PlaudError>;

    /// One page of recordings starting at `cursor`, optionally limited to one device
    async fn list_recordings(
        &self,
        device_sn: Option<&str>,
        cursor: Cursor,
    ) -> Result<RecordingPage, PlaudError>;

    /// Short-lived URL the original audio can be fetched from
    async fn temp_download_url(&self, recording_id: &str) -> Result<String, PlaudError>;

    /// Content manifest (transcript, summary, outline) of a recording
    async fn file_detail(&self, recording_id: &str) -> Result<FileDetail, PlaudError>;

    /// Fetch a content item that was not shipped inline with the detail
    async fn fetch_content(&self, url: &str) -> Result<String, PlaudError>;

    /// Download the original audio
    async fn download_audio(&self, recording_id: &str) -> Result<AudioClip, PlaudError>;
}

/// Builds a catalog for a user's stored Plaud connection
pub trait CatalogConnector: Send + Sync {
    fn connect(&self, connection: &PlaudConnection) -> Result<Arc<dyn RemoteCatalog>, PlaudError>;
}

/// Connector producing real HTTP clients
#[derive(Debug, Clone, Default)]
pub struct HttpCatalogConnector {
    retry: RetryPolicy,
}

impl HttpCatalogConnector {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }
}

impl CatalogConnector for HttpCatalogConnector {
    fn connect(&self, connection: &PlaudConnection) -> Result<Arc<dyn RemoteCatalog>, PlaudError> {
        let api_base = resolve_api_base(&connection.server).unwrap_or_else(|e| {
            log::warn!("{} for user {}, using the global server", e, connection.user_id);
            PlaudServer::Global.api_base().to_string()
        });

        let client = PlaudClient::new(api_base, connection.bearer_token.clone())?
            .with_retry_policy(self.retry.clone());
        Ok(Arc::new(client))
    }
}

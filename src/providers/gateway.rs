//! Provider gateway - resolves a user's default provider per capability
//!
//! Reads the stored configurations, picks the default for a capability and
//! builds a live provider through a [`ProviderFactory`].

use anyhow::Result;
use std::sync::Arc;

use super::openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
use super::provider::{ProviderError, TranscriptionProvider};
use crate::database::{DatabaseManager, ProviderCapability, ProviderConfig};

/// Turns a stored configuration into a callable provider
pub trait ProviderFactory: Send + Sync {
    fn create_transcriber(&self, config: &ProviderConfig) -> Result<Arc<dyn TranscriptionProvider>, ProviderError>;
}

/// Builds OpenAI-compatible HTTP providers
#[derive(Debug, Default, Clone)]
pub struct HttpProviderFactory;

impl ProviderFactory for HttpProviderFactory {
    fn create_transcriber(&self, config: &ProviderConfig) -> Result<Arc<dyn TranscriptionProvider>, ProviderError> {
        let provider = OpenAiCompatibleProvider::new(OpenAiCompatibleConfig::from_provider_config(config))?;
        Ok(Arc::new(provider))
    }
}

pub struct ProviderGateway {
    db: Arc<DatabaseManager>,
    factory: Arc<dyn ProviderFactory>,
}

impl ProviderGateway {
    pub fn new(db: Arc<DatabaseManager>, factory: Arc<dyn ProviderFactory>) -> Self {
        Self { db, factory }
    }

    /// The configuration flagged default for `capability`.
    ///
    /// More than one flagged row is a data-integrity problem (the store
    /// demotes on write); the most recently updated one wins.
    pub fn default_config(&self, user_id: &str, capability: ProviderCapability) -> Result<Option<ProviderConfig>> {
        let mut candidates = self.db.default_provider_candidates(user_id, capability)?;

        if candidates.len() > 1 {
            log::warn!(
                "User {} has {} providers flagged default for {}; using most recently updated ({})",
                user_id,
                candidates.len(),
                capability,
                candidates[0].provider
            );
        }

        Ok(if candidates.is_empty() {
            None
        } else {
            Some(candidates.swap_remove(0))
        })
    }

    /// Build a transcription provider from a stored configuration
    pub fn transcriber(&self, config: &ProviderConfig) -> Result<Arc<dyn TranscriptionProvider>, ProviderError> {
        self.factory.create_transcriber(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::create_test_db;
    use crate::database::UpsertProviderConfig;
    use rusqlite::params;

    #[test]
    fn test_no_default_configured() {
        let (db, user) = create_test_db();
        let gateway = ProviderGateway::new(Arc::new(db), Arc::new(HttpProviderFactory));

        assert!(gateway.default_config(&user.id, ProviderCapability::Transcription).unwrap().is_none());
    }

    #[test]
    fn test_most_recent_default_wins_when_several_flagged() {
        let (db, user) = create_test_db();
        let older = db.upsert_provider_config(&user.id, &UpsertProviderConfig {
            provider: "OpenAI".to_string(),
            is_default_transcription: true,
            ..Default::default()
        }).unwrap();
        let newer = db.upsert_provider_config(&user.id, &UpsertProviderConfig {
            provider: "Groq".to_string(),
            ..Default::default()
        }).unwrap();

        // Bypass the repository to simulate legacy rows with two defaults
        db.with_connection(|conn| {
            conn.execute(
                "UPDATE provider_configs SET is_default_transcription = 1, updated_at = ? WHERE id = ?",
                params!["2999-01-01T00:00:00.000Z", newer.id],
            )?;
            Ok(())
        }).unwrap();

        let gateway = ProviderGateway::new(Arc::new(db), Arc::new(HttpProviderFactory));
        let chosen = gateway.default_config(&user.id, ProviderCapability::Transcription).unwrap().unwrap();
        assert_eq!(chosen.id, newer.id);
        assert_ne!(chosen.id, older.id);
    }

    #[test]
    fn test_http_factory_builds_named_provider() {
        let (db, user) = create_test_db();
        let config = db.upsert_provider_config(&user.id, &UpsertProviderConfig {
            provider: "Groq".to_string(),
            api_key: "gsk".to_string(),
            is_default_transcription: true,
            ..Default::default()
        }).unwrap();

        let gateway = ProviderGateway::new(Arc::new(db), Arc::new(HttpProviderFactory));
        let provider = gateway.transcriber(&config).unwrap();
        assert_eq!(provider.provider_name(), "Groq");
    }
}

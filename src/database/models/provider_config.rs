// Provider configuration models

use serde::{Deserialize, Serialize};
use std::fmt;

/// A capability a configured provider can be selected for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCapability {
    Transcription,
    Enhancement,
}

impl ProviderCapability {
    /// Column holding the default flag for this capability
    pub(crate) fn default_column(&self) -> &'static str {
        match self {
            ProviderCapability::Transcription => "is_default_transcription",
            ProviderCapability::Enhancement => "is_default_enhancement",
        }
    }
}

impl fmt::Display for ProviderCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderCapability::Transcription => write!(f, "transcription"),
            ProviderCapability::Enhancement => write!(f, "enhancement"),
        }
    }
}

/// User-defined configuration for an AI provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub id: String,
    pub user_id: String,
    /// Provider name as chosen by the user (e.g., "OpenAI", "Groq", "Ollama")
    pub provider: String,
    /// Base URL override; None uses the provider preset
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub default_model: Option<String>,
    pub is_default_transcription: bool,
    pub is_default_enhancement: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ProviderConfig {
    pub fn is_default_for(&self, capability: ProviderCapability) -> bool {
        match capability {
            ProviderCapability::Transcription => self.is_default_transcription,
            ProviderCapability::Enhancement => self.is_default_enhancement,
        }
    }
}

/// Input for creating/updating a provider config
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpsertProviderConfig {
    /// None creates a new row
    pub id: Option<String>,
    pub provider: String,
    pub base_url: Option<String>,
    pub api_key: String,
    pub default_model: Option<String>,
    pub is_default_transcription: bool,
    pub is_default_enhancement: bool,
}

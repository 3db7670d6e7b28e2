//! OpenAI-compatible transcription provider
//!
//! Speaks the `/audio/transcriptions` multipart API that OpenAI, Groq,
//! Together AI, OpenRouter, LM Studio and Ollama all expose.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::presets::{ProviderKind, OPENAI_BASE_URL};
use super::provider::{AudioClip, ProviderError, TranscriptionOutput, TranscriptionProvider};
use crate::database::ProviderConfig;

/// Model used when neither the config nor the preset names one
const FALLBACK_MODEL: &str = "whisper-1";

/// verbose_json response (only the fields we read)
#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl OpenAiCompatibleConfig {
    /// Resolve base URL and model from the stored config, falling back to the preset
    pub fn from_provider_config(config: &ProviderConfig) -> Self {
        let kind = config.provider.parse::<ProviderKind>().ok();

        let base_url = config
            .base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| kind.and_then(|k| k.default_base_url()).map(str::to_string))
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());

        let model = config
            .default_model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| kind.and_then(|k| k.default_model()).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MODEL.to_string());

        Self {
            name: config.provider.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model,
            timeout_secs: 300,
        }
    }
}

pub struct OpenAiCompatibleProvider {
    config: OpenAiCompatibleConfig,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.config.base_url)
    }
}

#[async_trait]
impl TranscriptionProvider for OpenAiCompatibleProvider {
    fn provider_name(&self) -> &str {
        &self.config.name
    }

    async fn transcribe(
        &self,
        audio: AudioClip,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionOutput, ProviderError> {
        let size = audio.data.len();
        let file = Part::bytes(audio.data)
            .file_name(audio.filename)
            .mime_str(&audio.mime_type)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid audio mime type: {}", e)))?;

        let mut form = Form::new()
            .part("file", file)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json");
        if let Some(language) = language_hint {
            form = form.text("language", language.to_string());
        }

        log::info!(
            "Transcribing {} bytes with {} ({})",
            size,
            self.config.name,
            self.config.model
        );

        let mut request = self.client.post(self.endpoint()).multipart(form);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Cannot reach {}: {}", self.config.name, e)))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::Authentication(format!(
                "{} rejected the API key (HTTP {})",
                self.config.name,
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(500).collect::<String>()
            )));
        }

        let parsed: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(TranscriptionOutput {
            text: parsed.text.trim().to_string(),
            language: parsed
                .language
                .filter(|l| !l.is_empty())
                .or_else(|| language_hint.map(str::to_string)),
        })
    }
}

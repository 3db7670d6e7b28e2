//! Transcription provider trait and types
//!
//! Defines the common interface for every speech-to-text backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error types for provider operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// API key missing or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// Network failure, timeout or non-success status
    #[error("Request failed: {0}")]
    RequestFailed(String),
    /// The provider answered with something we could not read
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Audio handed to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let mime_type = mime_for_filename(&filename).to_string();
        Self { data, filename, mime_type }
    }
}

fn mime_for_filename(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "opus" | "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "webm" => "audio/webm",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Result of a transcription call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionOutput {
    pub text: String,
    /// Language detected (or echoed back) by the provider
    pub language: Option<String>,
}

/// The trait every transcription backend implements
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Provider name as configured (e.g., "OpenAI", "Groq")
    fn provider_name(&self) -> &str;

    /// Transcribe one clip. `language_hint` is an ISO-639-1 code; None lets
    /// the provider detect the language.
    async fn transcribe(
        &self,
        audio: AudioClip,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionOutput, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_clip_mime_type() {
        assert_eq!(AudioClip::new(vec![], "a.mp3").mime_type, "audio/mpeg");
        assert_eq!(AudioClip::new(vec![], "a.OPUS").mime_type, "audio/ogg");
        assert_eq!(AudioClip::new(vec![], "noext").mime_type, "application/octet-stream");
    }
}

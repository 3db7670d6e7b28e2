//! AI provider gateway
//!
//! Providers differ only in base URL, credential and model; all of them are
//! reached through the OpenAI-compatible transcription API.

pub mod gateway;
pub mod openai_compatible;
pub mod presets;
pub mod provider;

pub use gateway::{HttpProviderFactory, ProviderFactory, ProviderGateway};
pub use openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
pub use presets::ProviderKind;
pub use provider::{AudioClip, ProviderError, TranscriptionOutput, TranscriptionProvider};

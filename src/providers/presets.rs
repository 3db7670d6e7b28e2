// Known OpenAI-compatible provider presets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base URL used when neither the config nor the preset names one
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Groq,
    TogetherAi,
    OpenRouter,
    LmStudio,
    Ollama,
    Custom,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 7] = [
        ProviderKind::OpenAi,
        ProviderKind::Groq,
        ProviderKind::TogetherAi,
        ProviderKind::OpenRouter,
        ProviderKind::LmStudio,
        ProviderKind::Ollama,
        ProviderKind::Custom,
    ];

    /// Display name, also what gets stored in `provider_configs.provider`
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Groq => "Groq",
            ProviderKind::TogetherAi => "Together AI",
            ProviderKind::OpenRouter => "OpenRouter",
            ProviderKind::LmStudio => "LM Studio",
            ProviderKind::Ollama => "Ollama",
            ProviderKind::Custom => "Custom",
        }
    }

    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some(OPENAI_BASE_URL),
            ProviderKind::Groq => Some("https://api.groq.com/openai/v1"),
            ProviderKind::TogetherAi => Some("https://api.together.xyz/v1"),
            ProviderKind::OpenRouter => Some("https://openrouter.ai/api/v1"),
            ProviderKind::LmStudio => Some("http://localhost:1234/v1"),
            ProviderKind::Ollama => Some("http://localhost:11434/v1"),
            ProviderKind::Custom => None,
        }
    }

    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi | ProviderKind::OpenRouter => Some("whisper-1"),
            ProviderKind::Groq => Some("whisper-large-v3-turbo"),
            ProviderKind::TogetherAi => Some("whisper-large-v3"),
            ProviderKind::LmStudio | ProviderKind::Ollama | ProviderKind::Custom => None,
        }
    }

    /// Local servers accept any (or no) key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::LmStudio | ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    /// Matches display names case-insensitively, ignoring spaces
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();
        ProviderKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().replace(' ', "").to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown provider: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Together AI".parse::<ProviderKind>().unwrap(), ProviderKind::TogetherAi);
        assert_eq!("lmstudio".parse::<ProviderKind>().unwrap(), ProviderKind::LmStudio);
        assert!("whisperland".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(ProviderKind::Groq.default_model(), Some("whisper-large-v3-turbo"));
        assert_eq!(ProviderKind::Ollama.default_base_url(), Some("http://localhost:11434/v1"));
        assert!(ProviderKind::Custom.default_base_url().is_none());
        assert!(!ProviderKind::Ollama.requires_api_key());
    }
}

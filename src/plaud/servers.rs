// Plaud API regions

use std::fmt;
use std::str::FromStr;

/// Regional Plaud API deployment an account lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaudServer {
    #[default]
    Global,
    Eu,
}

impl PlaudServer {
    pub fn key(&self) -> &'static str {
        match self {
            PlaudServer::Global => "global",
            PlaudServer::Eu => "eu",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaudServer::Global => "Global (api.plaud.ai)",
            PlaudServer::Eu => "EU - Frankfurt (api-euc1.plaud.ai)",
        }
    }

    pub fn api_base(&self) -> &'static str {
        match self {
            PlaudServer::Global => "https://api.plaud.ai",
            PlaudServer::Eu => "https://api-euc1.plaud.ai",
        }
    }
}

impl fmt::Display for PlaudServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for PlaudServer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(PlaudServer::Global),
            "eu" => Ok(PlaudServer::Eu),
            other => Err(format!("Unknown Plaud server: {}", other)),
        }
    }
}

/// Resolve a stored server value to an API base URL.
/// Known region keys map to their host; anything that looks like a URL is used as-is.
pub fn resolve_api_base(server: &str) -> Result<String, String> {
    if server.starts_with("http://") || server.starts_with("https://") {
        return Ok(server.trim_end_matches('/').to_string());
    }
    server.parse::<PlaudServer>().map(|s| s.api_base().to_string())
}

// Database models - Transcription
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a recording's transcription
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionStatus {
    #[default]
    None,
    Queued,
    Running,
    Complete,
    Failed,
}

impl TranscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionStatus::None => "none",
            TranscriptionStatus::Queued => "queued",
            TranscriptionStatus::Running => "running",
            TranscriptionStatus::Complete => "complete",
            TranscriptionStatus::Failed => "failed",
        }
    }

    /// Forward-only transitions, plus `failed -> queued` (retry) and
    /// `complete -> queued` (explicit re-transcription).
    pub fn can_transition_to(&self, next: TranscriptionStatus) -> bool {
        use TranscriptionStatus::*;
        matches!(
            (self, next),
            (None, Queued)
                | (Queued, Running)
                | (Running, Complete)
                | (Running, Failed)
                | (Failed, Queued)
                | (Complete, Queued)
                // cancellation or configuration gaps before the provider is called
                | (Queued, Failed)
        )
    }

    /// Eligible for the backfill sweep
    pub fn needs_transcript(&self) -> bool {
        matches!(self, TranscriptionStatus::None | TranscriptionStatus::Failed)
    }
}

impl fmt::Display for TranscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TranscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(TranscriptionStatus::None),
            "queued" => Ok(TranscriptionStatus::Queued),
            "running" => Ok(TranscriptionStatus::Running),
            "complete" => Ok(TranscriptionStatus::Complete),
            "failed" => Ok(TranscriptionStatus::Failed),
            other => Err(format!("Unknown transcription status: {}", other)),
        }
    }
}

/// Where the transcript text came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    /// Generated here through a configured AI provider
    #[default]
    Server,
    /// Imported from the device vendor's own transcript
    Plaud,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptSource::Server => "server",
            TranscriptSource::Plaud => "plaud",
        }
    }
}

impl FromStr for TranscriptSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server" => Ok(TranscriptSource::Server),
            "plaud" => Ok(TranscriptSource::Plaud),
            other => Err(format!("Unknown transcript source: {}", other)),
        }
    }
}

/// The transcription record owned by a recording
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcription {
    pub recording_id: String,
    pub text: Option<String>,
    pub language: Option<String>,
    pub status: TranscriptionStatus,
    pub source: TranscriptSource,
    pub provider: Option<String>,
    pub last_error: Option<String>,
    pub updated_at: String,
}

impl Transcription {
    /// The implicit record of a recording that was never transcribed
    pub fn empty(recording_id: impl Into<String>) -> Self {
        Self {
            recording_id: recording_id.into(),
            text: None,
            language: None,
            status: TranscriptionStatus::None,
            source: TranscriptSource::Server,
            provider: None,
            last_error: None,
            updated_at: super::now_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        use TranscriptionStatus::*;
        assert!(None.can_transition_to(Queued));
        assert!(Queued.can_transition_to(Running));
        assert!(Running.can_transition_to(Complete));
        assert!(Running.can_transition_to(Failed));
    }

    #[test]
    fn test_backward_transitions_are_limited() {
        use TranscriptionStatus::*;
        assert!(Failed.can_transition_to(Queued));
        assert!(Complete.can_transition_to(Queued));
        assert!(!Complete.can_transition_to(Running));
        assert!(!Complete.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Complete));
        assert!(!None.can_transition_to(Running));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            TranscriptionStatus::None,
            TranscriptionStatus::Queued,
            TranscriptionStatus::Running,
            TranscriptionStatus::Complete,
            TranscriptionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TranscriptionStatus>().unwrap(), status);
        }
        assert!("done".parse::<TranscriptionStatus>().is_err());
    }
}

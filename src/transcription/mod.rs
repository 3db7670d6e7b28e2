//! Transcription pipeline
//!
//! [`JobManager`] transcribes single recordings; [`BackfillSweeper`] sweeps a
//! user's library for recordings still missing a transcript.

pub mod backfill;
pub mod job_manager;

pub use backfill::{BackfillError, BackfillReport, BackfillSweeper};
pub use job_manager::{JobManager, TranscribeError, PLAUD_PROVIDER_NAME};

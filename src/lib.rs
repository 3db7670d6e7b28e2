// plaud-mirror - Plaud recording synchronization and transcription pipeline
//
// Mirrors a user's Plaud recordings into local SQLite storage and keeps them
// transcribed:
// - Remote catalog client for the Plaud cloud API
// - Version-aware reconciliation and a single-flight sync scheduler
// - Transcription jobs and backfill through OpenAI-compatible providers

pub mod auth;
pub mod database;
pub mod notify;
pub mod plaud;
pub mod providers;
pub mod state;
pub mod sync;
pub mod transcription;

#[cfg(test)]
mod test_http;
#[cfg(test)]
mod testing;

//! Plaud remote catalog client
//!
//! Typed access to the device vendor's cloud API: device list, paginated
//! recording list, file detail, temporary download URLs and audio download.

pub mod catalog;
pub mod client;
pub mod error;
pub mod retry;
pub mod servers;
pub mod types;

pub use catalog::{CatalogConnector, HttpCatalogConnector, RemoteCatalog};
pub use client::{PlaudClient, PAGE_SIZE};
pub use error::PlaudError;
pub use retry::RetryPolicy;
pub use servers::PlaudServer;
pub use types::{Cursor, FileDetail, PlaudDevice, PlaudRecording, RecordingPage};

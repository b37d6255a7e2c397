//! Acara Core Library
//!
//! Domain models, error types, configuration and validation shared by every
//! crate of the berita acara record service. Nothing in here performs I/O.

pub mod config;
pub mod constants;
pub mod dates;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, RecordServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::{DocumentStoreBackend, StorageBackend};

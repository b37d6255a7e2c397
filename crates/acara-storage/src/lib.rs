//! Acara Storage Library
//!
//! Object storage abstraction for record images, with S3 and local
//! filesystem backends.
//!
//! # Storage key format
//!
//! All keys live under the configured images prefix:
//!
//! - **Signed pre-uploads**: `{prefix}/temp/{uuid}/{locator}-{uuid}{ext}`
//! - **Server-side uploads**: `{prefix}/{record_id}/{locator}-{uuid}{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so every writer produces the same layout.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use acara_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use factory::create_local_storage;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signing::{SignatureError, UrlSigner};
pub use traits::{ObjectMetadata, Storage, StorageError, StorageResult};

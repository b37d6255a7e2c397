//! Application state shared by every handler.

use acara_core::Config;
use acara_db::DocumentStore;
use acara_services::{DocumentRenderer, RecordAssembler, UploadBroker};
#[cfg(feature = "storage-local")]
use acara_storage::LocalStorage;
use acara_storage::Storage;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub store: Arc<dyn DocumentStore>,
    pub broker: UploadBroker,
    pub assembler: RecordAssembler,
    pub renderer: Arc<dyn DocumentRenderer>,
    /// Set only for the local backend, whose signed URLs point back at this
    /// server's object endpoints.
    #[cfg(feature = "storage-local")]
    pub local_storage: Option<LocalStorage>,
}

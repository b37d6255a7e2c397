//! Service wiring

use crate::setup::storage::StorageHandles;
use crate::state::AppState;
use acara_core::validation::ImagePathPolicy;
use acara_core::Config;
use acara_db::DocumentStore;
use acara_services::{DocxTemplateRenderer, ImageNormalizer, RecordAssembler, UploadBroker};
use anyhow::Result;
use std::sync::Arc;

/// Build the application state from already-connected backends.
pub fn initialize_services(
    config: &Config,
    store: Arc<dyn DocumentStore>,
    storage: StorageHandles,
) -> Result<Arc<AppState>> {
    let policy = ImagePathPolicy::new(config.storage_bucket(), config.images_prefix());
    let normalizer = ImageNormalizer::new(
        storage.storage.clone(),
        policy,
        config.display_url_ttl(),
    );
    let assembler = RecordAssembler::new(store.clone(), normalizer, config.display_timezone());
    let broker = UploadBroker::new(storage.storage.clone(), config.images_prefix());
    let renderer = Arc::new(DocxTemplateRenderer::new(
        config.templates_dir(),
        config.default_template(),
    ));

    if !config.templates_dir().is_dir() {
        tracing::warn!(
            templates_dir = %config.templates_dir().display(),
            "Templates directory does not exist; document rendering will fail"
        );
    }

    tracing::info!(
        display_timezone = %config.display_timezone(),
        display_url_ttl_secs = config.display_url_ttl().as_secs(),
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        storage: storage.storage,
        store,
        broker,
        assembler,
        renderer,
        #[cfg(feature = "storage-local")]
        local_storage: storage.local,
    }))
}

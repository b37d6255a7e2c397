//! Storage setup and initialization

use acara_core::{Config, StorageBackend};
#[cfg(feature = "storage-local")]
use acara_storage::{create_local_storage, LocalStorage};
use acara_storage::{create_storage, Storage};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Storage handles the application needs: the trait object every component
/// uses, plus the concrete local backend when it serves signed URLs itself.
pub struct StorageHandles {
    pub storage: Arc<dyn Storage>,
    #[cfg(feature = "storage-local")]
    pub local: Option<LocalStorage>,
}

pub async fn setup_storage(config: &Config) -> Result<StorageHandles> {
    tracing::info!("Initializing storage abstraction...");

    let handles = match config.storage_backend() {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let local = create_local_storage(config)
                .await
                .context("Failed to initialize local storage")?;
            StorageHandles {
                storage: Arc::new(local.clone()),
                local: Some(local),
            }
        }
        _ => StorageHandles {
            storage: create_storage(config)
                .await
                .context("Failed to initialize storage")?,
            #[cfg(feature = "storage-local")]
            local: None,
        },
    };

    tracing::info!(
        backend = ?handles.storage.backend_type(),
        bucket = %config.storage_bucket(),
        images_prefix = %config.images_prefix(),
        "Storage abstraction initialized successfully"
    );

    Ok(handles)
}

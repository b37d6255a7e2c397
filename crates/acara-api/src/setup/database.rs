//! Document store setup

use acara_core::{Config, DocumentStoreBackend};
use acara_db::{setup_database, DocumentStore, MemoryDocumentStore, PgDocumentStore};
use anyhow::Result;
use std::sync::Arc;

/// Connect the configured document store; Postgres runs pending migrations.
pub async fn setup_document_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.document_store() {
        DocumentStoreBackend::Postgres => {
            let pool = setup_database(config).await?;
            Arc::new(PgDocumentStore::new(pool))
        }
        DocumentStoreBackend::Memory => {
            tracing::warn!("Using the in-memory document store; records are lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    tracing::info!(backend = %config.document_store(), "Document store initialized");
    Ok(store)
}

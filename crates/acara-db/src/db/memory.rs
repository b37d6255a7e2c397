use super::document::{Document, DocumentStore};
use acara_core::AppError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process document store for development and tests.
#[derive(Default)]
pub struct MemoryDocumentStore {
    // Documents per collection in insertion order.
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document_with_id(
        &self,
        collection: &str,
        id: Uuid,
        data: Value,
    ) -> Result<Document, AppError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.iter().any(|doc| doc.id == id) {
            return Err(AppError::Database(format!(
                "document {} already exists in {}",
                id, collection
            )));
        }

        let document = Document {
            id,
            created_at: Utc::now(),
            data,
        };
        documents.push(document.clone());
        Ok(document)
    }

    async fn get_document(&self, collection: &str, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id).cloned()))
    }

    async fn list_documents(
        &self,
        collection: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, AppError> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(documents
            .iter()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

use acara_core::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// A stored JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub data: Value,
}

/// Key-value document store with ordered listing by creation time.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a document under a caller-chosen id in one atomic statement.
    async fn create_document_with_id(
        &self,
        collection: &str,
        id: Uuid,
        data: Value,
    ) -> Result<Document, AppError>;

    /// Write a document under a freshly generated id.
    async fn create_document(&self, collection: &str, data: Value) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        self.create_document_with_id(collection, id, data).await?;
        Ok(id)
    }

    async fn get_document(&self, collection: &str, id: Uuid) -> Result<Option<Document>, AppError>;

    /// Newest first.
    async fn list_documents(
        &self,
        collection: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, AppError>;
}

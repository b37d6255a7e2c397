use super::document::{Document, DocumentStore};
use acara_core::{AppError, Config};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Setup database connection pool and run migrations
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let database_url = config
        .database_url()
        .context("DATABASE_URL must be set for the postgres document store")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );

    // Run pending migrations on startup (path: workspace migrations/ from crate root)
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

fn db_error(err: sqlx::Error) -> AppError {
    AppError::Database(err.to_string())
}

fn row_to_document(row: PgRow) -> Result<Document, AppError> {
    Ok(Document {
        id: row.try_get("id").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        data: row.try_get("data").map_err(db_error)?,
    })
}

/// Document store backed by a JSONB table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create_document_with_id(
        &self,
        collection: &str,
        id: Uuid,
        data: Value,
    ) -> Result<Document, AppError> {
        // Use dynamic SQLx queries to avoid requiring DATABASE_URL/sqlx prepare
        let row = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            RETURNING id, data, created_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(data)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        row_to_document(row)
    }

    async fn get_document(&self, collection: &str, id: Uuid) -> Result<Option<Document>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, data, created_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(row_to_document).transpose()
    }

    async fn list_documents(
        &self,
        collection: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, data, created_at
            FROM documents
            WHERE collection = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(collection)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(row_to_document).collect()
    }
}

use crate::constants::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use acara_core::models::{PrintData, RecordCreated, RecordDetail, RecordSummary};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRecordsQuery {
    /// Page size (1-200, default 50)
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Persist a berita acara record
///
/// Image fields may be empty, a storage path from an upload authorization,
/// or a base64 data URL. Inline images are uploaded before the record is
/// written and deleted again if the write fails.
#[utoipa::path(
    post,
    path = "/api/v0/records",
    tag = "records",
    request_body = Object,
    responses(
        (status = 201, description = "Record stored", body = RecordCreated),
        (status = 400, description = "Invalid record or image value", body = ErrorResponse),
        (status = 422, description = "An image was never uploaded", body = ErrorResponse),
        (status = 502, description = "Inline image upload failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, submission), fields(operation = "create_record"))]
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    ValidatedJson(submission): ValidatedJson<Value>,
) -> Result<(StatusCode, Json<RecordCreated>), HttpAppError> {
    let id = state.assembler.persist_record(submission).await?;
    tracing::info!(record_id = %id, "Record created");
    Ok((StatusCode::CREATED, Json(RecordCreated { id })))
}

/// List records, newest first
#[utoipa::path(
    get,
    path = "/api/v0/records",
    tag = "records",
    params(ListRecordsQuery),
    responses(
        (status = 200, description = "Record summaries", body = Vec<RecordSummary>)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_records"))]
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<Vec<RecordSummary>>, HttpAppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let records = state.assembler.list_records(limit, offset).await?;
    Ok(Json(records))
}

/// Record detail view with signed image URLs
#[utoipa::path(
    get,
    path = "/api/v0/records/{id}",
    tag = "records",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record detail"),
        (status = 404, description = "Record not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(record_id = %id, operation = "get_record"))]
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecordDetail>, HttpAppError> {
    Ok(Json(state.assembler.build_detail_view(id).await?))
}

/// Flat print data with embedded images
#[utoipa::path(
    get,
    path = "/api/v0/records/{id}/print-data",
    tag = "records",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Print data"),
        (status = 404, description = "Record not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(record_id = %id, operation = "get_print_data"))]
pub async fn get_print_data(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PrintData>, HttpAppError> {
    Ok(Json(state.assembler.build_print_data(id).await?))
}

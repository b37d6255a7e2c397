//! Signed object endpoints of the local storage backend.
//!
//! `LocalStorage` hands out `{base_url}/{key}?expires=..&signature=..`; these
//! handlers check the HMAC and expiry before touching the filesystem. PUT
//! signatures are bound to the `Content-Type` the upload was authorized for.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use acara_core::models::ImageExtension;
use acara_core::AppError;
use acara_storage::{LocalStorage, Storage};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SignedUrlQuery {
    /// Unix timestamp after which the URL is rejected
    pub expires: u64,
    /// Hex HMAC-SHA256 signature
    pub signature: String,
}

fn local_storage(state: &AppState) -> Result<&LocalStorage, HttpAppError> {
    state.local_storage.as_ref().ok_or_else(|| {
        HttpAppError::from(AppError::NotFound(
            "Object endpoints are only served by the local storage backend".to_string(),
        ))
    })
}

/// Upload an object through a signed URL
#[utoipa::path(
    put,
    path = "/api/v0/storage/{key}",
    tag = "storage",
    params(("key" = String, Path, description = "Storage key"), SignedUrlQuery),
    request_body(content = Vec<u8>, content_type = "image/*"),
    responses(
        (status = 200, description = "Object stored"),
        (status = 403, description = "Signature invalid, expired or bound to another content type", body = ErrorResponse),
        (status = 413, description = "Body above 10 MiB")
    )
)]
#[tracing::instrument(skip(state, query, headers, body), fields(key = %key, operation = "put_object"))]
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedUrlQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HttpAppError> {
    let storage = local_storage(&state)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    storage
        .signer()
        .verify(&Method::PUT, &key, &content_type, query.expires, &query.signature)?;

    if body.is_empty() {
        return Err(AppError::InvalidSize("Upload body is empty".to_string()).into());
    }

    storage
        .upload_with_key(&key, body.to_vec(), &content_type)
        .await?;

    Ok(StatusCode::OK)
}

/// Read an object through a signed URL
#[utoipa::path(
    get,
    path = "/api/v0/storage/{key}",
    tag = "storage",
    params(("key" = String, Path, description = "Storage key"), SignedUrlQuery),
    responses(
        (status = 200, description = "Object bytes"),
        (status = 403, description = "Signature invalid or expired", body = ErrorResponse),
        (status = 404, description = "Object missing", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(key = %key, operation = "get_object"))]
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedUrlQuery>,
) -> Result<Response, HttpAppError> {
    let storage = local_storage(&state)?;

    storage
        .signer()
        .verify(&Method::GET, &key, "", query.expires, &query.signature)?;

    let data = storage.download(&key).await?;
    let content_type = ImageExtension::from_path(&key)
        .map(|ext| ext.content_type())
        .unwrap_or("application/octet-stream");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "private, max-age=3600"),
        ],
        data,
    )
        .into_response())
}

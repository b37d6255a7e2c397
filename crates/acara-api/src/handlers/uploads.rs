use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use acara_core::models::{UploadAuthorization, UploadAuthorizationRequest};
use axum::{extract::State, Json};
use std::sync::Arc;

/// Issue a signed, write-only upload URL for one image
#[utoipa::path(
    post,
    path = "/api/v0/uploads/authorize",
    tag = "uploads",
    request_body = UploadAuthorizationRequest,
    responses(
        (status = 200, description = "Upload authorized", body = UploadAuthorization),
        (status = 400, description = "Invalid size or request", body = ErrorResponse),
        (status = 413, description = "Declared size above 10 MiB", body = ErrorResponse),
        (status = 415, description = "Mime type not allowed", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        field_locator = %request.field_locator,
        mime_type = %request.mime_type,
        size = request.size,
        operation = "authorize_upload"
    )
)]
pub async fn authorize_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadAuthorizationRequest>,
) -> Result<Json<UploadAuthorization>, HttpAppError> {
    let authorization = state.broker.issue_upload_authorization(&request).await?;
    Ok(Json(authorization))
}

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use acara_core::constants::DOCX_CONTENT_TYPE;
use acara_core::validation::sanitize_file_name;
use acara_services::render_record;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderDocumentRequest {
    pub record_id: Uuid,
    /// Template file name; the configured default when omitted
    pub template_name: Option<String>,
}

/// Render a record into its DOCX template
#[utoipa::path(
    post,
    path = "/api/v0/documents/render",
    tag = "documents",
    request_body = RenderDocumentRequest,
    responses(
        (status = 200, description = "Rendered document", content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 404, description = "Record or template not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(record_id = %request.record_id, operation = "render_document")
)]
pub async fn render_document(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RenderDocumentRequest>,
) -> Result<Response, HttpAppError> {
    let template_name = request
        .template_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let document = render_record(
        &state.assembler,
        state.renderer.as_ref(),
        request.record_id,
        template_name,
    )
    .await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_file_name(&document.file_name)
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_CONTENT_TYPE)),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&disposition)
                    .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
            ),
        ],
        document.bytes,
    )
        .into_response())
}

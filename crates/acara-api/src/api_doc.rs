//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use acara_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Acara API",
        version = "0.1.0",
        description = "Berita acara (land survey record) service. Images are uploaded through short-lived signed URLs or sent inline; records are rendered into DOCX documents. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::uploads::authorize_upload,
        handlers::records::create_record,
        handlers::records::list_records,
        handlers::records::get_record,
        handlers::records::get_print_data,
        handlers::documents::render_document,
    ),
    components(schemas(
        models::UploadAuthorizationRequest,
        models::UploadAuthorization,
        models::RecordCreated,
        models::RecordSummary,
        handlers::documents::RenderDocumentRequest,
        error::ErrorResponse,
    )),
    tags(
        (name = "uploads", description = "Signed upload authorizations"),
        (name = "records", description = "Berita acara records"),
        (name = "documents", description = "Document generation"),
    )
)]
pub struct ApiDoc;

#[cfg(feature = "storage-local")]
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::storage_objects::put_object,
        handlers::storage_objects::get_object,
    ),
    tags((name = "storage", description = "Signed object endpoints (local backend)"))
)]
struct StorageObjectsDoc;

/// The served document; object endpoints are listed only when compiled in.
pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    #[allow(unused_mut)]
    let mut spec = ApiDoc::openapi();
    #[cfg(feature = "storage-local")]
    spec.merge(StorageObjectsDoc::openapi());
    spec
}

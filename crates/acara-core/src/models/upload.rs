use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request for a signed, write-only upload authorization
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadAuthorizationRequest {
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "File name must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    /// Content type the upload will be bound to
    #[validate(length(
        min = 1,
        max = 255,
        message = "Mime type must be between 1 and 255 characters"
    ))]
    pub mime_type: String,
    /// Declared size in bytes
    pub size: i64,
    /// Locator of the image field, e.g. `pengukuran_dihadiri[0].foto`
    #[serde(alias = "fieldPath")]
    #[validate(length(
        min = 1,
        max = 200,
        message = "Field locator must be between 1 and 200 characters"
    ))]
    pub field_locator: String,
}

/// Signed upload target and the storage path it writes to
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadAuthorization {
    /// URL accepting a single HTTP PUT
    pub upload_target: String,
    /// Storage path to reference from the record once the PUT succeeds
    pub storage_path: String,
    /// `Content-Type` the PUT must carry
    pub content_type: String,
    pub expires_at: DateTime<Utc>,
}

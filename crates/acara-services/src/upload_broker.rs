use std::sync::Arc;

use acara_core::constants::{MAX_IMAGE_SIZE_BYTES, UPLOAD_AUTHORIZATION_TTL};
use acara_core::models::{ImageExtension, UploadAuthorization, UploadAuthorizationRequest};
use acara_core::AppError;
use acara_storage::keys::temp_upload_key;
use acara_storage::Storage;
use chrono::Utc;
use validator::Validate;

/// Issues write-only, content-type-bound upload authorizations. Stateless:
/// nothing about an issued authorization is recorded.
#[derive(Clone)]
pub struct UploadBroker {
    storage: Arc<dyn Storage>,
    images_prefix: String,
}

impl UploadBroker {
    pub fn new(storage: Arc<dyn Storage>, images_prefix: impl Into<String>) -> Self {
        Self {
            storage,
            images_prefix: images_prefix.into(),
        }
    }

    #[tracing::instrument(skip(self, request), fields(
        field = %request.field_locator,
        mime_type = %request.mime_type,
        size = request.size
    ))]
    pub async fn issue_upload_authorization(
        &self,
        request: &UploadAuthorizationRequest,
    ) -> Result<UploadAuthorization, AppError> {
        let extension = ImageExtension::from_mime(&request.mime_type)
            .ok_or_else(|| AppError::UnsupportedMimeType(request.mime_type.clone()))?;
        check_declared_size(request.size)?;
        request.validate()?;

        let content_type = request.mime_type.trim().to_lowercase();
        let storage_path = temp_upload_key(&self.images_prefix, &request.field_locator, extension);
        let issued_at = Utc::now();

        let upload_target = self
            .storage
            .presigned_put_url(&storage_path, &content_type, UPLOAD_AUTHORIZATION_TTL)
            .await?;

        let expires_at = issued_at
            + chrono::Duration::from_std(UPLOAD_AUTHORIZATION_TTL)
                .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::debug!(storage_path = %storage_path, "Upload authorization issued");

        Ok(UploadAuthorization {
            upload_target,
            storage_path,
            content_type,
            expires_at,
        })
    }
}

/// `0 < size <= MAX_IMAGE_SIZE_BYTES`
pub fn check_declared_size(size: i64) -> Result<(), AppError> {
    if size <= 0 {
        return Err(AppError::InvalidSize(format!(
            "size must be positive, got {}",
            size
        )));
    }
    if size as u64 > MAX_IMAGE_SIZE_BYTES {
        return Err(AppError::PayloadTooLarge(format!(
            "{} bytes exceeds the {} byte limit",
            size, MAX_IMAGE_SIZE_BYTES
        )));
    }
    Ok(())
}

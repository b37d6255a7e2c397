//! Conversion of image values between their accepted representations.
//!
//! The storage direction turns any acceptable value into a storage path and
//! may write to storage. The read directions resolve stored paths into a
//! signed read URL (display) or embedded bytes (print) and never fail:
//! resolution problems degrade to `""` or the fallback image.

use std::sync::Arc;
use std::time::Duration;

use acara_core::constants::{PrintSize, FALLBACK_IMAGE_BASE64, MAX_IMAGE_SIZE_BYTES};
use acara_core::models::{ImageExtension, ImageValue, InlineImage, PrintImage};
use acara_core::validation::ImagePathPolicy;
use acara_core::AppError;
use acara_storage::keys::record_image_key;
use acara_storage::Storage;
use uuid::Uuid;

use crate::rollback::RollbackLedger;

#[derive(Clone)]
pub struct ImageNormalizer {
    storage: Arc<dyn Storage>,
    policy: ImagePathPolicy,
    display_url_ttl: Duration,
}

impl ImageNormalizer {
    pub fn new(storage: Arc<dyn Storage>, policy: ImagePathPolicy, display_url_ttl: Duration) -> Self {
        Self {
            storage,
            policy,
            display_url_ttl,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn policy(&self) -> &ImagePathPolicy {
        &self.policy
    }

    /// Every check of the storage direction, without touching storage.
    ///
    /// Remote references are re-validated and inline payloads decoded,
    /// size-checked and sniffed. Pending images must have been uploaded by
    /// the client first.
    pub fn prepare_for_storage(
        &self,
        value: ImageValue,
        field_locator: &str,
    ) -> Result<PreparedImage, AppError> {
        match value {
            ImageValue::Empty => Ok(PreparedImage::Empty),
            ImageValue::RemoteRef { storage_path } => self
                .policy
                .normalize(&storage_path, field_locator)
                .map(PreparedImage::Stored),
            ImageValue::InlinePrintPayload(inline) => prepare_inline(inline, field_locator),
            ImageValue::PendingLocal(_) => Err(AppError::UnresolvedImageState {
                field: field_locator.to_string(),
            }),
        }
    }

    /// Resolve a prepared value to the storage path persisted for
    /// `field_locator`. Inline payloads are written under the record's
    /// namespace and recorded in `ledger`; only the transfer itself can fail.
    pub async fn store_prepared(
        &self,
        prepared: PreparedImage,
        field_locator: &str,
        record_id: Uuid,
        ledger: &RollbackLedger,
    ) -> Result<String, AppError> {
        let (bytes, extension) = match prepared {
            PreparedImage::Empty => return Ok(String::new()),
            PreparedImage::Stored(storage_path) => return Ok(storage_path),
            PreparedImage::Upload { bytes, extension } => (bytes, extension),
        };

        let storage_path =
            record_image_key(self.policy.prefix(), record_id, field_locator, extension);
        self.storage
            .upload_with_key(&storage_path, bytes, extension.content_type())
            .await
            .map_err(|e| AppError::UploadTransferFailed {
                field: field_locator.to_string(),
                reason: e.to_string(),
            })?;
        ledger.record(storage_path.clone());

        Ok(storage_path)
    }

    /// Signed, short-lived read URL, or `""` when the value cannot be resolved.
    pub async fn normalize_for_display(&self, value: &ImageValue, field_locator: &str) -> String {
        match value {
            ImageValue::Empty | ImageValue::PendingLocal(_) => String::new(),
            ImageValue::InlinePrintPayload(inline) => inline.data_url(),
            ImageValue::RemoteRef { storage_path } => {
                let key = match self.policy.normalize(storage_path, field_locator) {
                    Ok(key) => key,
                    Err(e) => {
                        tracing::warn!(error = %e, storage_path = %storage_path, "Unusable image reference");
                        return String::new();
                    }
                };
                match self.storage.get_presigned_url(&key, self.display_url_ttl).await {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::warn!(error = %e, storage_path = %key, "Failed to sign read URL");
                        String::new()
                    }
                }
            }
        }
    }

    /// Embeddable image at `size`, or the fallback placeholder at `size`.
    pub async fn normalize_for_print(
        &self,
        value: &ImageValue,
        field_locator: &str,
        size: PrintSize,
    ) -> PrintImage {
        match value {
            ImageValue::InlinePrintPayload(inline) => inline.clone().at_size(size),
            ImageValue::RemoteRef { storage_path } => {
                match self.load_remote(storage_path, field_locator).await {
                    Ok(inline) => inline.at_size(size),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            storage_path = %storage_path,
                            field = %field_locator,
                            "Substituting fallback image"
                        );
                        fallback_image(size)
                    }
                }
            }
            ImageValue::Empty | ImageValue::PendingLocal(_) => fallback_image(size),
        }
    }

    async fn load_remote(&self, storage_path: &str, field_locator: &str) -> Result<InlineImage, AppError> {
        let key = self.policy.normalize(storage_path, field_locator)?;
        if !self.storage.exists(&key).await? {
            return Err(AppError::StorageObjectMissing(key));
        }

        let metadata = self.storage.metadata(&key).await?;
        let extension = metadata
            .content_type
            .as_deref()
            .and_then(ImageExtension::from_mime)
            .or_else(|| ImageExtension::from_path(&key))
            .ok_or_else(|| {
                AppError::UnsupportedMimeType(metadata.content_type.clone().unwrap_or_default())
            })?;

        let bytes = self.storage.download(&key).await?;
        if bytes.is_empty() {
            return Err(AppError::InvalidSize(format!("{} is empty", key)));
        }

        Ok(InlineImage::from_bytes(&bytes, extension))
    }
}

/// An image slot that passed the storage-direction checks.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PreparedImage {
    #[default]
    Empty,
    /// Validated storage path of an object that already exists.
    Stored(String),
    /// Decoded inline payload with its sniffed format.
    Upload {
        bytes: Vec<u8>,
        extension: ImageExtension,
    },
}

fn prepare_inline(inline: InlineImage, field_locator: &str) -> Result<PreparedImage, AppError> {
    let bytes = inline.decode().map_err(|_| AppError::UnsupportedImageFormat {
        field: field_locator.to_string(),
    })?;
    if bytes.is_empty() {
        return Err(AppError::InvalidSize(format!("{} is empty", field_locator)));
    }
    if bytes.len() as u64 > MAX_IMAGE_SIZE_BYTES {
        return Err(AppError::PayloadTooLarge(format!(
            "{} is {} bytes, limit is {}",
            field_locator,
            bytes.len(),
            MAX_IMAGE_SIZE_BYTES
        )));
    }

    // The bytes decide the format; the declared spelling (.jpg vs .jpeg)
    // survives when it agrees with them.
    let sniffed = ImageExtension::sniff(&bytes, field_locator)?;
    let extension = if sniffed.content_type() == inline.extension.content_type() {
        inline.extension
    } else {
        sniffed
    };

    Ok(PreparedImage::Upload { bytes, extension })
}

pub fn fallback_image(size: PrintSize) -> PrintImage {
    InlineImage {
        data: FALLBACK_IMAGE_BASE64.to_string(),
        extension: ImageExtension::Png,
    }
    .at_size(size)
}

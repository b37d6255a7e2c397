//! Shared key generation for storage backends.
//!
//! Signed pre-uploads land in `{prefix}/temp/{uuid}/{locator}-{uuid}{ext}`;
//! server-side uploads are namespaced by record:
//! `{prefix}/{record_id}/{locator}-{uuid}{ext}`.

use acara_core::constants::TEMP_UPLOAD_SEGMENT;
use acara_core::models::ImageExtension;
use acara_core::validation::sanitize_segment;
use uuid::Uuid;

/// Destination for a signed pre-upload of the image at `field_locator`.
pub fn temp_upload_key(prefix: &str, field_locator: &str, extension: ImageExtension) -> String {
    format!(
        "{}/{}/{}/{}-{}{}",
        prefix.trim_matches('/'),
        TEMP_UPLOAD_SEGMENT,
        Uuid::new_v4(),
        sanitize_segment(field_locator),
        Uuid::new_v4(),
        extension.as_str()
    )
}

/// Destination for an inline image uploaded while persisting `record_id`.
pub fn record_image_key(
    prefix: &str,
    record_id: Uuid,
    field_locator: &str,
    extension: ImageExtension,
) -> String {
    format!(
        "{}/{}/{}-{}{}",
        prefix.trim_matches('/'),
        record_id,
        sanitize_segment(field_locator),
        Uuid::new_v4(),
        extension.as_str()
    )
}

//! Contractual constants. These are intentionally not configurable.

use std::time::Duration;

/// Byte ceiling for any image, enforced at authorization and inline upload.
pub const MAX_IMAGE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Lifetime of a signed upload authorization.
pub const UPLOAD_AUTHORIZATION_TTL: Duration = Duration::from_secs(5 * 60);

/// Default lifetime of signed read URLs handed to the detail view.
pub const DEFAULT_DISPLAY_URL_TTL_SECS: u64 = 60 * 60;

/// Number of concurrent transfers the upload scheduler runs.
pub const UPLOAD_CONCURRENCY: usize = 3;

/// Logical collection holding berita acara records.
pub const RECORD_COLLECTION: &str = "berita-acara";

/// Marks records whose images are stored as bare storage paths.
pub const IMAGE_STORAGE_VERSION: u32 = 2;

/// Sub-directory of the images prefix used for signed pre-uploads.
pub const TEMP_UPLOAD_SEGMENT: &str = "temp";

pub const DEFAULT_TEMPLATE_NAME: &str = "berita-acara.docx";

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// 1x1 transparent PNG substituted when an image cannot be resolved for print.
pub const FALLBACK_IMAGE_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mP8/x8AAwMCAO2Yw0YAAAAASUVORK5CYII=";

/// Print dimensions in centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintSize {
    pub width_cm: f64,
    pub height_cm: f64,
}

/// Photos and the site diagram.
pub const PHOTO_PRINT_SIZE: PrintSize = PrintSize {
    width_cm: 7.0,
    height_cm: 7.0,
};

pub const SIGNATURE_PRINT_SIZE: PrintSize = PrintSize {
    width_cm: 2.0,
    height_cm: 2.0,
};

//! Error types module
//!
//! All failures of the record service are unified under the `AppError` enum.
//! Write-path failures abort the submission; read-path image failures are
//! absorbed by the normalizer and never reach this type's HTTP mapping.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UNSUPPORTED_MIME_TYPE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unsupported mime type: {0}")]
    UnsupportedMimeType(String),

    #[error("Unsupported image format for field {field}")]
    UnsupportedImageFormat { field: String },

    #[error("Image too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Image for field {field} has not been uploaded yet")]
    UnresolvedImageState { field: String },

    #[error("Upload failed for field {field}: {reason}")]
    UploadTransferFailed { field: String, reason: String },

    #[error("Storage object missing: {0}")]
    StorageObjectMissing(String),

    #[error("Failed to persist record: {0}")]
    RecordPersistFailed(String),

    #[error("Invalid storage path for field {field}: {reason}")]
    InvalidStoragePath { field: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Document render failed: {0}")]
    DocumentRender(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::UnsupportedMimeType(_) => (
            415,
            "UNSUPPORTED_MIME_TYPE",
            false,
            Some("Use a PNG, JPEG or GIF image"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedImageFormat { .. } => (
            400,
            "UNSUPPORTED_IMAGE_FORMAT",
            false,
            Some("Send an empty value, a storage path or a base64 data URL"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce the image size below 10 MiB"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidSize(_) => (
            400,
            "INVALID_SIZE",
            false,
            Some("Declare the image size in bytes"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnresolvedImageState { .. } => (
            422,
            "UNRESOLVED_IMAGE_STATE",
            false,
            Some("Upload pending images before submitting the record"),
            false,
            LogLevel::Warn,
        ),
        AppError::UploadTransferFailed { .. } => (
            502,
            "UPLOAD_TRANSFER_FAILED",
            true,
            Some("Retry the submission"),
            false,
            LogLevel::Warn,
        ),
        AppError::StorageObjectMissing(_) => (
            404,
            "STORAGE_OBJECT_MISSING",
            false,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::RecordPersistFailed(_) => (
            500,
            "RECORD_PERSIST_FAILED",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidStoragePath { .. } => (
            400,
            "INVALID_STORAGE_PATH",
            false,
            Some("Use the storage path returned by the upload authorization"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Request a new signed URL"),
            false,
            LogLevel::Warn,
        ),
        AppError::TemplateNotFound(_) => (
            404,
            "TEMPLATE_NOT_FOUND",
            false,
            Some("Check the template name"),
            false,
            LogLevel::Warn,
        ),
        AppError::DocumentRender(_) => (
            500,
            "DOCUMENT_RENDER_FAILED",
            false,
            Some("Check the template for malformed placeholders"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::UnsupportedMimeType(_) => "UnsupportedMimeType",
            AppError::UnsupportedImageFormat { .. } => "UnsupportedImageFormat",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::InvalidSize(_) => "InvalidSize",
            AppError::UnresolvedImageState { .. } => "UnresolvedImageState",
            AppError::UploadTransferFailed { .. } => "UploadTransferFailed",
            AppError::StorageObjectMissing(_) => "StorageObjectMissing",
            AppError::RecordPersistFailed(_) => "RecordPersistFailed",
            AppError::InvalidStoragePath { .. } => "InvalidStoragePath",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Forbidden(_) => "Forbidden",
            AppError::TemplateNotFound(_) => "TemplateNotFound",
            AppError::DocumentRender(_) => "DocumentRender",
            AppError::Storage(_) => "Storage",
            AppError::Database(_) => "Database",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::RecordPersistFailed(_) => "Failed to save record".to_string(),
            AppError::DocumentRender(_) => "Failed to render document".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::NotFound(ref msg)
            | AppError::InvalidInput(ref msg)
            | AppError::Forbidden(ref msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

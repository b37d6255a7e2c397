//! Image field values.
//!
//! Every image slot of a record holds exactly one [`ImageValue`]. Raw JSON
//! coming from clients is classified with [`ImageValue::classify`]; nothing
//! is ever silently coerced to `Empty` unless the input itself is empty.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::constants::PrintSize;
use crate::error::AppError;

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:([^;,]+);base64,([A-Za-z0-9+/=\s]+)$").expect("valid regex")
});

/// Allow-listed image formats. Anything else is rejected before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageExtension {
    Png,
    Jpg,
    Jpeg,
    Gif,
}

impl ImageExtension {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(ImageExtension::Png),
            "image/jpeg" => Some(ImageExtension::Jpeg),
            "image/jpg" => Some(ImageExtension::Jpg),
            "image/gif" => Some(ImageExtension::Gif),
            _ => None,
        }
    }

    /// Accepts `png`, `.PNG` and friends.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Some(ImageExtension::Png),
            "jpg" => Some(ImageExtension::Jpg),
            "jpeg" => Some(ImageExtension::Jpeg),
            "gif" => Some(ImageExtension::Gif),
            _ => None,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let file_name = path.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Identify the format from magic bytes. Images outside the allow-list
    /// are rejected as unsupported mime types, unrecognizable bytes as an
    /// unsupported format for `field`.
    pub fn sniff(data: &[u8], field: &str) -> Result<Self, AppError> {
        match image::guess_format(data) {
            Ok(image::ImageFormat::Png) => Ok(ImageExtension::Png),
            Ok(image::ImageFormat::Jpeg) => Ok(ImageExtension::Jpeg),
            Ok(image::ImageFormat::Gif) => Ok(ImageExtension::Gif),
            Ok(other) => Err(AppError::UnsupportedMimeType(
                other.to_mime_type().to_string(),
            )),
            Err(_) => Err(AppError::UnsupportedImageFormat {
                field: field.to_string(),
            }),
        }
    }

    /// Extension including the leading dot.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageExtension::Png => ".png",
            ImageExtension::Jpg => ".jpg",
            ImageExtension::Jpeg => ".jpeg",
            ImageExtension::Gif => ".gif",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageExtension::Png => "image/png",
            ImageExtension::Jpg | ImageExtension::Jpeg => "image/jpeg",
            ImageExtension::Gif => "image/gif",
        }
    }
}

impl fmt::Display for ImageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ImageExtension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Where the bytes of a not-yet-uploaded image live on the client.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingSource {
    Bytes(Bytes),
    File(PathBuf),
    /// Opaque handle that only the submitting client can resolve.
    Handle(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub source: PendingSource,
    pub preview_ref: Option<String>,
}

/// Inline base64 image, either freshly selected or materialized for print.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    /// Base64 payload without whitespace.
    pub data: String,
    pub extension: ImageExtension,
}

impl InlineImage {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.data.as_bytes())
    }

    pub fn from_bytes(data: &[u8], extension: ImageExtension) -> Self {
        Self {
            data: STANDARD.encode(data),
            extension,
        }
    }

    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.extension.content_type(),
            self.data
        )
    }

    pub fn at_size(self, size: PrintSize) -> PrintImage {
        PrintImage {
            data: self.data,
            extension: self.extension,
            width: size.width_cm,
            height: size.height_cm,
        }
    }
}

/// Embeddable image as the document generator consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintImage {
    pub width: f64,
    pub height: f64,
    pub data: String,
    pub extension: ImageExtension,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ImageValue {
    #[default]
    Empty,
    PendingLocal(PendingImage),
    RemoteRef {
        storage_path: String,
    },
    InlinePrintPayload(InlineImage),
}

impl ImageValue {
    pub fn remote(storage_path: impl Into<String>) -> Self {
        ImageValue::RemoteRef {
            storage_path: storage_path.into(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ImageValue::PendingLocal(_))
    }

    /// Classify a raw client representation. `field` is the locator used in
    /// errors, e.g. `daftar_petugas[2].ttd`.
    pub fn classify(raw: &Value, field: &str) -> Result<Self, AppError> {
        let unsupported = || AppError::UnsupportedImageFormat {
            field: field.to_string(),
        };

        match raw {
            Value::Null => Ok(ImageValue::Empty),
            Value::String(s) if s.trim().is_empty() => Ok(ImageValue::Empty),
            Value::String(s) if s.trim_start().starts_with("data:") => {
                parse_data_url(s.trim(), field).map(ImageValue::InlinePrintPayload)
            }
            Value::String(s) => Ok(ImageValue::remote(s.trim())),
            Value::Object(map) => {
                if let Some(path) = map.get("storagePath").and_then(Value::as_str) {
                    if !path.trim().is_empty() {
                        return Ok(ImageValue::remote(path.trim()));
                    }
                }

                match map.get("kind").and_then(Value::as_str) {
                    Some("pending") | Some("uploading") => {
                        let text = |key: &str| {
                            map.get(key)
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string()
                        };
                        let file_name = text("fileName");
                        let handle = map
                            .get("handle")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| file_name.clone());
                        Ok(ImageValue::PendingLocal(PendingImage {
                            mime_type: text("mimeType"),
                            size_bytes: map.get("size").and_then(Value::as_u64).unwrap_or(0),
                            source: PendingSource::Handle(handle),
                            preview_ref: map
                                .get("previewUrl")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            file_name,
                        }))
                    }
                    Some("new-upload") => {
                        if let Some(mime) = map.get("mimeType").and_then(Value::as_str) {
                            if ImageExtension::from_mime(mime).is_none() {
                                return Err(AppError::UnsupportedMimeType(mime.to_string()));
                            }
                        }
                        let data_url = map
                            .get("dataUrl")
                            .and_then(Value::as_str)
                            .ok_or_else(unsupported)?;
                        parse_data_url(data_url.trim(), field).map(ImageValue::InlinePrintPayload)
                    }
                    Some(_) => Err(unsupported()),
                    None => {
                        let data = map.get("data").and_then(Value::as_str);
                        let extension = map.get("extension").and_then(Value::as_str);
                        match (data, extension) {
                            (Some(data), Some(extension)) => {
                                let extension = ImageExtension::from_extension(extension)
                                    .ok_or_else(|| {
                                        AppError::UnsupportedMimeType(extension.to_string())
                                    })?;
                                let data = strip_whitespace(data);
                                if !is_valid_base64(&data) {
                                    return Err(unsupported());
                                }
                                Ok(ImageValue::InlinePrintPayload(InlineImage { data, extension }))
                            }
                            _ => Err(unsupported()),
                        }
                    }
                }
            }
            _ => Err(unsupported()),
        }
    }
}

/// Wire form sent by clients: a bare storage path for remote references,
/// tagged objects for everything transient.
impl Serialize for ImageValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ImageValue::Empty => serializer.serialize_str(""),
            ImageValue::RemoteRef { storage_path } => serializer.serialize_str(storage_path),
            ImageValue::PendingLocal(pending) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("kind", "pending")?;
                map.serialize_entry("fileName", &pending.file_name)?;
                map.serialize_entry("mimeType", &pending.mime_type)?;
                map.serialize_entry("size", &pending.size_bytes)?;
                map.end()
            }
            ImageValue::InlinePrintPayload(inline) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("kind", "new-upload")?;
                map.serialize_entry("mimeType", inline.extension.content_type())?;
                map.serialize_entry("dataUrl", &inline.data_url())?;
                map.end()
            }
        }
    }
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_valid_base64(value: &str) -> bool {
    !value.is_empty()
        && value.len() % 4 == 0
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

fn parse_data_url(value: &str, field: &str) -> Result<InlineImage, AppError> {
    let captures = DATA_URL
        .captures(value)
        .ok_or_else(|| AppError::UnsupportedImageFormat {
            field: field.to_string(),
        })?;
    let mime = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let extension = ImageExtension::from_mime(mime)
        .ok_or_else(|| AppError::UnsupportedMimeType(mime.to_string()))?;
    let data = strip_whitespace(captures.get(2).map(|m| m.as_str()).unwrap_or_default());
    if !is_valid_base64(&data) {
        return Err(AppError::UnsupportedImageFormat {
            field: field.to_string(),
        });
    }
    Ok(InlineImage { data, extension })
}

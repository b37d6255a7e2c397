//! Client-side form state loaded from JSON files.
//!
//! Image fields may name a local file as `{"file": "photo.jpg"}`; those
//! become pending images that [`drain_pending_uploads`](crate::drain_pending_uploads)
//! uploads before submission. Every other representation is classified the
//! same way the server does.

use std::path::Path;

use acara_core::models::{BeritaAcara, ImageExtension, ImageValue, PendingImage, PendingSource};
use anyhow::{Context, Result};
use serde_json::Value;

/// Parse a form. Relative image file paths are resolved against `base_dir`.
pub fn load_form(raw: Value, base_dir: &Path) -> Result<BeritaAcara<ImageValue>> {
    let record: BeritaAcara<Value> =
        serde_json::from_value(raw).context("Form is not a berita acara record")?;

    record.try_map_images(|slot, value| {
        let field = slot.to_string();
        match value.get("file").and_then(Value::as_str) {
            Some(file) => pending_from_file(&base_dir.join(file))
                .with_context(|| format!("Invalid image file for {}", field)),
            None => ImageValue::classify(&value, &field)
                .with_context(|| format!("Invalid image value for {}", field)),
        }
    })
}

/// Pending image backed by a file on disk; the mime type follows the extension.
pub fn pending_from_file(path: &Path) -> Result<ImageValue> {
    let path_str = path.to_string_lossy();
    let extension = ImageExtension::from_path(&path_str)
        .with_context(|| format!("{} is not a png, jpg, jpeg or gif file", path.display()))?;
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(ImageValue::PendingLocal(PendingImage {
        file_name,
        mime_type: extension.content_type().to_string(),
        size_bytes: metadata.len(),
        source: PendingSource::File(path.to_path_buf()),
        preview_ref: None,
    }))
}

//! Storage path policy for image references.
//!
//! A stored image reference is a bucket-relative key rooted under the
//! configured images prefix. Keys never carry a scheme, a leading slash,
//! backslashes, empty segments or dot segments.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

static UNSAFE_SEGMENT_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9_-]+").expect("valid regex")
});

static UNSAFE_FILE_NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9._-]").expect("valid regex")
});

/// Turn a field locator such as `pengukuran_dihadiri[0].foto` into a key
/// segment (`pengukuran_dihadiri-0-foto`). Falls back to `image`.
pub fn sanitize_segment(value: &str) -> String {
    let replaced = UNSAFE_SEGMENT_CHARS.replace_all(value, "-");
    let trimmed = replaced.trim_matches('-').to_lowercase();
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed
    }
}

/// File name safe for a `Content-Disposition` header.
pub fn sanitize_file_name(value: &str) -> String {
    UNSAFE_FILE_NAME_CHARS.replace_all(value, "_").into_owned()
}

#[derive(Debug, Clone)]
pub struct ImagePathPolicy {
    bucket: String,
    prefix: String,
}

impl ImagePathPolicy {
    pub fn new(bucket: impl Into<String>, prefix: &str) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Normalize a client-supplied reference into a storage key.
    ///
    /// `gs://` and `s3://` URIs are accepted only for the configured bucket;
    /// every other scheme is rejected.
    pub fn normalize(&self, raw: &str, field: &str) -> Result<String, AppError> {
        let invalid = |reason: &str| AppError::InvalidStoragePath {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }

        let key = match ["gs://", "s3://"]
            .iter()
            .find_map(|scheme| trimmed.strip_prefix(scheme))
        {
            Some(rest) => {
                let (bucket, key) = rest
                    .split_once('/')
                    .ok_or_else(|| invalid("missing object key"))?;
                if bucket != self.bucket {
                    return Err(invalid("bucket does not match"));
                }
                key
            }
            None if trimmed.contains("://") => return Err(invalid("URLs are not storage paths")),
            None => trimmed,
        };

        let key = key.trim_start_matches('/');
        if key.contains('\\') {
            return Err(invalid("backslashes are not allowed"));
        }
        if key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(invalid("empty or relative path segment"));
        }
        if !self.is_under_prefix(key) {
            return Err(invalid("path is outside the images prefix"));
        }

        Ok(key.to_string())
    }

    pub fn is_under_prefix(&self, key: &str) -> bool {
        key.strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ImagePathPolicy {
        ImagePathPolicy::new("acara-bucket", "/images/")
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(
            sanitize_segment("pengukuran_dihadiri[0].foto"),
            "pengukuran_dihadiri-0-foto"
        );
        assert_eq!(sanitize_segment("Gambar Denah"), "gambar-denah");
        assert_eq!(sanitize_segment("--$$--"), "image");
        assert_eq!(sanitize_segment(""), "image");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(
            sanitize_file_name("berita acara (1).docx"),
            "berita_acara__1_.docx"
        );
        assert_eq!(sanitize_file_name("../x.docx"), ".._x.docx");
    }

    #[test]
    fn test_normalize_accepts_prefixed_keys() {
        let policy = policy();
        assert_eq!(policy.prefix(), "images");
        assert_eq!(
            policy.normalize("  images/a/b.png ", "f").unwrap(),
            "images/a/b.png"
        );
        assert_eq!(
            policy.normalize("//images/a.png", "f").unwrap(),
            "images/a.png"
        );
        assert_eq!(
            policy
                .normalize("gs://acara-bucket/images/a.png", "f")
                .unwrap(),
            "images/a.png"
        );
    }

    #[test]
    fn test_normalize_rejects_unsafe_paths() {
        let policy = policy();
        for raw in [
            "",
            "https://evil.example/images/a.png",
            "gs://other-bucket/images/a.png",
            "images/../secrets/key",
            "images//a.png",
            "images\\a.png",
            "other/a.png",
            "images",
            "images/",
            "imagesx/a.png",
        ] {
            let err = policy.normalize(raw, "gambar_denah_area").unwrap_err();
            assert!(
                matches!(err, AppError::InvalidStoragePath { ref field, .. } if field == "gambar_denah_area"),
                "expected rejection for {raw:?}"
            );
        }
    }
}

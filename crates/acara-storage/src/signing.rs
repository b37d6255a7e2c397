//! HMAC-signed object URLs for the local storage backend.
//!
//! Signature = hex(HMAC-SHA256(secret, "{METHOD}\n{key}\n{content_type}\n{expires}")).
//! PUT signatures bind the content type; GET signatures sign an empty one.

use hmac::{Hmac, Mac};
use http::Method;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signed URL has expired")]
    Expired,
    #[error("signature does not match")]
    Invalid,
}

#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, method: &Method, key: &str, content_type: &str, expires: u64) -> Hmac<Sha256> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(method.as_str().as_bytes());
        mac.update(b"\n");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(content_type.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    pub fn sign(&self, method: &Method, key: &str, content_type: &str, expires: u64) -> String {
        hex::encode(self.mac(method, key, content_type, expires).finalize().into_bytes())
    }

    /// Verify against the current time.
    pub fn verify(
        &self,
        method: &Method,
        key: &str,
        content_type: &str,
        expires: u64,
        signature: &str,
    ) -> Result<(), SignatureError> {
        self.verify_at(method, key, content_type, expires, signature, unix_now())
    }

    pub fn verify_at(
        &self,
        method: &Method,
        key: &str,
        content_type: &str,
        expires: u64,
        signature: &str,
        now: u64,
    ) -> Result<(), SignatureError> {
        let tag = hex::decode(signature).map_err(|_| SignatureError::Invalid)?;
        self.mac(method, key, content_type, expires)
            .verify_slice(&tag)
            .map_err(|_| SignatureError::Invalid)?;
        if now > expires {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }

    /// `{base_url}/{key}?expires=..&signature=..`
    pub fn signed_url(
        &self,
        base_url: &str,
        method: &Method,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> String {
        let expires = unix_now().saturating_add(expires_in.as_secs());
        let signature = self.sign(method, key, content_type, expires);
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}?expires={}&signature={}",
            base_url.trim_end_matches('/'),
            encoded_key,
            expires,
            signature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn test_signature_binds_method_key_and_content_type() {
        let signer = signer();
        let sig = signer.sign(&Method::PUT, "images/a.png", "image/png", 1_000);

        assert!(signer
            .verify_at(&Method::PUT, "images/a.png", "image/png", 1_000, &sig, 900)
            .is_ok());
        assert_eq!(
            signer.verify_at(&Method::PUT, "images/a.png", "image/gif", 1_000, &sig, 900),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            signer.verify_at(&Method::GET, "images/a.png", "image/png", 1_000, &sig, 900),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            signer.verify_at(&Method::PUT, "images/b.png", "image/png", 1_000, &sig, 900),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            signer.verify_at(&Method::PUT, "images/a.png", "image/png", 1_001, &sig, 900),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_expired_signature_rejected() {
        let signer = signer();
        let sig = signer.sign(&Method::PUT, "images/a.png", "image/png", 1_000);
        assert_eq!(
            signer.verify_at(&Method::PUT, "images/a.png", "image/png", 1_000, &sig, 1_001),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn test_garbage_signature_rejected() {
        assert_eq!(
            signer().verify_at(&Method::GET, "k", "", 10, "not-hex", 0),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_signed_url_shape() {
        let url = signer().signed_url(
            "http://localhost:4000/api/v0/storage/",
            &Method::GET,
            "images/r/a.png",
            "",
            Duration::from_secs(60),
        );
        assert!(url.starts_with("http://localhost:4000/api/v0/storage/images/r/a.png?expires="));
        assert!(url.contains("&signature="));
    }
}

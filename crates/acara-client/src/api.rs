//! Domain methods for the berita acara API client.

use crate::scheduler::UploadTransport;
use crate::{api_prefix, ensure_success, ApiClient};
use acara_core::models::{
    RecordCreated, RecordSummary, UploadAuthorization, UploadAuthorizationRequest,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde_json::{json, Value};
use uuid::Uuid;

/// A downloaded document and the file name the server suggested.
#[derive(Debug)]
pub struct DownloadedDocument {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ApiClient {
    pub async fn authorize_upload(
        &self,
        request: &UploadAuthorizationRequest,
    ) -> Result<UploadAuthorization> {
        self.post_json(&format!("{}/uploads/authorize", api_prefix()), request)
            .await
    }

    /// PUT `body` to a signed upload target with the bound content type.
    pub async fn put_upload(&self, authorization: &UploadAuthorization, body: Bytes) -> Result<()> {
        let response = self
            .client()
            .put(&authorization.upload_target)
            .header(CONTENT_TYPE, authorization.content_type.as_str())
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to upload {}", authorization.storage_path))?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Submit a record whose images are all storage paths, inline data or empty.
    pub async fn create_record(&self, record: &Value) -> Result<Uuid> {
        let created: RecordCreated = self
            .post_json(&format!("{}/records", api_prefix()), record)
            .await?;
        Ok(created.id)
    }

    pub async fn list_records(&self, limit: i64, offset: i64) -> Result<Vec<RecordSummary>> {
        self.get(
            &format!("{}/records", api_prefix()),
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    pub async fn get_record(&self, id: Uuid) -> Result<Value> {
        self.get(&format!("{}/records/{}", api_prefix(), id), &[])
            .await
    }

    pub async fn get_print_data(&self, id: Uuid) -> Result<Value> {
        self.get(&format!("{}/records/{}/print-data", api_prefix(), id), &[])
            .await
    }

    pub async fn render_document(
        &self,
        id: Uuid,
        template_name: Option<&str>,
    ) -> Result<DownloadedDocument> {
        let response = self
            .post_json_raw(
                &format!("{}/documents/render", api_prefix()),
                &json!({ "recordId": id, "templateName": template_name }),
            )
            .await?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| format!("berita-acara-{}.docx", id));
        let bytes = response
            .bytes()
            .await
            .context("Failed to read document body")?;

        Ok(DownloadedDocument { file_name, bytes })
    }
}

/// `attachment; filename="x.docx"` -> `x.docx`
fn attachment_file_name(header: &str) -> Option<String> {
    header.split(';').find_map(|part| {
        let value = part.trim().strip_prefix("filename=")?;
        let value = value.trim_matches('"');
        let decoded = urlencoding::decode(value).ok()?;
        (!decoded.is_empty()).then(|| decoded.into_owned())
    })
}

#[async_trait]
impl UploadTransport for ApiClient {
    async fn authorize(&self, request: &UploadAuthorizationRequest) -> Result<UploadAuthorization> {
        self.authorize_upload(request).await
    }

    async fn transfer(&self, authorization: &UploadAuthorization, body: Bytes) -> Result<()> {
        self.put_upload(authorization, body).await
    }
}

//! Concurrent upload of pending images before submission.
//!
//! Workers pull tasks through one shared cursor. The first failure cancels
//! the queue so no worker claims another task. Transfers already in flight
//! finish, but the record is only updated when every upload succeeded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use acara_core::models::{
    BeritaAcara, ImageSlot, ImageValue, PendingImage, PendingSource, UploadAuthorization,
    UploadAuthorizationRequest,
};
use acara_core::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Obtains upload authorizations and moves bytes to the signed targets.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn authorize(
        &self,
        request: &UploadAuthorizationRequest,
    ) -> anyhow::Result<UploadAuthorization>;

    /// PUT `body` to the authorization's target with its bound content type.
    async fn transfer(&self, authorization: &UploadAuthorization, body: Bytes)
        -> anyhow::Result<()>;
}

struct UploadTask {
    slot: ImageSlot,
    field: String,
    image: PendingImage,
}

/// Upload every pending image of `record` and replace each with a remote
/// reference. Returns the number of uploaded images.
///
/// At most `min(concurrency, pending)` transfers run at once. On failure the
/// first error by completion time is returned and `record` is not modified.
pub async fn drain_pending_uploads(
    record: &mut BeritaAcara<ImageValue>,
    transport: Arc<dyn UploadTransport>,
    concurrency: usize,
) -> Result<usize, AppError> {
    let tasks: Vec<UploadTask> = record
        .images()
        .into_iter()
        .filter_map(|(slot, value)| match value {
            ImageValue::PendingLocal(image) => Some(UploadTask {
                slot,
                field: slot.to_string(),
                image: image.clone(),
            }),
            _ => None,
        })
        .collect();
    if tasks.is_empty() {
        return Ok(0);
    }

    let task_count = tasks.len();
    let workers = concurrency.min(task_count).max(1);
    tracing::info!(pending = task_count, workers, "Uploading pending images");

    let tasks = Arc::new(tasks);
    let cursor = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();
    let first_error: Arc<Mutex<Option<AppError>>> = Arc::new(Mutex::new(None));
    let uploaded: Arc<Mutex<HashMap<ImageSlot, String>>> = Arc::new(Mutex::new(HashMap::new()));

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let tasks = tasks.clone();
        let cursor = cursor.clone();
        let cancel = cancel.clone();
        let first_error = first_error.clone();
        let uploaded = uploaded.clone();
        let transport = transport.clone();

        set.spawn(async move {
            while !cancel.is_cancelled() {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(task) = tasks.get(index) else {
                    break;
                };

                match upload_one(transport.as_ref(), task).await {
                    Ok(storage_path) => {
                        if let Ok(mut uploaded) = uploaded.lock() {
                            uploaded.insert(task.slot, storage_path);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, field = %task.field, "Upload failed, cancelling queue");
                        record_first_error(&first_error, e);
                        cancel.cancel();
                        break;
                    }
                }
            }
        });
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            record_first_error(&first_error, AppError::Internal(format!("upload worker failed: {}", e)));
        }
    }

    if let Some(e) = first_error.lock().ok().and_then(|mut slot| slot.take()) {
        return Err(e);
    }

    let mut uploaded = uploaded
        .lock()
        .map(|mut uploaded| std::mem::take(&mut *uploaded))
        .map_err(|_| AppError::Internal("upload results unavailable".to_string()))?;
    if uploaded.len() != task_count {
        return Err(AppError::Internal(format!(
            "{} of {} uploads reported a result",
            uploaded.len(),
            task_count
        )));
    }

    for (slot, value) in record.images_mut() {
        if let Some(storage_path) = uploaded.remove(&slot) {
            *value = ImageValue::remote(storage_path);
        }
    }

    Ok(task_count)
}

fn record_first_error(first_error: &Mutex<Option<AppError>>, error: AppError) {
    if let Ok(mut slot) = first_error.lock() {
        if slot.is_none() {
            *slot = Some(error);
        }
    }
}

async fn upload_one(transport: &dyn UploadTransport, task: &UploadTask) -> Result<String, AppError> {
    let failed = |reason: String| AppError::UploadTransferFailed {
        field: task.field.clone(),
        reason,
    };

    let body = read_source(&task.image.source).await.map_err(|e| failed(format!("{:#}", e)))?;
    let request = UploadAuthorizationRequest {
        file_name: task.image.file_name.clone(),
        mime_type: task.image.mime_type.clone(),
        size: body.len() as i64,
        field_locator: task.field.clone(),
    };

    let authorization = transport
        .authorize(&request)
        .await
        .map_err(|e| failed(format!("{:#}", e)))?;
    transport
        .transfer(&authorization, body)
        .await
        .map_err(|e| failed(format!("{:#}", e)))?;

    tracing::debug!(field = %task.field, storage_path = %authorization.storage_path, "Image uploaded");
    Ok(authorization.storage_path)
}

async fn read_source(source: &PendingSource) -> anyhow::Result<Bytes> {
    match source {
        PendingSource::Bytes(bytes) => Ok(bytes.clone()),
        PendingSource::File(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e)),
        PendingSource::Handle(handle) => Err(anyhow::anyhow!(
            "image {} has no local bytes in this client",
            handle
        )),
    }
}

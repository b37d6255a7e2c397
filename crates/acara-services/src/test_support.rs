//! In-memory storage double with call counting and failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use acara_storage::{ObjectMetadata, Storage, StorageBackend, StorageError, StorageResult};
use async_trait::async_trait;

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    failing_deletes: Mutex<HashSet<String>>,
    fail_uploads_after: Mutex<Option<usize>>,
    fail_signing: AtomicBool,
    writes: AtomicUsize,
    signed: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, data: Vec<u8>, content_type: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
    }

    pub fn remove(&self, key: &str) {
        self.objects.lock().unwrap().remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|(data, _)| data.clone())
    }

    pub fn fail_deletes_of(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    /// Let `n` uploads succeed, then fail every following one.
    pub fn fail_uploads_after(&self, n: usize) {
        *self.fail_uploads_after.lock().unwrap() = Some(n);
    }

    pub fn fail_signing(&self) {
        self.fail_signing.store(true, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn signed_count(&self) -> usize {
        self.signed.load(Ordering::SeqCst)
    }

    fn sign(&self, method: &str, key: &str) -> StorageResult<String> {
        if self.fail_signing.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("signing unavailable".to_string()));
        }
        self.signed.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://storage.test/{}?method={}", key, method))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        let previous = self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = *self.fail_uploads_after.lock().unwrap() {
            if previous >= limit {
                return Err(StorageError::UploadFailed("injected failure".to_string()));
            }
        }
        self.insert(storage_key, data, content_type);
        Ok(())
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.get(storage_key)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if self.failing_deletes.lock().unwrap().contains(storage_key) {
            return Err(StorageError::DeleteFailed("injected failure".to_string()));
        }
        self.remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.contains(storage_key))
    }

    async fn metadata(&self, storage_key: &str) -> StorageResult<ObjectMetadata> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .map(|(data, content_type)| ObjectMetadata {
                content_type: Some(content_type.clone()),
                size_bytes: data.len() as u64,
            })
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        self.sign("GET", storage_key)
    }

    async fn presigned_put_url(
        &self,
        storage_key: &str,
        _content_type: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        self.sign("PUT", storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

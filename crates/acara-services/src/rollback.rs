use std::sync::{Mutex, MutexGuard, PoisonError};

use acara_storage::Storage;

/// Every object durably written during one submission attempt, so a later
/// failure can undo them.
#[derive(Debug, Default)]
pub struct RollbackLedger {
    paths: Mutex<Vec<String>>,
}

impl RollbackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panicking writer cannot lose entries already recorded.
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, storage_path: impl Into<String>) {
        self.lock().push(storage_path.into());
    }

    pub fn paths(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.paths().is_empty()
    }

    /// Delete every recorded object. Failures are logged and swallowed so
    /// they never mask the error that triggered the rollback.
    pub async fn compensate(&self, storage: &dyn Storage) {
        let paths = std::mem::take(&mut *self.lock());

        for path in paths {
            if let Err(e) = storage.delete(&path).await {
                tracing::warn!(
                    error = %e,
                    storage_path = %path,
                    "Failed to delete orphaned object during rollback"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStorage;

    #[tokio::test]
    async fn test_compensate_deletes_and_swallows_failures() {
        let storage = MemoryStorage::new();
        storage.insert("images/r/a.png", b"a".to_vec(), "image/png");
        storage.insert("images/r/b.png", b"b".to_vec(), "image/png");
        storage.fail_deletes_of("images/r/a.png");

        let ledger = RollbackLedger::new();
        ledger.record("images/r/a.png");
        ledger.record("images/r/b.png");
        ledger.compensate(&storage).await;

        assert!(storage.contains("images/r/a.png"));
        assert!(!storage.contains("images/r/b.png"));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_poisoned_ledger_still_compensates() {
        let storage = MemoryStorage::new();
        storage.insert("images/r/a.png", b"a".to_vec(), "image/png");
        storage.insert("images/r/b.png", b"b".to_vec(), "image/png");

        let ledger = RollbackLedger::new();
        ledger.record("images/r/a.png");
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ledger.paths.lock().unwrap();
            panic!("writer died");
        }));
        assert!(poisoned.is_err());
        assert!(ledger.paths.is_poisoned());

        ledger.record("images/r/b.png");
        assert_eq!(ledger.paths().len(), 2);
        ledger.compensate(&storage).await;

        assert!(storage.keys().is_empty());
        assert!(ledger.is_empty());
    }
}

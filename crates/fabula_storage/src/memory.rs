//! Map-backed implementation of the record store.

use async_trait::async_trait;
use fabula_core::{EntityKind, IndexRange, NormalizedRecord};
use fabula_error::{FabulaResult, StorageError, StorageErrorKind};
use fabula_interface::RecordStore;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// In-memory [`RecordStore`] keyed by (kind, natural key).
///
/// # Examples
///
/// ```
/// use fabula_storage::MemoryStore;
/// use fabula_interface::RecordStore;
///
/// let store = MemoryStore::new();
/// assert!(store.supports_insert_or_ignore());
///
/// let legacy = MemoryStore::without_insert_or_ignore();
/// assert!(!legacy.supports_insert_or_ignore());
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<(EntityKind, String), NormalizedRecord>>,
    insert_or_ignore: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a store that accepts the insert-or-do-nothing conflict clause.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            insert_or_ignore: true,
        }
    }

    /// Create a store emulating a backend that rejects an unrecognized
    /// conflict clause, forcing the persister's look-before-insert path.
    pub fn without_insert_or_ignore() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            insert_or_ignore: false,
        }
    }

    /// Number of stored records of a kind.
    pub async fn count(&self, kind: EntityKind) -> usize {
        self.records
            .lock()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Seed a record directly, bypassing persister semantics. Test helper.
    pub async fn seed(&self, record: NormalizedRecord) {
        let key = (record.kind(), record.natural_key());
        self.records.lock().await.insert(key, record);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn supports_insert_or_ignore(&self) -> bool {
        self.insert_or_ignore
    }

    async fn existing_keys(&self, kind: EntityKind) -> FabulaResult<Vec<String>> {
        Ok(self
            .records
            .lock()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn fetch(&self, kind: EntityKind, key: &str) -> FabulaResult<Option<NormalizedRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .get(&(kind, key.to_string()))
            .cloned())
    }

    async fn insert_if_absent(&self, record: &NormalizedRecord) -> FabulaResult<bool> {
        if !self.insert_or_ignore {
            return Err(StorageError::new(StorageErrorKind::QueryFailed(
                "syntax error near ON CONFLICT".to_string(),
            )))?;
        }
        let key = (record.kind(), record.natural_key());
        let mut records = self.records.lock().await;
        if records.contains_key(&key) {
            return Ok(false);
        }
        records.insert(key, record.clone());
        Ok(true)
    }

    async fn insert(&self, record: &NormalizedRecord) -> FabulaResult<()> {
        let key = (record.kind(), record.natural_key());
        let mut records = self.records.lock().await;
        if records.contains_key(&key) {
            return Err(StorageError::new(StorageErrorKind::ConstraintViolation(
                format!("duplicate natural key '{}'", key.1),
            )))?;
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn replace(&self, record: &NormalizedRecord) -> FabulaResult<()> {
        let key = (record.kind(), record.natural_key());
        self.records.lock().await.insert(key, record.clone());
        Ok(())
    }

    async fn delete_range(&self, kind: EntityKind, range: IndexRange) -> FabulaResult<usize> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|(k, _), record| {
            if *k != kind {
                return true;
            }
            match record.index() {
                Some(index) => !range.contains(index),
                // Named kinds have no ordinal; force clears the whole scope.
                None => false,
            }
        });
        let removed = before - records.len();
        tracing::debug!(kind = %kind, range = %range, removed, "Deleted stored records");
        Ok(removed)
    }
}

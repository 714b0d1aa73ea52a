use crate::error::{Result, StorageError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use snip_core::{DuplicateIndex, DuplicateIndexEntry, RecordStore, ShortCode, ShortCodeRecord, UrlHash};
use tracing::trace;

/// In-memory implementation of the store traits using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<ShortCode, ShortCodeRecord>,
    duplicates: DashMap<UrlHash, DuplicateIndexEntry>,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store sized for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
            duplicates: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn put_record(&self, record: &ShortCodeRecord) -> Result<()> {
        self.records.insert(record.code.clone(), record.clone());
        Ok(())
    }

    async fn insert_record(&self, record: &ShortCodeRecord) -> Result<()> {
        // The entry guard holds the shard lock, so check-and-insert is atomic.
        match self.records.entry(record.code.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.code.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get_record(&self, code: &ShortCode) -> Result<Option<ShortCodeRecord>> {
        Ok(self.records.get(code).map(|entry| entry.value().clone()))
    }

    async fn exists_code(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.records.contains_key(code))
    }
}

#[async_trait]
impl DuplicateIndex for InMemoryStore {
    async fn put_duplicate(&self, entry: &DuplicateIndexEntry) -> Result<()> {
        self.duplicates.insert(entry.url_hash.clone(), entry.clone());
        Ok(())
    }

    async fn get_duplicate(&self, url_hash: &UrlHash) -> Result<Option<DuplicateIndexEntry>> {
        Ok(self.duplicates.get(url_hash).map(|entry| entry.value().clone()))
    }

    async fn delete_duplicate(&self, url_hash: &UrlHash) -> Result<bool> {
        Ok(self.duplicates.remove(url_hash).is_some())
    }

    async fn evict_duplicate(&self, snapshot: &DuplicateIndexEntry) -> Result<bool> {
        let removed = self
            .duplicates
            .remove_if(&snapshot.url_hash, |_, current| current == snapshot)
            .is_some();
        if !removed {
            trace!(url_hash = %snapshot.url_hash, "duplicate entry changed since snapshot, kept");
        }
        Ok(removed)
    }

    async fn list_duplicates(&self) -> Result<Vec<DuplicateIndexEntry>> {
        Ok(self
            .duplicates
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

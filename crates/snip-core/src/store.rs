use crate::error::StorageError;
use crate::record::{DuplicateIndexEntry, ShortCodeRecord, UrlHash};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Records keyed by short code.
///
/// Every single-key write must be atomic with respect to concurrent readers:
/// a reader never observes a partially written record.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Creates or overwrites the record keyed by `record.code`.
    async fn put_record(&self, record: &ShortCodeRecord) -> Result<()>;

    /// Inserts a new record. Returns `Err(Conflict)` if the code already exists.
    async fn insert_record(&self, record: &ShortCodeRecord) -> Result<()>;

    /// Retrieves the record for a given short code.
    /// Returns `None` if the code does not exist.
    async fn get_record(&self, code: &ShortCode) -> Result<Option<ShortCodeRecord>>;

    /// Checks whether a short code is already taken.
    async fn exists_code(&self, code: &ShortCode) -> Result<bool>;
}

/// The duplicate index, keyed by [`UrlHash`].
#[async_trait]
pub trait DuplicateIndex: Send + Sync + 'static {
    /// Creates or replaces the entry keyed by `entry.url_hash`.
    async fn put_duplicate(&self, entry: &DuplicateIndexEntry) -> Result<()>;

    async fn get_duplicate(&self, url_hash: &UrlHash) -> Result<Option<DuplicateIndexEntry>>;

    /// Deletes the entry for `url_hash`.
    /// Returns `true` if the entry existed and was removed.
    async fn delete_duplicate(&self, url_hash: &UrlHash) -> Result<bool>;

    /// Deletes the entry only if the stored value still equals `snapshot`.
    ///
    /// Returns `true` if the entry was removed. An entry refreshed or replaced
    /// since `snapshot` was taken is left alone.
    async fn evict_duplicate(&self, snapshot: &DuplicateIndexEntry) -> Result<bool>;

    /// Returns a snapshot of every entry. No entry is ever half-written.
    async fn list_duplicates(&self) -> Result<Vec<DuplicateIndexEntry>>;
}

/// A store owning both indexes of the shortener.
pub trait MappingStore: RecordStore + DuplicateIndex {}

impl<T: RecordStore + DuplicateIndex> MappingStore for T {}

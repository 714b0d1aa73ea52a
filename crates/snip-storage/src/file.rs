//! File-per-key store.
//!
//! Layout under the root directory:
//!
//! ```text
//! records/<md5(code)>.json
//! duplicates/<url_hash>.json
//! ```
//!
//! Record files are named by the md5 of the code so that codes differing
//! only in case never share a file on case-insensitive filesystems.

use crate::error::{map_io_error, map_json_error, Result, StorageError};
use async_trait::async_trait;
use snip_core::{DuplicateIndex, DuplicateIndexEntry, RecordStore, ShortCode, ShortCodeRecord, UrlHash};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

const RECORDS_DIR: &str = "records";
const DUPLICATES_DIR: &str = "duplicates";
const TMP_PREFIX: &str = ".tmp-";
const LOCK_STRIPES: usize = 64;

/// Durable store keeping one JSON document per key.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    records_dir: PathBuf,
    duplicates_dir: PathBuf,
    stripes: Vec<Mutex<()>>,
    tmp_counter: AtomicU64,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory layout if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let records_dir = root.join(RECORDS_DIR);
        let duplicates_dir = root.join(DUPLICATES_DIR);

        fs::create_dir_all(&records_dir).await.map_err(map_io_error)?;
        fs::create_dir_all(&duplicates_dir)
            .await
            .map_err(map_io_error)?;

        debug!(root = %root.display(), "file store opened");

        Ok(Self {
            root,
            records_dir,
            duplicates_dir,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, code: &ShortCode) -> PathBuf {
        let digest = md5::compute(code.as_str().as_bytes());
        self.records_dir.join(format!("{digest:x}.json"))
    }

    fn duplicate_path(&self, url_hash: &UrlHash) -> PathBuf {
        self.duplicates_dir.join(format!("{url_hash}.json"))
    }

    fn stripe(&self, url_hash: &UrlHash) -> &Mutex<()> {
        // UrlHash is lowercase hex, so its leading bytes are already uniform.
        let idx = url_hash
            .as_str()
            .bytes()
            .take(4)
            .fold(0_usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        &self.stripes[idx % self.stripes.len()]
    }

    fn tmp_path(&self, dir: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        dir.join(format!("{TMP_PREFIX}{}-{n}", std::process::id()))
    }

    /// Writes `bytes` to a fresh temp file inside `dir` and fsyncs it.
    async fn write_tmp(&self, dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
        let tmp = self.tmp_path(dir);
        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp).await;
            return Err(map_io_error(e));
        }
        Ok(tmp)
    }

    async fn write_atomic(&self, dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = self.write_tmp(dir, bytes).await?;
        if let Err(e) = fs::rename(&tmp, target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(map_io_error(e));
        }
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(map_json_error),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io_error(e)),
        }
    }

    async fn remove_if_exists(path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io_error(e)),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(map_json_error)
}

fn is_data_file(name: &str) -> bool {
    !name.starts_with(TMP_PREFIX) && name.ends_with(".json")
}

#[async_trait]
impl RecordStore for FileStore {
    async fn put_record(&self, record: &ShortCodeRecord) -> Result<()> {
        let bytes = to_json(record)?;
        self.write_atomic(&self.records_dir, &self.record_path(&record.code), &bytes)
            .await
    }

    async fn insert_record(&self, record: &ShortCodeRecord) -> Result<()> {
        let bytes = to_json(record)?;
        let tmp = self.write_tmp(&self.records_dir, &bytes).await?;
        let target = self.record_path(&record.code);

        // link(2) fails if the target exists, which makes the insert exclusive.
        let linked = fs::hard_link(&tmp, &target).await;
        let _ = fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StorageError::Conflict(record.code.to_string()))
            }
            Err(e) => Err(map_io_error(e)),
        }
    }

    async fn get_record(&self, code: &ShortCode) -> Result<Option<ShortCodeRecord>> {
        let record: Option<ShortCodeRecord> = Self::read_json(&self.record_path(code)).await?;
        match record {
            Some(record) if record.code != *code => Err(StorageError::InvalidData(format!(
                "record file for {code} holds {}",
                record.code
            ))),
            other => Ok(other),
        }
    }

    async fn exists_code(&self, code: &ShortCode) -> Result<bool> {
        fs::try_exists(self.record_path(code))
            .await
            .map_err(map_io_error)
    }
}

#[async_trait]
impl DuplicateIndex for FileStore {
    async fn put_duplicate(&self, entry: &DuplicateIndexEntry) -> Result<()> {
        let bytes = to_json(entry)?;
        let _guard = self.stripe(&entry.url_hash).lock().await;
        self.write_atomic(
            &self.duplicates_dir,
            &self.duplicate_path(&entry.url_hash),
            &bytes,
        )
        .await
    }

    async fn get_duplicate(&self, url_hash: &UrlHash) -> Result<Option<DuplicateIndexEntry>> {
        // Renames are atomic, so readers never see a partial document.
        Self::read_json(&self.duplicate_path(url_hash)).await
    }

    async fn delete_duplicate(&self, url_hash: &UrlHash) -> Result<bool> {
        let _guard = self.stripe(url_hash).lock().await;
        Self::remove_if_exists(&self.duplicate_path(url_hash)).await
    }

    async fn evict_duplicate(&self, snapshot: &DuplicateIndexEntry) -> Result<bool> {
        let _guard = self.stripe(&snapshot.url_hash).lock().await;
        let path = self.duplicate_path(&snapshot.url_hash);

        let current: Option<DuplicateIndexEntry> = Self::read_json(&path).await?;
        if current.as_ref() != Some(snapshot) {
            trace!(url_hash = %snapshot.url_hash, "duplicate entry changed since snapshot, kept");
            return Ok(false);
        }
        Self::remove_if_exists(&path).await
    }

    async fn list_duplicates(&self) -> Result<Vec<DuplicateIndexEntry>> {
        let mut dir = fs::read_dir(&self.duplicates_dir)
            .await
            .map_err(map_io_error)?;
        let mut entries = Vec::new();

        while let Some(item) = dir.next_entry().await.map_err(map_io_error)? {
            let name = item.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_data_file(name) {
                continue;
            }

            // A file may vanish between listing and reading.
            let bytes = match fs::read(item.path()).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(map_io_error(e)),
            };

            match serde_json::from_slice::<DuplicateIndexEntry>(&bytes) {
                Ok(entry) => entries.push(entry),
                // One bad file must not stall housekeeping.
                Err(e) => warn!(file = %name, error = %e, "skipping unreadable duplicate entry"),
            }
        }

        Ok(entries)
    }
}

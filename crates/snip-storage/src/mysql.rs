use crate::error::{Result, StorageError};
use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::{DuplicateIndex, DuplicateIndexEntry, RecordStore, ShortCode, ShortCodeRecord, UrlHash};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;

const SCHEMA: [&str; 2] = [
    include_str!("../ddl/mysql/short_code_records.sql"),
    include_str!("../ddl/mysql/duplicate_index.sql"),
];

/// MySQL implementation of the store traits.
///
/// Records live in `short_code_records` keyed by code, duplicate entries in
/// `duplicate_index` keyed by URL hash. Timestamps are unix seconds. Both
/// key columns use a binary collation so codes stay case-sensitive.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Creates the tables if they don't exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        for ddl in SCHEMA {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        debug!("mysql schema ensured");
        Ok(())
    }
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn parse_code(raw: String) -> Result<ShortCode> {
    ShortCode::parse(&raw).map_err(|e| StorageError::InvalidData(e.to_string()))
}

fn record_from_row(row: &MySqlRow) -> Result<ShortCodeRecord> {
    let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(ShortCodeRecord {
        code: parse_code(code)?,
        original_url,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}

fn duplicate_from_row(row: &MySqlRow) -> Result<DuplicateIndexEntry> {
    let url_hash: String = row.try_get("url_hash").map_err(map_sqlx_error)?;
    let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let last_seen: i64 = row.try_get("last_seen").map_err(map_sqlx_error)?;

    Ok(DuplicateIndexEntry {
        url_hash: UrlHash::parse(url_hash).map_err(|e| StorageError::InvalidData(e.to_string()))?,
        code: parse_code(code)?,
        last_seen: parse_timestamp("last_seen", last_seen)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl RecordStore for MySqlStore {
    async fn put_record(&self, record: &ShortCodeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO short_code_records (short_code, original_url, created_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE
                original_url = VALUES(original_url),
                created_at = VALUES(created_at)
            "#,
        )
        .bind(record.code.as_str())
        .bind(&record.original_url)
        .bind(record.created_at.as_second())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn insert_record(&self, record: &ShortCodeRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_code_records (short_code, original_url, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(record.code.as_str())
        .bind(&record.original_url)
        .bind(record.created_at.as_second())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn get_record(&self, code: &ShortCode) -> Result<Option<ShortCodeRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, original_url, created_at
            FROM short_code_records
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn exists_code(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM short_code_records
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }
}

#[async_trait]
impl DuplicateIndex for MySqlStore {
    async fn put_duplicate(&self, entry: &DuplicateIndexEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO duplicate_index (url_hash, short_code, last_seen)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE
                short_code = VALUES(short_code),
                last_seen = VALUES(last_seen)
            "#,
        )
        .bind(entry.url_hash.as_str())
        .bind(entry.code.as_str())
        .bind(entry.last_seen.as_second())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_duplicate(&self, url_hash: &UrlHash) -> Result<Option<DuplicateIndexEntry>> {
        let row = sqlx::query(
            r#"
            SELECT url_hash, short_code, last_seen
            FROM duplicate_index
            WHERE url_hash = ?
            LIMIT 1
            "#,
        )
        .bind(url_hash.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(duplicate_from_row).transpose()
    }

    async fn delete_duplicate(&self, url_hash: &UrlHash) -> Result<bool> {
        let result = sqlx::query("DELETE FROM duplicate_index WHERE url_hash = ?")
            .bind(url_hash.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn evict_duplicate(&self, snapshot: &DuplicateIndexEntry) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM duplicate_index
            WHERE url_hash = ?
              AND short_code = ?
              AND last_seen = ?
            "#,
        )
        .bind(snapshot.url_hash.as_str())
        .bind(snapshot.code.as_str())
        .bind(snapshot.last_seen.as_second())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_duplicates(&self) -> Result<Vec<DuplicateIndexEntry>> {
        let rows = sqlx::query("SELECT url_hash, short_code, last_seen FROM duplicate_index")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(duplicate_from_row).collect()
    }
}

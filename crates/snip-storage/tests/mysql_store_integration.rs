use jiff::Timestamp;
use snip_core::{DuplicateIndexEntry, ShortCode, ShortCodeRecord, UrlHash};
use snip_storage::{DuplicateIndex, MySqlStore, RecordStore, StorageError};
use snip_test_infra::mysql::{MySqlServer, MysqlConfig};

struct Fixture {
    _mysql: MySqlServer,
    store: MySqlStore,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::new(MysqlConfig::builder().build())
            .await
            .expect("start mysql");
        let pool = mysql.pool().await.expect("connect mysql");

        let store = MySqlStore::new(pool);
        store.ensure_schema().await.expect("create schema");

        Self {
            _mysql: mysql,
            store,
        }
    }
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn ts(second: i64) -> Timestamp {
    Timestamp::from_second(second).unwrap()
}

fn record(code_str: &str, url: &str) -> ShortCodeRecord {
    ShortCodeRecord {
        code: code(code_str),
        original_url: url.to_string(),
        created_at: ts(1_700_000_000),
    }
}

fn duplicate(url: &str, code_str: &str, last_seen: i64) -> DuplicateIndexEntry {
    DuplicateIndexEntry {
        url_hash: UrlHash::of(url),
        code: code(code_str),
        last_seen: ts(last_seen),
    }
}

#[tokio::test]
async fn insert_and_get_record() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .insert_record(&record("abc123", "https://example.com"))
        .await
        .unwrap();

    let got = fixture.store.get_record(&code("abc123")).await.unwrap().unwrap();
    assert_eq!(got.original_url, "https://example.com");
    assert_eq!(got.created_at, ts(1_700_000_000));
    assert!(fixture.store.exists_code(&code("abc123")).await.unwrap());
}

#[tokio::test]
async fn insert_conflicts_when_code_already_exists() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .insert_record(&record("abc123", "https://one.example"))
        .await
        .unwrap();

    let err = fixture
        .store
        .insert_record(&record("abc123", "https://two.example"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn codes_are_case_sensitive() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .insert_record(&record("abcDEF", "https://upper.example"))
        .await
        .unwrap();
    fixture
        .store
        .insert_record(&record("abcdef", "https://lower.example"))
        .await
        .unwrap();

    let lower = fixture.store.get_record(&code("abcdef")).await.unwrap().unwrap();
    assert_eq!(lower.original_url, "https://lower.example");
}

#[tokio::test]
async fn put_record_overwrites() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .put_record(&record("abc123", "https://old.example"))
        .await
        .unwrap();
    fixture
        .store
        .put_record(&record("abc123", "https://new.example"))
        .await
        .unwrap();

    let got = fixture.store.get_record(&code("abc123")).await.unwrap().unwrap();
    assert_eq!(got.original_url, "https://new.example");
}

#[tokio::test]
async fn duplicate_index_lifecycle() {
    let fixture = Fixture::start().await;
    let first = duplicate("http://example.com", "abc123", 100);

    fixture.store.put_duplicate(&first).await.unwrap();
    assert_eq!(
        fixture.store.get_duplicate(&first.url_hash).await.unwrap(),
        Some(first.clone())
    );

    let refreshed = duplicate("http://example.com", "abc123", 130);
    fixture.store.put_duplicate(&refreshed).await.unwrap();

    // The stale snapshot no longer matches the stored row.
    assert!(!fixture.store.evict_duplicate(&first).await.unwrap());
    assert_eq!(fixture.store.list_duplicates().await.unwrap(), vec![refreshed.clone()]);

    assert!(fixture.store.evict_duplicate(&refreshed).await.unwrap());
    assert!(fixture.store.get_duplicate(&first.url_hash).await.unwrap().is_none());
    assert!(!fixture.store.delete_duplicate(&first.url_hash).await.unwrap());
}

#[tokio::test]
async fn ensure_schema_is_idempotent() {
    let fixture = Fixture::start().await;

    fixture.store.ensure_schema().await.unwrap();
    fixture.store.ensure_schema().await.unwrap();
}

#[tokio::test]
async fn stores_urls_longer_than_a_varchar_column() {
    let fixture = Fixture::start().await;
    let long_url = format!("https://example.com/{}", "a".repeat(5_000));

    fixture
        .store
        .insert_record(&record("long01", &long_url))
        .await
        .unwrap();

    let got = fixture.store.get_record(&code("long01")).await.unwrap().unwrap();
    assert_eq!(got.original_url, long_url);
}

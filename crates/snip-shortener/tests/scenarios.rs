use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use snip_core::{
    DuplicateIndex, DuplicateIndexEntry, ManualClock, ProbeFailure, RecordStore, ShortCode,
    ShortCodeRecord, StorageError, UrlHash,
};
use snip_generator::Generator;
use snip_shortener::{Shortener, ShortenerConfig, ShortenerService};
use snip_storage::InMemoryStore;
use snip_validator::{Mode, ReachabilityProbe, UrlValidator};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

struct AlwaysReachable;

#[async_trait]
impl ReachabilityProbe for AlwaysReachable {
    async fn probe(&self, _url: &Url) -> Result<(), ProbeFailure> {
        Ok(())
    }
}

/// Hands out a fixed list of codes, then repeats the last one.
struct SequenceGenerator {
    codes: Mutex<VecDeque<&'static str>>,
    last: Mutex<&'static str>,
}

impl SequenceGenerator {
    fn new(codes: &[&'static str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().copied().collect()),
            last: Mutex::new("zzzzzz"),
        }
    }
}

impl Generator for SequenceGenerator {
    fn generate(&self) -> ShortCode {
        let mut last = self.last.lock();
        if let Some(next) = self.codes.lock().pop_front() {
            *last = next;
        }
        ShortCode::new_unchecked(*last)
    }
}

/// Wraps the in-memory store to simulate a racing writer and slow disks.
#[derive(Default)]
struct Instrumented {
    inner: InMemoryStore,
    /// Report every code as free, as if another writer raced us.
    blind_exists: bool,
    insert_delay: Option<Duration>,
}

#[async_trait]
impl RecordStore for Instrumented {
    async fn put_record(&self, record: &ShortCodeRecord) -> Result<(), StorageError> {
        self.inner.put_record(record).await
    }

    async fn insert_record(&self, record: &ShortCodeRecord) -> Result<(), StorageError> {
        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.insert_record(record).await
    }

    async fn get_record(&self, code: &ShortCode) -> Result<Option<ShortCodeRecord>, StorageError> {
        self.inner.get_record(code).await
    }

    async fn exists_code(&self, code: &ShortCode) -> Result<bool, StorageError> {
        if self.blind_exists {
            return Ok(false);
        }
        self.inner.exists_code(code).await
    }
}

#[async_trait]
impl DuplicateIndex for Instrumented {
    async fn put_duplicate(&self, entry: &DuplicateIndexEntry) -> Result<(), StorageError> {
        self.inner.put_duplicate(entry).await
    }

    async fn get_duplicate(
        &self,
        url_hash: &UrlHash,
    ) -> Result<Option<DuplicateIndexEntry>, StorageError> {
        self.inner.get_duplicate(url_hash).await
    }

    async fn delete_duplicate(&self, url_hash: &UrlHash) -> Result<bool, StorageError> {
        self.inner.delete_duplicate(url_hash).await
    }

    async fn evict_duplicate(&self, snapshot: &DuplicateIndexEntry) -> Result<bool, StorageError> {
        self.inner.evict_duplicate(snapshot).await
    }

    async fn list_duplicates(&self) -> Result<Vec<DuplicateIndexEntry>, StorageError> {
        self.inner.list_duplicates().await
    }
}

fn scenario_config() -> ShortenerConfig {
    ShortenerConfig::builder()
        .base_url("http://short.url/")
        .max_url_length(2000)
        .supported_protocols(vec!["http://".to_string(), "https://".to_string()])
        .dedup_ttl_seconds(30)
        .build()
}

fn start() -> Timestamp {
    Timestamp::from_second(1_700_000_000).unwrap()
}

fn service<S: snip_core::MappingStore, G: Generator>(
    store: Arc<S>,
    generator: G,
    clock: ManualClock,
) -> ShortenerService<S, G, AlwaysReachable, ManualClock> {
    ShortenerService::new(
        store,
        generator,
        UrlValidator::new(AlwaysReachable),
        clock,
        scenario_config(),
    )
}

fn random_service() -> (
    ShortenerService<InMemoryStore, snip_generator::RandomGenerator, AlwaysReachable, ManualClock>,
    ManualClock,
) {
    let clock = ManualClock::new(start());
    let service = service(
        Arc::new(InMemoryStore::new()),
        snip_generator::RandomGenerator::new(),
        clock.clone(),
    );
    (service, clock)
}

fn is_code_shaped(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[tokio::test]
async fn reference_scenarios() {
    let (service, clock) = random_service();

    // 1. A fresh URL gets a six character code under the base.
    let first = service.encode("http://example.com").await.unwrap();
    let code = first.short_url.strip_prefix("http://short.url/").unwrap();
    assert!(is_code_shaped(code), "unexpected code {code}");

    // 2. Encoding again within the window returns the same short URL.
    clock.advance(SignedDuration::from_secs(10));
    let second = service.encode("http://example.com").await.unwrap();
    assert_eq!(second.short_url, first.short_url);

    // 3. Decoding resolves to the original.
    let decoded = service.decode(&first.short_url).await.unwrap();
    assert_eq!(decoded.original_url.as_deref(), Some("http://example.com"));

    // 4. Unknown short URLs resolve to nothing.
    let missing = service.decode("http://short.url/nonexistent").await.unwrap();
    assert_eq!(missing.original_url, None);

    // 5. and 6. Validator messages.
    let validator = UrlValidator::new(AlwaysReachable);
    let config = scenario_config();
    let malformed = validator
        .validate("not a valid url", Mode::Encode, &config)
        .await
        .unwrap_err();
    assert_eq!(malformed.to_string(), "Invalid URL format");

    let protocol = validator
        .validate("ftp://example.com", Mode::Encode, &config)
        .await
        .unwrap_err();
    assert!(protocol.to_string().contains("Invalid URL protocol"));
}

#[tokio::test]
async fn round_trip_holds_for_many_urls() {
    let (service, _) = random_service();
    let mut short_urls = HashSet::new();

    for i in 0..200 {
        let url = format!("https://example.com/page/{i}?ref=test");
        let encoded = service.encode(&url).await.unwrap();
        assert!(short_urls.insert(encoded.short_url.clone()));

        let decoded = service.decode(&encoded.short_url).await.unwrap();
        assert_eq!(decoded.original_url.as_deref(), Some(url.as_str()));
    }
}

#[tokio::test]
async fn conflicting_insert_draws_a_new_code() {
    let inner = InMemoryStore::new();
    inner
        .insert_record(&ShortCodeRecord {
            code: ShortCode::new_unchecked("taken1"),
            original_url: "https://first.example".to_string(),
            created_at: start(),
        })
        .await
        .unwrap();
    let store = Arc::new(Instrumented {
        inner,
        blind_exists: true,
        ..Instrumented::default()
    });
    let service = service(
        Arc::clone(&store),
        SequenceGenerator::new(&["taken1", "fresh1"]),
        ManualClock::new(start()),
    );

    let encoded = service.encode("https://second.example").await.unwrap();

    assert_eq!(encoded.short_url, "http://short.url/fresh1");
    let kept = store
        .get_record(&ShortCode::new_unchecked("taken1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.original_url, "https://first.example");
}

#[tokio::test]
async fn existence_check_skips_taken_codes() {
    let store = Arc::new(InMemoryStore::new());
    let service = service(
        Arc::clone(&store),
        SequenceGenerator::new(&["aaaaaa", "aaaaaa", "bbbbbb"]),
        ManualClock::new(start()),
    );

    let first = service.encode("https://one.example").await.unwrap();
    let second = service.encode("https://two.example").await.unwrap();

    assert_eq!(first.short_url, "http://short.url/aaaaaa");
    assert_eq!(second.short_url, "http://short.url/bbbbbb");
}

/// Two encodes of the same new URL may both miss the duplicate index and
/// allocate different codes. The last duplicate write wins and both codes
/// keep resolving.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_encodes_of_a_new_url_may_allocate_twice() {
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(service(
        Arc::clone(&store),
        snip_generator::RandomGenerator::new(),
        ManualClock::new(start()),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.encode("https://race.example").await.unwrap()
        }));
    }

    let mut short_urls = HashSet::new();
    for handle in handles {
        short_urls.insert(handle.await.unwrap().short_url);
    }

    assert!(!short_urls.is_empty());
    assert_eq!(store.record_count(), short_urls.len());
    for short_url in &short_urls {
        let decoded = service.decode(short_url).await.unwrap();
        assert_eq!(decoded.original_url.as_deref(), Some("https://race.example"));
    }

    // Exactly one duplicate entry survives, pointing at one of the codes.
    let entry = store
        .get_duplicate(&UrlHash::of("https://race.example"))
        .await
        .unwrap()
        .unwrap();
    assert!(short_urls.contains(&format!("http://short.url/{}", entry.code)));
    assert_eq!(store.list_duplicates().await.unwrap().len(), 1);
}

#[tokio::test]
async fn dropped_encode_still_persists() {
    let store = Arc::new(Instrumented {
        insert_delay: Some(Duration::from_millis(50)),
        ..Instrumented::default()
    });
    let service = service(
        Arc::clone(&store),
        SequenceGenerator::new(&["abc123"]),
        ManualClock::new(start()),
    );

    let result =
        tokio::time::timeout(Duration::from_millis(5), service.encode("https://slow.example")).await;
    assert!(result.is_err(), "encode should still be in flight");

    tokio::time::sleep(Duration::from_millis(200)).await;

    let record = store
        .get_record(&ShortCode::new_unchecked("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.original_url, "https://slow.example");
    assert!(store
        .get_duplicate(&UrlHash::of("https://slow.example"))
        .await
        .unwrap()
        .is_some());
}

use crate::error::{Result, ShortenerError};
use crate::housekeeper::ExpiryHousekeeper;
use crate::shortener::{DecodeOutcome, EncodeOutcome, Shortener};
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use snip_core::{
    Clock, DuplicateIndexEntry, Housekeeping, MappingStore, ShortCode, ShortCodeRecord,
    ShortenerConfig, StorageError, SystemClock, UrlHash,
};
use snip_generator::{generate_unique, Generator};
use snip_validator::{HttpProbe, Mode, ReachabilityProbe, UrlValidator};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A concrete implementation of the `Shortener` trait.
///
/// Encoding validates the URL, then either reuses the code recorded in the
/// duplicate index or allocates a fresh one. The store writes of an encode
/// run in a spawned task, so they finish even if the caller goes away.
pub struct ShortenerService<S, G, P = HttpProbe, C = SystemClock> {
    store: Arc<S>,
    generator: Arc<G>,
    validator: Arc<UrlValidator<P>>,
    housekeeper: ExpiryHousekeeper<S>,
    clock: Arc<C>,
    config: Arc<ShortenerConfig>,
}

impl<S, G, P, C> Clone for ShortenerService<S, G, P, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            validator: Arc::clone(&self.validator),
            housekeeper: self.housekeeper.clone(),
            clock: Arc::clone(&self.clock),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, G, P, C> ShortenerService<S, G, P, C>
where
    S: MappingStore,
    G: Generator,
    P: ReachabilityProbe,
    C: Clock,
{
    pub fn new(
        store: Arc<S>,
        generator: G,
        validator: UrlValidator<P>,
        clock: C,
        config: ShortenerConfig,
    ) -> Self {
        Self {
            housekeeper: ExpiryHousekeeper::new(Arc::clone(&store)),
            store,
            generator: Arc::new(generator),
            validator: Arc::new(validator),
            clock: Arc::new(clock),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ShortenerConfig {
        &self.config
    }

    /// A housekeeper over the same store, for running a background sweeper.
    pub fn housekeeper(&self) -> ExpiryHousekeeper<S> {
        self.housekeeper.clone()
    }

    /// The clock this service reads time from.
    pub fn clock(&self) -> Arc<C> {
        Arc::clone(&self.clock)
    }

    /// Encodes `original_url` as of `now`.
    pub async fn encode_at(&self, original_url: &str, now: Timestamp) -> Result<EncodeOutcome> {
        let started = Instant::now();

        self.validator
            .validate(original_url, Mode::Encode, &self.config)
            .await?;

        let allocation = Allocation {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            housekeeper: self.housekeeper.clone(),
            config: Arc::clone(&self.config),
            original_url: original_url.to_string(),
            now,
        };
        let code = tokio::spawn(allocation.run())
            .await
            .map_err(|e| ShortenerError::Internal(format!("encode task failed: {e}")))??;

        let short_url = code.to_url(&self.config.base_url);

        if self.config.logging_enabled {
            info!(
                event = "encoded",
                original_url = %original_url,
                short_code = %code,
                timestamp = %now,
                "url encoded"
            );
        }
        self.report_slow_call("encode", started.elapsed());

        Ok(EncodeOutcome {
            original_url: original_url.to_string(),
            short_url,
        })
    }

    async fn resolve(&self, short_url: &str) -> Result<DecodeOutcome> {
        let started = Instant::now();

        self.validator
            .validate(short_url, Mode::Decode, &self.config)
            .await?;

        let original_url = match extract_code(short_url, &self.config.base_url) {
            Some(code) => self
                .store
                .get_record(&code)
                .await?
                .map(|record| record.original_url),
            None => {
                debug!(short_url = %short_url, "no well-formed code in short url");
                None
            }
        };

        if let Some(original_url) = &original_url {
            if self.config.logging_enabled {
                debug!(
                    event = "decoded",
                    short_url = %short_url,
                    original_url = %original_url,
                    "url decoded"
                );
            }
        }
        self.report_slow_call("decode", started.elapsed());

        Ok(DecodeOutcome {
            short_url: short_url.to_string(),
            original_url,
        })
    }

    fn report_slow_call(&self, operation: &'static str, elapsed: Duration) {
        let Some(threshold) = self.config.slow_call_threshold() else {
            return;
        };
        if elapsed > threshold {
            warn!(
                operation,
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = threshold.as_millis() as u64,
                "slow shortener call"
            );
        }
    }
}

#[async_trait]
impl<S, G, P, C> Shortener for ShortenerService<S, G, P, C>
where
    S: MappingStore,
    G: Generator,
    P: ReachabilityProbe,
    C: Clock,
{
    async fn encode(&self, original_url: &str) -> Result<EncodeOutcome> {
        self.encode_at(original_url, self.clock.now()).await
    }

    async fn decode(&self, short_url: &str) -> Result<DecodeOutcome> {
        self.resolve(short_url).await
    }
}

/// The store-touching half of an encode. Owns everything it needs so it can
/// run on its own task.
struct Allocation<S, G> {
    store: Arc<S>,
    generator: Arc<G>,
    housekeeper: ExpiryHousekeeper<S>,
    config: Arc<ShortenerConfig>,
    original_url: String,
    now: Timestamp,
}

impl<S: MappingStore, G: Generator> Allocation<S, G> {
    async fn run(self) -> Result<ShortCode> {
        let Some(ttl) = self.config.dedup_window() else {
            return self.allocate().await;
        };

        let url_hash = UrlHash::of(&self.original_url);

        if let Some(entry) = self.store.get_duplicate(&url_hash).await? {
            if entry.is_live(self.now, ttl) {
                let refreshed = DuplicateIndexEntry {
                    last_seen: self.now,
                    ..entry
                };
                self.store.put_duplicate(&refreshed).await?;
                self.sweep(ttl).await;
                debug!(code = %refreshed.code, "reusing code from duplicate index");
                return Ok(refreshed.code);
            }
        }

        self.sweep(ttl).await;
        let code = self.allocate().await?;

        self.store
            .put_duplicate(&DuplicateIndexEntry {
                url_hash,
                code: code.clone(),
                last_seen: self.now,
            })
            .await?;

        Ok(code)
    }

    /// Generates a free code and registers the record under it, drawing
    /// again whenever another writer claims the code first.
    async fn allocate(&self) -> Result<ShortCode> {
        loop {
            let code = generate_unique(&*self.generator, |code| {
                let store = Arc::clone(&self.store);
                async move { store.exists_code(&code).await }
            })
            .await?;

            let record = ShortCodeRecord {
                code: code.clone(),
                original_url: self.original_url.clone(),
                created_at: self.now,
            };

            match self.store.insert_record(&record).await {
                Ok(()) => return Ok(code),
                Err(StorageError::Conflict(_)) => {
                    debug!(code = %code, "short code claimed concurrently, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Inline housekeeping. Failures are logged, never surfaced to the caller.
    async fn sweep(&self, ttl: SignedDuration) {
        if self.config.housekeeping != Housekeeping::Inline {
            return;
        }
        if let Err(e) = self.housekeeper.sweep(self.now, ttl).await {
            warn!(error = %e, "inline sweep failed");
        }
    }
}

/// Pulls the short code out of `short_url`: the base URL prefix is removed
/// (ignoring case) along with surrounding slashes.
fn extract_code(short_url: &str, base_url: &str) -> Option<ShortCode> {
    let short_url = short_url.trim();
    let remainder = match short_url.get(..base_url.len()) {
        Some(head) if head.eq_ignore_ascii_case(base_url) => &short_url[base_url.len()..],
        _ => short_url,
    };
    ShortCode::parse(remainder.trim_matches('/')).ok()
}

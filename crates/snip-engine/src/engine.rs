use crate::collision::CollisionResolver;
use crate::config::{ClickPersistence, EngineConfig};
use crate::error::{EngineError, Result};
use crate::stats::{EngineStats, TopKStats};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use snip_core::{CollisionStrategy, ExternalStore, ShortCode, StoreError, UrlRecord};
use snip_index::{HashIndex, LruCache, PrefixMatch, TopKHeap, Trie};
use std::future::Future;
use std::sync::Arc;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Result of a [`ShortenerEngine::shorten`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortenOutcome {
    pub short_code: ShortCode,
    pub short_url: String,
    pub original_url: String,
    pub collision_detected: bool,
    /// Index lookups spent on collision resolution; 0 when an existing
    /// mapping was returned.
    pub attempts: u32,
    pub strategy_used: Option<CollisionStrategy>,
    /// Whether the mapping was already held in memory.
    pub cached: bool,
}

/// Codes and URLs of new records whose persistence is still in flight.
///
/// Entries are added under the index write lock.
#[derive(Debug, Default)]
struct Pending {
    codes: HashSet<String>,
    /// Dropping the sender wakes tasks waiting on the same URL.
    urls: HashMap<String, watch::Sender<()>>,
}

enum Reserve<'a, S: ?Sized> {
    Existing(ShortenOutcome),
    InFlight(watch::Receiver<()>),
    Reserved(Reservation<'a, S>, u32),
}

/// A reserved code and URL. Dropping it releases both, whether or not the
/// record was committed.
struct Reservation<'a, S: ?Sized> {
    engine: &'a ShortenerEngine<S>,
    record: UrlRecord,
}

impl<S: ?Sized> Drop for Reservation<'_, S> {
    fn drop(&mut self) {
        let mut pending = self.engine.pending.lock();
        pending.codes.remove(self.record.short_code.as_str());
        pending.urls.remove(&self.record.original_url);
    }
}

/// In-process URL shortening engine.
///
/// Every structure sits behind its own lock and no lock is held across a
/// store call. The hash index write lock covers the whole
/// check-resolve-reserve sequence of a new code, and locks are always taken
/// in the order index, pending, trie.
pub struct ShortenerEngine<S: ?Sized> {
    store: Arc<S>,
    config: EngineConfig,
    index: RwLock<HashIndex>,
    pending: Mutex<Pending>,
    lru: Mutex<LruCache<String, ShortCode>>,
    trie: RwLock<Trie>,
    top: Mutex<TopKHeap>,
    resolver: CollisionResolver,
}

impl<S: ExternalStore> ShortenerEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        Self::with_shared_store(Arc::new(store), config)
    }
}

impl<S: ExternalStore + ?Sized> ShortenerEngine<S> {
    /// Creates an engine over a store that may be shared with other owners.
    pub fn with_shared_store(store: Arc<S>, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            index: RwLock::new(HashIndex::with_capacity(config.hash_capacity)),
            pending: Mutex::new(Pending::default()),
            lru: Mutex::new(LruCache::new(config.lru_capacity)),
            trie: RwLock::new(Trie::new()),
            top: Mutex::new(TopKHeap::new(config.top_k)),
            resolver: CollisionResolver::new(config.max_attempts),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Loads every persisted record into memory and returns how many were
    /// loaded. Records already indexed are left untouched.
    pub async fn warm_up(&self) -> Result<usize> {
        let records = with_timeout(
            self.config.store_timeout,
            "list_records",
            self.store.list_records(),
        )
        .await?;

        let mut loaded = 0;
        for record in records {
            if self.hydrate(record) {
                loaded += 1;
            }
        }

        info!(loaded, "engine warmed up from store");
        Ok(loaded)
    }

    /// Returns a short code for `original_url`, reusing an existing mapping
    /// when the URL was shortened before.
    ///
    /// A new code is reserved while its record is persisted and only becomes
    /// visible once the store accepted it. Concurrent calls for the same URL
    /// wait for that outcome instead of minting a second code.
    pub async fn shorten(
        &self,
        original_url: &str,
        strategy: Option<CollisionStrategy>,
    ) -> Result<ShortenOutcome> {
        validate_url(original_url)?;
        let strategy = strategy.unwrap_or(self.config.default_strategy);

        loop {
            if let Some(outcome) = self.cached_mapping(original_url) {
                debug!(url = %original_url, code = %outcome.short_code, "shorten served from memory");
                return Ok(outcome);
            }

            let existing = self
                .call("find_by_original_url", self.store.find_by_original_url(original_url))
                .await?;
            if let Some(record) = existing {
                debug!(url = %original_url, code = %record.short_code, "shorten served from store");
                let outcome = self.outcome_for(&record, false);
                self.hydrate(record);
                self.lru.lock().put(original_url.to_string(), outcome.short_code.clone());
                return Ok(outcome);
            }

            let id = self
                .call("allocate_identifier", self.store.allocate_identifier(original_url))
                .await?;
            let candidate = ShortCode::from_id(id)?;
            trace!(id, candidate = %candidate, "allocated identifier");

            let reserved = self.reserve(id, original_url, &candidate, strategy)?;
            let (reservation, attempts) = match reserved {
                Reserve::Existing(outcome) => {
                    self.lru.lock().put(original_url.to_string(), outcome.short_code.clone());
                    return Ok(outcome);
                }
                Reserve::InFlight(mut pending) => {
                    debug!(url = %original_url, "waiting for in-flight shorten of the same url");
                    // Resolves once the reservation holding the URL is dropped.
                    let _ = pending.changed().await;
                    continue;
                }
                Reserve::Reserved(reservation, attempts) => (reservation, attempts),
            };

            let record = reservation.record.clone();
            if let Err(err) = self
                .call("persist_record", self.store.persist_record(&record))
                .await
            {
                warn!(code = %record.short_code, error = %err, "persisting record failed, releasing reservation");
                return Err(err);
            }

            self.commit(reservation);
            self.lru
                .lock()
                .put(original_url.to_string(), record.short_code.clone());

            info!(
                code = %record.short_code,
                url = %original_url,
                collision = record.collision_detected,
                attempts,
                "created short url"
            );

            let mut outcome = self.outcome_for(&record, false);
            outcome.attempts = attempts;
            return Ok(outcome);
        }
    }

    /// Resolves `short_code` to its original URL and records the click.
    pub async fn resolve(&self, short_code: &str) -> Result<String> {
        let code = ShortCode::new(short_code)
            .map_err(|_| EngineError::NotFound(short_code.to_string()))?;

        let indexed = self.index.read().contains(code.as_str());
        if !indexed {
            trace!(code = %code, "index miss, querying store");
            match self.call("fetch_record", self.store.fetch_record(&code)).await? {
                Some(record) => {
                    self.hydrate(record);
                }
                None => {
                    debug!(code = %code, "short code not found");
                    return Err(EngineError::NotFound(code.to_string()));
                }
            }
        }

        match self.config.click_persistence {
            ClickPersistence::Synchronous => {
                self.call("persist_click_increment", self.store.persist_click_increment(&code))
                    .await?;
            }
            ClickPersistence::Background => self.spawn_click_increment(code.clone()),
            ClickPersistence::Disabled => {}
        }

        let (url, clicks) = {
            let mut index = self.index.write();
            let clicks = index
                .increment_clicks(code.as_str())
                .ok_or_else(|| EngineError::NotFound(code.to_string()))?;
            let url = index
                .get(code.as_str())
                .map(|record| record.original_url.clone())
                .ok_or_else(|| EngineError::NotFound(code.to_string()))?;
            (url, clicks)
        };

        self.trie.write().insert(&url);
        self.top.lock().observe(&code, clicks);

        debug!(code = %code, url = %url, clicks, "resolved short code");
        Ok(url)
    }

    /// Records with the most clicks, highest first.
    pub fn top_urls(&self) -> Vec<UrlRecord> {
        let ranked = self.top.lock().top_k();
        let index = self.index.read();
        ranked
            .iter()
            .filter_map(|entry| index.get(entry.short_code.as_str()).cloned())
            .collect()
    }

    pub fn search_prefix(&self, prefix: &str, max_results: usize) -> Vec<PrefixMatch> {
        self.trie.read().search_prefix(prefix, max_results)
    }

    /// Snapshot of the indexed record for `short_code`.
    pub fn record(&self, short_code: &str) -> Option<UrlRecord> {
        self.index.read().get(short_code).cloned()
    }

    pub fn stats(&self) -> EngineStats {
        let hash_index = self.index.read().stats();
        let lru_cache = self.lru.lock().stats();
        let trie = self.trie.read().stats();
        let top_k = {
            let top = self.top.lock();
            TopKStats {
                tracked: top.len(),
                capacity: top.capacity(),
                min_clicks: top.min_clicks(),
            }
        };

        EngineStats {
            hash_index,
            lru_cache,
            trie,
            collision_detector: self.resolver.stats(),
            top_k,
        }
    }

    fn cached_mapping(&self, original_url: &str) -> Option<ShortenOutcome> {
        let cached_code = self.lru.lock().get(&original_url.to_string()).cloned();
        if let Some(code) = cached_code {
            if let Some(record) = self.index.read().get(code.as_str()) {
                return Some(self.outcome_for(record, true));
            }
        }

        let outcome = self
            .index
            .read()
            .find_by_url(original_url)
            .map(|record| self.outcome_for(record, true))?;
        self.lru
            .lock()
            .put(original_url.to_string(), outcome.short_code.clone());
        Some(outcome)
    }

    /// Makes a persisted record visible to every structure. Returns false if
    /// the code was already indexed.
    fn hydrate(&self, record: UrlRecord) -> bool {
        let code = record.short_code.clone();
        let url = record.original_url.clone();
        let clicks = record.click_count;

        {
            let mut index = self.index.write();
            if index.contains(code.as_str()) {
                return false;
            }
            index.put(code.clone(), record);
            self.trie.write().ensure_frequency(&url, clicks);
        }

        self.top.lock().observe(&code, clicks);
        true
    }

    /// Picks a free code for a new record and reserves it along with the URL.
    fn reserve(
        &self,
        id: u64,
        original_url: &str,
        candidate: &ShortCode,
        strategy: CollisionStrategy,
    ) -> Result<Reserve<'_, S>> {
        let index = self.index.write();

        // Another task may have shortened the same URL while we waited on
        // the store.
        if let Some(record) = index.find_by_url(original_url) {
            return Ok(Reserve::Existing(self.outcome_for(record, true)));
        }

        let mut pending = self.pending.lock();
        if let Some(sender) = pending.urls.get(original_url) {
            return Ok(Reserve::InFlight(sender.subscribe()));
        }

        let resolution = self.resolver.resolve(candidate, strategy, |code| {
            index.contains(code) || pending.codes.contains(code)
        })?;
        let record = UrlRecord::new(id, original_url, resolution.code.clone())
            .with_resolution(resolution.strategy);

        pending.codes.insert(resolution.code.as_str().to_string());
        let (sender, _) = watch::channel(());
        pending.urls.insert(original_url.to_string(), sender);

        Ok(Reserve::Reserved(
            Reservation {
                engine: self,
                record,
            },
            resolution.attempts,
        ))
    }

    /// Makes a persisted reservation visible. The trie terminal is registered
    /// under the index write lock, before any click can reach it.
    fn commit(&self, reservation: Reservation<'_, S>) {
        let record = &reservation.record;
        let mut index = self.index.write();
        // A resolve may already have loaded the persisted record from the store.
        if !index.contains(record.short_code.as_str()) {
            index.put(record.short_code.clone(), record.clone());
        }
        self.trie.write().ensure_frequency(&record.original_url, 0);
        drop(index);
        drop(reservation);
    }

    fn outcome_for(&self, record: &UrlRecord, cached: bool) -> ShortenOutcome {
        ShortenOutcome {
            short_url: record.short_code.to_url(&self.config.base_url),
            short_code: record.short_code.clone(),
            original_url: record.original_url.clone(),
            collision_detected: record.collision_detected,
            attempts: 0,
            strategy_used: record.resolution_strategy,
            cached,
        }
    }

    fn spawn_click_increment(&self, code: ShortCode) {
        let store = Arc::clone(&self.store);
        let timeout = self.config.store_timeout;
        tokio::spawn(async move {
            let result = with_timeout(
                timeout,
                "persist_click_increment",
                store.persist_click_increment(&code),
            )
            .await;
            if let Err(err) = result {
                warn!(code = %code, error = %err, "background click persistence failed");
            }
        });
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = snip_core::store::Result<T>>,
    ) -> Result<T> {
        Ok(with_timeout(self.config.store_timeout, operation, fut).await?)
    }
}

async fn with_timeout<T>(
    timeout: Duration,
    operation: &'static str,
    fut: impl Future<Output = snip_core::store::Result<T>>,
) -> snip_core::store::Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = timeout.as_millis() as u64, "store call timed out");
            Err(StoreError::Timeout(format!(
                "{operation} did not complete within {timeout:?}"
            )))
        }
    }
}

/// Accepts absolute http(s) URLs with a non-empty host.
fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(EngineError::InvalidUrl("URL cannot be empty".to_string()));
    }
    if url.chars().any(char::is_whitespace) {
        return Err(EngineError::InvalidUrl(format!(
            "URL must not contain whitespace: {url}"
        )));
    }

    let Some((scheme, rest)) = url.split_once("://") else {
        return Err(EngineError::InvalidUrl(format!(
            "URL must have a valid scheme and host: {url}"
        )));
    };

    let scheme = scheme.to_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(EngineError::InvalidUrl(format!(
            "URL scheme must be http or https: {scheme}"
        )));
    }

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(EngineError::InvalidUrl(format!("URL has no host: {url}")));
    }

    Ok(())
}

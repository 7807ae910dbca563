//! Query Result Cache
//!
//! Adaptive cache for expensive search results with SHA256 fingerprints,
//! TTL expiry, LRU-by-access-time eviction, and a hard memory budget.
//!
//! The cache is strictly an optimization: an internal breaker disables it
//! (fail-open) if its own machinery errors repeatedly, and no operation
//! ever surfaces an error to the caller.

use parking_lot::Mutex as SyncMutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Query cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Entry time-to-live
    pub ttl: Duration,
    /// Hard memory budget across all entries
    pub max_memory_bytes: usize,
    /// Single entries above this fraction of the budget are never cached
    pub oversize_fraction: f64,
    /// Consecutive internal errors before the cache disables itself
    pub max_consecutive_errors: u32,
    /// Estimated time saved per hit, credited to statistics
    pub hit_time_saved_ms: f64,
    /// Size charged to a value no estimator tier could measure
    pub fallback_entry_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
            max_memory_bytes: 500 * 1024 * 1024,
            oversize_fraction: 0.1,
            max_consecutive_errors: 10,
            hit_time_saved_ms: 30_000.0,
            fallback_entry_bytes: 1_024,
        }
    }
}

/// How a value's memory footprint was measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeEstimate {
    /// Binary serialization succeeded
    Serialized(usize),
    /// Fell back to text serialization
    Text(usize),
    /// No serializer could handle the value; a fixed default is charged
    Fallback(usize),
}

impl SizeEstimate {
    pub fn bytes(&self) -> usize {
        match *self {
            Self::Serialized(n) | Self::Text(n) | Self::Fallback(n) => n,
        }
    }
}

/// Estimate the serialized size of a value, never failing.
///
/// Tiers are tried in a fixed priority order; the tag records which one
/// produced the number.
pub fn estimate_size<V: Serialize>(value: &V, fallback_bytes: usize) -> SizeEstimate {
    if let Ok(bytes) = bincode::serialize(value) {
        return SizeEstimate::Serialized(bytes.len());
    }
    if let Ok(text) = serde_json::to_string(value) {
        return SizeEstimate::Text(text.len());
    }
    SizeEstimate::Fallback(fallback_bytes)
}

struct StatsInner {
    hits: u64,
    misses: u64,
    errors: u64,
    total_requests: u64,
    time_saved_ms: f64,
    started: Instant,
}

/// Cache performance counters.
///
/// Holds its own lock so hit/miss recording never interleaves with a
/// snapshot computation.
pub struct CacheStatistics {
    inner: SyncMutex<StatsInner>,
}

/// Point-in-time view of the counters with derived rates
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub total_requests: u64,
    /// Percentage of requests served from cache
    pub hit_rate: f64,
    /// Percentage of requests that hit an internal error
    pub error_rate: f64,
    pub total_time_saved_seconds: f64,
    pub avg_time_saved_per_hit_ms: f64,
    pub uptime_seconds: f64,
}

impl Default for CacheStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self {
            inner: SyncMutex::new(StatsInner {
                hits: 0,
                misses: 0,
                errors: 0,
                total_requests: 0,
                time_saved_ms: 0.0,
                started: Instant::now(),
            }),
        }
    }

    pub fn record_hit(&self, time_saved_ms: f64) {
        let mut inner = self.inner.lock();
        inner.hits += 1;
        inner.total_requests += 1;
        inner.time_saved_ms += time_saved_ms;
    }

    pub fn record_miss(&self) {
        let mut inner = self.inner.lock();
        inner.misses += 1;
        inner.total_requests += 1;
    }

    pub fn record_error(&self) {
        let mut inner = self.inner.lock();
        inner.errors += 1;
        inner.total_requests += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock();
        let total = inner.total_requests;
        StatsSnapshot {
            hits: inner.hits,
            misses: inner.misses,
            errors: inner.errors,
            total_requests: total,
            hit_rate: percent(inner.hits, total),
            error_rate: percent(inner.errors, total),
            total_time_saved_seconds: inner.time_saved_ms / 1000.0,
            avg_time_saved_per_hit_ms: if inner.hits > 0 {
                inner.time_saved_ms / inner.hits as f64
            } else {
                0.0
            },
            uptime_seconds: inner.started.elapsed().as_secs_f64(),
        }
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    size_bytes: usize,
}

/// Entry table, access index, memory account, and pattern counter.
///
/// All four mutate together under one lock: the access index key set
/// always equals the entry key set, and the memory account always equals
/// the sum of live entry sizes.
struct CacheTables<V> {
    entries: HashMap<String, CacheEntry<V>>,
    access: HashMap<String, Instant>,
    memory_bytes: usize,
    patterns: HashMap<String, u64>,
}

impl<V> CacheTables<V> {
    fn remove(&mut self, key: &str) -> bool {
        if let Some(entry) = self.entries.remove(key) {
            self.memory_bytes = self.memory_bytes.saturating_sub(entry.size_bytes);
            self.access.remove(key);
            debug!("Evicted cache entry: {}...", &key[..8.min(key.len())]);
            true
        } else {
            false
        }
    }

    fn lru_key(&self) -> Option<String> {
        // Ties on the minimum timestamp may pick any candidate
        self.access
            .iter()
            .min_by_key(|(_, t)| *t)
            .map(|(k, _)| k.clone())
    }

    fn track_pattern(&mut self, query: &str) {
        let pattern = query
            .to_lowercase()
            .split_whitespace()
            .take(3)
            .collect::<Vec<_>>()
            .join(" ");
        if !pattern.is_empty() {
            *self.patterns.entry(pattern).or_insert(0) += 1;
        }
    }
}

/// Full statistics report for health endpoints
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    pub cache_size: usize,
    pub memory_usage_mb: f64,
    pub memory_limit_mb: f64,
    pub circuit_breaker_open: bool,
    pub consecutive_errors: u32,
    /// Most frequent query prefixes, advisory only
    pub top_patterns: Vec<(String, u64)>,
}

/// Cache health classification
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub status: &'static str,
    pub circuit_breaker_open: bool,
    pub error_rate: f64,
    pub memory_usage_percent: f64,
}

/// Adaptive result cache for (query, embedding, params) fingerprints
pub struct QueryResultCache<V> {
    config: CacheConfig,
    tables: Mutex<CacheTables<V>>,
    stats: CacheStatistics,
    consecutive_errors: AtomicU32,
    breaker_open: AtomicBool,
}

impl<V: Clone + Serialize> QueryResultCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            tables: Mutex::new(CacheTables {
                entries: HashMap::new(),
                access: HashMap::new(),
                memory_bytes: 0,
                patterns: HashMap::new(),
            }),
            stats: CacheStatistics::new(),
            consecutive_errors: AtomicU32::new(0),
            breaker_open: AtomicBool::new(false),
        }
    }

    /// Compute the fingerprint for a request.
    ///
    /// Key = SHA256(sorted-key JSON of normalized query + params), with a
    /// digest of at most the first 10 embedding components mixed in when
    /// an embedding is supplied. Returns `None` for empty query text.
    pub fn compute_key(
        query: &str,
        embedding: Option<&[f32]>,
        params: Option<&serde_json::Value>,
    ) -> Option<String> {
        if query.trim().is_empty() {
            return None;
        }

        // serde_json objects are BTreeMap-backed, so key order is stable
        let mut key_data = serde_json::Map::new();
        key_data.insert(
            "query".to_string(),
            serde_json::Value::String(query.to_lowercase().trim().to_string()),
        );
        key_data.insert(
            "params".to_string(),
            params.cloned().unwrap_or_else(|| serde_json::json!({})),
        );

        if let Some(embedding) = embedding {
            if embedding.is_empty() {
                warn!("Empty embedding supplied for cache key");
                return None;
            }
            let head = embedding
                .iter()
                .take(10)
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let digest = hex::encode(Sha256::digest(head.as_bytes()));
            key_data.insert("embedding_hash".to_string(), serde_json::Value::String(digest));
        }

        let key_json = serde_json::Value::Object(key_data).to_string();
        Some(hex::encode(Sha256::digest(key_json.as_bytes())))
    }

    /// Get a cached result if present and not expired
    pub async fn get(
        &self,
        query: &str,
        embedding: Option<&[f32]>,
        params: Option<&serde_json::Value>,
    ) -> Option<V> {
        if self.breaker_open.load(Ordering::Acquire) {
            debug!("Cache breaker open, skipping lookup");
            self.stats.record_miss();
            return None;
        }

        let key = match Self::compute_key(query, embedding, params) {
            Some(key) => key,
            None => {
                // Invalid caller input, not cache machinery failure
                debug!("Cache lookup declined: no key for query");
                self.stats.record_error();
                return None;
            }
        };

        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let mut expired = false;
        let hit = match tables.entries.get(&key) {
            None => None,
            Some(entry) if entry.stored_at.elapsed() > self.config.ttl => {
                expired = true;
                None
            }
            Some(entry) => Some(entry.value.clone()),
        };

        match hit {
            Some(value) => {
                tables.access.insert(key.clone(), Instant::now());
                tables.track_pattern(query);
                self.stats.record_hit(self.config.hit_time_saved_ms);
                debug!("Cache HIT: {}", &key[..16]);
                self.note_success();
                Some(value)
            }
            None => {
                if expired {
                    tables.remove(&key);
                }
                self.stats.record_miss();
                None
            }
        }
    }

    /// Store a result, evicting least-recently-accessed entries as needed.
    ///
    /// Returns false (without raising) when the value is oversized, the
    /// breaker is open, or eviction cannot make room.
    pub async fn set(
        &self,
        query: &str,
        value: V,
        embedding: Option<&[f32]>,
        params: Option<&serde_json::Value>,
    ) -> bool {
        if self.breaker_open.load(Ordering::Acquire) {
            debug!("Cache breaker open, skipping write");
            return false;
        }

        let key = match Self::compute_key(query, embedding, params) {
            Some(key) => key,
            None => {
                // Invalid caller input, not cache machinery failure
                debug!("Cache write declined: no key for query");
                self.stats.record_error();
                return false;
            }
        };

        let estimate = estimate_size(&value, self.config.fallback_entry_bytes);
        let size_bytes = estimate.bytes();

        let oversize_limit =
            (self.config.max_memory_bytes as f64 * self.config.oversize_fraction) as usize;
        if size_bytes > oversize_limit {
            warn!(
                "Value too large for cache: {:.2} MB ({:?})",
                size_bytes as f64 / 1024.0 / 1024.0,
                estimate
            );
            return false;
        }

        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        // Overwrites release the old entry's accounting first
        tables.remove(&key);

        if !self.evict_for(tables, size_bytes) {
            warn!("Failed to make space for new cache entry");
            return false;
        }

        tables.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                size_bytes,
            },
        );
        tables.access.insert(key.clone(), Instant::now());
        tables.memory_bytes += size_bytes;
        tables.track_pattern(query);

        debug!("Cache SET: {} ({} bytes)", &key[..16], size_bytes);
        self.note_success();
        true
    }

    /// Evict until the new entry fits the memory budget and entry capacity
    fn evict_for(&self, tables: &mut CacheTables<V>, new_size: usize) -> bool {
        let mut evicted = 0usize;
        while tables.memory_bytes + new_size > self.config.max_memory_bytes {
            if tables.entries.is_empty() {
                warn!("Cache empty but memory budget still exceeded");
                return false;
            }
            let lru = match tables.lru_key() {
                Some(key) => key,
                None => {
                    self.note_error("eviction: access index empty with live entries");
                    return false;
                }
            };
            if !tables.remove(&lru) {
                self.note_error("eviction: stale access index key");
                return false;
            }
            evicted += 1;
            if evicted > self.config.max_entries {
                self.note_error("eviction loop detected");
                return false;
            }
        }

        while tables.entries.len() >= self.config.max_entries {
            let lru = match tables.lru_key() {
                Some(key) => key,
                None => break,
            };
            if !tables.remove(&lru) {
                self.note_error("eviction: stale access index key");
                return false;
            }
        }

        true
    }

    /// Drop every entry and reset the accounting
    pub async fn clear(&self) -> bool {
        let mut tables = self.tables.lock().await;
        tables.entries.clear();
        tables.access.clear();
        tables.patterns.clear();
        tables.memory_bytes = 0;
        info!("Cache cleared");
        self.note_success();
        true
    }

    /// Pre-populate the cache with known-common queries
    pub async fn warm(&self, items: Vec<(String, V)>) -> usize {
        info!("Warming cache with {} common queries", items.len());
        let mut cached = 0;
        for (query, value) in items {
            if self.set(&query, value, None, None).await {
                cached += 1;
            }
        }
        info!("Cache warming completed: {} entries", cached);
        cached
    }

    /// Comprehensive statistics for reporting
    pub async fn get_statistics(&self) -> CacheStats {
        let counters = self.stats.snapshot();
        let tables = self.tables.lock().await;

        let mut top_patterns: Vec<(String, u64)> = tables
            .patterns
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        top_patterns.sort_by(|a, b| b.1.cmp(&a.1));
        top_patterns.truncate(10);

        CacheStats {
            counters,
            cache_size: tables.entries.len(),
            memory_usage_mb: tables.memory_bytes as f64 / 1024.0 / 1024.0,
            memory_limit_mb: self.config.max_memory_bytes as f64 / 1024.0 / 1024.0,
            circuit_breaker_open: self.breaker_open.load(Ordering::Acquire),
            consecutive_errors: self.consecutive_errors.load(Ordering::Acquire),
            top_patterns,
        }
    }

    /// Cache health classification for liveness reporting
    pub async fn health_check(&self) -> CacheHealth {
        let counters = self.stats.snapshot();
        let breaker_open = self.breaker_open.load(Ordering::Acquire);
        let memory_bytes = self.tables.lock().await.memory_bytes;

        let status = if breaker_open {
            "unhealthy"
        } else if counters.error_rate > 10.0 {
            "degraded"
        } else {
            "healthy"
        };

        CacheHealth {
            status,
            circuit_breaker_open: breaker_open,
            error_rate: counters.error_rate,
            memory_usage_percent: memory_bytes as f64 / self.config.max_memory_bytes as f64
                * 100.0,
        }
    }

    /// Whether the internal fail-open breaker has disabled the cache
    pub fn is_disabled(&self) -> bool {
        self.breaker_open.load(Ordering::Acquire)
    }

    fn note_error(&self, operation: &str) {
        self.stats.record_error();
        let errors = self.consecutive_errors.fetch_add(1, Ordering::AcqRel) + 1;
        warn!("Cache {} error ({} consecutive)", operation, errors);

        if errors >= self.config.max_consecutive_errors {
            self.breaker_open.store(true, Ordering::Release);
            error!("Cache circuit breaker opened after {} errors", errors);
        }
    }

    fn note_success(&self) {
        if self.consecutive_errors.swap(0, Ordering::AcqRel) > 0
            && self.breaker_open.swap(false, Ordering::AcqRel)
        {
            info!("Cache circuit breaker reset after successful operation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn small_cache(max_entries: usize) -> QueryResultCache<Value> {
        QueryResultCache::new(CacheConfig {
            max_entries,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_get_before_set_is_absent() {
        let cache = small_cache(10);
        assert!(cache.get("what is strategy", None, None).await.is_none());

        let stats = cache.get_statistics().await;
        assert_eq!(stats.counters.misses, 1);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = small_cache(10);
        assert!(cache.set("what is strategy", json!({"answer": 1}), None, None).await);

        let hit = cache.get("what is strategy", None, None).await;
        assert_eq!(hit, Some(json!({"answer": 1})));

        let stats = cache.get_statistics().await;
        assert_eq!(stats.counters.hits, 1);
        assert_eq!(stats.cache_size, 1);
    }

    #[test]
    fn test_key_normalization() {
        let k1 = QueryResultCache::<Value>::compute_key("Hello World", None, None);
        let k2 = QueryResultCache::<Value>::compute_key("  hello world  ", None, None);
        assert_eq!(k1, k2);
        assert!(k1.is_some());
    }

    #[test]
    fn test_key_varies_with_inputs() {
        let base = QueryResultCache::<Value>::compute_key("hello", None, None);
        let with_embedding =
            QueryResultCache::<Value>::compute_key("hello", Some(&[0.1, 0.2]), None);
        let with_params =
            QueryResultCache::<Value>::compute_key("hello", None, Some(&json!({"k": 5})));

        assert_ne!(base, with_embedding);
        assert_ne!(base, with_params);
        assert_ne!(with_embedding, with_params);
    }

    #[test]
    fn test_key_ignores_embedding_tail() {
        // Only the first 10 components feed the key
        let mut a = vec![0.5f32; 12];
        let mut b = vec![0.5f32; 12];
        a[11] = 1.0;
        b[11] = 2.0;
        let ka = QueryResultCache::<Value>::compute_key("q", Some(&a), None);
        let kb = QueryResultCache::<Value>::compute_key("q", Some(&b), None);
        assert_eq!(ka, kb);
    }

    #[test]
    fn test_empty_query_has_no_key() {
        assert!(QueryResultCache::<Value>::compute_key("   ", None, None).is_none());
    }

    #[test]
    fn test_size_estimate_serialized() {
        let estimate = estimate_size(&json!({"a": [1, 2, 3]}), 1024);
        assert!(matches!(estimate, SizeEstimate::Serialized(n) if n > 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache: QueryResultCache<Value> = QueryResultCache::new(CacheConfig {
            ttl: Duration::from_secs(10),
            ..Default::default()
        });
        cache.set("q", json!("v"), None, None).await;

        tokio::time::advance(Duration::from_millis(9_900)).await;
        assert_eq!(cache.get("q", None, None).await, Some(json!("v")));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(cache.get("q", None, None).await.is_none());

        // Expired entry was evicted, not just hidden
        assert_eq!(cache.get_statistics().await.cache_size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_eviction_respects_access_order() {
        let cache = small_cache(3);
        for q in ["a", "b", "c"] {
            cache.set(q, json!(q), None, None).await;
            tokio::time::advance(Duration::from_millis(10)).await;
        }

        // Touch "a" so "b" becomes the eviction victim
        cache.get("a", None, None).await;
        tokio::time::advance(Duration::from_millis(10)).await;

        cache.set("d", json!("d"), None, None).await;

        assert!(cache.get("a", None, None).await.is_some());
        assert!(cache.get("b", None, None).await.is_none());
        assert!(cache.get("c", None, None).await.is_some());
        assert!(cache.get("d", None, None).await.is_some());
        assert_eq!(cache.get_statistics().await.cache_size, 3);
    }

    #[tokio::test]
    async fn test_oversized_value_refused() {
        let cache: QueryResultCache<Value> = QueryResultCache::new(CacheConfig {
            max_memory_bytes: 1_000,
            oversize_fraction: 0.1,
            ..Default::default()
        });

        let big = json!("x".repeat(500));
        assert!(!cache.set("q", big, None, None).await);
        assert_eq!(cache.get_statistics().await.cache_size, 0);
    }

    #[tokio::test]
    async fn test_memory_budget_evicts() {
        let cache: QueryResultCache<Value> = QueryResultCache::new(CacheConfig {
            max_memory_bytes: 400,
            oversize_fraction: 0.5,
            ..Default::default()
        });

        // Each entry ~160 bytes serialized; the third forces eviction
        for q in ["a", "b", "c"] {
            assert!(cache.set(q, json!("y".repeat(150)), None, None).await);
        }

        let stats = cache.get_statistics().await;
        assert_eq!(stats.cache_size, 2);
        assert!(stats.memory_usage_mb * 1024.0 * 1024.0 <= 400.0);
    }

    #[tokio::test]
    async fn test_overwrite_does_not_double_account() {
        let cache = small_cache(10);
        cache.set("q", json!("value"), None, None).await;
        let before = cache.get_statistics().await;

        cache.set("q", json!("value"), None, None).await;
        let after = cache.get_statistics().await;

        assert_eq!(before.cache_size, after.cache_size);
        assert!((before.memory_usage_mb - after.memory_usage_mb).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = small_cache(10);
        cache.set("q", json!(1), None, None).await;
        assert!(cache.clear().await);

        let stats = cache.get_statistics().await;
        assert_eq!(stats.cache_size, 0);
        assert_eq!(stats.memory_usage_mb, 0.0);
        assert!(cache.get("q", None, None).await.is_none());
    }

    #[tokio::test]
    async fn test_warm() {
        let cache = small_cache(10);
        let cached = cache
            .warm(vec![
                ("what is strategic planning".to_string(), json!({"summary": "…"})),
                ("define competitive advantage".to_string(), json!({"summary": "…"})),
            ])
            .await;
        assert_eq!(cached, 2);
        assert!(cache.get("what is strategic planning", None, None).await.is_some());
    }

    #[tokio::test]
    async fn test_top_patterns() {
        let cache = small_cache(10);
        cache.set("how to create value", json!(1), None, None).await;
        cache.set("how to create revenue", json!(2), None, None).await;

        let stats = cache.get_statistics().await;
        assert_eq!(stats.top_patterns[0].0, "how to create");
        assert_eq!(stats.top_patterns[0].1, 2);
    }

    #[tokio::test]
    async fn test_invalid_input_does_not_disable_cache() {
        let cache: QueryResultCache<Value> = QueryResultCache::new(CacheConfig {
            max_consecutive_errors: 3,
            ..Default::default()
        });

        // Empty queries are declined, counted in stats, and never trip
        // the internal breaker
        for _ in 0..10 {
            assert!(cache.get("", None, None).await.is_none());
        }
        assert!(!cache.is_disabled());

        // Caching still works for well-formed requests
        assert!(cache.set("valid query", json!(1), None, None).await);
        assert_eq!(cache.get("valid query", None, None).await, Some(json!(1)));

        let stats = cache.get_statistics().await;
        assert_eq!(stats.counters.errors, 10);
        assert_eq!(stats.consecutive_errors, 0);
    }

    #[tokio::test]
    async fn test_internal_breaker_fails_open() {
        let cache: QueryResultCache<Value> = QueryResultCache::new(CacheConfig {
            max_consecutive_errors: 3,
            ..Default::default()
        });

        // Repeated machinery errors trip the breaker
        for _ in 0..3 {
            cache.note_error("eviction");
        }
        assert!(cache.is_disabled());

        // Disabled cache fails open: miss, not error
        assert!(cache.get("real query", None, None).await.is_none());
        assert!(!cache.set("real query", json!(1), None, None).await);

        // A successful operation closes the breaker again
        assert!(cache.clear().await);
        assert!(!cache.is_disabled());
        assert!(cache.set("real query", json!(1), None, None).await);
    }

    #[tokio::test]
    async fn test_health_check() {
        let cache = small_cache(10);
        cache.set("q", json!(1), None, None).await;
        let health = cache.health_check().await;
        assert_eq!(health.status, "healthy");
        assert!(!health.circuit_breaker_open);
    }
}

//! Resilience Layer
//!
//! The explicitly constructed owner of all shared resilience state: query
//! cache, embedding cache, breaker registry, error tracker, health monitor
//! and fallbacks. Built once by the application's startup routine and
//! passed to every component that needs it; nothing here is global.
//!
//! `cached_call` is the composition point: cache fast path, then retry
//! orchestrator, then the named circuit breaker, then the dependency.

use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;

use crate::breaker::{CircuitBreaker, CircuitBreakerRegistry};
use crate::cache::QueryResultCache;
use crate::config::ResilienceConfig;
use crate::embedding_cache::EmbeddingCache;
use crate::error::RagError;
use crate::fallback::FallbackRegistry;
use crate::health::{ErrorTracker, HealthMonitor, HealthProbe, SystemHealth};
use crate::retry::retry_with_backoff;

/// Explicit cache key descriptor for a protected call.
///
/// Replaces first-positional-argument sniffing: callers state exactly
/// which inputs identify the request.
#[derive(Debug, Clone, Copy)]
pub struct CacheKey<'a> {
    pub query: &'a str,
    pub embedding: Option<&'a [f32]>,
    pub params: Option<&'a Value>,
}

impl<'a> CacheKey<'a> {
    pub fn query(query: &'a str) -> Self {
        Self {
            query,
            embedding: None,
            params: None,
        }
    }

    pub fn with_embedding(mut self, embedding: &'a [f32]) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_params(mut self, params: &'a Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// Shared resilience state for one pipeline instance
pub struct ResilienceLayer {
    config: ResilienceConfig,
    query_cache: QueryResultCache<Value>,
    embedding_cache: EmbeddingCache,
    breakers: CircuitBreakerRegistry,
    errors: ErrorTracker,
    health: HealthMonitor,
    fallbacks: FallbackRegistry,
}

impl ResilienceLayer {
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            query_cache: QueryResultCache::new(config.cache.clone()),
            embedding_cache: EmbeddingCache::new(config.embedding_cache_entries),
            breakers: CircuitBreakerRegistry::new(),
            errors: ErrorTracker::new(config.max_error_history),
            health: HealthMonitor::new(),
            fallbacks: FallbackRegistry::new(config.embedding_dimension),
            config,
        }
    }

    pub fn query_cache(&self) -> &QueryResultCache<Value> {
        &self.query_cache
    }

    pub fn embedding_cache(&self) -> &EmbeddingCache {
        &self.embedding_cache
    }

    pub fn errors(&self) -> &ErrorTracker {
        &self.errors
    }

    pub fn fallbacks(&self) -> &FallbackRegistry {
        &self.fallbacks
    }

    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    /// Get or create the breaker for a dependency, with the configured
    /// default parameters
    pub fn circuit_breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        self.breakers.register(name, self.config.breaker.clone())
    }

    /// Run a protected dependency call with caching.
    ///
    /// Cache hit is the fast path. On a miss the call runs under the
    /// retry orchestrator and the named breaker; the result is cached
    /// only when the observed duration reached `min_cache_duration`, so
    /// cheap calls bypass the cache entirely. Failures are recorded in
    /// the error tracker and returned typed; cache trouble never aborts
    /// the call.
    pub async fn cached_call<F, Fut>(
        &self,
        key: CacheKey<'_>,
        service: &str,
        op: F,
    ) -> Result<Value, RagError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, RagError>>,
    {
        if let Some(hit) = self
            .query_cache
            .get(key.query, key.embedding, key.params)
            .await
        {
            return Ok(hit);
        }

        let breaker = self.circuit_breaker(service);
        let mut op = op;

        // Each attempt is timed on its own so backoff delays between
        // retries never count toward the caching threshold
        let result = retry_with_backoff(&self.config.retry, || {
            let breaker = Arc::clone(&breaker);
            let fut = op();
            async move {
                let started = Instant::now();
                breaker.call(fut).await.map(|value| (value, started.elapsed()))
            }
        })
        .await;

        match result {
            Ok((value, call_duration)) => {
                if call_duration >= self.config.min_cache_duration {
                    self.query_cache
                        .set(key.query, value.clone(), key.embedding, key.params)
                        .await;
                }
                Ok(value)
            }
            Err(err) => {
                self.errors
                    .record(&err, json!({ "service": service, "query": key.query }));
                Err(err)
            }
        }
    }

    /// Probe every dependency and aggregate health, breaker states, and
    /// error statistics into one report
    pub async fn check_system_health(&self, probes: &[&dyn HealthProbe]) -> SystemHealth {
        self.health.check_services(probes).await;

        SystemHealth {
            health: self.health.status(),
            circuit_breakers: self.breakers.all_status(),
            errors: self.errors.stats(),
        }
    }

    /// Log final statistics; all state is process-local, nothing persists
    pub async fn shutdown(&self) {
        let stats = self.query_cache.get_statistics().await;
        info!(
            "Resilience layer shutting down: {} cached entries, {:.1}% hit rate, {} errors recorded",
            stats.cache_size,
            stats.counters.hit_rate,
            self.errors.stats().total_errors
        );
    }
}

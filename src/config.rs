//! Configuration management
//!
//! All resilience policy constants live here as plain fields with the
//! defaults the pipeline has run with in production. Every value can be
//! overridden per instance or via `RAGSAFE_*` environment variables.

use anyhow::Result;
use std::time::Duration;

use crate::breaker::CircuitBreakerConfig;
use crate::cache::CacheConfig;
use crate::retry::RetryPolicy;

/// Top-level configuration for a [`ResilienceLayer`](crate::ResilienceLayer)
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    /// Query result cache limits and policy
    pub cache: CacheConfig,

    /// Embedding cache capacity (uniform-sized entries, count only)
    pub embedding_cache_entries: usize,

    /// Embedding dimension, used for the zero-vector fallback
    pub embedding_dimension: usize,

    /// Default breaker parameters for newly registered dependencies
    pub breaker: CircuitBreakerConfig,

    /// Default retry policy for protected calls
    pub retry: RetryPolicy,

    /// Only cache results whose call took at least this long
    pub min_cache_duration: Duration,

    /// Bounded error history kept for reporting
    pub max_error_history: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            embedding_cache_entries: 5_000,
            embedding_dimension: 2048,
            breaker: CircuitBreakerConfig::default(),
            retry: RetryPolicy::default(),
            min_cache_duration: Duration::from_millis(500),
            max_error_history: 1_000,
        }
    }
}

impl ResilienceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse::<u64>("RAGSAFE_CACHE_MAX_ENTRIES") {
            config.cache.max_entries = v as usize;
        }
        if let Some(v) = env_parse::<u64>("RAGSAFE_CACHE_TTL_SECS") {
            config.cache.ttl = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("RAGSAFE_CACHE_MAX_MEMORY_MB") {
            config.cache.max_memory_bytes = (v as usize) * 1024 * 1024;
        }
        if let Some(v) = env_parse::<u64>("RAGSAFE_EMBEDDING_CACHE_ENTRIES") {
            config.embedding_cache_entries = v as usize;
        }
        if let Some(v) = env_parse::<usize>("RAGSAFE_EMBEDDING_DIMENSION") {
            config.embedding_dimension = v;
        }
        if let Some(v) = env_parse::<u32>("RAGSAFE_BREAKER_FAILURE_THRESHOLD") {
            config.breaker.failure_threshold = v;
        }
        if let Some(v) = env_parse::<u64>("RAGSAFE_BREAKER_RECOVERY_SECS") {
            config.breaker.recovery_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<usize>("RAGSAFE_MAX_RETRIES") {
            config.retry.max_retries = v;
        }
        if let Some(v) = env_parse::<u64>("RAGSAFE_MIN_CACHE_DURATION_MS") {
            config.min_cache_duration = Duration::from_millis(v);
        }

        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResilienceConfig::default();
        assert_eq!(config.embedding_cache_entries, 5_000);
        assert_eq!(config.min_cache_duration, Duration::from_millis(500));
        assert_eq!(config.breaker.failure_threshold, 5);
    }

    #[test]
    fn test_from_env_falls_back_to_defaults() {
        // No RAGSAFE_* vars set in the test environment
        let config = ResilienceConfig::from_env().unwrap();
        assert_eq!(
            config.cache.max_entries,
            ResilienceConfig::default().cache.max_entries
        );
    }
}

//! Ragsafe
//!
//! Resilience layer for an in-process retrieval-augmented pipeline.
//! Shields the pipeline from its unreliable downstream dependencies
//! (embedding API, database, graph store, LLM) with adaptive caching and
//! circuit-breaker-protected retries.
//!
//! # Features
//!
//! - **Query Result Cache**: SHA256 fingerprints, TTL, LRU eviction,
//!   hard memory budget, fail-open internal breaker
//! - **Embedding Cache**: fixed-capacity LRU for raw vectors
//! - **Circuit Breakers**: per-dependency closed/open/half-open state
//!   machines with a shared registry
//! - **Backoff Retry**: exponential backoff with jitter, rate-limit aware
//! - **Error Taxonomy**: transient/permanent/degraded/critical
//!   classification with user-facing messages and fallback values
//! - **Health Monitoring**: dependency probes, breaker states, and error
//!   statistics in one report
//!
//! # Architecture
//!
//! ```text
//! tool call ──► QueryResultCache ──hit──► result
//!                     │ miss
//!                     ▼
//!               RetryOrchestrator ──► CircuitBreaker ──► dependency
//!                     │                                     │
//!                     └── ErrorTracker ◄── classification ──┘
//! ```

pub mod breaker;
pub mod cache;
pub mod config;
pub mod embedding_cache;
pub mod error;
pub mod fallback;
pub mod health;
pub mod resilience;
pub mod retry;

pub use breaker::{
    BreakerStatus, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
};
pub use cache::{
    CacheConfig, CacheHealth, CacheStatistics, CacheStats, QueryResultCache, SizeEstimate,
    StatsSnapshot,
};
pub use config::ResilienceConfig;
pub use embedding_cache::EmbeddingCache;
pub use error::{classify_foreign, ErrorCategory, RagError};
pub use fallback::{FallbackRegistry, GraphFallback};
pub use health::{
    ErrorRecord, ErrorStats, ErrorTracker, HealthMonitor, HealthProbe, HealthStatus, SystemHealth,
};
pub use resilience::{CacheKey, ResilienceLayer};
pub use retry::{retry_with_backoff, RetryPolicy};

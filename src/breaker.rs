//! Circuit Breaker
//!
//! Per-dependency state machine that fails fast once a dependency exceeds
//! its failure threshold, then probes recovery after a timeout:
//!
//! - **Closed**: calls pass through, failures increment a counter
//! - **Open**: calls are rejected immediately with a retry-after hint
//! - **HalfOpen**: one probe call is allowed after the recovery timeout
//!
//! Industry standard: Netflix Hystrix, resilience4j

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::RagError;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation
    Closed,
    /// Blocking all requests
    Open,
    /// Allowing one probe request through
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Time to wait before allowing a recovery probe
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker for one named dependency
///
/// The decision is synchronous; only the wrapped call suspends. A future
/// dropped mid-call records neither success nor failure, so abandoned
/// operations never skew the failure count.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

/// Snapshot of one breaker for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    /// Seconds until a recovery probe is allowed, when open
    pub time_until_reset_secs: Option<u64>,
}

impl CircuitBreaker {
    /// Create a breaker with default thresholds
    pub fn new(name: &str) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create with custom config
    pub fn with_config(name: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether a call may proceed.
    ///
    /// An open breaker whose recovery timeout has elapsed optimistically
    /// moves to half-open and admits the call as its probe; otherwise the
    /// rejection carries the remaining wait so callers can back off
    /// deterministically.
    pub fn try_acquire(&self) -> Result<(), RagError> {
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            let elapsed = inner.last_failure.map(|t| t.elapsed());
            match elapsed {
                Some(elapsed) if elapsed > self.config.recovery_timeout => {
                    inner.state = CircuitState::HalfOpen;
                    info!("Circuit breaker '{}' half-open, probing recovery", self.name);
                }
                _ => {
                    let remaining = self
                        .config
                        .recovery_timeout
                        .saturating_sub(elapsed.unwrap_or_default());
                    return Err(RagError::CircuitOpen {
                        name: self.name.clone(),
                        retry_after: remaining,
                    });
                }
            }
        }

        Ok(())
    }

    /// Record a successful call: reset the count and close from any state
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed || inner.failure_count > 0 {
            info!("Circuit breaker '{}' reset to closed", self.name);
        }
        inner.failure_count = 0;
        inner.state = CircuitState::Closed;
    }

    /// Record a failed call, opening the circuit at the threshold
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.last_failure = Some(Instant::now());
        inner.failure_count += 1;

        if inner.failure_count >= self.config.failure_threshold
            && inner.state != CircuitState::Open
        {
            inner.state = CircuitState::Open;
            warn!(
                "Circuit breaker '{}' opened after {} failures",
                self.name, inner.failure_count
            );
        }
    }

    /// Execute a call under this breaker.
    ///
    /// Rejects without polling the future when open; otherwise awaits it
    /// and records the outcome.
    pub async fn call<T, Fut>(&self, fut: Fut) -> Result<T, RagError>
    where
        Fut: Future<Output = Result<T, RagError>>,
    {
        self.try_acquire()?;

        match fut.await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    /// Current state
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock();
        inner.state
    }

    /// Snapshot for health reporting
    pub fn status(&self) -> BreakerStatus {
        let inner = self.inner.lock();
        let time_until_reset_secs = if inner.state == CircuitState::Open {
            let elapsed = inner.last_failure.map(|t| t.elapsed()).unwrap_or_default();
            Some(self.config.recovery_timeout.saturating_sub(elapsed).as_secs())
        } else {
            None
        };

        BreakerStatus {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            time_until_reset_secs,
        }
    }

    /// Force the breaker back to closed
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure = None;
        info!("Circuit breaker '{}' reset", self.name);
    }
}

/// One breaker per dependency name, created lazily on first use.
///
/// Registration is idempotent: the first configuration wins and later
/// `register` calls return the existing breaker, so a dependency's
/// parameters cannot drift between call sites.
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the breaker for a dependency
    pub fn register(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(name) {
            return Arc::clone(existing);
        }

        let mut breakers = self.breakers.write();
        Arc::clone(
            breakers
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::with_config(name, config))),
        )
    }

    /// Look up an already-registered breaker
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.read().get(name).cloned()
    }

    /// Status of every registered breaker
    pub fn all_status(&self) -> Vec<BreakerStatus> {
        self.breakers
            .read()
            .values()
            .map(|b| b.status())
            .collect()
    }
}

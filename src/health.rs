//! Error Tracking & Health Monitoring
//!
//! Bounded error history with per-kind counts, plus dependency health
//! probing. Aggregated with breaker states into one status object by
//! [`ResilienceLayer::check_system_health`](crate::ResilienceLayer::check_system_health).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tracing::{error, warn};

use crate::breaker::BreakerStatus;
use crate::error::{ErrorCategory, RagError};

/// One handled error
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub kind: String,
    pub message: String,
    pub category: ErrorCategory,
    pub user_message: String,
    pub timestamp: DateTime<Utc>,
    pub context: Value,
}

/// Aggregated error statistics
#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    pub total_errors: u64,
    pub error_counts: HashMap<String, u64>,
    /// Category distribution over the 100 most recent errors
    pub category_distribution: HashMap<ErrorCategory, u64>,
    pub recent_errors: Vec<ErrorRecord>,
}

struct TrackerInner {
    counts: HashMap<String, u64>,
    history: VecDeque<ErrorRecord>,
}

/// Centralized error recording with a capped history
pub struct ErrorTracker {
    max_history: usize,
    inner: Mutex<TrackerInner>,
}

impl ErrorTracker {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            inner: Mutex::new(TrackerInner {
                counts: HashMap::new(),
                history: VecDeque::new(),
            }),
        }
    }

    /// Record a handled error with optional free-form context
    pub fn record(&self, err: &RagError, context: Value) -> ErrorRecord {
        let record = ErrorRecord {
            kind: err.kind().to_string(),
            message: err.to_string(),
            category: err.category(),
            user_message: err.user_message().to_string(),
            timestamp: Utc::now(),
            context,
        };

        match record.category {
            ErrorCategory::Critical | ErrorCategory::Permanent => {
                error!("Error recorded: {} ({})", record.message, record.kind)
            }
            _ => warn!("Error recorded: {} ({})", record.message, record.kind),
        }

        let mut inner = self.inner.lock();
        *inner.counts.entry(record.kind.clone()).or_insert(0) += 1;
        inner.history.push_back(record.clone());
        while inner.history.len() > self.max_history {
            inner.history.pop_front();
        }

        record
    }

    /// Aggregate counts, recent category distribution, and recent records
    pub fn stats(&self) -> ErrorStats {
        let inner = self.inner.lock();

        let mut category_distribution: HashMap<ErrorCategory, u64> = HashMap::new();
        for record in inner.history.iter().rev().take(100) {
            *category_distribution.entry(record.category).or_insert(0) += 1;
        }

        let recent_errors = inner
            .history
            .iter()
            .rev()
            .take(10)
            .rev()
            .cloned()
            .collect();

        ErrorStats {
            total_errors: inner.counts.values().sum(),
            error_counts: inner.counts.clone(),
            category_distribution,
            recent_errors,
        }
    }
}

/// A minimal-request health probe for one dependency
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Dependency name as reported in health status
    fn name(&self) -> &str;

    /// Issue a minimal request (SELECT 1, tiny embedding, etc.)
    async fn check(&self) -> Result<(), RagError>;
}

/// Current health view of the probed services
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub services: HashMap<String, bool>,
    pub last_check: Option<DateTime<Utc>>,
    pub overall_health: bool,
}

#[derive(Default)]
struct MonitorInner {
    results: HashMap<String, bool>,
    last_check: Option<DateTime<Utc>>,
}

/// Tracks the latest probe results per dependency
#[derive(Default)]
pub struct HealthMonitor {
    inner: Mutex<MonitorInner>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every probe and cache the boolean outcomes
    pub async fn check_services(&self, probes: &[&dyn HealthProbe]) -> HashMap<String, bool> {
        let mut results = HashMap::new();

        for probe in probes {
            let healthy = match probe.check().await {
                Ok(()) => true,
                Err(err) => {
                    error!("{} health check failed: {}", probe.name(), err);
                    false
                }
            };
            results.insert(probe.name().to_string(), healthy);
        }

        let mut inner = self.inner.lock();
        inner.results = results.clone();
        inner.last_check = Some(Utc::now());

        results
    }

    /// Latest cached health view
    pub fn status(&self) -> HealthStatus {
        let inner = self.inner.lock();
        HealthStatus {
            services: inner.results.clone(),
            last_check: inner.last_check,
            overall_health: !inner.results.is_empty() && inner.results.values().all(|&h| h),
        }
    }
}

/// Everything a liveness endpoint needs in one object
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub health: HealthStatus,
    pub circuit_breakers: Vec<BreakerStatus>,
    pub errors: ErrorStats,
}

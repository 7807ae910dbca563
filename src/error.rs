//! Error Taxonomy
//!
//! Every failure from a downstream dependency (embedding API, database,
//! graph store, LLM) is mapped into one of four categories that drive the
//! recovery strategy: retry, surface, substitute a fallback, or alert.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Categories of errors for different handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Network errors, timeouts, rate limits - retry likely to succeed
    Transient,
    /// Bad requests, authentication errors - retry won't help
    Permanent,
    /// Partial failure, a fallback value is available
    Degraded,
    /// System failure, propagate and alert
    Critical,
}

/// Errors raised by the resilience layer and its protected dependencies
#[derive(Debug, Error)]
pub enum RagError {
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    #[error("embedding generation failed: {0}")]
    EmbeddingGeneration(String),

    #[error("knowledge graph query failed: {0}")]
    GraphSearch(String),

    #[error("llm request failed: {0}")]
    Llm(String),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("circuit breaker '{name}' is open, retry in {retry_after:?}")]
    CircuitOpen { name: String, retry_after: Duration },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("degraded: {0}")]
    Degraded(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    /// Category driving the recovery strategy
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DatabaseConnection(_)
            | Self::EmbeddingGeneration(_)
            | Self::GraphSearch(_)
            | Self::Llm(_)
            | Self::RateLimited { .. }
            | Self::CircuitOpen { .. }
            | Self::Timeout(_) => ErrorCategory::Transient,
            Self::InvalidRequest(_) | Self::Authentication(_) => ErrorCategory::Permanent,
            Self::Degraded(_) => ErrorCategory::Degraded,
            Self::Internal(_) => ErrorCategory::Critical,
        }
    }

    /// Whether the retry orchestrator should attempt this again
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    /// Explicit wait hint, when the failure carries one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } | Self::CircuitOpen { retry_after, .. } => {
                Some(*retry_after)
            }
            _ => None,
        }
    }

    /// User-facing message, never a raw error chain
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DatabaseConnection(_) => {
                "Unable to connect to the database. Please try again later."
            }
            Self::EmbeddingGeneration(_) | Self::Llm(_) => {
                "The AI service is temporarily unavailable. Please try again."
            }
            Self::GraphSearch(_) => "Unable to search the knowledge base. Please try again.",
            Self::RateLimited { .. } => {
                "Request limit exceeded. Please wait a moment and try again."
            }
            Self::CircuitOpen { .. } | Self::Timeout(_) => {
                "The service is temporarily unavailable. Please try again."
            }
            Self::InvalidRequest(_) => "Invalid request. Please check your input and try again.",
            Self::Authentication(_) => "Authentication failed. Please check your credentials.",
            Self::Degraded(_) => {
                "Partial results only; some sources are currently unavailable."
            }
            Self::Internal(_) => "An unexpected error occurred. Please try again or contact support.",
        }
    }

    /// Stable short name for counting and reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DatabaseConnection(_) => "database_connection",
            Self::EmbeddingGeneration(_) => "embedding_generation",
            Self::GraphSearch(_) => "graph_search",
            Self::Llm(_) => "llm",
            Self::RateLimited { .. } => "rate_limited",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Timeout(_) => "timeout",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Authentication(_) => "authentication",
            Self::Degraded(_) => "degraded",
            Self::Internal(_) => "internal",
        }
    }
}

/// Classify a foreign error from its type name and message.
///
/// Used when a dependency surfaces an error outside the [`RagError`]
/// family. Defaults to [`ErrorCategory::Permanent`] when ambiguous, so an
/// unknown failure is never retried indefinitely.
pub fn classify_foreign(type_name: &str, message: &str) -> ErrorCategory {
    const TRANSIENT_TYPES: &[&str] = &[
        "ConnectionError",
        "TimeoutError",
        "NetworkError",
        "TemporaryFailure",
        "ServiceUnavailable",
    ];

    if TRANSIENT_TYPES.iter().any(|t| type_name.contains(t)) {
        return ErrorCategory::Transient;
    }

    let lower = message.to_lowercase();
    if lower.contains("rate") && lower.contains("limit")
        || lower.contains("too many requests")
        || lower.contains("429")
    {
        return ErrorCategory::Transient;
    }
    if lower.contains("timeout") || lower.contains("connection") || lower.contains("temporary") {
        return ErrorCategory::Transient;
    }
    if lower.contains("unavailable") || lower.contains("503") {
        return ErrorCategory::Transient;
    }

    ErrorCategory::Permanent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            RagError::DatabaseConnection("refused".into()).category(),
            ErrorCategory::Transient
        );
        assert_eq!(
            RagError::InvalidRequest("bad field".into()).category(),
            ErrorCategory::Permanent
        );
        assert_eq!(
            RagError::Internal("corrupt state".into()).category(),
            ErrorCategory::Critical
        );
    }

    #[test]
    fn test_retryable() {
        assert!(RagError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(RagError::RateLimited {
            retry_after: Duration::from_secs(60)
        }
        .is_retryable());
        assert!(!RagError::Authentication("expired key".into()).is_retryable());
    }

    #[test]
    fn test_retry_after_hint() {
        let err = RagError::RateLimited {
            retry_after: Duration::from_secs(30),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(RagError::Llm("boom".into()).retry_after(), None);
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = RagError::DatabaseConnection("password=hunter2 refused".into());
        assert!(!err.user_message().contains("hunter2"));
    }

    #[test]
    fn test_classify_foreign() {
        assert_eq!(
            classify_foreign("ConnectionError", "refused"),
            ErrorCategory::Transient
        );
        assert_eq!(
            classify_foreign("ApiError", "rate limit exceeded"),
            ErrorCategory::Transient
        );
        assert_eq!(
            classify_foreign("ValueError", "bad input"),
            ErrorCategory::Permanent
        );
        assert_eq!(
            classify_foreign("SomethingWeird", "no idea"),
            ErrorCategory::Permanent
        );
    }
}

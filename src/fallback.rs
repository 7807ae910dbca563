//! Degraded-Mode Fallbacks
//!
//! Substitute values for failed dependencies so a single outage degrades
//! the pipeline instead of aborting it. Every use is logged at warn level.

use serde_json::Value;
use tracing::warn;

/// Signal for how to degrade when the graph store is down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFallback {
    /// Skip graph traversal and answer from vector search alone
    VectorOnly,
}

/// Per-dependency fallback values
#[derive(Debug, Clone)]
pub struct FallbackRegistry {
    embedding_dimension: usize,
}

impl FallbackRegistry {
    pub fn new(embedding_dimension: usize) -> Self {
        Self {
            embedding_dimension,
        }
    }

    /// Zero vector standing in for a failed embedding call
    pub fn embedding_fallback(&self) -> Vec<f32> {
        warn!("Using zero embedding fallback");
        vec![0.0; self.embedding_dimension]
    }

    /// Templated apology standing in for a failed LLM call
    pub fn llm_fallback(&self) -> String {
        warn!("Using template response fallback");
        "I apologize, but I'm currently unable to process your request due to \
         technical difficulties. Please try again in a few moments. If the issue \
         persists, please contact support."
            .to_string()
    }

    /// Empty result list standing in for a failed search
    pub fn search_fallback(&self) -> Vec<Value> {
        warn!("Using empty results fallback");
        Vec::new()
    }

    /// Degradation signal for a failed graph query
    pub fn graph_fallback(&self) -> GraphFallback {
        warn!("Using vector-only search fallback");
        GraphFallback::VectorOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_fallback_dimension() {
        let fallbacks = FallbackRegistry::new(2048);
        let vector = fallbacks.embedding_fallback();
        assert_eq!(vector.len(), 2048);
        assert!(vector.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_llm_fallback_is_apologetic() {
        let fallbacks = FallbackRegistry::new(8);
        assert!(fallbacks.llm_fallback().contains("apologize"));
    }

    #[test]
    fn test_search_fallback_empty() {
        let fallbacks = FallbackRegistry::new(8);
        assert!(fallbacks.search_fallback().is_empty());
    }

    #[test]
    fn test_graph_fallback_signal() {
        let fallbacks = FallbackRegistry::new(8);
        assert_eq!(fallbacks.graph_fallback(), GraphFallback::VectorOnly);
    }
}

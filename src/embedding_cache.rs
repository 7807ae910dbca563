//! Embedding Cache
//!
//! Fixed-capacity LRU for raw embedding vectors, keyed by a content digest
//! of the exact text. Entries are uniform-sized, so there is no TTL and no
//! memory accounting: classic move-to-end LRU, evict from the front.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct EmbeddingTables {
    entries: HashMap<String, Vec<f32>>,
    /// Access order, least recently used at the front
    order: VecDeque<String>,
}

/// LRU cache for embedding lookups
pub struct EmbeddingCache {
    max_entries: usize,
    inner: Mutex<EmbeddingTables>,
}

impl EmbeddingCache {
    /// Create a cache holding at most `max_entries` vectors (default 5,000)
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            inner: Mutex::new(EmbeddingTables {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Content digest used as the cache key; no normalization beyond
    /// exact match
    fn content_key(text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        Some(hex::encode(Sha256::digest(text.as_bytes())))
    }

    /// Get a cached embedding, refreshing its recency.
    ///
    /// Returns a copy so callers cannot mutate cached state.
    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = Self::content_key(text)?;
        let mut inner = self.inner.lock().await;

        if let Some(embedding) = inner.entries.get(&key).cloned() {
            touch(&mut inner.order, &key);
            debug!("Embedding cache HIT: {}", &key[..16]);
            Some(embedding)
        } else {
            None
        }
    }

    /// Cache an embedding, evicting the least recently used at capacity
    pub async fn set(&self, text: &str, embedding: &[f32]) -> bool {
        let key = match Self::content_key(text) {
            Some(key) => key,
            None => return false,
        };
        if embedding.is_empty() {
            warn!("Refusing to cache empty embedding");
            return false;
        }

        let mut inner = self.inner.lock().await;

        if inner.entries.contains_key(&key) {
            touch(&mut inner.order, &key);
            return true;
        }

        while inner.entries.len() >= self.max_entries {
            match inner.order.pop_front() {
                Some(lru) => {
                    inner.entries.remove(&lru);
                }
                None => break,
            }
        }

        inner.entries.insert(key.clone(), embedding.to_vec());
        inner.order.push_back(key);
        true
    }

    /// Drop every cached vector
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of cached vectors
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Move a key to the most-recently-used position
fn touch(order: &mut VecDeque<String>, key: &str) {
    if let Some(pos) = order.iter().position(|k| k == key) {
        order.remove(pos);
    }
    order.push_back(key.to_string());
}

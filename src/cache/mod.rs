//! Hand-rolled TTL+FIFO response cache for by-metadata detection requests.
//!
//! Deliberately not `moka` (the cache the rest of this codebase reaches for):
//! FIFO eviction order and an exact admin-purge count are part of the
//! detection contract, so both are hand-verified here instead of delegated
//! to a third-party eviction policy.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::core::types::DetectionResponse;

struct Entry {
    value: DetectionResponse,
    inserted_at: Instant,
}

struct Inner {
    index: HashMap<u64, Entry>,
    order: VecDeque<u64>,
}

/// TTL + FIFO cache keyed on a pre-hashed `u64` (see [`compute_key`]).
pub struct ResponseCache {
    ttl: Duration,
    max_size: usize,
    inner: Mutex<Inner>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            inner: Mutex::new(Inner {
                index: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Returns a clone of the cached value if present and unexpired, deleting
    /// it (a miss) if it has expired since insertion. Lazy expiry: no
    /// background sweeper runs.
    pub fn get(&self, key: u64) -> Option<DetectionResponse> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let expired = match inner.index.get(&key) {
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            inner.index.remove(&key);
            inner.order.retain(|k| *k != key);
            return None;
        }
        inner.index.get(&key).map(|e| e.value.clone())
    }

    /// Insert a value, evicting the oldest entry by insertion order if the
    /// cache is at capacity. Overwriting an existing key does not change its
    /// position in the FIFO order.
    pub fn insert(&self, key: u64, value: DetectionResponse) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
        };

        if inner.index.contains_key(&key) {
            inner.index.insert(key, entry);
            return;
        }

        if inner.index.len() >= self.max_size {
            if let Some(oldest) = inner.order.pop_front() {
                inner.index.remove(&oldest);
            }
        }

        inner.index.insert(key, entry);
        inner.order.push_back(key);
    }

    /// Empties the cache, returning the number of entries removed.
    pub fn purge(&self) -> usize {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let count = inner.index.len();
        inner.index.clear();
        inner.order.clear();
        count
    }
}

#[derive(Default)]
pub struct CacheKeyParts {
    pub normalized_title: String,
    pub normalized_description_prefix: String,
    pub normalized_url: String,
    pub sorted_keywords: Vec<String>,
    pub similarity_threshold: f64,
    pub active_fields: Vec<&'static str>,
    pub max_candidates: usize,
}

/// Builds a stable `u64` cache key, grounded on the existing
/// `tools::scrape::compute_scrape_cache_key` idiom: a `|`-joined string of
/// the discriminating fields with a `DefaultHasher` digest over any
/// free-text component, formatted in `{:016x}`.
pub fn compute_key(parts: &CacheKeyParts) -> u64 {
    let mut key = format!(
        "t={:016x}|d={:016x}|u={:016x}|kw={:016x}|th={:.3}|mc={}|af=",
        hash_str(&parts.normalized_title),
        hash_str(&parts.normalized_description_prefix),
        hash_str(&parts.normalized_url),
        hash_str(&parts.sorted_keywords.join(",")),
        parts.similarity_threshold,
        parts.max_candidates,
    );
    for (i, f) in parts.active_fields.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(f);
    }
    hash_str(&key)
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Metadata;

    fn sample_response() -> DetectionResponse {
        DetectionResponse {
            source_metadata: Metadata::default(),
            threshold: 0.9,
            enrichment: None,
            candidate_search_results: Vec::new(),
            total_candidates_checked: 0,
            duplicates: Vec::new(),
        }
    }

    #[test]
    fn insert_then_get_returns_same_value_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        cache.insert(1, sample_response());
        let got = cache.get(1);
        assert!(got.is_some());
    }

    #[test]
    fn miss_for_unknown_key() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        assert!(cache.get(42).is_none());
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = ResponseCache::new(Duration::from_millis(1), 10);
        cache.insert(1, sample_response());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn fifo_eviction_removes_exactly_the_first_inserted() {
        let cache = ResponseCache::new(Duration::from_secs(60), 3);
        cache.insert(1, sample_response());
        cache.insert(2, sample_response());
        cache.insert(3, sample_response());
        cache.insert(4, sample_response());

        assert!(cache.get(1).is_none(), "oldest entry should have been evicted");
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
        assert!(cache.get(4).is_some());
    }

    #[test]
    fn purge_empties_cache_and_reports_count() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        cache.insert(1, sample_response());
        cache.insert(2, sample_response());
        assert_eq!(cache.purge(), 2);
        assert!(cache.get(1).is_none());
        assert_eq!(cache.purge(), 0);
    }

    #[test]
    fn identical_parts_hash_to_the_same_key() {
        let parts = CacheKeyParts {
            normalized_title: "islam".to_string(),
            normalized_description_prefix: "a short description".to_string(),
            normalized_url: "example.com/islam".to_string(),
            sorted_keywords: vec!["religion".to_string()],
            similarity_threshold: 0.9,
            active_fields: vec!["title", "url"],
            max_candidates: 40,
        };
        let a = compute_key(&parts);
        let b = compute_key(&parts);
        assert_eq!(a, b);
    }
}

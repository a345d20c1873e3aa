//! In-session memo of parsed scenarios.
//!
//! Entries are keyed by data file name and hold the already-validated
//! [`Scenario`], so re-selecting a scenario skips both the fetch and the parse.
//! Nothing is persisted across reloads.
//!
//! # Implementations
//!
//! - [`MemoryCache`]: In-memory memo with an optional entry limit
//! - [`NoCache`]: Passthrough implementation that remembers nothing

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::types::Scenario;

/// A store for scenarios that have already been loaded.
pub trait ScenarioCache: Send + Sync {
    /// Get a previously stored scenario.
    fn get(&self, file: &str) -> Option<Arc<Scenario>>;

    /// Store a scenario under its data file name.
    fn put(&self, file: &str, scenario: Arc<Scenario>);

    /// Forget every stored scenario.
    fn clear(&self);
}

/// A cache that stores nothing (passthrough).
#[derive(Debug, Clone, Default)]
pub struct NoCache;

impl NoCache {
    /// Create a new no-op cache.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ScenarioCache for NoCache {
    fn get(&self, _file: &str) -> Option<Arc<Scenario>> {
        None
    }

    fn put(&self, _file: &str, _scenario: Arc<Scenario>) {}

    fn clear(&self) {}
}

/// An in-memory scenario memo.
///
/// With an entry limit, the least recently inserted scenario is dropped first.
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<RwLock<MemoryCacheInner>>,
    max_entries: Option<usize>,
}

#[derive(Debug, Default)]
struct MemoryCacheInner {
    entries: HashMap<String, Arc<Scenario>>,
    /// Insertion order for eviction.
    order: Vec<String>,
}

impl MemoryCache {
    /// Create a memo with no entry limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memo holding at most `max_entries` scenarios.
    #[must_use]
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            inner: Arc::default(),
            max_entries: Some(max_entries),
        }
    }

    /// Get the number of stored scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Check if the memo is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScenarioCache for MemoryCache {
    fn get(&self, file: &str) -> Option<Arc<Scenario>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(file).cloned()
    }

    fn put(&self, file: &str, scenario: Arc<Scenario>) {
        if self.max_entries == Some(0) {
            return;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner.entries.remove(file).is_some() {
            inner.order.retain(|k| k != file);
        }

        if let Some(max_entries) = self.max_entries {
            while inner.entries.len() >= max_entries && !inner.order.is_empty() {
                let oldest = inner.order.remove(0);
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(file.to_string(), scenario);
        inner.order.push(file.to_string());
    }

    fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::TWO_STEP_JSON;

    fn scenario() -> Arc<Scenario> {
        Arc::new(Scenario::from_json(TWO_STEP_JSON.as_bytes()).unwrap())
    }

    #[test]
    fn test_no_cache() {
        let cache = NoCache::new();
        cache.put("a.json", scenario());
        assert!(cache.get("a.json").is_none());
    }

    #[test]
    fn test_memory_cache_basic() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());

        let stored = scenario();
        cache.put("a.json", Arc::clone(&stored));
        assert_eq!(cache.len(), 1);

        let hit = cache.get("a.json").unwrap();
        assert!(Arc::ptr_eq(&hit, &stored));
        assert!(cache.get("b.json").is_none());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_eviction() {
        let cache = MemoryCache::with_max_entries(2);

        cache.put("a.json", scenario());
        cache.put("b.json", scenario());
        cache.put("c.json", scenario());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a.json").is_none());
        assert!(cache.get("b.json").is_some());
        assert!(cache.get("c.json").is_some());
    }

    #[test]
    fn test_memory_cache_replace_keeps_single_entry() {
        let cache = MemoryCache::with_max_entries(2);

        cache.put("a.json", scenario());
        cache.put("b.json", scenario());
        let replacement = scenario();
        cache.put("a.json", Arc::clone(&replacement));

        assert_eq!(cache.len(), 2);
        assert!(Arc::ptr_eq(&cache.get("a.json").unwrap(), &replacement));
        assert!(cache.get("b.json").is_some());
    }

    #[test]
    fn test_memory_cache_shared_between_clones() {
        let cache = MemoryCache::new();
        let clone = cache.clone();

        clone.put("a.json", scenario());
        assert!(cache.get("a.json").is_some());
    }
}

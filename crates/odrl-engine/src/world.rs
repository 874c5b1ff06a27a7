//! Mutable fact store consulted during evaluation.

use crate::error::{OdrlError, Result};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::HashMap;

/// Read access to world facts.
pub trait FactSource {
    /// Returns the value stored under `key`.
    fn fact(&self, key: &str) -> Option<&str>;
}

impl FactSource for HashMap<String, String> {
    fn fact(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// Thread-safe string key/value store owned by one engine.
///
/// Writers are serialized against each other and against readers; an
/// evaluation holds a read guard for its whole duration, so it observes a
/// single consistent view.
#[derive(Debug, Default)]
pub struct WorldStore {
    facts: RwLock<HashMap<String, String>>,
}

impl WorldStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.facts.read().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(OdrlError::MalformedQuery("world key must not be empty".to_string()));
        }
        let value = value.into();
        tracing::debug!(key = %key, value = %value, "world fact set");
        self.facts.write().insert(key, value);
        Ok(())
    }

    /// Removes `key`; returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        let existed = self.facts.write().remove(key).is_some();
        tracing::debug!(key = %key, existed, "world fact removed");
        existed
    }

    /// Sorted list of the keys currently stored.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.facts.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.facts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.read().is_empty()
    }

    /// Removes every fact.
    pub fn clear(&self) {
        self.facts.write().clear();
    }

    /// Holds a read guard for the duration of an evaluation.
    pub fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.facts.read()
    }

    /// Copies the current contents.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.facts.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_round_trip() {
        let world = WorldStore::new();
        world.set("k", "v").unwrap();
        assert_eq!(world.get("k").as_deref(), Some("v"));

        world.set("k", "w").unwrap();
        assert_eq!(world.get("k").as_deref(), Some("w"));

        assert!(world.remove("k"));
        assert_eq!(world.get("k"), None);
        assert!(!world.remove("k"));
    }

    #[test]
    fn test_empty_key_leaves_store_untouched() {
        let world = WorldStore::new();
        world.set("a", "1").unwrap();
        let err = world.set("", "x").unwrap_err();
        assert!(matches!(err, OdrlError::MalformedQuery(_)));
        assert_eq!(world.snapshot().len(), 1);
    }

    #[test]
    fn test_fact_source_reads_guard() {
        let world = WorldStore::new();
        world.set("dateTime", "2024-01-01").unwrap();
        let guard = world.read();
        assert_eq!(guard.fact("dateTime"), Some("2024-01-01"));
        assert_eq!(guard.fact("missing"), None);
    }

    #[test]
    fn test_concurrent_writers_lose_nothing() {
        let world = Arc::new(WorldStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let world = Arc::clone(&world);
                thread::spawn(move || {
                    for i in 0..100 {
                        world.set(format!("t{}:{}", t, i), i.to_string()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(world.len(), 800);
        assert_eq!(world.keys()[0], "t0:0");
    }
}

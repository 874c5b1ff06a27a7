//! Table of live engines addressed by opaque handles.
//!
//! Handles are non-zero `u64` tokens that are never reused within a process,
//! so a closed handle stays invalid forever. `0` is reserved as the failure
//! sentinel returned by `create` at the boundary.

use crate::config::EngineConfig;
use crate::engine::PolicyEngine;
use crate::error::{OdrlError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Handle value that never refers to an engine.
pub const NULL_HANDLE: u64 = 0;

static GLOBAL: OnceLock<EngineRegistry> = OnceLock::new();

/// Process-wide registry used by the C boundary.
pub fn global() -> &'static EngineRegistry {
    GLOBAL.get_or_init(EngineRegistry::new)
}

/// Owns every open engine.
#[derive(Debug)]
pub struct EngineRegistry {
    engines: RwLock<HashMap<u64, Arc<PolicyEngine>>>,
    next: AtomicU64,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: RwLock::new(HashMap::new()),
            next: AtomicU64::new(1),
        }
    }

    fn next_handle(&self) -> u64 {
        loop {
            let handle = self.next.fetch_add(1, Ordering::Relaxed);
            if handle != NULL_HANDLE {
                return handle;
            }
        }
    }

    /// Loads `document` and registers the resulting engine.
    pub fn create(&self, document: &str, config: EngineConfig) -> Result<u64> {
        let engine = PolicyEngine::with_config(document, config)?;
        Ok(self.insert(engine))
    }

    /// Registers an already built engine.
    pub fn insert(&self, engine: PolicyEngine) -> u64 {
        let handle = self.next_handle();
        self.engines.write().insert(handle, Arc::new(engine));
        tracing::info!(handle, "engine handle opened");
        handle
    }

    /// Looks up a live engine.
    pub fn get(&self, handle: u64) -> Result<Arc<PolicyEngine>> {
        self.engines
            .read()
            .get(&handle)
            .cloned()
            .ok_or(OdrlError::InvalidHandle(handle))
    }

    /// Releases an engine. Closing an unknown or already closed handle is a no-op.
    ///
    /// Returns whether the handle was live. Calls already holding the engine
    /// finish against it; it is dropped when the last of them returns.
    pub fn close(&self, handle: u64) -> bool {
        let removed = self.engines.write().remove(&handle).is_some();
        if removed {
            tracing::info!(handle, "engine handle closed");
        }
        removed
    }

    /// Number of live engines.
    pub fn len(&self) -> usize {
        self.engines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{"type": "Set", "target": "urn:asset:T", "permission": [{"action": "use"}]}"#;

    #[test]
    fn test_lifecycle() {
        let registry = EngineRegistry::new();
        let handle = registry.create(DOC, EngineConfig::default()).unwrap();
        assert_ne!(handle, NULL_HANDLE);
        assert_eq!(registry.len(), 1);

        let engine = registry.get(handle).unwrap();
        assert!(engine.evaluate("use", "urn:asset:T", "a", "b").unwrap().is_allowed());

        assert!(registry.close(handle));
        assert!(!registry.close(handle));
        assert!(matches!(registry.get(handle), Err(OdrlError::InvalidHandle(h)) if h == handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handles_are_independent_and_not_reused() {
        let registry = EngineRegistry::new();
        let a = registry.create(DOC, EngineConfig::default()).unwrap();
        let b = registry.create(DOC, EngineConfig::default()).unwrap();
        assert_ne!(a, b);

        registry.get(a).unwrap().world_set("k", "v").unwrap();
        assert_eq!(registry.get(b).unwrap().world_get("k"), None);

        registry.close(a);
        let c = registry.create(DOC, EngineConfig::default()).unwrap();
        assert_ne!(c, a);
    }

    #[test]
    fn test_failed_load_registers_nothing() {
        let registry = EngineRegistry::new();
        let err = registry.create("{\"uid\": \"x\"}", EngineConfig::default()).unwrap_err();
        assert!(err.is_parse_error());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_closed_engine_outlives_inflight_reference() {
        let registry = EngineRegistry::new();
        let handle = registry.create(DOC, EngineConfig::default()).unwrap();
        let engine = registry.get(handle).unwrap();
        registry.close(handle);
        assert!(engine.evaluate("use", "urn:asset:T", "a", "b").unwrap().is_allowed());
    }
}

//! WASM bindings for the ODRL engine.

#![cfg(feature = "wasm")]

use crate::engine::PolicyEngine;
use crate::error::OdrlError;
use wasm_bindgen::prelude::*;

fn js_error(err: OdrlError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// WASM-compatible engine wrapper owning one policy and its world.
#[wasm_bindgen]
pub struct WasmOdrlEngine {
    engine: PolicyEngine,
}

#[wasm_bindgen]
impl WasmOdrlEngine {
    /// Loads a policy document (JSON or YAML).
    #[wasm_bindgen(constructor)]
    pub fn new(document: &str) -> Result<WasmOdrlEngine, JsValue> {
        let engine = PolicyEngine::from_document(document).map_err(js_error)?;
        Ok(Self { engine })
    }

    /// Evaluates a query and returns the decision as a JSON string.
    #[wasm_bindgen]
    pub fn evaluate(&self, action: &str, target: &str, assigner: &str, assignee: &str) -> Result<String, JsValue> {
        let decision = self
            .engine
            .evaluate(action, target, assigner, assignee)
            .map_err(js_error)?;
        decision.to_json().map_err(js_error)
    }

    /// Quick evaluation that returns true only for an allow verdict.
    #[wasm_bindgen]
    pub fn is_allowed(&self, action: &str, target: &str, assigner: &str, assignee: &str) -> Result<bool, JsValue> {
        let decision = self
            .engine
            .evaluate(action, target, assigner, assignee)
            .map_err(js_error)?;
        Ok(decision.is_allowed())
    }

    #[wasm_bindgen]
    pub fn world_set(&self, key: &str, value: &str) -> Result<(), JsValue> {
        self.engine.world_set(key, value).map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn world_get(&self, key: &str) -> Option<String> {
        self.engine.world_get(key)
    }

    #[wasm_bindgen]
    pub fn world_remove(&self, key: &str) -> bool {
        self.engine.world_remove(key)
    }

    /// Keys currently in the world, sorted.
    #[wasm_bindgen]
    pub fn world_keys(&self) -> js_sys::Array {
        self.engine
            .world()
            .keys()
            .into_iter()
            .map(|key| JsValue::from_str(&key))
            .collect()
    }

    /// Digest of the loaded policy document.
    #[wasm_bindgen]
    pub fn digest(&self) -> String {
        self.engine.policy().digest.clone()
    }
}

/// Logs a message to the console (for debugging).
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Returns the version of the engine.
#[wasm_bindgen]
pub fn version() -> String {
    crate::VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Native run: JsValue cannot be built off wasm32, so only calls that succeed are made.
    #[test]
    fn test_wasm_engine_success_path() {
        let engine = WasmOdrlEngine::new(
            r#"{"type": "Set", "target": "urn:asset:T", "permission": [{"action": "use",
                "constraint": {"leftOperand": "count", "operator": "lt", "rightOperand": 3}}]}"#,
        )
        .unwrap_or_else(|_| panic!("policy should load"));

        engine.world_set("count", "1").unwrap_or_else(|_| panic!("set failed"));
        assert_eq!(engine.world_get("count").as_deref(), Some("1"));
        assert!(engine.is_allowed("use", "urn:asset:T", "a", "b").unwrap_or(false));

        let json = engine
            .evaluate("use", "urn:asset:T", "a", "b")
            .unwrap_or_else(|_| panic!("evaluate failed"));
        assert!(json.contains("\"allow\""));
        assert!(engine.world_remove("count"));
        assert!(engine.digest().starts_with("p:"));
    }
}

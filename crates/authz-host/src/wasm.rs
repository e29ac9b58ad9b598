//! WASM bindings for the access control engine.

#![cfg(feature = "wasm")]

use crate::context::RequestContext;
use crate::evaluator::AccessEvaluator;
use crate::rule_set::RuleSet;
use wasm_bindgen::prelude::*;

/// WASM-compatible access engine wrapper.
#[wasm_bindgen]
pub struct WasmAccessEngine {
    evaluator: AccessEvaluator,
}

#[wasm_bindgen]
impl WasmAccessEngine {
    /// Creates an engine with an empty rule set.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            evaluator: AccessEvaluator::default(),
        }
    }

    /// Replaces the rules with parsed directive text.
    #[wasm_bindgen]
    pub fn load_directives(&self, text: &str) -> Result<(), JsValue> {
        self.evaluator
            .reload_from_directives(text)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Replaces the rules with a rule set in JSON form.
    #[wasm_bindgen]
    pub fn load_rule_set_json(&self, json: &str) -> Result<(), JsValue> {
        let rule_set = RuleSet::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.evaluator.reload(rule_set);
        Ok(())
    }

    /// Evaluates a request context (JSON string).
    /// Returns the decision as a JSON string.
    #[wasm_bindgen]
    pub fn evaluate(&self, context_json: &str) -> Result<String, JsValue> {
        let context: RequestContext = serde_json::from_str(context_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid context: {}", e)))?;

        let decision = self.evaluator.check(&context);

        serde_json::to_string(&decision).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Quick evaluation that returns just allowed/forbidden as a boolean.
    #[wasm_bindgen]
    pub fn is_allowed(&self, context_json: &str) -> Result<bool, JsValue> {
        let context: RequestContext = serde_json::from_str(context_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid context: {}", e)))?;

        Ok(self.evaluator.is_allowed(&context))
    }

    /// Canonical directive text of the loaded rules.
    #[wasm_bindgen]
    pub fn directives(&self) -> String {
        self.evaluator.current().to_directives()
    }

    /// Fingerprint of the loaded rules.
    #[wasm_bindgen]
    pub fn fingerprint(&self) -> String {
        self.evaluator.current().fingerprint()
    }
}

impl Default for WasmAccessEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs a message to the console (for debugging).
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Returns the version of the access engine.
#[wasm_bindgen]
pub fn version() -> String {
    crate::VERSION.to_string()
}

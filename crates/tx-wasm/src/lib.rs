//! WebAssembly bindings for the TexSwap extension glue.
//!
//! The service worker keeps ownership of the browser APIs (the declarative
//! rule engine, storage, messaging) and calls in here for the semantics:
//! rule-file parsing, id assignment and switch-plan computation. Plans are
//! returned as plain JS objects the glue can feed straight into the host API.

use std::sync::OnceLock;

use wasm_bindgen::prelude::*;

use tx_core::plan::plan_switch as compute_plan;
use tx_core::{parse_rule_file, Rule, RuleSetDescriptor, RuleSetRegistry, Selection};

static REGISTRY: OnceLock<RuleSetRegistry> = OnceLock::new();

/// Install the built-in rule-set registry (minecraft / vanilla / combat).
#[wasm_bindgen]
pub fn init() -> Result<(), JsValue> {
    REGISTRY
        .set(RuleSetRegistry::builtin())
        .map_err(|_| JsValue::from_str("Already initialized. Reload the page to reinitialize."))
}

/// Install a custom registry from a JSON array of descriptors
/// (`[{key, staticRulesetId, idBase}, ...]`).
#[wasm_bindgen]
pub fn init_with_registry(registry_json: &str) -> Result<(), JsValue> {
    let descriptors: Vec<RuleSetDescriptor> = serde_json::from_str(registry_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid registry: {e}")))?;
    REGISTRY
        .set(RuleSetRegistry::new(descriptors))
        .map_err(|_| JsValue::from_str("Already initialized. Reload the page to reinitialize."))
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    REGISTRY.get().is_some()
}

#[wasm_bindgen]
pub fn registry_info() -> JsValue {
    let result = js_sys::Object::new();
    match REGISTRY.get() {
        Some(registry) => {
            let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(true));
            let keys = js_sys::Array::new();
            for descriptor in registry.iter() {
                keys.push(&JsValue::from_str(&descriptor.key));
            }
            let _ = js_sys::Reflect::set(&result, &"ruleSets".into(), &keys);
        }
        None => {
            let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(false));
        }
    }
    result.into()
}

/// Compute the host-API calls for switching to `target`.
///
/// `installed_ids` is every currently installed dynamic-rule id;
/// `rules_json` is the fetched resource file for the target, if any. A
/// missing or malformed file degrades to an empty rule list, matching the
/// coordinator. Returns `{removeRuleIds, addRules, disableRulesetIds,
/// enableRulesetId}`; fails for an unknown key or before `init`.
#[wasm_bindgen]
pub fn plan_switch(
    target: &str,
    installed_ids: Vec<u32>,
    rules_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let registry = REGISTRY
        .get()
        .ok_or_else(|| JsValue::from_str("Not initialized"))?;

    let rules = match rules_json.as_deref() {
        Some(text) => parse_rules_lenient(target, text),
        None => Vec::new(),
    };

    let plan = compute_plan(
        registry,
        &installed_ids,
        &Selection::from_key(target),
        rules,
    )
    .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let result = js_sys::Object::new();

    let remove = js_sys::Array::new();
    for id in &plan.remove_rule_ids {
        remove.push(&JsValue::from(*id));
    }
    let _ = js_sys::Reflect::set(&result, &"removeRuleIds".into(), &remove);

    let add_rules_json = serde_json::to_string(&plan.add_rules)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize rules: {e}")))?;
    let add_rules = js_sys::JSON::parse(&add_rules_json)?;
    let _ = js_sys::Reflect::set(&result, &"addRules".into(), &add_rules);

    let disable = js_sys::Array::new();
    for id in &plan.disable_ruleset_ids {
        disable.push(&JsValue::from_str(id));
    }
    let _ = js_sys::Reflect::set(&result, &"disableRulesetIds".into(), &disable);

    match &plan.enable_ruleset_id {
        Some(id) => {
            let _ = js_sys::Reflect::set(&result, &"enableRulesetId".into(), &JsValue::from_str(id));
        }
        None => {
            let _ = js_sys::Reflect::set(&result, &"enableRulesetId".into(), &JsValue::NULL);
        }
    }

    Ok(result.into())
}

/// Validate a rule resource file. Returns the rule count, or throws with the
/// parse failure.
#[wasm_bindgen]
pub fn parse_rules(rules_json: &str) -> Result<u32, JsValue> {
    let rules = parse_rule_file(rules_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(rules.len() as u32)
}

/// Normalize a stored selection for popup startup: unknown keys and absent
/// values both come back as `"none"`.
#[wasm_bindgen]
pub fn current_or_none(stored: Option<String>) -> String {
    let Some(registry) = REGISTRY.get() else {
        return "none".to_string();
    };
    match stored.as_deref().map(Selection::from_key) {
        Some(Selection::RuleSet(key)) if registry.contains(&key) => key,
        _ => "none".to_string(),
    }
}

fn parse_rules_lenient(target: &str, text: &str) -> Vec<Rule> {
    match parse_rule_file(text) {
        Ok(rules) => rules,
        Err(e) => {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "Failed to parse rules for {target}: {e}"
            )));
            Vec::new()
        }
    }
}

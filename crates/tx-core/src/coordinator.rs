//! The rule coordinator.
//!
//! Owns the authoritative active-selection value and drives the host engine
//! through switches. A switch always passes through "disable everything"
//! before enabling the target, so there is no Active(A) to Active(B) path
//! that could leave two id ranges installed at once.
//!
//! All coordinator state sits behind one mutex and a switch holds it end to
//! end, so overlapping switch commands (two open panels, say) serialize
//! instead of interleaving their disable and enable phases.

use std::sync::{Mutex, PoisonError};

use crate::host::{ChangeNotifier, HostApiError, PreferenceStore, RuleEngine, RuleSource};
use crate::messages::{Notification, Request, Response};
use crate::plan::plan_switch;
use crate::rules::{parse_rule_file, Rule};
use crate::types::{RuleSetRegistry, Selection, ACTIVE_SELECTION_KEY};

/// Error switching rule sets.
///
/// Host failures are carried as sources with a phase-specific message; the
/// panel only ever sees the rendered string. There is no rollback: a failure
/// mid-switch can leave partial host state behind, repaired by the next
/// [`Coordinator::initialize`].
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("unknown rule set: {0}")]
    UnknownRuleSet(String),
    #[error("failed to disable active rules: {0}")]
    Disable(#[source] HostApiError),
    #[error("failed to install rules for '{key}': {source}")]
    Install { key: String, source: HostApiError },
    #[error("failed to persist selection '{key}': {source}")]
    Persist { key: String, source: HostApiError },
}

/// Coordinates rule-set switches against the injected host capabilities.
pub struct Coordinator<E, S, R, N> {
    inner: Mutex<Inner<E, S, R, N>>,
}

struct Inner<E, S, R, N> {
    registry: RuleSetRegistry,
    engine: E,
    store: S,
    source: R,
    notifier: N,
}

impl<E, S, R, N> Coordinator<E, S, R, N>
where
    E: RuleEngine,
    S: PreferenceStore,
    R: RuleSource,
    N: ChangeNotifier,
{
    pub fn new(registry: RuleSetRegistry, engine: E, store: S, source: R, notifier: N) -> Self {
        Self {
            inner: Mutex::new(Inner {
                registry,
                engine,
                store,
                source,
                notifier,
            }),
        }
    }

    /// Startup resync: the host's rule state does not necessarily survive a
    /// restart of the coordinating process, so replay the persisted selection
    /// into the engine. A persisted `none` is left alone.
    pub fn initialize(&self) {
        let selection = self.current_selection();
        if selection.is_none() {
            return;
        }
        if let Err(e) = self.switch_to(selection.clone()) {
            log::error!("failed to restore rule set '{selection}': {e}");
        }
    }

    /// Switch the active rule set and persist the choice.
    pub fn switch_to(&self, target: Selection) -> Result<Selection, SwitchError> {
        let mut inner = self.lock();
        inner.switch_to(target)
    }

    /// The persisted selection. Fails open to [`Selection::None`] on any read
    /// failure or an unknown stored key; never errors.
    pub fn current_selection(&self) -> Selection {
        let inner = self.lock();
        inner.current_selection()
    }

    /// Message entry point for the panel protocol.
    pub fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::SwitchRuleSet { rule_set } => {
                match self.switch_to(Selection::from_key(&rule_set)) {
                    Ok(active) => Response::success(active.as_key()),
                    Err(e) => {
                        log::error!("switch to '{rule_set}' failed: {e}");
                        Response::failure(e.to_string())
                    }
                }
            }
        }
    }

    /// Raw-JSON variant of [`Coordinator::handle_request`] for the message
    /// boundary. Unparseable requests get a failure response, not an error:
    /// an unrecognized `type` tag is reported as such, while a known type
    /// with a bad payload reports what was wrong with it.
    pub fn handle_request_json(&self, json: &str) -> String {
        let response = match serde_json::from_str::<Request>(json) {
            Ok(request) => self.handle_request(request),
            Err(e) if request_type_of(json).is_some_and(|t| Request::known_type(&t)) => {
                Response::failure(format!("malformed request: {e}"))
            }
            Err(_) => Response::failure("unknown message type"),
        };
        serde_json::to_string(&response).unwrap_or_else(|_| {
            r#"{"success":false,"error":"internal serialization failure"}"#.to_string()
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<E, S, R, N>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The `type` tag of a raw request, if the JSON parses at all.
fn request_type_of(json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    value
        .get("type")
        .and_then(|t| t.as_str())
        .map(str::to_string)
}

impl<E, S, R, N> Inner<E, S, R, N>
where
    E: RuleEngine,
    S: PreferenceStore,
    R: RuleSource,
    N: ChangeNotifier,
{
    fn switch_to(&mut self, target: Selection) -> Result<Selection, SwitchError> {
        // Validate and load before touching the host, so an unknown key or a
        // bad resource file never tears existing rules down.
        if let Selection::RuleSet(key) = &target {
            if !self.registry.contains(key) {
                return Err(SwitchError::UnknownRuleSet(key.clone()));
            }
        }
        let rules = match &target {
            Selection::None => Vec::new(),
            Selection::RuleSet(key) => self.load_rules(key),
        };

        let installed = self.engine.dynamic_rule_ids().map_err(SwitchError::Disable)?;
        let plan = plan_switch(&self.registry, &installed, &target, rules)
            .map_err(|e| SwitchError::UnknownRuleSet(e.0))?;

        if !plan.remove_rule_ids.is_empty() {
            self.engine
                .remove_dynamic_rules(&plan.remove_rule_ids)
                .map_err(SwitchError::Disable)?;
        }
        self.engine
            .disable_static_rulesets(&plan.disable_ruleset_ids)
            .map_err(SwitchError::Disable)?;

        if !plan.add_rules.is_empty() {
            self.engine
                .add_dynamic_rules(&plan.add_rules)
                .map_err(|source| SwitchError::Install {
                    key: target.as_key().to_string(),
                    source,
                })?;
        }
        // The static variant is best-effort; the dynamic rules above already
        // cover the swap when it is not shipped.
        if let Some(ruleset_id) = &plan.enable_ruleset_id {
            if let Err(e) = self.engine.enable_static_ruleset(ruleset_id) {
                log::info!("static ruleset '{ruleset_id}' not available, using dynamic only: {e}");
            }
        }

        self.store
            .set(ACTIVE_SELECTION_KEY, target.as_key())
            .map_err(|source| SwitchError::Persist {
                key: target.as_key().to_string(),
                source,
            })?;

        let note = Notification::RuleSetChanged {
            rule_set: target.as_key().to_string(),
        };
        if self.notifier.notify(&note).is_err() {
            log::debug!("no panel listening for rule set change");
        }

        Ok(target)
    }

    fn current_selection(&self) -> Selection {
        let stored = match self.store.get(ACTIVE_SELECTION_KEY) {
            Ok(Some(key)) => key,
            Ok(None) => return Selection::None,
            Err(e) => {
                log::warn!("failed to read active selection: {e}");
                return Selection::None;
            }
        };
        let selection = Selection::from_key(&stored);
        match &selection {
            Selection::RuleSet(key) if !self.registry.contains(key) => {
                log::warn!("persisted selection '{key}' is not a known rule set");
                Selection::None
            }
            _ => selection,
        }
    }

    fn load_rules(&self, key: &str) -> Vec<Rule> {
        let text = match self.source.load(key) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("failed to load rule file for '{key}': {e}");
                return Vec::new();
            }
        };
        match parse_rule_file(&text) {
            Ok(rules) => rules,
            Err(e) => {
                log::warn!("failed to parse rule file for '{key}': {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryEngine, MemoryNotifier, MemorySource, MemoryStore};
    use crate::panel::PanelState;

    const MINECRAFT_RULES: &str = r#"[
        {"action": {"type": "redirect", "redirect": {"url": "https://cdn.example/mc/grass.png"}},
         "condition": {"urlFilter": "grass.png"}},
        {"action": {"type": "redirect", "redirect": {"url": "https://cdn.example/mc/stone.png"}},
         "condition": {"urlFilter": "stone.png"}}
    ]"#;

    const VANILLA_RULES: &str = r#"{"rules": [
        {"action": {"type": "redirect", "redirect": {"url": "https://cdn.example/v/grass.png"}},
         "condition": {"urlFilter": "grass.png"}},
        {"action": {"type": "redirect", "redirect": {"url": "https://cdn.example/v/dirt.png"}},
         "condition": {"urlFilter": "dirt.png"}}
    ]}"#;

    struct Harness {
        engine: MemoryEngine,
        store: MemoryStore,
        source: MemorySource,
        notifier: MemoryNotifier,
        coordinator: Coordinator<MemoryEngine, MemoryStore, MemorySource, MemoryNotifier>,
    }

    fn harness() -> Harness {
        let engine = MemoryEngine::new();
        let store = MemoryStore::new();
        let source = MemorySource::new();
        let notifier = MemoryNotifier::new();
        source.insert("minecraft", MINECRAFT_RULES);
        source.insert("vanilla", VANILLA_RULES);
        let coordinator = Coordinator::new(
            RuleSetRegistry::builtin(),
            engine.clone(),
            store.clone(),
            source.clone(),
            notifier.clone(),
        );
        Harness {
            engine,
            store,
            source,
            notifier,
            coordinator,
        }
    }

    #[test]
    fn test_switch_to_none_clears_everything() {
        let h = harness();
        h.engine.ship_static_ruleset("minecraft_textures");
        h.coordinator
            .switch_to(Selection::from_key("minecraft"))
            .unwrap();
        assert!(!h.engine.installed_dynamic_ids().is_empty());
        assert!(!h.engine.enabled_static_rulesets().is_empty());

        h.coordinator.switch_to(Selection::None).unwrap();
        assert!(h.engine.installed_dynamic_ids().is_empty());
        assert!(h.engine.enabled_static_rulesets().is_empty());
        assert_eq!(h.store.value(ACTIVE_SELECTION_KEY).as_deref(), Some("none"));
    }

    #[test]
    fn test_switch_never_mixes_id_ranges() {
        let h = harness();
        h.coordinator
            .switch_to(Selection::from_key("minecraft"))
            .unwrap();
        assert_eq!(h.engine.installed_dynamic_ids(), vec![1000, 1001]);

        h.coordinator
            .switch_to(Selection::from_key("vanilla"))
            .unwrap();
        assert_eq!(h.engine.installed_dynamic_ids(), vec![2000, 2001]);
    }

    #[test]
    fn test_current_selection_fails_open() {
        let h = harness();
        h.store.insert(ACTIVE_SELECTION_KEY, "vanilla");
        assert_eq!(
            h.coordinator.current_selection(),
            Selection::from_key("vanilla")
        );

        h.store.fail_reads(true);
        assert_eq!(h.coordinator.current_selection(), Selection::None);

        h.store.fail_reads(false);
        h.store.insert(ACTIVE_SELECTION_KEY, "not_a_known_set");
        assert_eq!(h.coordinator.current_selection(), Selection::None);
    }

    #[test]
    fn test_missing_rule_file_degrades_to_empty() {
        let h = harness();
        h.engine.ship_static_ruleset("combat_textures");
        // No "combat" entry in the source at all.
        let active = h.coordinator.switch_to(Selection::from_key("combat")).unwrap();
        assert_eq!(active, Selection::from_key("combat"));
        assert!(h.engine.installed_dynamic_ids().is_empty());
        // The static enable attempt still happened.
        assert_eq!(
            h.engine.enabled_static_rulesets(),
            vec!["combat_textures".to_string()]
        );
        assert_eq!(
            h.store.value(ACTIVE_SELECTION_KEY).as_deref(),
            Some("combat")
        );
    }

    #[test]
    fn test_malformed_rule_file_degrades_to_empty() {
        let h = harness();
        h.source.insert("vanilla", "{not json");
        let active = h.coordinator.switch_to(Selection::from_key("vanilla")).unwrap();
        assert_eq!(active, Selection::from_key("vanilla"));
        assert!(h.engine.installed_dynamic_ids().is_empty());
    }

    #[test]
    fn test_missing_static_ruleset_is_tolerated() {
        let h = harness();
        // Nothing shipped: every static enable fails, the switch still works.
        h.coordinator
            .switch_to(Selection::from_key("vanilla"))
            .unwrap();
        assert_eq!(h.engine.installed_dynamic_ids(), vec![2000, 2001]);
        assert!(h.engine.enabled_static_rulesets().is_empty());
    }

    #[test]
    fn test_unknown_key_fails_before_mutation() {
        let h = harness();
        h.coordinator
            .switch_to(Selection::from_key("minecraft"))
            .unwrap();
        let err = h
            .coordinator
            .switch_to(Selection::from_key("sci_fi"))
            .unwrap_err();
        assert!(matches!(err, SwitchError::UnknownRuleSet(key) if key == "sci_fi"));
        // The previously active rules were not torn down.
        assert_eq!(h.engine.installed_dynamic_ids(), vec![1000, 1001]);
        assert_eq!(
            h.store.value(ACTIVE_SELECTION_KEY).as_deref(),
            Some("minecraft")
        );
    }

    #[test]
    fn test_engine_failure_surfaces_descriptively() {
        let h = harness();
        h.engine.fail_all(true);
        let err = h
            .coordinator
            .switch_to(Selection::from_key("vanilla"))
            .unwrap_err();
        assert!(matches!(err, SwitchError::Disable(_)));
        assert!(err.to_string().contains("disable"));
    }

    #[test]
    fn test_persist_failure_surfaces_descriptively() {
        let h = harness();
        h.store.insert(ACTIVE_SELECTION_KEY, "minecraft");
        h.store.fail_writes(true);
        let err = h
            .coordinator
            .switch_to(Selection::from_key("vanilla"))
            .unwrap_err();
        assert!(matches!(err, SwitchError::Persist { ref key, .. } if key == "vanilla"));
        assert!(err.to_string().contains("persist"));
        // The stored selection is untouched; the next resync repairs the
        // already-mutated engine state from it.
        assert_eq!(
            h.store.value(ACTIVE_SELECTION_KEY).as_deref(),
            Some("minecraft")
        );
    }

    #[test]
    fn test_switch_persists_and_broadcasts() {
        let h = harness();
        h.coordinator
            .switch_to(Selection::from_key("vanilla"))
            .unwrap();
        assert_eq!(
            h.store.value(ACTIVE_SELECTION_KEY).as_deref(),
            Some("vanilla")
        );
        assert_eq!(
            h.notifier.notes(),
            vec![Notification::RuleSetChanged {
                rule_set: "vanilla".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_listener_is_not_an_error() {
        let h = harness();
        h.notifier.set_listening(false);
        h.coordinator
            .switch_to(Selection::from_key("vanilla"))
            .unwrap();
        assert!(h.notifier.notes().is_empty());
    }

    #[test]
    fn test_initialize_replays_persisted_selection() {
        let h = harness();
        h.store.insert(ACTIVE_SELECTION_KEY, "minecraft");
        // Simulates a restart: store says minecraft, engine is empty.
        h.coordinator.initialize();
        assert_eq!(h.engine.installed_dynamic_ids(), vec![1000, 1001]);
    }

    #[test]
    fn test_initialize_with_none_is_a_no_op() {
        let h = harness();
        h.coordinator.initialize();
        assert!(h.engine.installed_dynamic_ids().is_empty());
        assert!(h.notifier.notes().is_empty());
    }

    #[test]
    fn test_handle_request_wraps_outcomes() {
        let h = harness();
        let ok = h.coordinator.handle_request(Request::SwitchRuleSet {
            rule_set: "vanilla".to_string(),
        });
        assert_eq!(ok, Response::success("vanilla"));

        let err = h.coordinator.handle_request(Request::SwitchRuleSet {
            rule_set: "sci_fi".to_string(),
        });
        assert_eq!(err, Response::failure("unknown rule set: sci_fi"));
    }

    #[test]
    fn test_handle_request_json_rejects_unknown_types() {
        let h = harness();
        let raw = h
            .coordinator
            .handle_request_json(r#"{"type": "reloadEverything"}"#);
        let response: Response = serde_json::from_str(&raw).unwrap();
        assert_eq!(response, Response::failure("unknown message type"));

        let raw = h.coordinator.handle_request_json("{not json");
        let response: Response = serde_json::from_str(&raw).unwrap();
        assert_eq!(response, Response::failure("unknown message type"));
    }

    #[test]
    fn test_handle_request_json_reports_malformed_payloads() {
        let h = harness();
        // Known type, missing its ruleSet field.
        let raw = h.coordinator.handle_request_json(r#"{"type": "switchRuleSet"}"#);
        let response: Response = serde_json::from_str(&raw).unwrap();
        match response {
            Response::Failure { error, .. } => {
                assert!(error.starts_with("malformed request:"), "got: {error}");
                assert!(error.contains("ruleSet"), "got: {error}");
            }
            Response::Success { .. } => panic!("expected a failure response"),
        }
    }

    #[test]
    fn test_end_to_end_switch_updates_both_panels() {
        let h = harness();
        let mut panel = PanelState::open(h.coordinator.current_selection());
        let mut other_panel = PanelState::open(h.coordinator.current_selection());

        panel.select(Selection::from_key("vanilla"));
        let request = panel.confirm().expect("confirm should emit a request");
        assert!(panel.is_busy());

        let response = h.coordinator.handle_request(request);
        assert!(response.is_success());
        panel.switch_result(&response);

        assert!(!panel.is_busy());
        assert_eq!(panel.current(), &Selection::from_key("vanilla"));
        assert_eq!(h.engine.installed_dynamic_ids(), vec![2000, 2001]);
        // The installed rules are vanilla's, bodies passed through untouched.
        let installed = h.engine.installed_dynamic_rules();
        assert_eq!(
            installed[0].body["action"]["redirect"]["url"],
            "https://cdn.example/v/grass.png"
        );
        assert_eq!(
            h.store.value(ACTIVE_SELECTION_KEY).as_deref(),
            Some("vanilla")
        );

        // The other panel picks the change up from the broadcast alone.
        for note in h.notifier.notes() {
            other_panel.notification(&note);
        }
        assert_eq!(other_panel.current(), &Selection::from_key("vanilla"));
        assert_eq!(other_panel.status_text(), "Vanilla textures active");
    }
}

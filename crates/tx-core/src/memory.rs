//! In-memory host implementations.
//!
//! Used by the coordinator's tests and by the CLI simulator. Each type is a
//! cheap clone sharing its state, so a test can keep a handle for inspection
//! while the coordinator owns another.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::host::{ChangeNotifier, HostApiError, PreferenceStore, RuleEngine, RuleSource};
use crate::messages::Notification;
use crate::rules::Rule;

// =============================================================================
// Rule engine
// =============================================================================

#[derive(Debug, Default)]
struct EngineState {
    dynamic: Vec<Rule>,
    enabled_static: BTreeSet<String>,
    shipped_static: BTreeSet<String>,
    fail_all: bool,
}

/// In-memory [`RuleEngine`].
///
/// Static rulesets must be registered with [`MemoryEngine::ship_static_ruleset`]
/// before they can be enabled, mirroring a host that only ships some variants.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Rc<RefCell<EngineState>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ship_static_ruleset(&self, id: &str) {
        self.state.borrow_mut().shipped_static.insert(id.to_string());
    }

    /// Make every engine call fail, for exercising host-failure paths.
    pub fn fail_all(&self, fail: bool) {
        self.state.borrow_mut().fail_all = fail;
    }

    pub fn installed_dynamic_ids(&self) -> Vec<u32> {
        self.state.borrow().dynamic.iter().map(|rule| rule.id).collect()
    }

    pub fn installed_dynamic_rules(&self) -> Vec<Rule> {
        self.state.borrow().dynamic.clone()
    }

    pub fn enabled_static_rulesets(&self) -> Vec<String> {
        self.state.borrow().enabled_static.iter().cloned().collect()
    }

    fn check(&self) -> Result<(), HostApiError> {
        if self.state.borrow().fail_all {
            Err(HostApiError::new("rule engine unavailable"))
        } else {
            Ok(())
        }
    }
}

impl RuleEngine for MemoryEngine {
    fn dynamic_rule_ids(&self) -> Result<Vec<u32>, HostApiError> {
        self.check()?;
        Ok(self.installed_dynamic_ids())
    }

    fn remove_dynamic_rules(&mut self, ids: &[u32]) -> Result<(), HostApiError> {
        self.check()?;
        self.state
            .borrow_mut()
            .dynamic
            .retain(|rule| !ids.contains(&rule.id));
        Ok(())
    }

    fn add_dynamic_rules(&mut self, rules: &[Rule]) -> Result<(), HostApiError> {
        self.check()?;
        let mut state = self.state.borrow_mut();
        for rule in rules {
            if state.dynamic.iter().any(|installed| installed.id == rule.id) {
                return Err(HostApiError::new(format!(
                    "duplicate dynamic rule id {}",
                    rule.id
                )));
            }
            state.dynamic.push(rule.clone());
        }
        Ok(())
    }

    fn disable_static_rulesets(&mut self, ids: &[String]) -> Result<(), HostApiError> {
        self.check()?;
        let mut state = self.state.borrow_mut();
        for id in ids {
            state.enabled_static.remove(id);
        }
        Ok(())
    }

    fn enable_static_ruleset(&mut self, id: &str) -> Result<(), HostApiError> {
        self.check()?;
        let mut state = self.state.borrow_mut();
        if !state.shipped_static.contains(id) {
            return Err(HostApiError::new(format!("no static ruleset '{id}'")));
        }
        state.enabled_static.insert(id.to_string());
        Ok(())
    }
}

// =============================================================================
// Preference store
// =============================================================================

#[derive(Debug, Default)]
struct StoreState {
    values: BTreeMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-memory [`PreferenceStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.state
            .borrow_mut()
            .values
            .insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.state.borrow().values.get(key).cloned()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, HostApiError> {
        let state = self.state.borrow();
        if state.fail_reads {
            return Err(HostApiError::new("storage read failed"));
        }
        Ok(state.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), HostApiError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(HostApiError::new("storage write failed"));
        }
        state.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// Rule source
// =============================================================================

/// In-memory [`RuleSource`]: raw JSON text per rule-set key. Keys without an
/// entry behave like a missing resource file.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, text: &str) {
        self.files
            .borrow_mut()
            .insert(key.to_string(), text.to_string());
    }
}

impl RuleSource for MemorySource {
    fn load(&self, key: &str) -> Result<String, HostApiError> {
        self.files
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| HostApiError::new(format!("no rule file for '{key}'")))
    }
}

// =============================================================================
// Change notifier
// =============================================================================

#[derive(Debug, Default)]
struct NotifierState {
    notes: Vec<Notification>,
    listening: bool,
}

/// In-memory [`ChangeNotifier`] recording every broadcast.
#[derive(Debug, Clone)]
pub struct MemoryNotifier {
    state: Rc<RefCell<NotifierState>>,
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(NotifierState {
                notes: Vec::new(),
                listening: true,
            })),
        }
    }
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// With no listener, every broadcast fails the way a closed popup does.
    pub fn set_listening(&self, listening: bool) {
        self.state.borrow_mut().listening = listening;
    }

    pub fn notes(&self) -> Vec<Notification> {
        self.state.borrow().notes.clone()
    }
}

impl ChangeNotifier for MemoryNotifier {
    fn notify(&mut self, note: &Notification) -> Result<(), HostApiError> {
        let mut state = self.state.borrow_mut();
        if !state.listening {
            return Err(HostApiError::new("no listener"));
        }
        state.notes.push(note.clone());
        Ok(())
    }
}

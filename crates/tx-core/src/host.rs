//! Capability traits for the browser-owned collaborators.
//!
//! The rule-filtering engine, the preference store, the rule resource files
//! and the broadcast channel all belong to the host. The coordinator only
//! reaches them through these seams, which keeps the switching logic
//! deterministic under test: see [`crate::memory`] for the in-memory
//! implementations.

use crate::messages::Notification;
use crate::rules::Rule;

/// A host API call that failed, carrying the host's own description of why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HostApiError(pub String);

impl HostApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Declarative rule-filtering engine: a single dynamic-rule namespace plus
/// named static rulesets that can be enabled and disabled as groups.
pub trait RuleEngine {
    /// Ids of every currently installed dynamic rule.
    fn dynamic_rule_ids(&self) -> Result<Vec<u32>, HostApiError>;

    /// Remove the given dynamic rules by id.
    fn remove_dynamic_rules(&mut self, ids: &[u32]) -> Result<(), HostApiError>;

    /// Install the given dynamic rules. Ids are already assigned.
    fn add_dynamic_rules(&mut self, rules: &[Rule]) -> Result<(), HostApiError>;

    /// Disable the named static rulesets. Ids that are not currently enabled
    /// are ignored.
    fn disable_static_rulesets(&mut self, ids: &[String]) -> Result<(), HostApiError>;

    /// Enable one named static ruleset. Fails if the host does not ship a
    /// ruleset under that id.
    fn enable_static_ruleset(&mut self, id: &str) -> Result<(), HostApiError>;
}

/// Key-value preference storage.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, HostApiError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), HostApiError>;
}

/// Source of rule resource files, one JSON document per rule-set key.
pub trait RuleSource {
    fn load(&self, key: &str) -> Result<String, HostApiError>;
}

/// Broadcast channel toward any open panel instances.
pub trait ChangeNotifier {
    /// Fire-and-forget. An `Err` means no listener was reachable; callers
    /// treat that as normal.
    fn notify(&mut self, note: &Notification) -> Result<(), HostApiError>;
}

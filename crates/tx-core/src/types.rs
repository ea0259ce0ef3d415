//! Core type definitions for the TexSwap switching core.
//!
//! A rule set is a named bundle of URL-rewrite rules swapping one family of
//! texture assets. At most one rule set is active at a time; the active choice
//! is persisted as a single string under [`ACTIVE_SELECTION_KEY`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage key the active selection is persisted under.
pub const ACTIVE_SELECTION_KEY: &str = "activeRuleSet";

/// Wire value for "no rule set active".
pub const NONE_KEY: &str = "none";

// =============================================================================
// Rule set descriptors
// =============================================================================

/// Descriptor for one supported rule set.
///
/// Defined once at startup; the coordinator never mutates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetDescriptor {
    /// Stable key the UI, storage and wire protocol refer to this set by.
    pub key: String,
    /// Id of the static ruleset variant shipped alongside the extension.
    pub static_ruleset_id: String,
    /// Namespace offset for dynamically injected rule ids. Bases of different
    /// sets must be far enough apart that their id ranges never overlap.
    pub id_base: u32,
}

impl RuleSetDescriptor {
    pub fn new(key: &str, static_ruleset_id: &str, id_base: u32) -> Self {
        Self {
            key: key.to_string(),
            static_ruleset_id: static_ruleset_id.to_string(),
            id_base,
        }
    }
}

/// The fixed registry of rule sets the coordinator knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetRegistry {
    sets: Vec<RuleSetDescriptor>,
}

impl RuleSetRegistry {
    pub fn new(sets: Vec<RuleSetDescriptor>) -> Self {
        Self { sets }
    }

    /// The rule sets shipped with the extension.
    pub fn builtin() -> Self {
        Self::new(vec![
            RuleSetDescriptor::new("minecraft", "minecraft_textures", 1000),
            RuleSetDescriptor::new("vanilla", "vanilla_textures", 2000),
            RuleSetDescriptor::new("combat", "combat_textures", 3000),
        ])
    }

    pub fn get(&self, key: &str) -> Option<&RuleSetDescriptor> {
        self.sets.iter().find(|set| set.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Static ruleset ids of every known set, in registry order.
    pub fn static_ruleset_ids(&self) -> Vec<String> {
        self.sets
            .iter()
            .map(|set| set.static_ruleset_id.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleSetDescriptor> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

// =============================================================================
// Active selection
// =============================================================================

/// The active choice: a known rule-set key, or nothing.
///
/// Serialized on the wire and in storage as the plain key string, with
/// [`NONE_KEY`] standing in for the empty choice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    RuleSet(String),
}

impl Selection {
    /// Parse a stored or wire key. `"none"` maps to [`Selection::None`];
    /// anything else is taken as a rule-set key (validity is checked against
    /// the registry at the point of use).
    pub fn from_key(key: &str) -> Self {
        if key == NONE_KEY {
            Selection::None
        } else {
            Selection::RuleSet(key.to_string())
        }
    }

    pub fn as_key(&self) -> &str {
        match self {
            Selection::None => NONE_KEY,
            Selection::RuleSet(key) => key,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

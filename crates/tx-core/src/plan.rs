//! Pure switch-plan computation.
//!
//! A switch always tears everything down before building the target up, so at
//! most one rule set's rules are installed at a time. This module computes
//! that transition as data; the coordinator applies it against the host
//! traits, and the wasm boundary hands it to the extension's JS glue to apply
//! through the browser API. Keeping the computation in one place means both
//! paths agree on semantics.

use crate::rules::{assign_rule_ids, Rule};
use crate::types::{RuleSetRegistry, Selection};

/// Everything a switch needs to do to the host engine, computed up front.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchPlan {
    /// Dynamic rules to remove: everything currently installed, whatever rule
    /// set (or stale restart) it came from.
    pub remove_rule_ids: Vec<u32>,
    /// Dynamic rules to install, ids already assigned from the target's base.
    pub add_rules: Vec<Rule>,
    /// Static rulesets to disable: every known set's variant.
    pub disable_ruleset_ids: Vec<String>,
    /// Static ruleset to attempt to enable afterwards, if the target is not
    /// `none`. Enabling is best-effort; the variant may not be shipped.
    pub enable_ruleset_id: Option<String>,
}

/// The requested key is not in the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rule set: {0}")]
pub struct UnknownRuleSet(pub String);

/// Compute the plan for switching to `target`.
///
/// `rules` is the parsed content of the target's resource file (empty for
/// `none`, or when the file was missing or malformed). Fails only for an
/// unknown key, before anything would touch the host.
pub fn plan_switch(
    registry: &RuleSetRegistry,
    installed_ids: &[u32],
    target: &Selection,
    mut rules: Vec<Rule>,
) -> Result<SwitchPlan, UnknownRuleSet> {
    let enable_ruleset_id = match target {
        Selection::None => {
            rules.clear();
            None
        }
        Selection::RuleSet(key) => {
            let descriptor = registry
                .get(key)
                .ok_or_else(|| UnknownRuleSet(key.clone()))?;
            assign_rule_ids(&mut rules, descriptor.id_base);
            Some(descriptor.static_ruleset_id.clone())
        }
    };

    Ok(SwitchPlan {
        remove_rule_ids: installed_ids.to_vec(),
        add_rules: rules,
        disable_ruleset_ids: registry.static_ruleset_ids(),
        enable_ruleset_id,
    })
}

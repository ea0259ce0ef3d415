//! Rule resource files and dynamic-rule id assignment.
//!
//! Each rule set ships one JSON document, either a bare array of rule objects
//! or an object with a `rules` array. Rule contents are opaque to this crate:
//! they are handed to the host engine untouched, apart from the `id` field,
//! which is always overwritten before installation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single redirect/block rule, opaque apart from its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Dynamic-rule id. Whatever the resource file says is discarded and
    /// replaced via [`assign_rule_ids`] before installation.
    #[serde(default)]
    pub id: u32,
    /// Everything else, passed through to the host engine as-is.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

/// Error loading a rule resource file.
#[derive(Debug, thiserror::Error)]
pub enum RuleFileError {
    #[error("rule file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rule file is neither a rule array nor an object with a 'rules' array")]
    UnexpectedShape,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleFile {
    Bare(Vec<Rule>),
    Wrapped { rules: Vec<Rule> },
}

/// Parse a rule resource file.
pub fn parse_rule_file(text: &str) -> Result<Vec<Rule>, RuleFileError> {
    // Probe the JSON first so a structurally wrong document reports a shape
    // error instead of serde's untagged "no variant matched".
    let value: Value = serde_json::from_str(text)?;
    if !value.is_array() && value.get("rules").map_or(true, |r| !r.is_array()) {
        return Err(RuleFileError::UnexpectedShape);
    }

    let file: RuleFile = serde_json::from_value(value)?;
    Ok(match file {
        RuleFile::Bare(rules) => rules,
        RuleFile::Wrapped { rules } => rules,
    })
}

/// Assign installed ids: `id_base + position`.
///
/// Bases of different rule sets are spaced so the resulting ranges never
/// collide inside the host's single dynamic-rule namespace.
pub fn assign_rule_ids(rules: &mut [Rule], id_base: u32) {
    for (index, rule) in rules.iter_mut().enumerate() {
        rule.id = id_base + index as u32;
    }
}

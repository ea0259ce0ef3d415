//! Wire protocol between the popup panel and the coordinator.
//!
//! Shapes are fixed by the extension's JS glue, so everything here serializes
//! to camelCase-tagged JSON. The `ts-rs` exports keep the TypeScript side of
//! the boundary in lockstep with these definitions.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Command sent from a panel to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export)]
pub enum Request {
    /// Switch the active rule set. `rule_set` is a registry key or `"none"`.
    #[serde(rename_all = "camelCase")]
    SwitchRuleSet { rule_set: String },
}

impl Request {
    /// Whether `tag` is a `type` value this protocol understands. Lets the
    /// message boundary tell an unknown command apart from a known one with
    /// a malformed payload.
    pub fn known_type(tag: &str) -> bool {
        tag == "switchRuleSet"
    }
}

/// Payload of a successful switch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SwitchOutcome {
    pub active_rule_set: String,
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Response {
    Success {
        success: bool,
        result: SwitchOutcome,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl Response {
    pub fn success(active_rule_set: &str) -> Self {
        Response::Success {
            success: true,
            result: SwitchOutcome {
                active_rule_set: active_rule_set.to_string(),
            },
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Response::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }
}

/// Broadcast from the coordinator to any listening panels, fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export)]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    RuleSetChanged { rule_set: String },
}

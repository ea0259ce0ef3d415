//! TexSwap Core Library
//!
//! This crate provides the rule-set switching core for the TexSwap texture
//! extension: the coordinator that installs and removes URL-rewrite rules
//! through the host browser's declarative rule engine, the wire protocol it
//! speaks with the popup panel, and the panel's own state machine.
//!
//! # Architecture
//!
//! The host browser owns both the rule-filtering engine and the preference
//! store. The coordinator never touches them directly; it goes through the
//! capability traits in [`host`], so tests (and the CLI simulator) can inject
//! in-memory implementations and drive a full switch deterministically.
//!
//! # Modules
//!
//! - `types`: rule-set descriptors, registry and the active selection
//! - `rules`: rule resource files and dynamic-rule id assignment
//! - `host`: capability traits for the browser-owned engine and store
//! - `plan`: pure switch-plan computation shared with the wasm boundary
//! - `coordinator`: the rule coordinator (switch, resync, message handling)
//! - `messages`: panel/coordinator wire protocol
//! - `panel`: popup panel state machine
//! - `memory`: in-memory hosts for tests and the CLI simulator

pub mod coordinator;
pub mod host;
pub mod memory;
pub mod messages;
pub mod panel;
pub mod plan;
pub mod rules;
pub mod types;

// Re-export commonly used types
pub use coordinator::{Coordinator, SwitchError};
pub use host::{ChangeNotifier, HostApiError, PreferenceStore, RuleEngine, RuleSource};
pub use messages::{Notification, Request, Response, SwitchOutcome};
pub use panel::{Notice, PanelState};
pub use plan::{plan_switch, SwitchPlan};
pub use rules::{assign_rule_ids, parse_rule_file, Rule};
pub use types::{RuleSetDescriptor, RuleSetRegistry, Selection, ACTIVE_SELECTION_KEY};

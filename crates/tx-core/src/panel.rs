//! Popup panel state machine.
//!
//! A pure reducer over the panel's little state, free of any UI toolkit: the
//! extension's popup glue renders from it and feeds user events and incoming
//! messages back in. Multiple panel instances stay consistent because each
//! also applies the coordinator's broadcasts.

use crate::messages::{Notification, Request, Response};
use crate::types::Selection;

/// Transient notice shown under the controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// State of one open panel instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelState {
    current: Selection,
    pending: Selection,
    busy: bool,
    notice: Option<Notice>,
}

impl PanelState {
    /// Panel opened: pre-select the persisted selection.
    pub fn open(current: Selection) -> Self {
        Self {
            pending: current.clone(),
            current,
            busy: false,
            notice: None,
        }
    }

    pub fn current(&self) -> &Selection {
        &self.current
    }

    pub fn pending(&self) -> &Selection {
        &self.pending
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Whether the confirm control is actionable. Re-selecting the value that
    /// is already active keeps it disabled, so no redundant switch command
    /// can be sent.
    pub fn can_confirm(&self) -> bool {
        !self.busy && self.pending != self.current
    }

    /// Status line for the active selection.
    pub fn status_text(&self) -> String {
        match &self.current {
            Selection::None => "No textures active".to_string(),
            Selection::RuleSet(key) => format!("{} textures active", capitalize(key)),
        }
    }

    /// A candidate was picked in the UI.
    pub fn select(&mut self, candidate: Selection) {
        self.pending = candidate;
        if matches!(self.notice, Some(Notice::Error(_))) {
            self.notice = None;
        }
    }

    /// Confirm pressed. Returns the request to send to the coordinator, or
    /// `None` when there is nothing to do (busy, or no actual change).
    pub fn confirm(&mut self) -> Option<Request> {
        if !self.can_confirm() {
            return None;
        }
        self.busy = true;
        self.notice = None;
        Some(Request::SwitchRuleSet {
            rule_set: self.pending.as_key().to_string(),
        })
    }

    /// The coordinator replied to our switch request.
    ///
    /// On failure the previously active selection stays in place; the pending
    /// pick is kept so the user can retry.
    pub fn switch_result(&mut self, response: &Response) {
        self.busy = false;
        match response {
            Response::Success { result, .. } => {
                self.current = Selection::from_key(&result.active_rule_set);
                self.pending = self.current.clone();
                self.notice = Some(Notice::Success("Success! Refresh the page!".to_string()));
            }
            Response::Failure { error, .. } => {
                self.notice = Some(Notice::Error(error.clone()));
            }
        }
    }

    /// A broadcast arrived, possibly triggered by another panel instance.
    /// Only the displayed active selection resyncs; the user's pending pick
    /// is theirs to keep.
    pub fn notification(&mut self, note: &Notification) {
        let Notification::RuleSetChanged { rule_set } = note;
        self.current = Selection::from_key(rule_set);
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

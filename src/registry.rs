//! Scoped shortcut tables and the cross-registrant conflict log.
//!
//! Scopes are independent binding namespaces; exactly one is current per
//! dispatcher. The [`RegistrationLog`] sits alongside, recording every bind
//! regardless of scope so that two registrants claiming the same shortcut
//! string can be reported. Conflicts are reported, never prevented: both
//! handlers stay bound and both fire.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::event::KeyEvent;
use crate::spec::ParsedShortcut;

/// A bound shortcut handler. Single-threaded by design, hence `Rc`.
pub type Handler = Rc<RefCell<dyn FnMut(&mut KeyEvent)>>;

/// Wrap a closure as a [`Handler`].
pub fn handler(f: impl FnMut(&mut KeyEvent) + 'static) -> Handler {
    Rc::new(RefCell::new(f))
}

/// One bound shortcut inside a scope table.
#[derive(Clone)]
pub struct ScopeEntry {
    pub raw: String,
    pub parsed: ParsedShortcut,
    pub handler: Handler,
    pub owner: String,
}

/// A named, independently activatable binding namespace.
#[derive(Default)]
pub struct Scope {
    pub entries: Vec<ScopeEntry>,
}

impl Scope {
    pub fn remove_key(&mut self, raw: &str) {
        self.entries.retain(|e| e.raw != raw);
    }
}

/// One entry of the registration log, recorded per bind and removed on
/// unbind/destroy, never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub key: String,
    pub owner: String,
    pub scope: String,
    pub label: String,
}

/// One row of the conflict report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictOwner {
    pub scope: String,
    pub owner: String,
}

/// Conflict report: shortcut key → registrants, in registration order.
/// Only keys claimed by more than one distinct owner appear.
pub type ConflictReport = BTreeMap<String, Vec<ConflictOwner>>;

/// Append-only record of every registration, across all scopes.
///
/// An explicit value rather than process-global state: each dispatcher owns
/// one by default, and independent dispatchers can share one when a single
/// conflict report should span them.
#[derive(Default)]
pub struct RegistrationLog {
    entries: Vec<Registration>,
}

impl RegistrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, registration: Registration) {
        let extra_owner = self
            .entries
            .iter()
            .any(|e| e.key == registration.key && e.owner != registration.owner);
        if extra_owner {
            warn!(
                key = %registration.key,
                owner = %registration.owner,
                scope = %registration.scope,
                "shortcut key already claimed by another owner"
            );
        }
        self.entries.push(registration);
    }

    /// Remove registrations for one key within one scope.
    pub fn remove(&mut self, key: &str, scope: &str) {
        self.entries.retain(|e| !(e.key == key && e.scope == scope));
    }

    /// Remove every registration belonging to a scope.
    pub fn remove_scope(&mut self, scope: &str) {
        self.entries.retain(|e| e.scope != scope);
    }

    pub fn entries(&self) -> &[Registration] {
        &self.entries
    }

    /// Group registrations by shortcut key and report every key claimed by
    /// more than one distinct owner. Owners keep registration order.
    pub fn conflicts(&self) -> ConflictReport {
        let mut by_key: BTreeMap<&str, Vec<&Registration>> = BTreeMap::new();
        for entry in &self.entries {
            by_key.entry(&entry.key).or_default().push(entry);
        }

        let mut report = ConflictReport::new();
        for (key, regs) in by_key {
            let distinct_owners = {
                let mut owners: Vec<&str> = regs.iter().map(|r| r.owner.as_str()).collect();
                owners.sort_unstable();
                owners.dedup();
                owners.len()
            };
            if distinct_owners > 1 {
                report.insert(
                    key.to_string(),
                    regs.iter()
                        .map(|r| ConflictOwner {
                            scope: r.scope.clone(),
                            owner: r.owner.clone(),
                        })
                        .collect(),
                );
            }
        }
        report
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;

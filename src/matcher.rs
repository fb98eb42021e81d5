//! Match resolution over the active shortcut set.
//!
//! Two independent match functions run in a fixed priority order on each
//! event: chained first, then combined. The combined path is skipped
//! entirely whenever the pressed key participates in any active chain, so a
//! chain in progress can never double as a same-named simultaneous
//! shortcut.

use crate::chain::ChainHistory;
use crate::event::KeyEvent;
use crate::registry::Handler;
use crate::spec::ParsedShortcut;

/// One entry of the dispatcher's active set, in registration order.
#[derive(Clone)]
pub struct ActiveShortcut {
    pub parsed: ParsedShortcut,
    pub handler: Handler,
    pub owner: String,
}

impl std::fmt::Debug for ActiveShortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveShortcut")
            .field("parsed", &self.parsed)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Candidate chain key for the newly pressed token: `"{last}-{token}"`,
/// or None when no chain is in progress.
pub fn chain_candidate(history: &ChainHistory, token: &str) -> Option<String> {
    history.last().map(|last| format!("{last}-{token}"))
}

/// First chained entry whose key equals the candidate. Registration order
/// decides when duplicate registrations exist: the earliest wins.
pub fn find_chained(active: &[ActiveShortcut], candidate: &str) -> Option<usize> {
    active
        .iter()
        .position(|s| s.parsed.chained && s.parsed.key == candidate)
}

/// Every combined entry matching the event: base key equal to the pressed
/// token and all four modifier flags exactly equal to the event's state.
/// Conflicting registrations are deliberately all returned, in registration
/// order.
pub fn find_combined(active: &[ActiveShortcut], event: &KeyEvent, token: &str) -> Vec<usize> {
    active
        .iter()
        .enumerate()
        .filter(|(_, s)| {
            !s.parsed.chained && s.parsed.key == token && s.parsed.mods.matches_event(event)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Does the pressed token participate in any active chain pattern? Used to
/// suppress the combined path while a chain could be in progress.
pub fn token_joins_chain(active: &[ActiveShortcut], token: &str) -> bool {
    !token.is_empty()
        && active
            .iter()
            .any(|s| s.parsed.chained && s.parsed.key.contains(token))
}

/// True when the token equals or prefixes some active chain's first
/// segment, i.e. pressing it could begin a chain.
pub fn token_starts_chain(active: &[ActiveShortcut], token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    active.iter().any(|s| {
        s.parsed.chained
            && matches!(s.parsed.key.split_once('-'), Some((first, _)) if first.starts_with(token))
    })
}

/// Should this token enter chain history? True when it equals or prefixes
/// some chain's first segment, or equals the segment after the hyphen.
pub fn token_starts_or_continues_chain(active: &[ActiveShortcut], token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    active.iter().any(|s| {
        if !s.parsed.chained {
            return false;
        }
        match s.parsed.key.split_once('-') {
            Some((first, second)) => first.starts_with(token) || token == second,
            None => false,
        }
    })
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod matcher_tests;

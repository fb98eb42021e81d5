//! The dispatcher: one event pipeline from keyboard event to handler.
//!
//! On every keydown the pipeline runs typing guard → chained match →
//! combined match → chain-history update, synchronously, so all matching
//! for one event completes before the next event is seen. Attach/detach
//! manage a single subscription on the host's event source.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::chain::ChainHistory;
use crate::event::{EventKind, EventSource, KeyEvent, Subscription};
use crate::guard::{Filter, TypingGuard};
use crate::matcher::{
    chain_candidate, find_chained, find_combined, token_joins_chain, token_starts_chain,
    token_starts_or_continues_chain, ActiveShortcut,
};
use crate::registry::{
    ConflictReport, Handler, Registration, RegistrationLog, Scope, ScopeEntry,
};
use crate::spec::{Platform, SpecParser};

/// The scope every binding lands in unless told otherwise.
pub const DEFAULT_SCOPE: &str = "all";

/// An ordered set of spec → handler pairs for one binding call.
/// Keys are unique within a call: a repeated spec replaces the earlier one.
#[derive(Default)]
pub struct Bindings {
    entries: Vec<(String, Handler)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, spec: &str, f: impl FnMut(&mut KeyEvent) + 'static) -> Self {
        self.on_handler(spec, crate::registry::handler(f))
    }

    pub fn on_handler(mut self, spec: &str, handler: Handler) -> Self {
        let spec = spec.to_lowercase();
        self.entries.retain(|(k, _)| *k != spec);
        self.entries.push((spec, handler));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Configuration accepted by one binding call.
///
/// `scope`, `owner` and `label` apply to the bindings being registered.
/// The optional knobs reconfigure the dispatcher itself when present and
/// leave it untouched when `None`; the guard, delay and filter are
/// consulted once per event, not per shortcut.
pub struct BindOptions {
    pub scope: String,
    pub owner: String,
    pub label: Option<String>,
    pub disable_on_inputs: Option<bool>,
    pub chain_delay: Option<Duration>,
    pub filter: Option<Filter>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            scope: DEFAULT_SCOPE.to_string(),
            owner: "anonymous".to_string(),
            label: None,
            disable_on_inputs: None,
            chain_delay: None,
            filter: None,
        }
    }
}

impl BindOptions {
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn disable_on_inputs(mut self, value: bool) -> Self {
        self.disable_on_inputs = Some(value);
        self
    }

    pub fn chain_delay(mut self, delay: Duration) -> Self {
        self.chain_delay = Some(delay);
        self
    }

    pub fn filter(mut self, f: impl Fn(&KeyEvent) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(f));
        self
    }
}

/// Owns the scope tables, the active shortcut set, the chain history and
/// the attach/detach lifecycle.
pub struct Dispatcher {
    parser: SpecParser,
    scopes: HashMap<String, Scope>,
    current: String,
    active: Vec<ActiveShortcut>,
    history: ChainHistory,
    guard: TypingGuard,
    filter: Option<Filter>,
    log: Rc<RefCell<RegistrationLog>>,
    subscription: Option<Subscription>,
}

impl Dispatcher {
    /// A dispatcher with its own private registration log.
    pub fn new(platform: Platform) -> Self {
        Self::with_registry(platform, Rc::new(RefCell::new(RegistrationLog::new())))
    }

    /// A dispatcher recording into a shared registration log, so one
    /// conflict report can span several dispatchers.
    pub fn with_registry(platform: Platform, log: Rc<RefCell<RegistrationLog>>) -> Self {
        let mut scopes = HashMap::new();
        scopes.insert(DEFAULT_SCOPE.to_string(), Scope::default());
        Self {
            parser: SpecParser::new(platform),
            scopes,
            current: DEFAULT_SCOPE.to_string(),
            active: Vec::new(),
            history: ChainHistory::default(),
            guard: TypingGuard::default(),
            filter: None,
            log,
            subscription: None,
        }
    }

    /// Register a set of shortcut bindings.
    ///
    /// Malformed specs are dropped from the set with a warning rather than
    /// failing the call; everything else in the call still binds.
    pub fn bind(&mut self, bindings: Bindings, opts: BindOptions) {
        let BindOptions {
            scope,
            owner,
            label,
            disable_on_inputs,
            chain_delay,
            filter,
        } = opts;

        if let Some(value) = disable_on_inputs {
            self.guard.disable_on_inputs = value;
        }
        if let Some(delay) = chain_delay {
            self.history.set_delay(delay);
        }
        if let Some(f) = filter {
            self.filter = Some(f);
        }

        let label = label.unwrap_or_else(|| owner.clone());
        for (raw, handler) in bindings.entries {
            let parsed = match self.parser.parse(&raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(spec = %raw, %err, "dropping malformed shortcut spec");
                    continue;
                }
            };
            self.log.borrow_mut().record(Registration {
                key: raw.clone(),
                owner: owner.clone(),
                scope: scope.clone(),
                label: label.clone(),
            });
            self.scopes
                .entry(scope.clone())
                .or_default()
                .entries
                .push(ScopeEntry {
                    raw,
                    parsed,
                    handler,
                    owner: owner.clone(),
                });
        }

        if scope == self.current {
            self.rebuild_active();
        }
    }

    /// Make the named scope current and rebuild the active set from exactly
    /// its table. Unknown names become fresh empty scopes.
    pub fn activate(&mut self, scope: &str) {
        self.scopes.entry(scope.to_string()).or_default();
        self.current = scope.to_string();
        self.history.clear();
        self.rebuild_active();
        info!(scope, shortcuts = self.active.len(), "scope activated");
    }

    pub fn current_scope(&self) -> &str {
        &self.current
    }

    /// Remove one shortcut key from a scope and its registrations.
    pub fn unbind(&mut self, scope: &str, key: &str) {
        let key = key.to_lowercase();
        if let Some(table) = self.scopes.get_mut(scope) {
            table.remove_key(&key);
        }
        self.log.borrow_mut().remove(&key, scope);
        if scope == self.current {
            self.rebuild_active();
        }
    }

    /// Drop a scope, its table and its registrations. Destroying the
    /// current scope leaves the dispatcher with an empty active set.
    pub fn destroy(&mut self, scope: &str) {
        self.scopes.remove(scope);
        self.log.borrow_mut().remove_scope(scope);
        if scope == self.current {
            self.active.clear();
            self.history.clear();
        }
    }

    /// Atomically replace a scope's table with a new set of bindings.
    /// Hosts call this when their own configuration changes.
    pub fn rebind(&mut self, scope: &str, bindings: Bindings, mut opts: BindOptions) {
        self.scopes.insert(scope.to_string(), Scope::default());
        self.log.borrow_mut().remove_scope(scope);
        opts.scope = scope.to_string();
        self.bind(bindings, opts);
        if scope == self.current {
            self.rebuild_active();
        }
    }

    fn rebuild_active(&mut self) {
        self.active.clear();
        if let Some(table) = self.scopes.get(&self.current) {
            for entry in &table.entries {
                self.active.push(ActiveShortcut {
                    parsed: entry.parsed.clone(),
                    handler: entry.handler.clone(),
                    owner: entry.owner.clone(),
                });
            }
        }
    }

    /// Number of shortcuts in the active set.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Cross-scope conflict report from the registration log.
    pub fn conflicts(&self) -> ConflictReport {
        self.log.borrow().conflicts()
    }

    pub fn registry(&self) -> Rc<RefCell<RegistrationLog>> {
        self.log.clone()
    }

    /// Subscribe to the host's keydown stream. A second attach while
    /// already attached is a no-op.
    pub fn attach(this: &Rc<RefCell<Self>>, source: &mut dyn EventSource) {
        if this.borrow().subscription.is_some() {
            return;
        }
        let weak = Rc::downgrade(this);
        let listener: crate::event::Listener =
            Rc::new(RefCell::new(move |event: &mut KeyEvent| {
                if let Some(dispatcher) = weak.upgrade() {
                    dispatcher.borrow_mut().handle_key(event);
                }
            }));
        let subscription = source.subscribe(EventKind::KeyDown, listener);
        this.borrow_mut().subscription = Some(subscription);
        info!("dispatcher attached to event source");
    }

    /// Remove the subscription and cancel any pending chain deadline.
    /// Safe to call when already detached.
    pub fn detach(&mut self) {
        if self.subscription.take().is_some() {
            info!("dispatcher detached from event source");
        }
        self.history.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Pending chain-history deadline, for hosts that schedule a wakeup
    /// instead of waiting for the next keystroke.
    pub fn chain_deadline(&self) -> Option<Instant> {
        self.history.deadline()
    }

    /// Host-timer entry point: reset chain history if its window passed.
    pub fn expire_chain(&mut self, now: Instant) -> bool {
        self.history.expire_if_due(now)
    }

    /// Run the pipeline for one keydown. Returns true when any handler
    /// fired.
    pub fn handle_key(&mut self, event: &mut KeyEvent) -> bool {
        self.handle_key_at(event, Instant::now())
    }

    /// Same as [`handle_key`] with an explicit clock, so timing behavior is
    /// testable without sleeping.
    ///
    /// [`handle_key`]: Dispatcher::handle_key
    pub fn handle_key_at(&mut self, event: &mut KeyEvent, now: Instant) -> bool {
        self.history.expire_if_due(now);

        let token = event.key.to_lowercase();
        let typing = self.guard.is_typing(&event.target);

        // Chained grammar first: it outranks combos whenever both could
        // apply to the same key.
        if !typing {
            if let Some(candidate) = chain_candidate(&self.history, &token) {
                if let Some(index) = find_chained(&self.active, &candidate) {
                    let hit = self.active[index].clone();
                    debug!(key = %candidate, owner = %hit.owner, "chained shortcut matched");
                    event.prevent_default();
                    self.history.clear();
                    (hit.handler.borrow_mut())(event);
                    return true;
                }
            }
        }

        // The filter, when installed, fully decides the combined path;
        // otherwise the typing guard does.
        let combined_allowed = match &self.filter {
            Some(f) => f(event),
            None => !typing,
        };

        // A key participating in a chain must not also resolve as a combo
        // while that chain could be in progress: either history already
        // holds a token, or this key would start one. A chain key pressed
        // cold, after the window expired, still reaches the combined path.
        let chain_pending = !self.history.is_empty() || token_starts_chain(&self.active, &token);
        let combo_shadowed = chain_pending && token_joins_chain(&self.active, &token);

        if combined_allowed && !combo_shadowed {
            let hits = find_combined(&self.active, event, &token);
            if !hits.is_empty() {
                let fired: Vec<ActiveShortcut> =
                    hits.into_iter().map(|i| self.active[i].clone()).collect();
                event.prevent_default();
                self.history.clear();
                for hit in fired {
                    debug!(key = %hit.parsed.key, owner = %hit.owner, "combined shortcut matched");
                    (hit.handler.borrow_mut())(event);
                }
                return true;
            }
        }

        // No match: remember the token if it could begin or continue some
        // registered chain, restarting the debounce window.
        if !typing && token_starts_or_continues_chain(&self.active, &token) {
            self.history.push(token, now);
        }

        false
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("current", &self.current)
            .field("scopes", &self.scopes.len())
            .field("active", &self.active.len())
            .field("attached", &self.subscription.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod dispatcher_tests;

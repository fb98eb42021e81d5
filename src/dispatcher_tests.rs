use super::*;
use crate::event::{FocusTarget, Listener};
use std::cell::Cell;
use std::rc::Weak;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Platform::MacOS)
}

fn counter() -> (Rc<Cell<usize>>, impl FnMut(&mut KeyEvent) + 'static) {
    let count = Rc::new(Cell::new(0usize));
    let c = count.clone();
    (count, move |_: &mut KeyEvent| c.set(c.get() + 1))
}

/// In-memory stand-in for the host's keyboard event source.
#[derive(Default)]
struct FakeSource {
    listeners: Rc<RefCell<Vec<(u64, EventKind, Listener)>>>,
    next_id: u64,
}

impl FakeSource {
    fn emit(&self, kind: EventKind, event: &mut KeyEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| l.clone())
            .collect();
        for listener in snapshot {
            (listener.borrow_mut())(event);
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl EventSource for FakeSource {
    fn subscribe(&mut self, kind: EventKind, listener: Listener) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.borrow_mut().push((id, kind, listener));
        let weak: Weak<RefCell<Vec<(u64, EventKind, Listener)>>> =
            Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.borrow_mut().retain(|(i, _, _)| *i != id);
            }
        })
    }
}

// --- combined matching -------------------------------------------------

#[test]
fn test_combined_shortcut_fires_once_and_prevents_default() {
    let mut d = dispatcher();
    let (count, save) = counter();
    d.bind(Bindings::new().on("ctrl_s", save), BindOptions::default());

    let mut ev = KeyEvent::key("s").ctrl();
    assert!(d.handle_key(&mut ev));
    assert_eq!(count.get(), 1);
    assert!(ev.default_prevented());
}

#[test]
fn test_combined_requires_exact_modifiers() {
    let mut d = dispatcher();
    let (count, save) = counter();
    d.bind(Bindings::new().on("ctrl_s", save), BindOptions::default());

    assert!(!d.handle_key(&mut KeyEvent::key("s")));
    assert!(!d.handle_key(&mut KeyEvent::key("s").ctrl().shift()));
    assert!(!d.handle_key(&mut KeyEvent::key("s").meta()));
    assert_eq!(count.get(), 0);
}

#[test]
fn test_event_key_case_insensitive() {
    let mut d = dispatcher();
    let (count, save) = counter();
    d.bind(Bindings::new().on("ctrl_s", save), BindOptions::default());

    assert!(d.handle_key(&mut KeyEvent::key("S").ctrl()));
    assert_eq!(count.get(), 1);
}

#[test]
fn test_meta_spec_matches_ctrl_event_on_linux() {
    let mut d = Dispatcher::new(Platform::Linux);
    let (count, open) = counter();
    d.bind(Bindings::new().on("meta_k", open), BindOptions::default());

    assert!(d.handle_key(&mut KeyEvent::key("k").ctrl()));
    assert!(!d.handle_key(&mut KeyEvent::key("k").meta()));
    assert_eq!(count.get(), 1);
}

// --- chained matching --------------------------------------------------

#[test]
fn test_chain_fires_within_window() {
    let mut d = dispatcher();
    let (count, go_home) = counter();
    d.bind(Bindings::new().on("g-h", go_home), BindOptions::default());

    let t0 = Instant::now();
    assert!(!d.handle_key_at(&mut KeyEvent::key("g"), t0));
    assert!(d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(300)));
    assert_eq!(count.get(), 1);
}

#[test]
fn test_chain_clears_history_after_match() {
    let mut d = dispatcher();
    let (count, go_home) = counter();
    d.bind(Bindings::new().on("g-h", go_home), BindOptions::default());

    let t0 = Instant::now();
    d.handle_key_at(&mut KeyEvent::key("g"), t0);
    d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(100));
    assert!(d.chain_deadline().is_none());

    // A second "h" must not re-fire without a fresh "g".
    assert!(!d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(200)));
    assert_eq!(count.get(), 1);
}

#[test]
fn test_chain_expires_past_window() {
    let mut d = dispatcher();
    let (count, go_home) = counter();
    d.bind(Bindings::new().on("g-h", go_home), BindOptions::default());

    let t0 = Instant::now();
    d.handle_key_at(&mut KeyEvent::key("g"), t0);
    assert!(!d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(900)));
    assert_eq!(count.get(), 0);
}

#[test]
fn test_bare_binding_fires_after_chain_window_expires() {
    let mut d = dispatcher();
    let (chain_count, go_home) = counter();
    let (bare_count, bare_h) = counter();
    d.bind(
        Bindings::new().on("g-h", go_home).on("h", bare_h),
        BindOptions::default(),
    );

    let t0 = Instant::now();
    d.handle_key_at(&mut KeyEvent::key("g"), t0);
    // Past the window the chain is dead and the bare key takes over.
    assert!(d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(900)));
    assert_eq!(chain_count.get(), 0);
    assert_eq!(bare_count.get(), 1);
}

#[test]
fn test_chain_outranks_combo_on_same_key() {
    let mut d = dispatcher();
    let (chain_count, go_home) = counter();
    let (bare_count, bare_h) = counter();
    d.bind(
        Bindings::new().on("g-h", go_home).on("h", bare_h),
        BindOptions::default(),
    );

    let t0 = Instant::now();
    d.handle_key_at(&mut KeyEvent::key("g"), t0);
    assert!(d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(100)));
    assert_eq!(chain_count.get(), 1);
    assert_eq!(bare_count.get(), 0);
}

#[test]
fn test_chain_start_key_does_not_fire_as_combo() {
    let mut d = dispatcher();
    let (count, bare_g) = counter();
    d.bind(
        Bindings::new().on("g-h", |_| {}).on("g", bare_g),
        BindOptions::default(),
    );

    // "g" starts a chain, so its combo binding is shadowed for this event.
    assert!(!d.handle_key(&mut KeyEvent::key("g")));
    assert_eq!(count.get(), 0);
}

#[test]
fn test_custom_chain_delay() {
    let mut d = dispatcher();
    let (count, go_home) = counter();
    d.bind(
        Bindings::new().on("g-h", go_home),
        BindOptions::default().chain_delay(Duration::from_millis(100)),
    );

    let t0 = Instant::now();
    d.handle_key_at(&mut KeyEvent::key("g"), t0);
    assert!(!d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(150)));
    assert_eq!(count.get(), 0);
}

#[test]
fn test_debounce_window_restarts_per_keystroke() {
    let mut d = dispatcher();
    let (count, go_home) = counter();
    d.bind(Bindings::new().on("g-h", go_home), BindOptions::default());

    // Each qualifying press restarts the 800 ms window, so g @0 then g
    // @700 keeps the chain alive for the h @1400.
    let t0 = Instant::now();
    d.handle_key_at(&mut KeyEvent::key("g"), t0);
    d.handle_key_at(&mut KeyEvent::key("g"), t0 + Duration::from_millis(700));
    assert!(d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(1400)));
    assert_eq!(count.get(), 1);
}

#[test]
fn test_combined_match_resets_chain_history() {
    let mut d = dispatcher();
    let (chain_count, go_home) = counter();
    let (save_count, save) = counter();
    d.bind(
        Bindings::new().on("g-h", go_home).on("ctrl_s", save),
        BindOptions::default(),
    );

    let t0 = Instant::now();
    d.handle_key_at(&mut KeyEvent::key("g"), t0);
    assert!(d.handle_key_at(&mut KeyEvent::key("s").ctrl(), t0 + Duration::from_millis(100)));
    assert_eq!(save_count.get(), 1);
    // The combo cleared the chain, so the follow-up "h" is an orphan.
    assert!(!d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(200)));
    assert_eq!(chain_count.get(), 0);
}

#[test]
fn test_expire_chain_host_timer_entry() {
    let mut d = dispatcher();
    d.bind(Bindings::new().on("g-h", |_| {}), BindOptions::default());

    let t0 = Instant::now();
    d.handle_key_at(&mut KeyEvent::key("g"), t0);
    let deadline = d.chain_deadline().unwrap();
    assert!(!d.expire_chain(deadline - Duration::from_millis(1)));
    assert!(d.expire_chain(deadline));
    assert!(d.chain_deadline().is_none());
}

// --- typing guard and filter -------------------------------------------

#[test]
fn test_no_handler_fires_while_typing() {
    let mut d = dispatcher();
    let (close_count, close) = counter();
    let (chain_count, go_home) = counter();
    d.bind(
        Bindings::new().on("escape", close).on("g-h", go_home),
        BindOptions::default(),
    );

    let t0 = Instant::now();
    let mut ev = KeyEvent::key("escape").focus(FocusTarget::TextInput);
    assert!(!d.handle_key_at(&mut ev, t0));

    d.handle_key_at(&mut KeyEvent::key("g").focus(FocusTarget::TextArea), t0);
    assert!(!d.handle_key_at(
        &mut KeyEvent::key("h").focus(FocusTarget::TextArea),
        t0 + Duration::from_millis(100),
    ));
    assert_eq!(close_count.get(), 0);
    assert_eq!(chain_count.get(), 0);
}

#[test]
fn test_typing_keystrokes_never_enter_history() {
    let mut d = dispatcher();
    let (count, go_home) = counter();
    d.bind(Bindings::new().on("g-h", go_home), BindOptions::default());

    let t0 = Instant::now();
    // "g" typed into an input must not start a chain...
    d.handle_key_at(&mut KeyEvent::key("g").focus(FocusTarget::TextInput), t0);
    // ...so "h" on the page afterwards has nothing to complete.
    assert!(!d.handle_key_at(&mut KeyEvent::key("h"), t0 + Duration::from_millis(100)));
    assert_eq!(count.get(), 0);
}

#[test]
fn test_disable_on_inputs_false_allows_typing_targets() {
    let mut d = dispatcher();
    let (count, close) = counter();
    d.bind(
        Bindings::new().on("escape", close),
        BindOptions::default().disable_on_inputs(false),
    );

    let mut ev = KeyEvent::key("escape").focus(FocusTarget::TextInput);
    assert!(d.handle_key(&mut ev));
    assert_eq!(count.get(), 1);
}

#[test]
fn test_filter_fully_decides_combined_path() {
    let mut d = dispatcher();
    let (count, save) = counter();
    d.bind(
        Bindings::new().on("ctrl_s", save),
        // Allow combos inside text inputs, nowhere else.
        BindOptions::default().filter(|ev| ev.target == FocusTarget::TextInput),
    );

    assert!(d.handle_key(&mut KeyEvent::key("s").ctrl().focus(FocusTarget::TextInput)));
    assert!(!d.handle_key(&mut KeyEvent::key("s").ctrl()));
    assert_eq!(count.get(), 1);
}

// --- conflicts ----------------------------------------------------------

#[test]
fn test_conflicting_handlers_both_fire_in_registration_order() {
    let mut d = dispatcher();
    let order = Rc::new(RefCell::new(Vec::new()));
    let (o1, o2) = (order.clone(), order.clone());

    d.bind(
        Bindings::new().on("ctrl_s", move |_| o1.borrow_mut().push("component-a")),
        BindOptions::default().owner("component-a"),
    );
    d.bind(
        Bindings::new().on("ctrl_s", move |_| o2.borrow_mut().push("component-b")),
        BindOptions::default().owner("component-b"),
    );

    let report = d.conflicts();
    assert_eq!(report.len(), 1);
    assert_eq!(report["ctrl_s"].len(), 2);
    assert_eq!(report["ctrl_s"][0].owner, "component-a");
    assert_eq!(report["ctrl_s"][1].owner, "component-b");

    assert!(d.handle_key(&mut KeyEvent::key("s").ctrl()));
    assert_eq!(*order.borrow(), vec!["component-a", "component-b"]);
}

#[test]
fn test_shared_registry_spans_dispatchers() {
    let log = Rc::new(RefCell::new(RegistrationLog::new()));
    let mut a = Dispatcher::with_registry(Platform::MacOS, log.clone());
    let mut b = Dispatcher::with_registry(Platform::MacOS, log);

    a.bind(
        Bindings::new().on("ctrl_s", |_| {}),
        BindOptions::default().owner("a"),
    );
    b.bind(
        Bindings::new().on("ctrl_s", |_| {}),
        BindOptions::default().owner("b"),
    );

    assert_eq!(a.conflicts()["ctrl_s"].len(), 2);
    assert_eq!(b.conflicts(), a.conflicts());
}

#[test]
fn test_duplicate_spec_in_one_call_replaces() {
    let mut d = dispatcher();
    let (first_count, first) = counter();
    let (second_count, second) = counter();
    d.bind(
        Bindings::new().on("ctrl_s", first).on("ctrl_s", second),
        BindOptions::default(),
    );

    d.handle_key(&mut KeyEvent::key("s").ctrl());
    assert_eq!(first_count.get(), 0);
    assert_eq!(second_count.get(), 1);
    assert!(d.conflicts().is_empty());
}

// --- scopes -------------------------------------------------------------

#[test]
fn test_scope_isolation() {
    let mut d = dispatcher();
    let (count, save) = counter();
    d.bind(
        Bindings::new().on("ctrl_s", save),
        BindOptions::default().scope("editor").owner("editor-pane"),
    );

    // Bound only in "editor": silent while "all" is current.
    assert!(!d.handle_key(&mut KeyEvent::key("s").ctrl()));
    assert_eq!(count.get(), 0);

    d.activate("editor");
    assert!(d.handle_key(&mut KeyEvent::key("s").ctrl()));
    assert_eq!(count.get(), 1);

    d.activate("viewer");
    assert!(!d.handle_key(&mut KeyEvent::key("s").ctrl()));
    assert_eq!(count.get(), 1);
}

#[test]
fn test_activate_unknown_scope_is_fresh_and_empty() {
    let mut d = dispatcher();
    d.bind(Bindings::new().on("ctrl_s", |_| {}), BindOptions::default());
    d.activate("nowhere");
    assert_eq!(d.current_scope(), "nowhere");
    assert_eq!(d.active_count(), 0);
    assert!(!d.handle_key(&mut KeyEvent::key("s").ctrl()));
}

#[test]
fn test_bind_into_current_scope_takes_effect_immediately() {
    let mut d = dispatcher();
    d.activate("editor");
    let (count, save) = counter();
    d.bind(
        Bindings::new().on("ctrl_s", save),
        BindOptions::default().scope("editor"),
    );
    assert!(d.handle_key(&mut KeyEvent::key("s").ctrl()));
    assert_eq!(count.get(), 1);
}

#[test]
fn test_unbind_removes_shortcut_and_registration() {
    let mut d = dispatcher();
    let (count, save) = counter();
    d.bind(Bindings::new().on("ctrl_s", save), BindOptions::default());
    d.unbind(DEFAULT_SCOPE, "ctrl_s");

    assert!(!d.handle_key(&mut KeyEvent::key("s").ctrl()));
    assert_eq!(count.get(), 0);
    assert!(d.registry().borrow().entries().is_empty());
}

#[test]
fn test_destroy_current_scope_empties_active_set() {
    let mut d = dispatcher();
    d.activate("editor");
    d.bind(
        Bindings::new().on("ctrl_s", |_| {}),
        BindOptions::default().scope("editor"),
    );
    d.destroy("editor");
    assert_eq!(d.active_count(), 0);
    assert!(d.registry().borrow().entries().is_empty());
}

#[test]
fn test_rebind_replaces_scope_table() {
    let mut d = dispatcher();
    let (old_count, old) = counter();
    let (new_count, new) = counter();
    d.bind(Bindings::new().on("ctrl_s", old), BindOptions::default());
    d.rebind(
        DEFAULT_SCOPE,
        Bindings::new().on("ctrl_o", new),
        BindOptions::default(),
    );

    assert!(!d.handle_key(&mut KeyEvent::key("s").ctrl()));
    assert!(d.handle_key(&mut KeyEvent::key("o").ctrl()));
    assert_eq!(old_count.get(), 0);
    assert_eq!(new_count.get(), 1);
}

#[test]
fn test_malformed_specs_dropped_silently() {
    let mut d = dispatcher();
    let (count, save) = counter();
    d.bind(
        Bindings::new().on("g--h", |_| {}).on("-x", |_| {}).on("ctrl_s", save),
        BindOptions::default(),
    );
    // Only the valid spec made it into the active set.
    assert_eq!(d.active_count(), 1);
    assert!(d.handle_key(&mut KeyEvent::key("s").ctrl()));
    assert_eq!(count.get(), 1);
}

// --- attach / detach ----------------------------------------------------

#[test]
fn test_attach_routes_source_events() {
    let mut source = FakeSource::default();
    let d = Rc::new(RefCell::new(dispatcher()));
    let (count, save) = counter();
    d.borrow_mut()
        .bind(Bindings::new().on("ctrl_s", save), BindOptions::default());

    Dispatcher::attach(&d, &mut source);
    assert!(d.borrow().is_attached());
    assert_eq!(source.listener_count(), 1);

    let mut ev = KeyEvent::key("s").ctrl();
    source.emit(EventKind::KeyDown, &mut ev);
    assert_eq!(count.get(), 1);
    assert!(ev.default_prevented());
}

#[test]
fn test_attach_twice_keeps_single_listener() {
    let mut source = FakeSource::default();
    let d = Rc::new(RefCell::new(dispatcher()));
    Dispatcher::attach(&d, &mut source);
    Dispatcher::attach(&d, &mut source);
    assert_eq!(source.listener_count(), 1);
}

#[test]
fn test_detach_unsubscribes_and_is_idempotent() {
    let mut source = FakeSource::default();
    let d = Rc::new(RefCell::new(dispatcher()));
    let (count, save) = counter();
    d.borrow_mut()
        .bind(Bindings::new().on("ctrl_s", save), BindOptions::default());

    Dispatcher::attach(&d, &mut source);
    d.borrow_mut().detach();
    d.borrow_mut().detach();
    assert!(!d.borrow().is_attached());
    assert_eq!(source.listener_count(), 0);

    source.emit(EventKind::KeyDown, &mut KeyEvent::key("s").ctrl());
    assert_eq!(count.get(), 0);
}

#[test]
fn test_detach_cancels_pending_chain() {
    let mut d = dispatcher();
    d.bind(Bindings::new().on("g-h", |_| {}), BindOptions::default());
    d.handle_key(&mut KeyEvent::key("g"));
    assert!(d.chain_deadline().is_some());
    d.detach();
    assert!(d.chain_deadline().is_none());
}

#[test]
fn test_keyup_events_are_not_routed() {
    let mut source = FakeSource::default();
    let d = Rc::new(RefCell::new(dispatcher()));
    let (count, save) = counter();
    d.borrow_mut()
        .bind(Bindings::new().on("ctrl_s", save), BindOptions::default());

    Dispatcher::attach(&d, &mut source);
    source.emit(EventKind::KeyUp, &mut KeyEvent::key("s").ctrl());
    assert_eq!(count.get(), 0);
}

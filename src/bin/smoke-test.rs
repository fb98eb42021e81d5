//! Smoke test binary for exercising the dispatcher end to end.
//!
//! Run with: cargo run --bin smoke-test
//!
//! Drives a scripted keydown sequence through a dispatcher wired to an
//! in-memory event source:
//! 1. combined shortcut (ctrl_s)
//! 2. chained shortcut (g then h)
//! 3. typing suppression inside a text input
//! 4. scope switching (editor vs viewer)
//! 5. a deliberate conflict, printed as a JSON report

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use shortcut_kit::{
    BindOptions, Bindings, Dispatcher, EventKind, EventSource, FocusTarget, KeyEvent, Listener,
    Platform, Subscription,
};

/// Minimal in-memory event source standing in for a real keyboard stream.
#[derive(Default)]
struct ScriptedSource {
    listeners: Rc<RefCell<Vec<(u64, EventKind, Listener)>>>,
    next_id: u64,
}

impl ScriptedSource {
    fn emit(&self, event: &mut KeyEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, kind, _)| *kind == EventKind::KeyDown)
            .map(|(_, _, l)| l.clone())
            .collect();
        for listener in snapshot {
            (listener.borrow_mut())(event);
        }
    }
}

impl EventSource for ScriptedSource {
    fn subscribe(&mut self, kind: EventKind, listener: Listener) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.borrow_mut().push((id, kind, listener));
        let weak = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.borrow_mut().retain(|(i, _, _)| *i != id);
            }
        })
    }
}

fn main() -> Result<()> {
    let _guard = shortcut_kit::logging::init();

    println!("=== shortcut-kit smoke test ===\n");

    let mut source = ScriptedSource::default();
    let dispatcher = Rc::new(RefCell::new(Dispatcher::new(Platform::current())));

    let fired: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let (save, go_home, close_a, close_b, export) = (
        fired.clone(),
        fired.clone(),
        fired.clone(),
        fired.clone(),
        fired.clone(),
    );

    {
        let mut d = dispatcher.borrow_mut();
        d.bind(
            Bindings::new()
                .on("ctrl_s", move |_| save.borrow_mut().push("save"))
                .on("g-h", move |_| go_home.borrow_mut().push("go-home")),
            BindOptions::default().owner("main-view"),
        );
        // Same key from two owners: reported, both fire.
        d.bind(
            Bindings::new().on("escape", move |_| close_a.borrow_mut().push("close-a")),
            BindOptions::default().owner("panel-a"),
        );
        d.bind(
            Bindings::new().on("escape", move |_| close_b.borrow_mut().push("close-b")),
            BindOptions::default().owner("panel-b"),
        );
        d.bind(
            Bindings::new().on("ctrl_e", move |_| export.borrow_mut().push("export")),
            BindOptions::default().scope("editor").owner("editor-pane"),
        );
    }
    Dispatcher::attach(&dispatcher, &mut source);

    println!("1. combined shortcut ctrl_s...");
    source.emit(&mut KeyEvent::key("s").ctrl());

    println!("2. chained shortcut g then h...");
    source.emit(&mut KeyEvent::key("g"));
    source.emit(&mut KeyEvent::key("h"));

    println!("3. escape inside a text input (suppressed)...");
    source.emit(&mut KeyEvent::key("escape").focus(FocusTarget::TextInput));

    println!("4. escape on the page (conflicting owners, both fire)...");
    source.emit(&mut KeyEvent::key("escape"));

    println!("5. ctrl_e before and after activating the editor scope...");
    source.emit(&mut KeyEvent::key("e").ctrl());
    dispatcher.borrow_mut().activate("editor");
    source.emit(&mut KeyEvent::key("e").ctrl());

    let report = dispatcher.borrow().conflicts();
    println!("\nconflict report: {}", serde_json::to_string_pretty(&report)?);
    println!("handlers fired: {:?}", fired.borrow());

    dispatcher.borrow_mut().detach();

    let got = fired.borrow().clone();
    let expected = ["save", "go-home", "close-a", "close-b", "export"];
    if got == expected {
        println!("\nOK: all scenarios behaved as expected");
        Ok(())
    } else {
        anyhow::bail!("unexpected handler sequence: {got:?}, wanted {expected:?}")
    }
}

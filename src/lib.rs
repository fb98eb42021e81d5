//! shortcut-kit: a keyboard-shortcut dispatch engine.
//!
//! Turns a declarative mapping of shortcut-spec strings onto handler
//! callbacks into a live matcher over a stream of keyboard events. Two
//! grammars are supported: simultaneous modifier combinations
//! (`"ctrl_shift_s"`) and sequential two-key chains (`"g-h"`). Matching is
//! suppressed while a text-entry element holds focus, bindings live in
//! independently activatable scopes, and registrants claiming the same
//! shortcut string are reported as conflicts (both stay bound, both fire).
//!
//! # Example
//!
//! ```ignore
//! use shortcut_kit::{BindOptions, Bindings, Dispatcher, KeyEvent, Platform};
//!
//! let mut dispatcher = Dispatcher::new(Platform::current());
//! dispatcher.bind(
//!     Bindings::new()
//!         .on("ctrl_s", |_ev| println!("save"))
//!         .on("g-h", |_ev| println!("go home")),
//!     BindOptions::default().owner("main-view"),
//! );
//! dispatcher.handle_key(&mut KeyEvent::key("s").ctrl());
//! ```

pub mod chain;
pub mod dispatcher;
pub mod event;
pub mod guard;
pub mod logging;
pub mod matcher;
pub mod registry;
pub mod spec;

pub use chain::{ChainHistory, DEFAULT_CHAIN_DELAY};
pub use dispatcher::{BindOptions, Bindings, Dispatcher, DEFAULT_SCOPE};
pub use event::{EventKind, EventSource, FocusTarget, KeyEvent, Listener, Subscription};
pub use guard::{Filter, TypingGuard};
pub use registry::{
    handler, ConflictOwner, ConflictReport, Handler, Registration, RegistrationLog,
};
pub use spec::{Modifiers, ParsedShortcut, Platform, SpecError, SpecParser};

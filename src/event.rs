//! Keyboard events and the host event-source seam.
//!
//! The engine never talks to a real window system. The host hands it
//! anything that can deliver [`KeyEvent`]s through the [`EventSource`]
//! trait; dropping the returned [`Subscription`] removes the listener.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// What currently holds keyboard focus on the host side.
///
/// The dispatcher only cares whether the target accepts text entry; hosts
/// map their own focus model onto these variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusTarget {
    /// No text-entry element focused (document body, a button, a list...).
    #[default]
    Page,
    /// Single-line text input.
    TextInput,
    /// Multi-line text area.
    TextArea,
    /// Content-editable region.
    Editable,
}

impl FocusTarget {
    pub fn is_text_entry(&self) -> bool {
        matches!(self, Self::TextInput | Self::TextArea | Self::Editable)
    }
}

/// One keyboard event as delivered by the host.
#[derive(Clone, Debug)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub target: FocusTarget,
    default_prevented: bool,
}

impl KeyEvent {
    /// A plain keydown with no modifiers, focused on the page.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl_key: false,
            meta_key: false,
            shift_key: false,
            alt_key: false,
            target: FocusTarget::Page,
            default_prevented: false,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta_key = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift_key = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt_key = true;
        self
    }

    pub fn focus(mut self, target: FocusTarget) -> Self {
        self.target = target;
        self
    }

    /// Suppress the host's default action for this event.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Event categories a source can deliver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyDown,
    KeyUp,
}

/// A registered listener. Shared and single-threaded; the engine never
/// delivers events from more than one thread.
pub type Listener = Rc<RefCell<dyn FnMut(&mut KeyEvent)>>;

/// Anything that can deliver keyboard events.
///
/// The contract mirrors `subscribe(type, listener) -> unsubscribe()`:
/// subscribing yields a [`Subscription`] whose drop removes the listener.
/// Sources must support at least [`EventKind::KeyDown`].
pub trait EventSource {
    fn subscribe(&mut self, kind: EventKind, listener: Listener) -> Subscription;
}

/// Guard for an active event subscription. Dropping it unsubscribes;
/// [`Subscription::cancel`] does the same explicitly. Safe to cancel twice.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(f) = self.cancel.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.cancel.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

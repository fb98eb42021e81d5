//! Typing suppression: don't fire shortcuts into someone's prose.

use crate::event::{FocusTarget, KeyEvent};

/// Caller-supplied override predicate. Returns true to allow matching for
/// the event. When installed it fully determines suppression for the
/// combined-match path; the chained path keeps using [`TypingGuard`].
pub type Filter = Box<dyn Fn(&KeyEvent) -> bool>;

/// Decides whether matching is suppressed because the user is typing.
#[derive(Clone, Copy, Debug)]
pub struct TypingGuard {
    pub disable_on_inputs: bool,
}

impl Default for TypingGuard {
    fn default() -> Self {
        Self {
            disable_on_inputs: true,
        }
    }
}

impl TypingGuard {
    /// True when the focused element accepts text entry and suppression is
    /// enabled. With `disable_on_inputs` false this always reports not
    /// typing.
    pub fn is_typing(&self, target: &FocusTarget) -> bool {
        self.disable_on_inputs && target.is_text_entry()
    }
}

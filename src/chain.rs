//! Chain history: the debounced token sequence behind chained shortcuts.
//!
//! Only one deadline is live at a time. Every qualifying keystroke restarts
//! it, so the window only expires when the user stops typing chain tokens.
//! Expiry clears the history silently; a successful match clears it
//! immediately and cancels the deadline.

use std::time::{Duration, Instant};

use smallvec::SmallVec;
use tracing::debug;

/// Default debounce window between chain keystrokes.
pub const DEFAULT_CHAIN_DELAY: Duration = Duration::from_millis(800);

/// Ordered, time-bounded sequence of recently pressed key tokens.
#[derive(Debug)]
pub struct ChainHistory {
    tokens: SmallVec<[String; 4]>,
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for ChainHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_DELAY)
    }
}

impl ChainHistory {
    pub fn new(delay: Duration) -> Self {
        Self {
            tokens: SmallVec::new(),
            delay,
            deadline: None,
        }
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Most recent token, if any.
    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// When the pending debounce window ends. Hosts that want eager resets
    /// can schedule a wakeup for this instant and call [`expire_if_due`];
    /// the dispatcher also checks it lazily on the next event.
    ///
    /// [`expire_if_due`]: ChainHistory::expire_if_due
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Record a token and restart the debounce window.
    pub fn push(&mut self, token: impl Into<String>, now: Instant) {
        self.tokens.push(token.into());
        self.deadline = Some(now + self.delay);
    }

    /// Clear history if the debounce window has passed. Returns true when a
    /// reset happened.
    pub fn expire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                debug!(tokens = self.tokens.len(), "chain history expired");
                self.clear();
                true
            }
            _ => false,
        }
    }

    /// Drop all tokens and cancel any pending deadline.
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.deadline = None;
    }
}

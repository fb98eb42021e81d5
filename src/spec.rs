//! Shortcut-spec parsing.
//!
//! Two grammars share one string form:
//! - combined: tokens joined by `_`, e.g. `"ctrl_shift_s"`: modifier
//!   tokens plus one base key, all held simultaneously;
//! - chained: exactly two segments joined by `-`, e.g. `"g-h"`: two keys
//!   pressed in sequence, never carrying modifiers.
//!
//! A spec with neither separator is a bare key. Shape violations (empty
//! segments, more than two chain segments) are typed errors; callers decide
//! whether to surface or drop them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::KeyEvent;

/// Errors produced while parsing a shortcut spec string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("shortcut spec is empty")]
    Empty,
    #[error("chained spec '{0}' must be exactly two non-empty segments joined by '-'")]
    ChainShape(String),
    #[error("combined spec '{0}' has an empty segment")]
    ComboShape(String),
}

/// Simultaneous modifier state required by a combined shortcut.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }

    pub fn none(&self) -> bool {
        !self.any()
    }

    /// Exact-equality check against an event's modifier state. Every flag
    /// must agree, including flags the spec never mentioned.
    pub fn matches_event(&self, event: &KeyEvent) -> bool {
        self.ctrl == event.ctrl_key
            && self.meta == event.meta_key
            && self.shift == event.shift_key
            && self.alt == event.alt_key
    }
}

/// Platform family, used to normalize `meta` specs on non-Apple hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        #[cfg(target_os = "macos")]
        {
            Platform::MacOS
        }
        #[cfg(target_os = "windows")]
        {
            Platform::Windows
        }
        #[cfg(target_os = "linux")]
        {
            Platform::Linux
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            Platform::Linux
        }
    }

    pub fn is_mac(&self) -> bool {
        matches!(self, Platform::MacOS)
    }
}

/// A spec string reduced to its matchable form.
///
/// When `chained` is true, `key` holds the full hyphen-joined pattern
/// (`"g-h"`) and `mods` is all-false; chained shortcuts never carry
/// simultaneous modifiers. Otherwise `key` is the lowercased base key with
/// modifier tokens stripped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedShortcut {
    pub key: String,
    pub chained: bool,
    pub mods: Modifiers,
}

/// Parser for shortcut-spec strings. Compile once, parse many.
pub struct SpecParser {
    platform: Platform,
    chain_shape: Regex,
    combo_shape: Regex,
}

impl SpecParser {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            // Exactly two non-empty hyphen segments.
            chain_shape: Regex::new(r"^[^-]+-[^-]+$").expect("invalid chain regex"),
            // One or more non-empty underscore segments.
            combo_shape: Regex::new(r"^[^_]+(?:_[^_]+)*$").expect("invalid combo regex"),
        }
    }

    /// Parse one raw spec string.
    pub fn parse(&self, raw: &str) -> Result<ParsedShortcut, SpecError> {
        let spec = raw.to_lowercase();
        if spec.is_empty() {
            return Err(SpecError::Empty);
        }

        // Hyphen without underscore selects the chained grammar.
        if spec.contains('-') && !spec.contains('_') {
            if !self.chain_shape.is_match(&spec) {
                return Err(SpecError::ChainShape(spec));
            }
            return Ok(ParsedShortcut {
                key: spec,
                chained: true,
                mods: Modifiers::default(),
            });
        }

        if spec.contains('_') && !self.combo_shape.is_match(&spec) {
            return Err(SpecError::ComboShape(spec));
        }

        let mut mods = Modifiers::default();
        let mut key_tokens: Vec<&str> = Vec::new();
        for token in spec.split('_') {
            match token {
                "ctrl" => mods.ctrl = true,
                "meta" | "command" => mods.meta = true,
                "shift" => mods.shift = true,
                "alt" | "option" => mods.alt = true,
                other => key_tokens.push(other),
            }
        }

        // A spec written with "meta" should act as Ctrl away from Apple
        // keyboards, so one spec serves both platforms.
        if !self.platform.is_mac() && mods.meta && !mods.ctrl {
            mods.meta = false;
            mods.ctrl = true;
        }

        Ok(ParsedShortcut {
            key: key_tokens.join("_"),
            chained: false,
            mods,
        })
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod spec_tests;

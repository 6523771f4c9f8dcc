//! Op modes and their per-release numeric values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Enforcement outcome assigned to an op for a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Allowed,
    Ignored,
    Errored,
    /// Inherit whatever the host considers the default for the op
    Default,
    Ask,
    Hint,
}

impl Mode {
    /// Every mode, in the order they are offered for selection
    pub const ALL: [Mode; 6] = [
        Mode::Allowed,
        Mode::Ignored,
        Mode::Errored,
        Mode::Default,
        Mode::Ask,
        Mode::Hint,
    ];

    /// The host's own short name for the mode
    pub fn name(self) -> &'static str {
        match self {
            Mode::Allowed => "allow",
            Mode::Ignored => "ignore",
            Mode::Errored => "deny",
            Mode::Default => "default",
            Mode::Ask => "ask",
            Mode::Hint => "hint",
        }
    }

    pub fn from_name(name: &str) -> Option<Mode> {
        Mode::ALL.into_iter().find(|mode| mode.name() == name)
    }

    /// Whether a two-state switch shows this mode as "on"
    pub fn is_checked(self) -> bool {
        matches!(self, Mode::Allowed | Mode::Default | Mode::Ask | Mode::Hint)
    }

    /// Mode written when a two-state switch is flipped
    pub fn from_checked(checked: bool) -> Mode {
        if checked {
            Mode::Allowed
        } else {
            Mode::Ignored
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw numeric value of each mode on one host release. `None` marks a mode
/// the release does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeValues {
    pub allowed: i32,
    pub ignored: i32,
    pub errored: i32,
    pub default: Option<i32>,
    pub ask: Option<i32>,
    pub hint: Option<i32>,
}

impl ModeValues {
    /// Stock values for an API level; vendor modes are added separately
    pub fn aosp(api_level: u32) -> Self {
        Self {
            allowed: 0,
            ignored: 1,
            errored: 2,
            default: if api_level >= 19 { Some(3) } else { None },
            ask: None,
            hint: None,
        }
    }

    pub fn with_ask(mut self, raw: i32) -> Self {
        self.ask = Some(raw);
        self
    }

    pub fn with_hint(mut self, raw: i32) -> Self {
        self.hint = Some(raw);
        self
    }

    pub fn raw(&self, mode: Mode) -> Option<i32> {
        match mode {
            Mode::Allowed => Some(self.allowed),
            Mode::Ignored => Some(self.ignored),
            Mode::Errored => Some(self.errored),
            Mode::Default => self.default,
            Mode::Ask => self.ask,
            Mode::Hint => self.hint,
        }
    }

    pub fn from_raw(&self, raw: i32) -> Option<Mode> {
        Mode::ALL.into_iter().find(|mode| self.raw(*mode) == Some(raw))
    }

    pub fn is_available(&self, mode: Mode) -> bool {
        self.raw(mode).is_some()
    }
}

//! Shared types for Sift launcher components.
//!
//! This crate provides the event and value types exchanged between
//! sift-core and front-ends (the terminal CLI or any other UI layer).
//! All types are serializable so a front-end can forward them over IPC.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single result entry produced by a plugin.
///
/// Backends return heterogeneous items (applications, packages, plugin
/// listings...), so the shared contract carries them as JSON values and
/// leaves interpretation to the rendering layer.
pub type Item = serde_json::Value;

/// Where keyboard focus should move next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusTarget {
    Forward,
    Backward,
    Entry,
    Up,
    Down,
    Right,
    Left,
}

impl FocusTarget {
    pub const ALL: [FocusTarget; 7] = [
        FocusTarget::Forward,
        FocusTarget::Backward,
        FocusTarget::Entry,
        FocusTarget::Up,
        FocusTarget::Down,
        FocusTarget::Right,
        FocusTarget::Left,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FocusTarget::Forward => "forward",
            FocusTarget::Backward => "backward",
            FocusTarget::Entry => "entry",
            FocusTarget::Up => "up",
            FocusTarget::Down => "down",
            FocusTarget::Right => "right",
            FocusTarget::Left => "left",
        }
    }
}

impl fmt::Display for FocusTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`FocusTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFocusTarget(pub String);

impl fmt::Display for UnknownFocusTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" is not a valid FocusTarget", self.0)
    }
}

impl std::error::Error for UnknownFocusTarget {}

impl FromStr for FocusTarget {
    type Err = UnknownFocusTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownFocusTarget(s.to_string()))
    }
}

/// Display attributes of a plugin that may change at runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMeta {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub hint: String,

    #[serde(default = "default_icon")]
    pub icon: String,
}

pub const DEFAULT_ICON: &str = "system-search-symbolic";

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

impl Default for PluginMeta {
    fn default() -> Self {
        Self {
            description: String::new(),
            hint: String::new(),
            icon: default_icon(),
        }
    }
}

/// Events raised by a single plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PluginEvent {
    /// The plugin's result sequence was replaced or mutated
    ResultChanged,

    /// Description, hint or icon changed
    MetaChanged { meta: PluginMeta },

    /// Recoverable fault (protocol or process)
    Error { message: String },

    /// Non-fatal diagnostic, e.g. unknown settings keys
    Warning { message: String },

    /// Free-form log line, e.g. subprocess stderr
    Log { message: String },

    /// Ask the UI layer to apply properties to the widget with ref `id`
    SetProps {
        id: String,
        props: serde_json::Map<String, serde_json::Value>,
    },
}

/// Updates sent from the router to the front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LauncherUpdate {
    /// Input text changed (including router-side rewrites)
    TextChanged { text: String },

    /// A different plugin now receives the input
    ActivePluginChanged { command: String },

    /// Launcher surface visibility changed
    OpenChanged { is_open: bool },

    /// Launcher was opened with an initial text
    Opened { text: String },

    /// Launcher was closed
    Closed,

    /// Move keyboard focus
    Focus { target: FocusTarget },

    /// Printable key pressed outside the entry while the router is
    /// configured to delegate type-ahead to the front-end
    StartSearch { key: u32 },

    /// Event raised by a registered plugin
    Plugin { command: String, event: PluginEvent },
}

/// Requests a plugin can make against the session that owns it.
///
/// Plugins never hold the router directly; they push these through a
/// [`SessionRequest`] channel and the router applies them in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionRequest {
    Open { text: String },
    Close,
    Focus { target: FocusTarget },
    SetText { text: String },
}

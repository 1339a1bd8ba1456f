//! Key handling for the launcher surface.
//!
//! Key codes are X11/GDK keyvals so front-ends built on GTK can pass them
//! through unchanged; other front-ends translate into the same space.

use super::Router;
use serde::{Deserialize, Serialize};
use sift_types::{FocusTarget, LauncherUpdate, SessionRequest};

/// Keyvals the state machine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMap {
    pub escape: u32,
    pub enter: u32,
    pub tab: u32,
    pub backtab: u32,
    pub backspace: u32,
    pub down: u32,
    pub up: u32,
    pub right: u32,
    pub left: u32,
    pub shift_l: u32,
    pub shift_r: u32,
    pub control_l: u32,
    pub control_r: u32,
    pub next: u32,
    pub previous: u32,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            escape: 0xff1b,
            enter: 0xff0d,
            tab: 0xff09,
            backtab: 0xfe20,
            backspace: 0xff08,
            down: 0xff54,
            up: 0xff52,
            right: 0xff53,
            left: 0xff51,
            shift_l: 0xffe1,
            shift_r: 0xffe2,
            control_l: 0xffe3,
            control_r: 0xffe4,
            next: 0x006e,
            previous: 0x0070,
        }
    }
}

// Keyvals for code points outside Latin-1 carry this offset
const UNICODE_KEYVAL_OFFSET: u32 = 0x0100_0000;

impl KeyMap {
    /// Character a keyval types, if it is printable
    #[must_use]
    pub fn to_char(key: u32) -> Option<char> {
        let code = match key {
            0x20..=0x7e | 0xa0..=0xff => key,
            k if k > UNICODE_KEYVAL_OFFSET => k - UNICODE_KEYVAL_OFFSET,
            _ => return None,
        };
        char::from_u32(code).filter(|c| !c.is_control())
    }

    /// Inverse of [`KeyMap::to_char`]
    #[must_use]
    pub fn from_char(c: char) -> u32 {
        let code = u32::from(c);
        match code {
            0x20..=0x7e | 0xa0..=0xff => code,
            _ => code + UNICODE_KEYVAL_OFFSET,
        }
    }
}

/// What a printable key does while the entry is not focused
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeAhead {
    /// Append the character to the text and focus the entry
    #[default]
    Append,

    /// Leave it to the front-end via [`LauncherUpdate::StartSearch`]
    Hook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: u32,

    /// Whether the text entry has input focus
    pub focused_entry: bool,

    /// Control-style modifier held
    pub control: bool,
}

impl KeyEvent {
    #[must_use]
    pub fn new(key: u32, focused_entry: bool) -> Self {
        Self {
            key,
            focused_entry,
            control: false,
        }
    }

    #[must_use]
    pub fn with_control(mut self) -> Self {
        self.control = true;
        self
    }
}

impl Router {
    /// Interpret a key press. Returns `false` for keys the front-end should
    /// handle itself, such as ordinary editing inside the focused entry.
    pub fn keypress(&mut self, event: KeyEvent) -> bool {
        let handled = self.handle_key(event);
        self.flush_session();
        handled
    }

    fn handle_key(&mut self, event: KeyEvent) -> bool {
        let keys = self.config.keys;
        let KeyEvent {
            key,
            focused_entry: focused,
            control,
        } = event;

        if control && key == keys.next {
            self.focus(FocusTarget::Forward);
            return true;
        }
        if control && key == keys.previous {
            self.focus(FocusTarget::Backward);
            return true;
        }

        match key {
            k if k == keys.escape => {
                self.apply_request(SessionRequest::Close);
                true
            }
            k if k == keys.enter => {
                if focused {
                    self.activate();
                }
                focused
            }
            k if k == keys.tab => {
                if focused
                    && let Some(completion) = self.complete()
                    && completion != self.text
                {
                    self.assign_text(completion);
                    self.focus(FocusTarget::Entry);
                    return true;
                }
                self.focus(FocusTarget::Forward);
                true
            }
            k if k == keys.backtab => {
                self.focus(FocusTarget::Backward);
                true
            }
            k if k == keys.backspace => self.backspace(focused),
            k if k == keys.down => {
                self.focus(FocusTarget::Down);
                true
            }
            k if k == keys.up => self.focus_unless(focused, FocusTarget::Up),
            k if k == keys.right => self.focus_unless(focused, FocusTarget::Right),
            k if k == keys.left => self.focus_unless(focused, FocusTarget::Left),
            k if [keys.shift_l, keys.shift_r, keys.control_l, keys.control_r].contains(&k) => {
                false
            }
            _ if !focused => {
                self.type_ahead(key);
                true
            }
            _ => false,
        }
    }

    fn backspace(&mut self, focused: bool) -> bool {
        if focused
            && !self.config.visible_command
            && !self.is_builtin(&self.active)
            && self.text.is_empty()
        {
            let command = self.active.command().to_string();
            let dock = self.dock_plugin();
            self.set_active(dock);
            self.assign_text(format!("{}{}", self.config.command_leader, command));
            self.focus(FocusTarget::Entry);
            return true;
        }

        if !focused {
            let mut text = self.text.clone();
            text.pop();
            self.assign_text(text);
            self.focus(FocusTarget::Entry);
            return true;
        }

        false
    }

    fn focus_unless(&mut self, focused: bool, target: FocusTarget) -> bool {
        if !focused {
            self.focus(target);
        }
        !focused
    }

    fn type_ahead(&mut self, key: u32) {
        match self.config.type_ahead {
            TypeAhead::Append => {
                if let Some(c) = KeyMap::to_char(key) {
                    let mut text = self.text.clone();
                    text.push(c);
                    self.assign_text(text);
                }
                self.focus(FocusTarget::Entry);
            }
            TypeAhead::Hook => self.emit(LauncherUpdate::StartSearch { key }),
        }
    }
}

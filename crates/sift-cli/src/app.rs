//! Front-end state mirrored from router updates.

use crossterm::event::{KeyCode, KeyEvent as TermKey, KeyModifiers};
use ratatui::widgets::ListState;
use serde_json::Value;
use sift_core::{FocusTarget, KeyEvent, KeyMap, LauncherUpdate, PluginEvent};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

/// Main application state
pub struct App {
    pub text: String,
    pub active_plugin: String,
    pub entry_focused: bool,
    pub list_state: ListState,
    pub status: Option<Status>,
    pub should_quit: bool,
    result_len: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            active_plugin: String::new(),
            entry_focused: true,
            list_state: ListState::default(),
            status: None,
            should_quit: false,
            result_len: 0,
        }
    }

    /// Apply an update. Returns text the router should be given when the
    /// update asks the front-end to edit the input.
    pub fn handle_update(&mut self, update: LauncherUpdate) -> Option<String> {
        match update {
            LauncherUpdate::TextChanged { text } => self.text = text,
            LauncherUpdate::ActivePluginChanged { command } => {
                debug!("Active plugin: {}", command);
                self.active_plugin = command;
                self.status = None;
                if !self.entry_focused {
                    self.list_state.select(Some(0));
                }
            }
            LauncherUpdate::OpenChanged { is_open } => debug!("Launcher open: {}", is_open),
            LauncherUpdate::Opened { text } => debug!("Opened with {:?}", text),
            LauncherUpdate::Closed => self.should_quit = true,
            LauncherUpdate::Focus { target } => self.move_focus(target),
            LauncherUpdate::StartSearch { key } => {
                let c = KeyMap::to_char(key)?;
                self.move_focus(FocusTarget::Entry);
                return Some(format!("{}{c}", self.text));
            }
            LauncherUpdate::Plugin { command, event } => self.plugin_event(&command, event),
        }
        None
    }

    fn plugin_event(&mut self, command: &str, event: PluginEvent) {
        match event {
            PluginEvent::Error { message } => {
                warn!("[{}] {}", command, message);
                self.status = Some(Status {
                    kind: StatusKind::Error,
                    message: format!("{command}: {message}"),
                });
            }
            PluginEvent::Warning { message } => {
                self.status = Some(Status {
                    kind: StatusKind::Warning,
                    message: format!("{command}: {message}"),
                });
            }
            PluginEvent::Log { message } => debug!("[{}] {}", command, message),
            PluginEvent::SetProps { id, props } => {
                // No widget refs in the terminal front-end; surface labels only
                if let Some(label) = props.get("label").and_then(Value::as_str) {
                    self.status = Some(Status {
                        kind: StatusKind::Info,
                        message: format!("{id}: {label}"),
                    });
                }
            }
            PluginEvent::ResultChanged | PluginEvent::MetaChanged { .. } => {}
        }
    }

    /// Called before each frame with the active plugin's result length
    pub fn set_result_len(&mut self, len: usize) {
        self.result_len = len;
        match self.list_state.selected() {
            Some(_) if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None if !self.entry_focused && len > 0 => self.list_state.select(Some(0)),
            _ => {}
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    fn move_focus(&mut self, target: FocusTarget) {
        match target {
            FocusTarget::Entry => {
                self.entry_focused = true;
                self.list_state.select(None);
            }
            FocusTarget::Forward | FocusTarget::Down => {
                if self.entry_focused {
                    if self.result_len > 0 {
                        self.entry_focused = false;
                        self.list_state.select(Some(0));
                    }
                } else if let Some(i) = self.list_state.selected()
                    && i + 1 < self.result_len
                {
                    self.list_state.select(Some(i + 1));
                }
            }
            FocusTarget::Backward | FocusTarget::Up => match self.list_state.selected() {
                _ if self.entry_focused => {}
                Some(i) if i > 0 => self.list_state.select(Some(i - 1)),
                _ => self.move_focus(FocusTarget::Entry),
            },
            FocusTarget::Left | FocusTarget::Right => {}
        }
    }

    /// Ordinary line editing for keys the router left unhandled. Returns the
    /// new text if it changed.
    pub fn edit(&self, key: &TermKey) -> Option<String> {
        if !self.entry_focused || key.modifiers.contains(KeyModifiers::CONTROL) {
            return None;
        }

        let mut text = self.text.clone();
        match key.code {
            KeyCode::Char(c) => text.push(c),
            KeyCode::Backspace => {
                text.pop()?;
            }
            _ => return None,
        }
        Some(text)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate a terminal key into the router's keyval space
pub fn key_event(key: &TermKey, keys: &KeyMap, entry_focused: bool) -> Option<KeyEvent> {
    let code = match key.code {
        KeyCode::Esc => keys.escape,
        KeyCode::Enter => keys.enter,
        KeyCode::Tab => keys.tab,
        KeyCode::BackTab => keys.backtab,
        KeyCode::Backspace => keys.backspace,
        KeyCode::Down => keys.down,
        KeyCode::Up => keys.up,
        KeyCode::Right => keys.right,
        KeyCode::Left => keys.left,
        KeyCode::Char(c) => KeyMap::from_char(c),
        _ => return None,
    };

    let event = KeyEvent::new(code, entry_focused);
    Some(if key.modifiers.contains(KeyModifiers::CONTROL) {
        event.with_control()
    } else {
        event
    })
}

/// Title and optional detail line for a result item
pub fn item_label(item: &Value) -> (String, Option<String>) {
    const TITLE_KEYS: [&str; 4] = ["name", "title", "label", "command"];
    const DETAIL_KEYS: [&str; 3] = ["description", "hint", "detail"];

    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| item.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    match item {
        Value::String(s) => (s.clone(), None),
        Value::Object(_) => (
            field(&TITLE_KEYS[..]).unwrap_or_else(|| item.to_string()),
            field(&DETAIL_KEYS[..]),
        ),
        other => (other.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(code: KeyCode) -> TermKey {
        TermKey::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_event_mapping() {
        let keys = KeyMap::default();

        let event = key_event(&key(KeyCode::Esc), &keys, true).unwrap();
        assert_eq!(event.key, keys.escape);
        assert!(event.focused_entry);

        let event = key_event(&key(KeyCode::Char('a')), &keys, false).unwrap();
        assert_eq!(event.key, 0x61);
        assert!(!event.control);

        let ctrl_n = TermKey::new(KeyCode::Char('n'), KeyModifiers::CONTROL);
        let event = key_event(&ctrl_n, &keys, true).unwrap();
        assert_eq!(event.key, keys.next);
        assert!(event.control);

        assert!(key_event(&key(KeyCode::F(1)), &keys, true).is_none());
    }

    #[test]
    fn test_focus_moves_between_entry_and_list() {
        let mut app = App::new();
        app.set_result_len(3);

        app.handle_update(LauncherUpdate::Focus {
            target: FocusTarget::Down,
        });
        assert!(!app.entry_focused);
        assert_eq!(app.selected(), Some(0));

        app.handle_update(LauncherUpdate::Focus {
            target: FocusTarget::Forward,
        });
        assert_eq!(app.selected(), Some(1));

        app.handle_update(LauncherUpdate::Focus {
            target: FocusTarget::Up,
        });
        app.handle_update(LauncherUpdate::Focus {
            target: FocusTarget::Up,
        });
        assert!(app.entry_focused);
        assert_eq!(app.selected(), None);
    }

    #[test]
    fn test_down_with_no_results_keeps_entry() {
        let mut app = App::new();
        app.handle_update(LauncherUpdate::Focus {
            target: FocusTarget::Down,
        });
        assert!(app.entry_focused);
    }

    #[test]
    fn test_selection_clamped_to_results() {
        let mut app = App::new();
        app.set_result_len(5);
        app.handle_update(LauncherUpdate::Focus {
            target: FocusTarget::Down,
        });
        app.list_state.select(Some(4));

        app.set_result_len(2);
        assert_eq!(app.selected(), Some(1));

        app.set_result_len(0);
        assert_eq!(app.selected(), None);
    }

    #[test]
    fn test_closed_quits() {
        let mut app = App::new();
        app.handle_update(LauncherUpdate::Closed);
        assert!(app.should_quit);
    }

    #[test]
    fn test_start_search_types_character() {
        let mut app = App::new();
        app.text = "fi".to_string();
        app.entry_focused = false;

        let text = app.handle_update(LauncherUpdate::StartSearch {
            key: KeyMap::from_char('r'),
        });

        assert_eq!(text.as_deref(), Some("fir"));
        assert!(app.entry_focused);
    }

    #[test]
    fn test_plugin_error_sets_status() {
        let mut app = App::new();
        app.handle_update(LauncherUpdate::Plugin {
            command: "calc".to_string(),
            event: PluginEvent::Error {
                message: "subprocess failed".to_string(),
            },
        });

        let status = app.status.unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "calc: subprocess failed");
    }

    #[test]
    fn test_edit() {
        let mut app = App::new();
        app.text = "ab".to_string();

        assert_eq!(app.edit(&key(KeyCode::Char('c'))).as_deref(), Some("abc"));
        assert_eq!(app.edit(&key(KeyCode::Backspace)).as_deref(), Some("a"));
        assert_eq!(app.edit(&key(KeyCode::Home)), None);

        app.text.clear();
        assert_eq!(app.edit(&key(KeyCode::Backspace)), None);

        app.entry_focused = false;
        assert_eq!(app.edit(&key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_item_label() {
        assert_eq!(item_label(&json!("firefox")), ("firefox".to_string(), None));
        assert_eq!(
            item_label(&json!({"command": "calc", "description": "Calculator"})),
            ("calc".to_string(), Some("Calculator".to_string()))
        );
        assert_eq!(item_label(&json!(42)), ("42".to_string(), None));
        assert_eq!(item_label(&json!({"x": 1})).0, r#"{"x":1}"#);
    }
}

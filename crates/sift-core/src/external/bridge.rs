//! Applies requests sent by a plugin process to the plugin's state and
//! the owning session.

use super::protocol::{Frame, ProtocolError, Request};
use crate::plugin::PluginState;
use crate::router::SessionHandle;
use serde_json::Value;
use sift_types::{FocusTarget, PluginEvent, PluginMeta};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

const SETTINGS_KEYS: [&str; 4] = ["description", "icon", "delay", "hint"];

pub(crate) struct Bridge {
    state: PluginState,
    session: SessionHandle,
    delay_ms: AtomicU64,
}

impl Bridge {
    pub(crate) fn new(
        command: impl Into<String>,
        meta: PluginMeta,
        session: SessionHandle,
        delay: Duration,
    ) -> Self {
        Self {
            state: PluginState::new(command, meta),
            session,
            delay_ms: AtomicU64::new(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    pub(crate) fn state(&self) -> &PluginState {
        &self.state
    }

    pub(crate) fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::Relaxed))
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(
            u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
    }

    /// Apply one request, reporting protocol faults on the error channel
    pub(crate) fn dispatch(&self, request: Request) {
        if let Err(e) = self.handle(request) {
            self.state.error(e.to_string());
        }
    }

    fn handle(&self, request: Request) -> Result<(), ProtocolError> {
        let Request { action, payload } = request;
        let Some(action) = action.filter(|a| !a.is_empty()) else {
            return Ok(());
        };

        match action.as_str() {
            "ignore" => {}
            "settings" => self.apply_settings(payload)?,
            "result" => match payload {
                Some(Value::Array(items)) => self.state.set_result(items),
                _ => return Err(ProtocolError::payload("result", "payload is not an array")),
            },
            "result:push" => {
                let item = payload.unwrap_or(Value::Null);
                self.state.update_result(|items| items.push(item));
            }
            "result:pop" => {
                self.state.update_result(Vec::pop);
            }
            "result:unshift" => {
                let item = payload.unwrap_or(Value::Null);
                self.state.update_result(|items| items.insert(0, item));
            }
            "result:shift" => {
                self.state.update_result(|items| {
                    if !items.is_empty() {
                        items.remove(0);
                    }
                });
            }
            "result:slice" => self.slice(payload.as_ref())?,
            "result:remove" => {
                let Some(index) = payload.as_ref().and_then(Value::as_f64) else {
                    return Err(ProtocolError::payload(
                        "result:remove",
                        "payload is not an index number",
                    ));
                };
                self.state.update_result(|items| {
                    if let Some(i) = exact_index(index).filter(|i| *i < items.len()) {
                        items.remove(i);
                    }
                });
            }
            "set:props" => self.set_props(payload)?,
            "set:text" => self.session.set_text(stringify(payload.as_ref())),
            "close" => self.session.close(),
            "open" => self.session.open(""),
            "focus" => {
                let target = payload
                    .as_ref()
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<FocusTarget>().ok())
                    .ok_or_else(|| ProtocolError::InvalidFocus(stringify(payload.as_ref())))?;
                self.session.focus(target);
            }
            "log" => self.state.log(stringify(payload.as_ref())),
            "log:warning" => self.state.warning(stringify(payload.as_ref())),
            "log:error" => self.state.error(stringify(payload.as_ref())),
            "batch" => {
                let Some(Value::Array(requests)) = payload else {
                    return Err(ProtocolError::payload("batch", "payload is not an array"));
                };
                for nested in requests {
                    match Request::try_from(nested) {
                        Ok(request) => self.dispatch(request),
                        Err(e) => self.state.error(e.to_string()),
                    }
                }
            }
            _ => return Err(ProtocolError::UnknownAction(action)),
        }

        Ok(())
    }

    fn apply_settings(&self, payload: Option<Value>) -> Result<(), ProtocolError> {
        let Some(Value::Object(settings)) = payload else {
            return Err(ProtocolError::InvalidSettings);
        };

        let text = |key: &str| settings.get(key).and_then(Value::as_str).map(str::to_string);
        let (description, icon, hint) = (text("description"), text("icon"), text("hint"));
        self.state.update_meta(|meta| {
            if let Some(description) = description {
                meta.description = description;
            }
            if let Some(icon) = icon {
                meta.icon = icon;
            }
            if let Some(hint) = hint {
                meta.hint = hint;
            }
        });

        if let Some(delay) = settings.get("delay").and_then(Value::as_f64) {
            self.set_delay(millis(delay));
        }

        let unknown: Vec<&str> = settings
            .keys()
            .map(String::as_str)
            .filter(|k| !SETTINGS_KEYS.contains(k))
            .collect();
        if !unknown.is_empty() {
            self.state
                .warning(format!("unknown keys on settings: {}", unknown.join(",")));
        }

        Ok(())
    }

    fn slice(&self, payload: Option<&Value>) -> Result<(), ProtocolError> {
        const ACTION: &str = "result:slice";

        let Some(Value::Array(bounds)) = payload else {
            return Err(ProtocolError::payload(ACTION, "payload is not a tuple"));
        };
        if !(1..=2).contains(&bounds.len()) {
            return Err(ProtocolError::payload(
                ACTION,
                "tuple should have 1 or 2 elements",
            ));
        }

        let start = bounds[0]
            .as_f64()
            .ok_or_else(|| ProtocolError::payload(ACTION, "start parameter has to be a number"))?;
        let end = match bounds.get(1) {
            Some(end) => Some(
                end.as_f64()
                    .ok_or_else(|| ProtocolError::payload(ACTION, "end parameter has to be a number"))?,
            ),
            None => None,
        };

        self.state.update_result(|items| {
            let len = items.len();
            let from = relative_index(start, len);
            let to = end.map_or(len, |end| relative_index(end, len));
            if from < to {
                items.truncate(to);
                items.drain(..from);
            } else {
                items.clear();
            }
        });
        Ok(())
    }

    fn set_props(&self, payload: Option<Value>) -> Result<(), ProtocolError> {
        let Some(Value::Object(mut props)) = payload else {
            return Err(ProtocolError::payload("set:props", "payload is not an object"));
        };
        let Some(Value::String(id)) = props.remove("$") else {
            return Err(ProtocolError::payload("set:props", "payload is missing ref id"));
        };

        self.state.emit(&PluginEvent::SetProps { id, props });
        Ok(())
    }
}

/// Where frames read from a plugin process are delivered.
///
/// Holds the bridge weakly so background readers never keep a destroyed
/// plugin alive.
#[derive(Clone)]
pub(crate) struct Inbox {
    bridge: Weak<Bridge>,
}

impl Inbox {
    pub(crate) fn new(bridge: &Arc<Bridge>) -> Self {
        Self {
            bridge: Arc::downgrade(bridge),
        }
    }

    pub(crate) fn deliver(&self, frame: Frame) {
        if let Some(bridge) = self.bridge.upgrade() {
            match frame {
                Ok(request) => bridge.dispatch(request),
                Err(e) => bridge.state.error(e.to_string()),
            }
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) {
        if let Some(bridge) = self.bridge.upgrade() {
            bridge.state.error(message);
        }
    }

    pub(crate) fn log(&self, message: impl Into<String>) {
        if let Some(bridge) = self.bridge.upgrade() {
            bridge.state.log(message);
        }
    }
}

/// Render a payload the way it is shown to users: strings verbatim,
/// nothing as empty, anything else as JSON text
pub(crate) fn stringify(payload: Option<&Value>) -> String {
    match payload {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// Resolve a possibly negative slice bound against `len`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn relative_index(bound: f64, len: usize) -> usize {
    let bound = bound.trunc();
    let len_f = len as f64;
    if bound < 0.0 {
        (len_f + bound).max(0.0) as usize
    } else {
        bound.min(len_f) as usize
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn exact_index(index: f64) -> Option<usize> {
    (index >= 0.0 && index.fract() == 0.0).then_some(index as usize)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn millis(delay: f64) -> Duration {
    Duration::from_millis(delay.max(0.0).round() as u64)
}

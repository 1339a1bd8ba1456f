use super::{Plugin, PluginRef, PluginState, Registry, read_lock};
use crate::router::SessionHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sift_types::PluginMeta;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, Weak};

pub const HELP_ICON: &str = "dialog-question-symbolic";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelpOptions {
    /// List every registered plugin instead of filtering by the typed command
    pub show_all: bool,

    /// Let Tab complete a partially typed command
    pub enable_completion: bool,
}

/// Lists the registered commands matching what the user has typed so far.
pub struct HelpPlugin {
    state: PluginState,
    registry: Weak<RwLock<Registry>>,
    leader: String,
    session: SessionHandle,
    show_all: AtomicBool,
    enable_completion: AtomicBool,
}

impl HelpPlugin {
    pub fn new(
        leader: impl Into<String>,
        registry: Weak<RwLock<Registry>>,
        session: SessionHandle,
        options: HelpOptions,
    ) -> Self {
        let meta = PluginMeta {
            icon: HELP_ICON.to_string(),
            ..PluginMeta::default()
        };
        Self {
            state: PluginState::new(super::HELP, meta),
            registry,
            leader: leader.into(),
            session,
            show_all: AtomicBool::new(options.show_all),
            enable_completion: AtomicBool::new(options.enable_completion),
        }
    }

    pub fn set_show_all(&self, show_all: bool) {
        self.show_all.store(show_all, Ordering::Relaxed);
    }

    pub fn set_enable_completion(&self, enable: bool) {
        self.enable_completion.store(enable, Ordering::Relaxed);
    }

    /// Registered plugins matching `text`, in registration order
    #[must_use]
    pub fn matches(&self, text: &str) -> Vec<PluginRef> {
        let Some(registry) = self.registry.upgrade() else {
            return Vec::new();
        };
        let registry = read_lock(&registry);

        if self.show_all.load(Ordering::Relaxed) {
            return registry.iter().cloned().collect();
        }

        let token = text
            .strip_prefix(self.leader.as_str())
            .unwrap_or(text)
            .split_whitespace()
            .next()
            .unwrap_or_default();

        registry
            .iter()
            .filter(|p| p.command().starts_with(token) && !p.meta().description.is_empty())
            .cloned()
            .collect()
    }

    fn command_text(&self, plugin: &PluginRef) -> String {
        format!("{}{} ", self.leader, plugin.command())
    }
}

impl Plugin for HelpPlugin {
    fn state(&self) -> &PluginState {
        &self.state
    }

    fn search(&self, text: &str) {
        let items = self
            .matches(text)
            .iter()
            .map(|p| {
                let meta = p.meta();
                json!({
                    "command": p.command(),
                    "description": meta.description,
                    "hint": meta.hint,
                    "icon": meta.icon,
                })
            })
            .collect();
        self.state.set_result(items);
    }

    fn activate(&self, text: &str) {
        if let Some(plugin) = self.matches(text).first() {
            self.session.set_text(self.command_text(plugin));
        }
    }

    fn complete(&self, text: &str) -> Option<String> {
        if !self.enable_completion.load(Ordering::Relaxed) {
            return None;
        }
        self.matches(text).first().map(|p| self.command_text(p))
    }
}

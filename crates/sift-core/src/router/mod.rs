//! Input routing: decides which plugin interprets the current text.

mod keyboard;
mod session;
mod setup;

pub use keyboard::{KeyEvent, KeyMap, TypeAhead};
pub use session::SessionHandle;

use crate::plugin::{
    CollectionPlugin, DEFAULT, DOCK, HELP, HelpOptions, HelpPlugin, ListenerId, Plugin,
    PluginRef, Registry, StaticPlugin, read_lock, same_plugin, write_lock,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sift_types::{FocusTarget, LauncherUpdate, PluginMeta, SessionRequest};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

pub const DEFAULT_COMMAND_LEADER: &str = ":";

// Upper bound on chained session requests handled in one flush. Plugins that
// answer every text change with another `set:text` would otherwise spin.
const MAX_SESSION_REQUESTS: usize = 64;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub command_leader: String,

    /// Keep the command prefix in the text instead of stripping it
    pub visible_command: bool,

    pub type_ahead: TypeAhead,
    pub keys: KeyMap,
    pub help: HelpOptions,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            command_leader: DEFAULT_COMMAND_LEADER.to_string(),
            visible_command: false,
            type_ahead: TypeAhead::default(),
            keys: KeyMap::default(),
            help: HelpOptions::default(),
        }
    }
}

/// Where a plugin goes when added with [`Router::add_child`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Placement {
    /// Reachable by command only
    #[default]
    Registry,

    /// Reachable by command and queried for non-command input
    Default,

    /// Queried for non-command input only
    #[serde(alias = "default-only")]
    DefaultOnly,
}

/// Owns the input text and the active plugin.
///
/// All routing is synchronous; plugins do their own async work and report
/// back through their [`PluginState`](crate::PluginState). Updates for the
/// front-end are sent over the channel returned by [`Router::new`].
pub struct Router {
    config: RouterConfig,
    text: String,
    is_open: bool,
    registry: Arc<RwLock<Registry>>,
    dock: Arc<StaticPlugin>,
    default: Arc<CollectionPlugin>,
    help: Arc<HelpPlugin>,
    active: PluginRef,
    update_tx: UnboundedSender<LauncherUpdate>,
    session: SessionHandle,
    session_rx: UnboundedReceiver<SessionRequest>,
    forwarders: Vec<(PluginRef, ListenerId)>,
}

impl Router {
    /// Create a router and the receiver for its updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the command leader is empty.
    pub fn new(config: RouterConfig) -> Result<(Self, UnboundedReceiver<LauncherUpdate>)> {
        if config.command_leader.is_empty() {
            return Err(Error::Config("commandLeader must not be empty".to_string()));
        }

        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (session, session_rx) = SessionHandle::channel();
        let registry = Arc::new(RwLock::new(Registry::new()));

        let dock = Arc::new(StaticPlugin::new(DOCK, PluginMeta::default(), Vec::new()));
        let default = Arc::new(CollectionPlugin::new(DEFAULT, PluginMeta::default()));
        let help = Arc::new(HelpPlugin::new(
            config.command_leader.clone(),
            Arc::downgrade(&registry),
            session.clone(),
            config.help,
        ));

        let mut router = Self {
            config,
            text: String::new(),
            is_open: false,
            registry,
            active: dock.clone(),
            dock,
            default,
            help,
            update_tx,
            session,
            session_rx,
            forwarders: Vec::new(),
        };

        let builtins: [PluginRef; 3] = [
            router.dock.clone(),
            router.default.clone(),
            router.help.clone(),
        ];
        for builtin in builtins {
            router.forward_events(&builtin);
        }

        Ok((router, update_rx))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the input text and re-run mode selection if it changed
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.assign_text(text.into());
        self.flush_session();
    }

    #[must_use]
    pub fn active_plugin(&self) -> &PluginRef {
        &self.active
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    #[must_use]
    pub fn command_leader(&self) -> &str {
        &self.config.command_leader
    }

    #[must_use]
    pub fn visible_command(&self) -> bool {
        self.config.visible_command
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Handle plugins use to request open/close/focus/text changes
    #[must_use]
    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    #[must_use]
    pub fn plugin(&self, command: &str) -> Option<PluginRef> {
        read_lock(&self.registry).get(command).cloned()
    }

    /// Registered plugins in insertion order
    #[must_use]
    pub fn plugins(&self) -> Vec<PluginRef> {
        read_lock(&self.registry).iter().cloned().collect()
    }

    #[must_use]
    pub fn builtin_dock(&self) -> &Arc<StaticPlugin> {
        &self.dock
    }

    #[must_use]
    pub fn builtin_default(&self) -> &Arc<CollectionPlugin> {
        &self.default
    }

    #[must_use]
    pub fn builtin_help(&self) -> &Arc<HelpPlugin> {
        &self.help
    }

    /// The dock in effect: a registered `dock` overrides the built-in
    #[must_use]
    pub fn dock_plugin(&self) -> PluginRef {
        self.plugin(DOCK).unwrap_or_else(|| self.dock.clone() as PluginRef)
    }

    #[must_use]
    pub fn default_plugin(&self) -> PluginRef {
        self.plugin(DEFAULT).unwrap_or_else(|| self.default.clone() as PluginRef)
    }

    #[must_use]
    pub fn help_plugin(&self) -> PluginRef {
        self.plugin(HELP).unwrap_or_else(|| self.help.clone() as PluginRef)
    }

    #[must_use]
    pub fn is_builtin(&self, plugin: &PluginRef) -> bool {
        same_plugin(plugin, &self.dock_plugin())
            || same_plugin(plugin, &self.default_plugin())
            || same_plugin(plugin, &self.help_plugin())
    }

    /// Register a plugin under its command, returning the plugin it
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommand`] if the command is empty, contains
    /// whitespace or starts with the command leader.
    pub fn add_plugin(&mut self, plugin: PluginRef) -> Result<Option<PluginRef>> {
        self.validate_command(plugin.command())?;

        let takes_dock = plugin.command() == DOCK && same_plugin(&self.active, &self.dock_plugin());

        info!("Registering plugin '{}'", plugin.command());
        let replaced = write_lock(&self.registry).insert(plugin.clone());
        self.forward_events(&plugin);

        if let Some(old) = &replaced
            && !same_plugin(old, &plugin)
            && !self.default.contains(old)
            && !same_plugin(old, &self.active)
        {
            self.stop_forwarding(old);
        }

        if takes_dock {
            self.set_active(plugin.clone());
            plugin.search("");
        }

        self.flush_session();
        Ok(replaced)
    }

    /// Add a plugin to the registry, the default collection or both.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommand`] if the command is not usable.
    pub fn add_child(&mut self, plugin: PluginRef, placement: Placement) -> Result<()> {
        self.validate_command(plugin.command())?;

        if matches!(placement, Placement::Default | Placement::DefaultOnly) {
            self.forward_events(&plugin);
            if let Some(old) = self.default.add_plugin(plugin.clone())
                && !same_plugin(&old, &plugin)
                && read_lock(&self.registry)
                    .get(old.command())
                    .is_none_or(|p| !same_plugin(p, &old))
            {
                self.stop_forwarding(&old);
            }
        }

        if placement != Placement::DefaultOnly {
            self.add_plugin(plugin)?;
        }

        Ok(())
    }

    /// Remove the binding for `command`. The active plugin is unaffected
    /// and the removed plugin is handed back to the caller, not destroyed.
    pub fn remove_plugin(&mut self, command: &str) -> Option<PluginRef> {
        let removed = write_lock(&self.registry).remove(command)?;
        debug!("Removed plugin '{}'", command);

        if !self.default.contains(&removed) && !same_plugin(&removed, &self.active) {
            self.stop_forwarding(&removed);
        }
        Some(removed)
    }

    /// Remove `plugin` from both the registry and the default collection
    pub fn remove_child(&mut self, plugin: &PluginRef) -> bool {
        let in_default = self.default.remove_plugin(plugin);

        let registered = read_lock(&self.registry)
            .get(plugin.command())
            .is_some_and(|p| same_plugin(p, plugin));
        if registered {
            write_lock(&self.registry).remove(plugin.command());
        }

        if (in_default || registered) && !same_plugin(plugin, &self.active) {
            self.stop_forwarding(plugin);
        }
        in_default || registered
    }

    /// Activate the current selection
    pub fn activate(&mut self) {
        if self.config.visible_command {
            let (remainder, plugin) = self.parse_input(&self.text);
            if let Some(plugin) = plugin {
                plugin.activate(remainder.trim_start());
            }
        } else {
            let active = self.active.clone();
            active.activate(&self.text);
        }
        self.flush_session();
    }

    /// Ask the relevant plugin for a completion of the current text.
    ///
    /// The returned string is a full replacement for the text; the router
    /// does not apply it.
    pub fn complete(&mut self) -> Option<String> {
        let completion = if self.config.visible_command {
            let text = self.text.clone();
            let (remainder, plugin) = self.parse_input(&text);
            let plugin = plugin?;
            let completion = plugin
                .complete(remainder.trim_start())
                .filter(|c| !c.is_empty())?;

            if text.starts_with(self.config.command_leader.as_str()) {
                Some(format!(
                    "{}{} {}",
                    self.config.command_leader,
                    plugin.command(),
                    completion
                ))
            } else {
                Some(completion)
            }
        } else {
            self.active.complete(&self.text).filter(|c| !c.is_empty())
        };

        self.flush_session();
        completion
    }

    pub fn open(&mut self, text: impl Into<String>) {
        self.apply_request(SessionRequest::Open { text: text.into() });
        self.flush_session();
    }

    pub fn close(&mut self) {
        self.apply_request(SessionRequest::Close);
        self.flush_session();
    }

    pub fn focus(&mut self, target: FocusTarget) {
        self.emit(LauncherUpdate::Focus { target });
    }

    /// Apply a request received from [`Router::next_session_request`]
    pub fn apply(&mut self, request: SessionRequest) {
        self.apply_request(request);
        self.flush_session();
    }

    /// Wait for the next request a plugin queued from a background task
    pub async fn next_session_request(&mut self) -> Option<SessionRequest> {
        self.session_rx.recv().await
    }

    fn apply_request(&mut self, request: SessionRequest) {
        match request {
            SessionRequest::Open { text } => {
                self.set_open(true);
                self.emit(LauncherUpdate::Opened { text: text.clone() });
                self.assign_text(text);
                self.focus(FocusTarget::Entry);
            }
            SessionRequest::Close => {
                self.set_open(false);
                let dock = self.dock_plugin();
                self.set_active(dock);
                self.assign_text(String::new());
                self.emit(LauncherUpdate::Closed);
            }
            SessionRequest::Focus { target } => self.focus(target),
            SessionRequest::SetText { text } => self.assign_text(text),
        }
    }

    fn flush_session(&mut self) {
        for _ in 0..MAX_SESSION_REQUESTS {
            let Ok(request) = self.session_rx.try_recv() else {
                return;
            };
            self.apply_request(request);
        }
        warn!(
            "More than {} chained session requests, deferring the rest",
            MAX_SESSION_REQUESTS
        );
    }

    fn set_open(&mut self, is_open: bool) {
        if self.is_open != is_open {
            self.is_open = is_open;
            self.emit(LauncherUpdate::OpenChanged { is_open });
        }
    }

    fn assign_text(&mut self, text: String) {
        if self.text == text {
            return;
        }
        self.text = text;
        self.select_mode();
        self.emit(LauncherUpdate::TextChanged {
            text: self.text.clone(),
        });
    }

    fn select_mode(&mut self) {
        let text = self.text.clone();

        if !self.config.visible_command && !self.is_builtin(&self.active) {
            let active = self.active.clone();
            debug!("Passing text to '{}'", active.command());
            active.search(&text);
            return;
        }

        if text.is_empty() {
            let dock = self.dock_plugin();
            self.set_active(dock.clone());
            dock.search("");
            return;
        }

        if !text.starts_with(self.config.command_leader.as_str()) {
            let default = self.default_plugin();
            self.set_active(default.clone());
            default.search(&text);
            return;
        }

        let (remainder, plugin) = self.parse_input(&text);
        if let Some(plugin) = plugin
            && !self.is_builtin(&plugin)
            && !remainder.trim().is_empty()
        {
            let query = if self.config.visible_command {
                remainder.trim_start().to_string()
            } else {
                let query = remainder.trim().to_string();
                self.text.clone_from(&query);
                query
            };
            debug!("Dispatching to command '{}'", plugin.command());
            self.set_active(plugin.clone());
            plugin.search(&query);
            return;
        }

        let help = self.help_plugin();
        self.set_active(help.clone());
        help.search(&text);
    }

    /// Split `text` into the remainder after the command token and the
    /// plugin it names. Text without the leader belongs to the default
    /// plugin in full.
    fn parse_input<'a>(&self, text: &'a str) -> (&'a str, Option<PluginRef>) {
        let Some(rest) = text.strip_prefix(self.config.command_leader.as_str()) else {
            return (text, Some(self.default_plugin()));
        };

        let (token, remainder) = rest
            .find(char::is_whitespace)
            .map_or((rest, ""), |i| rest.split_at(i));
        (remainder, self.plugin(token))
    }

    pub(crate) fn set_active(&mut self, plugin: PluginRef) {
        if same_plugin(&self.active, &plugin) {
            return;
        }
        self.active.clear();
        debug!(
            "Active plugin '{}' -> '{}'",
            self.active.command(),
            plugin.command()
        );
        let previous = std::mem::replace(&mut self.active, plugin);
        if !self.is_attached(&previous) {
            self.stop_forwarding(&previous);
        }
        self.emit(LauncherUpdate::ActivePluginChanged {
            command: self.active.command().to_string(),
        });
    }

    /// Whether the router still holds `plugin` anywhere besides `active`
    fn is_attached(&self, plugin: &PluginRef) -> bool {
        let builtins: [PluginRef; 3] = [
            self.dock.clone(),
            self.default.clone(),
            self.help.clone(),
        ];
        builtins.iter().any(|b| same_plugin(b, plugin))
            || self.default.contains(plugin)
            || read_lock(&self.registry)
                .get(plugin.command())
                .is_some_and(|p| same_plugin(p, plugin))
    }

    fn validate_command(&self, command: &str) -> Result<()> {
        let reason = if command.is_empty() {
            "command is empty"
        } else if command.chars().any(char::is_whitespace) {
            "contains whitespace"
        } else if command.starts_with(self.config.command_leader.as_str()) {
            "starts with the command leader"
        } else {
            return Ok(());
        };

        Err(Error::InvalidCommand {
            command: command.to_string(),
            reason,
        })
    }

    fn forward_events(&mut self, plugin: &PluginRef) {
        if self.forwarders.iter().any(|(p, _)| same_plugin(p, plugin)) {
            return;
        }

        let tx = self.update_tx.clone();
        let command = plugin.command().to_string();
        let id = plugin.state().subscribe(move |event| {
            let _ = tx.send(LauncherUpdate::Plugin {
                command: command.clone(),
                event: event.clone(),
            });
        });
        self.forwarders.push((plugin.clone(), id));
    }

    fn stop_forwarding(&mut self, plugin: &PluginRef) {
        if let Some(index) = self.forwarders.iter().position(|(p, _)| same_plugin(p, plugin)) {
            let (plugin, id) = self.forwarders.remove(index);
            plugin.state().unsubscribe(id);
        }
    }

    fn emit(&self, update: LauncherUpdate) {
        let _ = self.update_tx.send(update);
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        for (plugin, id) in self.forwarders.drain(..) {
            plugin.state().unsubscribe(id);
        }

        let mut plugins: Vec<PluginRef> = write_lock(&self.registry).drain();
        for child in self.default.plugins() {
            if !plugins.iter().any(|p| same_plugin(p, &child)) {
                plugins.push(child);
            }
        }

        debug!("Destroying {} plugins", plugins.len());
        self.default.destroy();
        for plugin in plugins {
            plugin.destroy();
        }
    }
}

//! Observable per-plugin state shared by every [`Plugin`](super::Plugin)
//! implementation.
//!
//! A plugin owns exactly one `PluginState`. Only the owning plugin mutates
//! it; everyone else reads snapshots or subscribes to [`PluginEvent`]s.

use super::{lock, read_lock, write_lock};
use sift_types::{Item, PluginEvent, PluginMeta};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};

/// Handle returned by [`PluginState::subscribe`], used to unsubscribe
pub type ListenerId = u64;

type Listener = Arc<dyn Fn(&PluginEvent) + Send + Sync>;

pub struct PluginState {
    command: String,
    meta: RwLock<PluginMeta>,
    result: RwLock<Vec<Item>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl PluginState {
    pub fn new(command: impl Into<String>, meta: PluginMeta) -> Self {
        Self {
            command: command.into(),
            meta: RwLock::new(meta),
            result: RwLock::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn meta(&self) -> PluginMeta {
        read_lock(&self.meta).clone()
    }

    /// Mutate display attributes, notifying listeners only on change
    pub fn update_meta(&self, f: impl FnOnce(&mut PluginMeta)) {
        let changed = {
            let mut meta = write_lock(&self.meta);
            let before = meta.clone();
            f(&mut meta);
            (*meta != before).then(|| meta.clone())
        };

        if let Some(meta) = changed {
            self.emit(&PluginEvent::MetaChanged { meta });
        }
    }

    /// Snapshot of the current result sequence
    #[must_use]
    pub fn result(&self) -> Vec<Item> {
        read_lock(&self.result).clone()
    }

    #[must_use]
    pub fn result_len(&self) -> usize {
        read_lock(&self.result).len()
    }

    /// Replace the result sequence wholesale
    pub fn set_result(&self, items: Vec<Item>) {
        *write_lock(&self.result) = items;
        self.emit(&PluginEvent::ResultChanged);
    }

    /// Mutate the result sequence in place; always notifies afterwards
    pub fn update_result<R>(&self, f: impl FnOnce(&mut Vec<Item>) -> R) -> R {
        let out = f(&mut write_lock(&self.result));
        self.emit(&PluginEvent::ResultChanged);
        out
    }

    pub fn subscribe(&self, listener: impl Fn(&PluginEvent) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Deliver an event to every listener.
    ///
    /// The listener list is cloned first so callbacks may subscribe,
    /// unsubscribe or read this state without deadlocking.
    pub fn emit(&self, event: &PluginEvent) {
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("[{}] {}", self.command, message);
        self.emit(&PluginEvent::Error { message });
    }

    pub fn warning(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("[{}] {}", self.command, message);
        self.emit(&PluginEvent::Warning { message });
    }

    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("[{}] {}", self.command, message);
        self.emit(&PluginEvent::Log { message });
    }
}

impl std::fmt::Debug for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginState")
            .field("command", &self.command)
            .field("meta", &self.meta())
            .field("result_len", &self.result_len())
            .finish_non_exhaustive()
    }
}

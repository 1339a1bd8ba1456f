use super::{ListenerId, Plugin, PluginRef, PluginState, read_lock, same_plugin, write_lock};
use sift_types::{Item, PluginEvent, PluginMeta};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Aggregates several plugins behind one.
///
/// Queries fan out to every child and the result is the concatenation of
/// the children's results in insertion order. A child's `ResultChanged` is
/// re-emitted as the collection's own.
pub struct CollectionPlugin {
    state: Arc<PluginState>,
    children: RwLock<Vec<(PluginRef, ListenerId)>>,
}

impl CollectionPlugin {
    pub fn new(command: impl Into<String>, meta: PluginMeta) -> Self {
        Self {
            state: Arc::new(PluginState::new(command, meta)),
            children: RwLock::new(Vec::new()),
        }
    }

    /// Append a child. A child with the same command is replaced in place
    /// and returned.
    pub fn add_plugin(&self, plugin: PluginRef) -> Option<PluginRef> {
        let weak = Arc::downgrade(&self.state);
        let listener = plugin.state().subscribe(move |event| {
            if matches!(event, PluginEvent::ResultChanged)
                && let Some(state) = weak.upgrade()
            {
                state.emit(&PluginEvent::ResultChanged);
            }
        });

        let replaced = {
            let mut children = write_lock(&self.children);
            let existing = children
                .iter()
                .position(|(child, _)| child.command() == plugin.command());
            debug!(
                "[{}] adding child '{}'",
                self.state.command(),
                plugin.command()
            );
            match existing {
                Some(index) => Some(std::mem::replace(&mut children[index], (plugin, listener))),
                None => {
                    children.push((plugin, listener));
                    None
                }
            }
        };

        let replaced = replaced.map(|(old, id)| {
            old.state().unsubscribe(id);
            old
        });
        self.state.emit(&PluginEvent::ResultChanged);
        replaced
    }

    /// Detach `plugin`, returning whether it was a child
    pub fn remove_plugin(&self, plugin: &PluginRef) -> bool {
        let removed = {
            let mut children = write_lock(&self.children);
            children
                .iter()
                .position(|(child, _)| same_plugin(child, plugin))
                .map(|index| children.remove(index))
        };

        match removed {
            Some((child, id)) => {
                child.state().unsubscribe(id);
                self.state.emit(&PluginEvent::ResultChanged);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, plugin: &PluginRef) -> bool {
        read_lock(&self.children)
            .iter()
            .any(|(child, _)| same_plugin(child, plugin))
    }

    #[must_use]
    pub fn plugins(&self) -> Vec<PluginRef> {
        read_lock(&self.children)
            .iter()
            .map(|(child, _)| Arc::clone(child))
            .collect()
    }

    #[must_use]
    pub fn has_result(&self) -> bool {
        self.plugins().iter().any(|p| !p.result().is_empty())
    }
}

impl Plugin for CollectionPlugin {
    fn state(&self) -> &PluginState {
        &self.state
    }

    fn search(&self, text: &str) {
        for child in self.plugins() {
            child.search(text);
        }
    }

    fn clear(&self) {
        for child in self.plugins() {
            child.clear();
        }
    }

    fn activate(&self, text: &str) {
        if let Some(child) = self
            .plugins()
            .into_iter()
            .find(|p| !p.result().is_empty())
        {
            child.activate(text);
        }
    }

    fn complete(&self, text: &str) -> Option<String> {
        self.plugins()
            .into_iter()
            .find_map(|p| p.complete(text).filter(|c| !c.is_empty()))
    }

    fn result(&self) -> Vec<Item> {
        self.plugins().iter().flat_map(|p| p.result()).collect()
    }

    fn destroy(&self) {
        let children = std::mem::take(&mut *write_lock(&self.children));
        for (child, id) in children {
            child.state().unsubscribe(id);
        }
    }
}

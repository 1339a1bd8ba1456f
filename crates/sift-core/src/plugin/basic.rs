use super::{Plugin, PluginState, lock};
use sift_types::{Item, PluginMeta};
use std::sync::Mutex;

/// Plugin serving a fixed list of items regardless of the query.
///
/// Used as the built-in dock; front-ends may swap the items at runtime.
pub struct StaticPlugin {
    state: PluginState,
    items: Mutex<Vec<Item>>,
}

impl StaticPlugin {
    pub fn new(command: impl Into<String>, meta: PluginMeta, items: Vec<Item>) -> Self {
        Self {
            state: PluginState::new(command, meta),
            items: Mutex::new(items),
        }
    }

    pub fn set_items(&self, items: Vec<Item>) {
        *lock(&self.items) = items;
    }
}

impl Plugin for StaticPlugin {
    fn state(&self) -> &PluginState {
        &self.state
    }

    fn search(&self, _text: &str) {
        let items = lock(&self.items).clone();
        self.state.set_result(items);
    }
}

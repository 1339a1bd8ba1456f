use super::PluginRef;
use std::collections::HashMap;

/// Plugins keyed by command, iterated in insertion order
#[derive(Default)]
pub struct Registry {
    plugins: HashMap<String, PluginRef>,
    order: Vec<String>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `plugin` to its command. A previous binding is returned and the
    /// new plugin takes its position in iteration order.
    pub fn insert(&mut self, plugin: PluginRef) -> Option<PluginRef> {
        let command = plugin.command().to_string();
        let previous = self.plugins.insert(command.clone(), plugin);
        if previous.is_none() {
            self.order.push(command);
        }
        previous
    }

    pub fn remove(&mut self, command: &str) -> Option<PluginRef> {
        let removed = self.plugins.remove(command)?;
        self.order.retain(|c| c != command);
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, command: &str) -> Option<&PluginRef> {
        self.plugins.get(command)
    }

    #[must_use]
    pub fn contains(&self, command: &str) -> bool {
        self.plugins.contains_key(command)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginRef> {
        self.order.iter().filter_map(|c| self.plugins.get(c))
    }

    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove every binding, returning plugins in insertion order
    pub fn drain(&mut self) -> Vec<PluginRef> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|c| self.plugins.remove(&c))
            .collect()
    }
}

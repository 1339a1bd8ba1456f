//! The plugin contract and the in-process plugins shipped with the core.

mod basic;
mod collection;
mod help;
mod registry;
mod state;

pub use basic::StaticPlugin;
pub use collection::CollectionPlugin;
pub use help::{HelpOptions, HelpPlugin};
pub use registry::Registry;
pub use state::{ListenerId, PluginState};

use sift_types::{Item, PluginMeta};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Command of the plugin shown when the input is empty
pub const DOCK: &str = "dock";

/// Command of the collection that handles non-command input
pub const DEFAULT: &str = "default";

/// Command of the plugin listing available commands
pub const HELP: &str = "help";

pub const BUILTIN_COMMANDS: [&str; 3] = [DOCK, DEFAULT, HELP];

/// A search/action backend.
///
/// `search` is the only required capability; the others default to no-ops.
/// Implementations keep their observable data in a [`PluginState`] and
/// replace or mutate its result from `search`, possibly asynchronously.
pub trait Plugin: Send + Sync {
    fn state(&self) -> &PluginState;

    fn search(&self, text: &str);

    /// Called on the previously active plugin when another one takes over
    fn clear(&self) {}

    fn activate(&self, _text: &str) {}

    fn complete(&self, _text: &str) -> Option<String> {
        None
    }

    fn result(&self) -> Vec<Item> {
        self.state().result()
    }

    /// Release resources (subprocesses, timers). Called once on teardown.
    fn destroy(&self) {}

    fn command(&self) -> &str {
        self.state().command()
    }

    fn meta(&self) -> PluginMeta {
        self.state().meta()
    }
}

pub type PluginRef = Arc<dyn Plugin>;

/// Identity comparison; two handles are the same plugin only if they share
/// an allocation.
#[must_use]
pub fn same_plugin(a: &PluginRef, b: &PluginRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[must_use]
pub fn is_builtin_command(command: &str) -> bool {
    BUILTIN_COMMANDS.contains(&command)
}

// A panicking listener must not wedge the launcher, so poisoned locks are
// recovered rather than propagated.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read_lock<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

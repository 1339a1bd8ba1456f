use super::Router;
use crate::config::Config;
use crate::external::ExternalPlugin;
use crate::plugin::PluginRef;
use crate::Result;
use sift_types::LauncherUpdate;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

impl Router {
    /// Build a router from config and start every declared plugin.
    ///
    /// Plugins with unusable commands are skipped with a warning. Must be
    /// called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the router config is invalid.
    pub fn from_config(config: &Config) -> Result<(Self, UnboundedReceiver<LauncherUpdate>)> {
        let (mut router, updates) = Self::new(config.router_config())?;

        for decl in &config.plugins {
            if let Err(e) = router.validate_command(&decl.command) {
                warn!("Skipping plugin: {}", e);
                continue;
            }

            let plugin: PluginRef = Arc::new(ExternalPlugin::spawn(decl.options(), router.session()));
            if let Err(e) = router.add_child(plugin, decl.placement) {
                warn!("Failed to add plugin '{}': {}", decl.command, e);
            }
        }

        info!(
            "Router ready with {} registered plugins, {} default sources",
            router.plugins().len(),
            router.builtin_default().plugins().len()
        );
        Ok((router, updates))
    }
}

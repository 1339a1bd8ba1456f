use crate::external::{ExternalMode, ExternalPluginOptions};
use crate::plugin::HelpOptions;
use crate::router::{DEFAULT_COMMAND_LEADER, Placement, RouterConfig, TypeAhead};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sift_types::PluginMeta;
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_command_leader")]
    pub command_leader: String,

    #[serde(default)]
    pub visible_command: bool,

    #[serde(default)]
    pub type_ahead: TypeAhead,

    #[serde(default)]
    pub help: HelpOptions,

    #[serde(default)]
    pub plugins: Vec<PluginDecl>,
}

fn default_command_leader() -> String {
    DEFAULT_COMMAND_LEADER.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_leader: default_command_leader(),
            visible_command: false,
            type_ahead: TypeAhead::default(),
            help: HelpOptions::default(),
            plugins: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from file, or defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, "config.json");
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty command leader or a plugin without a
    /// command or executable.
    pub fn validate(&self) -> Result<()> {
        if self.command_leader.is_empty() {
            return Err(Error::Config("commandLeader must not be empty".to_string()));
        }

        for (i, plugin) in self.plugins.iter().enumerate() {
            if plugin.command.trim().is_empty() {
                return Err(Error::Config(format!("plugins[{i}]: command is empty")));
            }
            if plugin.executable.trim().is_empty() {
                return Err(Error::Config(format!(
                    "plugins[{i}] ({}): executable is empty",
                    plugin.command
                )));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            command_leader: self.command_leader.clone(),
            visible_command: self.visible_command,
            type_ahead: self.type_ahead,
            help: self.help,
            ..RouterConfig::default()
        }
    }
}

/// An external plugin to start with the launcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDecl {
    pub command: String,

    pub executable: String,

    #[serde(default)]
    pub mode: ExternalMode,

    #[serde(default)]
    pub placement: Placement,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Search debounce in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

impl PluginDecl {
    #[must_use]
    pub fn options(&self) -> ExternalPluginOptions {
        let mut meta = PluginMeta::default();
        if let Some(description) = &self.description {
            meta.description.clone_from(description);
        }
        if let Some(hint) = &self.hint {
            meta.hint.clone_from(hint);
        }
        if let Some(icon) = &self.icon {
            meta.icon.clone_from(icon);
        }

        ExternalPluginOptions::new(&self.command, &self.executable)
            .mode(self.mode)
            .meta(meta)
            .delay(Duration::from_millis(self.delay.unwrap_or(0)))
    }
}

mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::{Config, PluginDecl};
pub use validation::{unknown_fields, warn_unknown_fields};

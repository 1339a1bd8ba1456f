//! Routing core of the sift launcher.
//!
//! A [`Router`] owns the input line and decides which [`Plugin`] interprets
//! it: the dock for empty input, the default collection for plain text, a
//! registered command for `:command args`, and help otherwise. Plugins may
//! live in-process or in an external executable speaking line-delimited
//! JSON (see [`external`]).

pub mod config;
pub mod external;
pub mod plugin;
pub mod router;

mod error;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use external::{
    ExternalMode, ExternalPlugin, ExternalPluginOptions, ProtocolError, Request, request_once,
};
pub use plugin::{
    CollectionPlugin, HelpOptions, HelpPlugin, Plugin, PluginRef, PluginState, Registry,
    StaticPlugin,
};
pub use router::{
    KeyEvent, KeyMap, Placement, Router, RouterConfig, SessionHandle, TypeAhead,
};

pub use sift_types::*;

//! Plugins implemented by an external executable.
//!
//! The host forwards `search`, `activate`, `complete`, `clear` and UI
//! `action`s as request frames; the process answers with requests of its
//! own that mutate the plugin's result and settings or drive the session.

mod bridge;
mod debounce;
mod persistent;
mod protocol;
mod transient;

pub use protocol::{CodecError, Frame, ProtocolError, Request, RequestCodec, parse_request};
pub use transient::request_once;

pub(crate) use bridge::{Bridge, Inbox};

use crate::plugin::{Plugin, PluginState};
use crate::router::SessionHandle;
use debounce::Debouncer;
use persistent::PersistentTransport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sift_types::PluginMeta;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use transient::TransientTransport;

/// Process lifetime of an external plugin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExternalMode {
    /// One process for the plugin's lifetime
    #[default]
    Persistent,

    /// One process per request
    Transient,
}

#[derive(Debug, Clone)]
pub struct ExternalPluginOptions {
    pub command: String,

    /// Command line, split on whitespace
    pub executable: String,

    pub mode: ExternalMode,
    pub meta: PluginMeta,

    /// Quiet period before a search is forwarded
    pub delay: Duration,
}

impl ExternalPluginOptions {
    pub fn new(command: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            executable: executable.into(),
            mode: ExternalMode::default(),
            meta: PluginMeta::default(),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: ExternalMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn meta(mut self, meta: PluginMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Moves host requests to the plugin process
pub(crate) trait Transport: Send + Sync {
    fn send(&self, request: Request);

    fn shutdown(&self) {}
}

pub struct ExternalPlugin {
    bridge: Arc<Bridge>,
    transport: Arc<dyn Transport>,
    debounce: Debouncer,
    executable: String,
    mode: ExternalMode,
    destroyed: AtomicBool,
}

impl ExternalPlugin {
    /// Create the plugin and, in persistent mode, start its process.
    ///
    /// Must be called from within a tokio runtime for the process to start;
    /// failures are reported on the plugin's error channel.
    pub fn spawn(options: ExternalPluginOptions, session: SessionHandle) -> Self {
        let executable = options.executable.clone();
        let mode = options.mode;
        Self::with_transport(options, session, move |inbox| -> Arc<dyn Transport> {
            match mode {
                ExternalMode::Persistent => {
                    Arc::new(PersistentTransport::spawn(&executable, inbox))
                }
                ExternalMode::Transient => Arc::new(TransientTransport::new(&executable, inbox)),
            }
        })
    }

    pub(crate) fn with_transport(
        options: ExternalPluginOptions,
        session: SessionHandle,
        transport: impl FnOnce(Inbox) -> Arc<dyn Transport>,
    ) -> Self {
        let ExternalPluginOptions {
            command,
            executable,
            mode,
            meta,
            delay,
        } = options;

        let bridge = Arc::new(Bridge::new(command, meta, session, delay));
        let transport = transport(Inbox::new(&bridge));
        debug!("[{}] created {:?} plugin for '{}'", bridge.state().command(), mode, executable);

        Self {
            bridge,
            transport,
            debounce: Debouncer::default(),
            executable,
            mode,
            destroyed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    #[must_use]
    pub fn mode(&self) -> ExternalMode {
        self.mode
    }

    /// Current search debounce, adjustable by the process via `settings`
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.bridge.delay()
    }

    /// Forward a UI action (e.g. a button press in rendered results)
    pub fn action(&self, data: Value) {
        self.request(Request::new("action", data));
    }

    /// Apply a request as if the process had sent it
    pub fn handle_request(&self, request: Request) {
        self.bridge.dispatch(request);
    }

    fn request(&self, request: Request) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        self.transport.send(request);
    }
}

impl Plugin for ExternalPlugin {
    fn state(&self) -> &PluginState {
        self.bridge.state()
    }

    fn search(&self, text: &str) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        let transport = Arc::clone(&self.transport);
        let request = Request::new("search", Value::String(text.to_string()));
        self.debounce
            .schedule(self.bridge.delay(), move || transport.send(request));
    }

    fn clear(&self) {
        self.request(Request::bare("clear"));
    }

    fn activate(&self, text: &str) {
        self.request(Request::new("activate", Value::String(text.to_string())));
    }

    /// Completions arrive asynchronously as `set:text`, so nothing is
    /// returned here.
    fn complete(&self, text: &str) -> Option<String> {
        self.request(Request::new("complete", Value::String(text.to_string())));
        None
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("[{}] destroying", self.command());
        self.debounce.cancel();
        self.transport.shutdown();
    }
}

impl Drop for ExternalPlugin {
    fn drop(&mut self) {
        self.destroy();
    }
}

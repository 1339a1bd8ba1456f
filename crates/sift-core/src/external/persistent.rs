//! One long-lived process per plugin, spoken to over stdin/stdout.

use super::Transport;
use super::bridge::Inbox;
use super::protocol::{Request, RequestCodec};
use crate::plugin::lock;
use crate::{Error, Result};
use futures_util::{SinkExt, StreamExt};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long a process gets to honour `["exit"]` before it is killed
const EXIT_GRACE: Duration = Duration::from_secs(2);

pub(crate) struct PersistentTransport {
    executable: String,
    requests: Mutex<Option<mpsc::UnboundedSender<Request>>>,
    failed: Arc<AtomicBool>,
    cancel: CancellationToken,
    inbox: Inbox,
}

impl PersistentTransport {
    /// Spawn the process. A spawn failure is reported once on the plugin's
    /// error channel and leaves the transport degraded.
    pub(crate) fn spawn(executable: &str, inbox: Inbox) -> Self {
        let failed = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        let requests = match start(executable, &inbox, &failed, &cancel) {
            Ok(tx) => Some(tx),
            Err(e) => {
                failed.store(true, Ordering::SeqCst);
                inbox.error(e.to_string());
                None
            }
        };

        Self {
            executable: executable.to_string(),
            requests: Mutex::new(requests),
            failed,
            cancel,
            inbox,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

impl Transport for PersistentTransport {
    fn send(&self, request: Request) {
        if self.failed.load(Ordering::SeqCst) {
            self.inbox.error("cannot send request: subprocess failed");
            return;
        }

        let requests = lock(&self.requests);
        match requests.as_ref() {
            Some(tx) => {
                if tx.send(request).is_err() {
                    self.inbox.error("cannot send request: subprocess failed");
                }
            }
            None => debug!("[{}] dropping request after shutdown", self.executable),
        }
    }

    fn shutdown(&self) {
        if let Some(tx) = lock(&self.requests).take() {
            debug!("[{}] sending exit", self.executable);
            let _ = tx.send(Request::bare("exit"));
        }
        self.cancel.cancel();
    }
}

fn start(
    executable: &str,
    inbox: &Inbox,
    failed: &Arc<AtomicBool>,
    cancel: &CancellationToken,
) -> Result<mpsc::UnboundedSender<Request>> {
    let runtime = Handle::try_current()
        .map_err(|_| Error::Process(format!("Cannot start {executable}: no async runtime")))?;

    let mut child = command(executable)?
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Process(format!("Failed to spawn {executable}: {e}")))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Process("Failed to get stdin handle".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Process("Failed to get stdout handle".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Process("Failed to get stderr handle".to_string()))?;

    info!("Started plugin process '{}' (pid {:?})", executable, child.id());

    let (tx, mut rx) = mpsc::unbounded_channel::<Request>();

    let writer_inbox = inbox.clone();
    let writer_failed = Arc::clone(failed);
    runtime.spawn(async move {
        let mut writer = FramedWrite::new(stdin, RequestCodec::new());
        while let Some(request) = rx.recv().await {
            if let Err(e) = writer.send(request).await {
                if !writer_failed.swap(true, Ordering::SeqCst) {
                    writer_inbox.error(format!("cannot write request: {e}"));
                }
                break;
            }
        }
        // Dropping the writer closes stdin
    });

    let reader_inbox = inbox.clone();
    let reader_cancel = cancel.clone();
    runtime.spawn(async move {
        let mut reader = FramedRead::new(stdout, RequestCodec::new());
        loop {
            tokio::select! {
                () = reader_cancel.cancelled() => break,
                frame = reader.next() => match frame {
                    Some(Ok(frame)) => reader_inbox.deliver(frame),
                    Some(Err(e)) => {
                        reader_inbox.error(format!("cannot read response: {e}"));
                        break;
                    }
                    None => break,
                },
            }
        }
    });

    let stderr_inbox = inbox.clone();
    let stderr_cancel = cancel.clone();
    runtime.spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            tokio::select! {
                () = stderr_cancel.cancelled() => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => stderr_inbox.log(line),
                    _ => break,
                },
            }
        }
    });

    runtime.spawn(watch(
        child,
        executable.to_string(),
        inbox.clone(),
        Arc::clone(failed),
        cancel.clone(),
    ));

    Ok(tx)
}

/// Wait for the process. An exit nobody asked for degrades the transport;
/// after shutdown the process gets a grace period before it is killed.
async fn watch(
    mut child: Child,
    executable: String,
    inbox: Inbox,
    failed: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    tokio::select! {
        status = child.wait() => {
            if cancel.is_cancelled() {
                debug!("[{}] exited after shutdown", executable);
                return;
            }
            let detail = match status {
                Ok(status) => status.to_string(),
                Err(e) => e.to_string(),
            };
            if !failed.swap(true, Ordering::SeqCst) {
                inbox.error(format!("subprocess exited unexpectedly ({detail})"));
            }
        }
        () = cancel.cancelled() => {
            match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
                Ok(_) => debug!("[{}] exited", executable),
                Err(_) => {
                    warn!("[{}] did not exit within {:?}, killing", executable, EXIT_GRACE);
                    let _ = child.kill().await;
                }
            }
        }
    }
}

/// Build a command from a shell-style command line. Quotes group words;
/// no expansion or redirection happens.
pub(crate) fn command(executable: &str) -> Result<Command> {
    let parts = shlex::split(executable)
        .ok_or_else(|| Error::Process(format!("invalid command line: {executable}")))?;
    let mut parts = parts.into_iter();
    let program = parts
        .next()
        .ok_or_else(|| Error::Process("executable is empty".to_string()))?;

    let mut command = Command::new(program);
    command.args(parts);
    Ok(command)
}

//! A fresh process per request: write one frame, read one frame back.

use super::Transport;
use super::bridge::Inbox;
use super::persistent::command;
use super::protocol::{ProtocolError, Request, parse_request};
use crate::{Error, Result};
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) struct TransientTransport {
    executable: String,
    inbox: Inbox,
    cancel: CancellationToken,
}

impl TransientTransport {
    pub(crate) fn new(executable: &str, inbox: Inbox) -> Self {
        Self {
            executable: executable.to_string(),
            inbox,
            cancel: CancellationToken::new(),
        }
    }
}

impl Transport for TransientTransport {
    fn send(&self, request: Request) {
        let Ok(runtime) = Handle::try_current() else {
            self.inbox.error("cannot send request: no async runtime");
            return;
        };
        if self.cancel.is_cancelled() {
            debug!("[{}] dropping request after shutdown", self.executable);
            return;
        }

        let executable = self.executable.clone();
        let inbox = self.inbox.clone();
        let cancel = self.cancel.child_token();
        runtime.spawn(async move {
            tokio::select! {
                // Dropping the exchange kills the process
                () = cancel.cancelled() => debug!("[{}] request cancelled", executable),
                result = exchange(&executable, &request) => match result {
                    Ok((response, stderr)) => {
                        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                            inbox.log(line);
                        }
                        inbox.deliver(Ok(response));
                    }
                    Err(Error::Protocol(e)) => inbox.deliver(Err(e)),
                    Err(e) => inbox.error(e.to_string()),
                },
            }
        });
    }

    fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Run `executable` once with `request` on stdin and parse its stdout as
/// the response.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned, exits unsuccessfully
/// (the error carries its trimmed stderr), or prints a malformed frame.
pub async fn request_once(executable: &str, request: &Request) -> Result<Request> {
    let (response, stderr) = exchange(executable, request).await?;
    if !stderr.trim().is_empty() {
        debug!("[{}] stderr: {}", executable, stderr.trim());
    }
    Ok(response)
}

async fn exchange(executable: &str, request: &Request) -> Result<(Request, String)> {
    let mut child = command(executable)?
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Process(format!("Failed to spawn {executable}: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Process("Failed to get stdin handle".to_string()))?;

    let mut line = request.to_line()?;
    line.push('\n');
    match stdin.write_all(line.as_bytes()).await {
        // The process may answer without reading its input
        Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
        _ => {}
    }
    drop(stdin);

    let output = child.wait_with_output().await?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let stderr = stderr.trim();
        return Err(Error::Process(if stderr.is_empty() {
            format!("{executable} exited with {}", output.status)
        } else {
            stderr.to_string()
        }));
    }

    let stdout = String::from_utf8(output.stdout).map_err(|_| ProtocolError::InvalidUtf8)?;
    let response = parse_request(stdout.trim())?;
    Ok((response, stderr))
}

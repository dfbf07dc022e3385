//! [`Transport`] backed by the `adb` host binary
//!
//! Every operation spawns `adb` with `tokio::process`. The adb server keeps the
//! actual TCP link to the device; this module only classifies what the binary
//! prints so that refused, corrupted and vanished links can be told apart.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use futures_util::stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;

use firetv_core::prelude::*;
use firetv_core::Endpoint;

use crate::transport::{Connector, ShellStream, Transport, TransportError};

/// Default timeout applied to each buffered adb invocation
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Read size for streaming shell output
const STREAM_CHUNK_SIZE: usize = 4096;

/// Error text seen when a device is stuck holding several adb connections.
///
/// Matching vendor messages is a best-effort heuristic; unknown variants fall
/// through as ordinary transport errors.
const MULTI_SESSION_SIGNATURES: &[&str] = &[
    "Unable to unpack ADB command",
    "protocol fault (couldn't read status)",
    "protocol fault (no status)",
];

/// Markers of a link that failed its integrity check
const CORRUPTION_SIGNATURES: &[&str] = &["checksum", "protocol fault", "bad magic"];

/// Markers of a device that is not (or no longer) reachable through adb
const UNAVAILABLE_SIGNATURES: &[&str] = &[
    "device offline",
    "device unauthorized",
    "no devices/emulators found",
    "not found",
    "closed",
];

/// Opens [`AdbSession`]s through `adb connect`
#[derive(Debug, Clone)]
pub struct AdbConnector {
    adb_path: PathBuf,
    command_timeout: Duration,
}

impl AdbConnector {
    pub fn new(adb_path: impl Into<PathBuf>, command_timeout: Duration) -> Self {
        Self {
            adb_path: adb_path.into(),
            command_timeout,
        }
    }

    /// Resolve the adb binary (a bare name is looked up on `PATH`)
    pub fn locate(adb: impl AsRef<Path>, command_timeout: Duration) -> Result<Self> {
        let adb = adb.as_ref();
        let resolved = which::which(adb).map_err(|e| {
            debug!("adb lookup for {} failed: {}", adb.display(), e);
            Error::AdbNotFound
        })?;

        debug!("Using adb at {}", resolved.display());
        Ok(Self::new(resolved, command_timeout))
    }
}

impl Connector for AdbConnector {
    type Session = AdbSession;

    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> std::result::Result<AdbSession, TransportError> {
        let serial = endpoint.serial();
        debug!("adb connect {}", serial);

        let output = run_adb(&self.adb_path, &["connect", &serial], self.command_timeout).await?;
        let combined = format!("{}{}", output.stdout, output.stderr);
        classify_connect_output(&combined)?;

        Ok(AdbSession {
            adb_path: self.adb_path.clone(),
            serial,
            command_timeout: self.command_timeout,
        })
    }
}

/// A device registered with the local adb server
#[derive(Debug, Clone)]
pub struct AdbSession {
    adb_path: PathBuf,
    serial: String,
    command_timeout: Duration,
}

impl AdbSession {
    pub fn serial(&self) -> &str {
        &self.serial
    }

    fn shell_command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        cmd.args(["-s", &self.serial, "shell", command])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Transport for AdbSession {
    async fn execute(&self, command: &str) -> std::result::Result<String, TransportError> {
        trace!("[{}] shell: {}", self.serial, command);

        let child = self.shell_command(command).spawn().map_err(spawn_error)?;
        let output = timeout(self.command_timeout, child.wait_with_output())
            .await
            .map_err(|_| TransportError::Timeout(self.command_timeout))??;

        // The exit status belongs to the remote command (grep exits 1 on no
        // match), so only adb's own diagnostics on stderr count as failures.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Some(err) = classify_shell_error(&stderr) {
            return Err(err);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn execute_streaming(
        &self,
        command: &str,
    ) -> std::result::Result<ShellStream, TransportError> {
        trace!("[{}] streaming shell: {}", self.serial, command);

        let mut child = self.shell_command(command).spawn().map_err(spawn_error)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Command("adb stdout was not captured".into()))?;

        Ok(chunk_stream(child, stdout, self.command_timeout))
    }
}

/// Turn a running child's stdout into a stream of text fragments.
///
/// Each read must complete within `limit`; a stalled device yields a
/// trailing [`TransportError::Timeout`] and the child is killed. Once stdout
/// closes, stderr is inspected so that a corrupted link surfaces as a
/// trailing error item instead of a silently short listing.
fn chunk_stream(child: Child, stdout: ChildStdout, limit: Duration) -> ShellStream {
    struct State {
        child: Child,
        stdout: ChildStdout,
        pending: Vec<u8>,
        limit: Duration,
        done: bool,
    }

    let state = State {
        child,
        stdout,
        pending: Vec::new(),
        limit,
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
        loop {
            match timeout(state.limit, state.stdout.read(&mut buf)).await {
                Err(_) => {
                    state.done = true;
                    if let Err(e) = state.child.start_kill() {
                        debug!("Failed to kill stalled adb: {}", e);
                    }
                    return Some((Err(TransportError::Timeout(state.limit)), state));
                }
                Ok(Ok(0)) if !state.pending.is_empty() => {
                    let tail = String::from_utf8_lossy(&state.pending).into_owned();
                    state.pending.clear();
                    return Some((Ok(tail), state));
                }
                Ok(Ok(0)) => {
                    state.done = true;
                    let stderr = match state.child.stderr.take() {
                        Some(stderr) => timeout(state.limit, read_all(stderr))
                            .await
                            .unwrap_or_default(),
                        None => String::new(),
                    };
                    if timeout(state.limit, state.child.wait()).await.is_err() {
                        debug!("adb did not exit after closing stdout");
                    }
                    return classify_shell_error(&stderr).map(|err| (Err(err), state));
                }
                Ok(Ok(n)) => {
                    state.pending.extend_from_slice(&buf[..n]);
                    let chunk = take_utf8_prefix(&mut state.pending);
                    if !chunk.is_empty() {
                        return Some((Ok(chunk), state));
                    }
                }
                Ok(Err(e)) => {
                    state.done = true;
                    return Some((Err(TransportError::Io(e)), state));
                }
            }
        }
    }))
}

/// Decode the longest prefix of `pending` that ends on a character boundary
///
/// An incomplete multi-byte sequence at the end stays in `pending` for the
/// next read; genuinely invalid bytes are replaced.
fn take_utf8_prefix(pending: &mut Vec<u8>) -> String {
    let complete = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };

    let rest = pending.split_off(complete);
    let head = std::mem::replace(pending, rest);
    String::from_utf8_lossy(&head).into_owned()
}

async fn read_all(mut reader: impl AsyncRead + Unpin) -> String {
    let mut text = String::new();
    if let Err(e) = reader.read_to_string(&mut text).await {
        debug!("Failed to read adb stderr: {}", e);
    }
    text
}

struct AdbOutput {
    stdout: String,
    stderr: String,
}

/// Run a host-side adb command (not `adb shell`) with a timeout
async fn run_adb(
    adb_path: &Path,
    args: &[&str],
    limit: Duration,
) -> std::result::Result<AdbOutput, TransportError> {
    let child = Command::new(adb_path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(spawn_error)?;

    let output = timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| TransportError::Timeout(limit))??;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    debug!("adb {} stdout: {}", args.join(" "), stdout.trim());
    if !stderr.is_empty() {
        debug!("adb {} stderr: {}", args.join(" "), stderr.trim());
    }

    Ok(AdbOutput { stdout, stderr })
}

fn spawn_error(e: std::io::Error) -> TransportError {
    if e.kind() == std::io::ErrorKind::NotFound {
        TransportError::NotFound
    } else {
        TransportError::Io(e)
    }
}

/// Map `adb connect` output onto the connect outcomes
///
/// adb prints failures on stdout and still exits 0, so the text is all there
/// is to go on.
fn classify_connect_output(text: &str) -> std::result::Result<(), TransportError> {
    let lower = text.to_lowercase();

    if lower.contains("connection refused") {
        return Err(TransportError::ConnectionRefused);
    }

    if MULTI_SESSION_SIGNATURES.iter().any(|sig| text.contains(sig)) {
        return Err(TransportError::Handshake(text.trim().to_string()));
    }

    if lower.contains("failed") || lower.contains("cannot") || lower.contains("unable") {
        return Err(TransportError::Command(text.trim().to_string()));
    }

    if lower.contains("connected to") {
        return Ok(());
    }

    Err(TransportError::Command(format!(
        "unexpected adb connect output: {}",
        text.trim()
    )))
}

/// Classify adb's own diagnostics on stderr; `None` means no adb-level failure
fn classify_shell_error(stderr: &str) -> Option<TransportError> {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();

    if CORRUPTION_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        return Some(TransportError::Corruption(trimmed.to_string()));
    }

    if lower.starts_with("error:") || lower.starts_with("adb:") {
        if UNAVAILABLE_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
            return Some(TransportError::Unavailable(trimmed.to_string()));
        }
        return Some(TransportError::Command(trimmed.to_string()));
    }

    // Anything else on stderr came from the remote command itself.
    trace!("remote stderr: {}", trimmed);
    None
}

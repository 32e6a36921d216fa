//! Connection to the downstream Java language server.
//!
//! The connection owns the spawned process, frames JSON-RPC messages with
//! the LSP base protocol (`Content-Length: N\r\n\r\n{json}`), and runs a
//! background reader task that routes responses to their waiters by request
//! ID. Writes are serialized through a mutex; reads happen only on the
//! reader task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::protocol::{
    RequestId, build_execute_command_request, build_exit_notification, build_initialize_request,
    build_initialized_notification, build_shutdown_request, validate_initialize_response,
};
use super::router::ResponseRouter;
use crate::error::{RelayError, RelayResult};

/// How long shutdown waits for the downstream server to answer before the
/// exit notification and kill are sent anyway.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A live connection to a spawned downstream language server.
pub(crate) struct BridgeConnection {
    /// Stdin for outgoing messages, serialized across concurrent requests
    stdin: Mutex<ChildStdin>,
    /// The spawned process, kept for teardown
    child: Mutex<Child>,
    /// Pending requests awaiting responses
    router: Arc<ResponseRouter>,
    /// Next JSON-RPC request ID
    next_request_id: AtomicI64,
    /// Set by the reader task on EOF or read error
    closed: Arc<AtomicBool>,
    /// Cancels the reader task when the connection is dropped
    _reader: ReaderTaskHandle,
}

/// Handle keeping the reader task alive; cancels it on drop.
struct ReaderTaskHandle {
    _join_handle: JoinHandle<()>,
    _cancel_guard: DropGuard,
}

impl std::fmt::Debug for BridgeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConnection")
            .field(
                "next_request_id",
                &self.next_request_id.load(Ordering::SeqCst),
            )
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl BridgeConnection {
    /// Spawn the downstream server and start its reader task.
    pub(crate) async fn spawn(command: &str, args: &[String]) -> RelayResult<Arc<Self>> {
        use std::process::Stdio;
        use tokio::process::Command;

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RelayError::spawn(command, e))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RelayError::protocol("failed to capture downstream stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RelayError::protocol("failed to capture downstream stdout"))?;

        let router = Arc::new(ResponseRouter::new());
        let closed = Arc::new(AtomicBool::new(false));
        let cancel_token = CancellationToken::new();

        let join_handle = tokio::spawn(reader_loop(
            MessageReader::new(stdout),
            Arc::clone(&router),
            Arc::clone(&closed),
            cancel_token.clone(),
        ));

        Ok(Arc::new(Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            router,
            next_request_id: AtomicI64::new(1),
            closed,
            _reader: ReaderTaskHandle {
                _join_handle: join_handle,
                _cancel_guard: cancel_token.drop_guard(),
            },
        }))
    }

    /// Whether the reader task has observed EOF or a fatal read error.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn allocate_request_id(&self) -> RequestId {
        RequestId::new(self.next_request_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Perform the initialize handshake with the downstream server.
    pub(crate) async fn initialize(
        &self,
        root_uri: Option<&str>,
        initialization_options: Option<serde_json::Value>,
    ) -> RelayResult<()> {
        let request_id = self.allocate_request_id();
        let request = build_initialize_request(request_id, root_uri, initialization_options);
        let response = self.request(request, request_id).await?;
        validate_initialize_response(&response)?;
        self.write_message(&build_initialized_notification()).await
    }

    /// Relay a completion lookup via `workspace/executeCommand` and return
    /// the raw response envelope.
    pub(crate) async fn execute_command(
        &self,
        command: &str,
        locator: &str,
        line: u32,
        character: u32,
    ) -> RelayResult<serde_json::Value> {
        let request_id = self.allocate_request_id();
        let request =
            build_execute_command_request(request_id, command, locator, line, character);
        self.request(request, request_id).await
    }

    /// Graceful teardown: shutdown request (bounded wait), exit
    /// notification, then kill.
    pub(crate) async fn shutdown(&self) {
        let request_id = self.allocate_request_id();
        let request = build_shutdown_request(request_id);
        match tokio::time::timeout(SHUTDOWN_GRACE, self.request(request, request_id)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(
                    target: "mixin_ls::bridge::connection",
                    "shutdown request failed: {}",
                    e
                );
            }
            Err(_) => {
                warn!(
                    target: "mixin_ls::bridge::connection",
                    "downstream server did not answer shutdown within {:?}",
                    SHUTDOWN_GRACE
                );
                self.router.remove(request_id);
            }
        }
        let _ = self.write_message(&build_exit_notification()).await;
        let _ = self.child.lock().await.start_kill();
    }

    /// Send a request and wait for its response. The waiter is registered
    /// before the write so a fast response cannot be lost.
    async fn request(
        &self,
        message: serde_json::Value,
        request_id: RequestId,
    ) -> RelayResult<serde_json::Value> {
        if self.is_closed() {
            return Err(RelayError::connection_lost("downstream server exited"));
        }

        let response_rx = self.router.register(request_id);

        if let Err(e) = self.write_message(&message).await {
            self.router.remove(request_id);
            return Err(e);
        }

        match response_rx.await {
            Ok(result) => result,
            Err(_) => Err(RelayError::connection_lost("response channel dropped")),
        }
    }

    /// Write a framed message to the downstream server's stdin.
    pub(crate) async fn write_message(&self, message: &serde_json::Value) -> RelayResult<()> {
        let mut stdin = self.stdin.lock().await;
        write_framed(&mut *stdin, message).await?;
        Ok(())
    }
}

/// The reader loop: reads framed messages and routes responses until EOF,
/// read error, or cancellation.
async fn reader_loop(
    mut reader: MessageReader<ChildStdout>,
    router: Arc<ResponseRouter>,
    closed: Arc<AtomicBool>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                debug!(
                    target: "mixin_ls::bridge::reader",
                    "reader task cancelled, shutting down"
                );
                break;
            }

            result = reader.read_message() => {
                match result {
                    Ok(message) => handle_message(message, &router),
                    Err(e) => {
                        warn!(
                            target: "mixin_ls::bridge::reader",
                            "reader stopped: {}, failing pending requests",
                            e
                        );
                        closed.store(true, Ordering::SeqCst);
                        router.fail_all(&format!("reader stopped: {}", e));
                        break;
                    }
                }
            }
        }
    }
}

/// Classify and dispatch one downstream message.
///
/// Responses (numeric id, no method) go to their waiter. Everything else —
/// notifications and server-initiated requests such as
/// `client/registerCapability` — is logged and dropped; the relay has no use
/// for them.
fn handle_message(message: serde_json::Value, router: &ResponseRouter) {
    let is_response = message.get("id").is_some() && message.get("method").is_none();
    if is_response {
        if !router.route(message) {
            debug!(
                target: "mixin_ls::bridge::reader",
                "response for unknown request ID, dropping"
            );
        }
    } else if let Some(method) = message.get("method").and_then(|v| v.as_str()) {
        debug!(
            target: "mixin_ls::bridge::reader",
            "ignoring downstream message: {}",
            method
        );
    }
}

/// Write a JSON-RPC message with LSP base-protocol framing.
pub(crate) async fn write_framed<W>(writer: &mut W, message: &serde_json::Value) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_string(message)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    let framed = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
    writer.write_all(framed.as_bytes()).await?;
    writer.flush().await
}

/// Reads LSP base-protocol framed messages from a byte stream.
pub(crate) struct MessageReader<R> {
    reader: BufReader<R>,
}

impl<R> MessageReader<R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    /// Read one framed message.
    ///
    /// Headers other than `Content-Length` (e.g. `Content-Type`) are
    /// skipped. EOF before a complete message is an error.
    pub(crate) async fn read_message(&mut self) -> std::io::Result<serde_json::Value> {
        use std::io::{Error, ErrorKind};

        let mut content_length: Option<usize> = None;
        loop {
            let mut line = String::new();
            let bytes_read = self.reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                return Err(Error::new(
                    ErrorKind::UnexpectedEof,
                    "downstream closed the stream",
                ));
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.strip_prefix("Content-Length:") {
                let parsed = value.trim().parse::<usize>().map_err(|e| {
                    Error::new(ErrorKind::InvalidData, format!("invalid Content-Length: {}", e))
                })?;
                content_length = Some(parsed);
            }
        }

        let content_length = content_length
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "missing Content-Length header"))?;

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await?;

        serde_json::from_slice(&body)
            .map_err(|e| Error::new(ErrorKind::InvalidData, format!("invalid JSON body: {}", e)))
    }
}

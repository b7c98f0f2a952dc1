//! Server-push stream with fixed-delay reconnection.
//!
//! [`StreamController`] keeps one long-lived connection to
//! `<endpoint>/stream` and publishes the latest payload. The state
//! machine is:
//!
//! | From                   | Event              | To                     |
//! |------------------------|--------------------|------------------------|
//! | `Connecting`           | open succeeded     | `Connected`            |
//! | `Connecting`           | open failed        | `DisconnectedRetrying` |
//! | `Connected`            | message            | `Connected`            |
//! | `Connected`            | error / server EOF | `DisconnectedRetrying` |
//! | `DisconnectedRetrying` | retry delay passed | `Connecting`           |
//! | any                    | shutdown / drop    | `Closed`               |
//!
//! Retries are unbounded and the delay never grows. Messages that are
//! not valid JSON are logged and dropped without touching the connection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use eventdekho_api::{ApiClient, Error as ApiError, SseStream};
use serde_json::Value;
use strum::Display;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const MESSAGE_CHANNEL_CAPACITY: usize = 256;

// ── Connection seam ──────────────────────────────────────────────────

/// Something that can open a push connection.
pub trait EventSource: Send + Sync + 'static {
    type Connection: EventConnection;

    fn open(&self) -> impl Future<Output = Result<Self::Connection, ApiError>> + Send;
}

/// An open push connection yielding raw text messages.
pub trait EventConnection: Send + 'static {
    /// Next message; `None` when the server ends the stream.
    fn next_message(&mut self) -> impl Future<Output = Option<Result<String, ApiError>>> + Send;
}

/// Server-sent events over the REST adapter.
#[derive(Debug, Clone)]
pub struct SseSource {
    client: Arc<ApiClient>,
    path: String,
}

impl SseSource {
    /// Source for the `<endpoint>/stream` convention.
    pub fn for_endpoint(client: Arc<ApiClient>, endpoint: &str) -> Self {
        Self {
            client,
            path: format!("{}/stream", endpoint.trim_end_matches('/')),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl EventSource for SseSource {
    type Connection = SseStream;

    async fn open(&self) -> Result<SseStream, ApiError> {
        self.client.open_stream(&self.path).await
    }
}

impl EventConnection for SseStream {
    async fn next_message(&mut self) -> Option<Result<String, ApiError>> {
        self.next_event().await.map(|r| r.map(|event| event.data))
    }
}

// ── Observable state ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum StreamState {
    Connecting,
    Connected,
    DisconnectedRetrying,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamSnapshot {
    pub state: StreamState,
    pub is_connected: bool,
    /// True until the first connection opens.
    pub loading: bool,
    /// Latest successfully parsed payload.
    pub data: Option<Value>,
    pub error: Option<String>,
    /// Reconnection attempts started so far.
    pub reconnects: u64,
}

impl Default for StreamSnapshot {
    fn default() -> Self {
        Self {
            state: StreamState::Connecting,
            is_connected: false,
            loading: true,
            data: None,
            error: None,
            reconnects: 0,
        }
    }
}

// ── StreamController ─────────────────────────────────────────────────

/// Owner of the background connection loop.
///
/// Exactly one loop runs per controller, so at most one connection is
/// live at a time. [`shutdown`](Self::shutdown) or dropping the
/// controller closes it and stops further reconnects.
pub struct StreamController {
    state: watch::Receiver<StreamSnapshot>,
    messages: broadcast::Sender<Arc<Value>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl StreamController {
    /// Start the connection loop on the current Tokio runtime.
    pub fn spawn<S: EventSource>(source: S, retry_delay: Duration) -> Self {
        let (state_tx, state) = watch::channel(StreamSnapshot::default());
        let (messages, _) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let task = StreamTask {
            state: state_tx,
            messages: messages.clone(),
            cancel: cancel.clone(),
            retry_delay,
        };
        let handle = tokio::spawn(task.run(source));

        Self {
            state,
            messages,
            cancel,
            handle,
        }
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamSnapshot> {
        self.state.clone()
    }

    /// Receive every parsed payload, not just the latest.
    pub fn subscribe_messages(&self) -> broadcast::Receiver<Arc<Value>> {
        self.messages.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected
    }

    pub fn latest(&self) -> Option<Value> {
        self.state.borrow().data.clone()
    }

    /// Close the connection; no reconnect is scheduled afterwards.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the background loop has exited.
    pub fn is_closed(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background loop ──────────────────────────────────────────────────

struct StreamTask {
    state: watch::Sender<StreamSnapshot>,
    messages: broadcast::Sender<Arc<Value>>,
    cancel: CancellationToken,
    retry_delay: Duration,
}

impl StreamTask {
    async fn run<S: EventSource>(self, source: S) {
        loop {
            self.state.send_modify(|s| s.state = StreamState::Connecting);

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                outcome = self.connect_and_read(&source) => outcome,
            };

            let message = match outcome {
                Ok(()) => "stream closed by server".to_owned(),
                Err(e) => e.user_message(),
            };
            warn!(error = %message, "stream disconnected");
            self.state.send_modify(|s| {
                s.state = StreamState::DisconnectedRetrying;
                s.is_connected = false;
                s.error = Some(message);
            });

            let delay_ms = u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX);
            info!(delay_ms, "scheduling stream reconnect");
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.retry_delay) => {}
            }

            self.state.send_modify(|s| s.reconnects += 1);
        }

        self.state.send_modify(|s| {
            s.state = StreamState::Closed;
            s.is_connected = false;
        });
        debug!("stream loop exiting");
    }

    /// One connection lifecycle: open, then read until it drops.
    async fn connect_and_read<S: EventSource>(&self, source: &S) -> Result<(), ApiError> {
        let mut conn = source.open().await?;

        self.state.send_modify(|s| {
            s.state = StreamState::Connected;
            s.is_connected = true;
            s.loading = false;
            s.error = None;
        });
        info!("stream connected");

        while let Some(message) = conn.next_message().await {
            let text = message?;
            match serde_json::from_str::<Value>(&text) {
                Ok(payload) => {
                    self.state.send_modify(|s| s.data = Some(payload.clone()));
                    // no subscribers is fine
                    let _ = self.messages.send(Arc::new(payload));
                }
                Err(e) => warn!(error = %e, "dropping malformed stream message"),
            }
        }
        Ok(())
    }
}

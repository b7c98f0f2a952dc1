#![allow(clippy::unwrap_used)]
// Reconnect state machine tests driven by a scripted event source on a
// paused clock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::sleep;

use eventdekho_api::Error as ApiError;
use eventdekho_core::{EventConnection, EventSource, StreamController, StreamState};

const RETRY: Duration = Duration::from_millis(5000);

// ── Scripted source ─────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum End {
    /// Stay open forever.
    Hold,
    /// Fail with a transport error.
    Fail,
    /// Server ends the stream cleanly.
    Close,
}

enum Step {
    Refuse,
    Serve(Vec<&'static str>, End),
}

#[derive(Clone, Default)]
struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Step>>>,
    opens: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let source = Self::default();
        source.script.lock().unwrap().extend(steps);
        source
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl EventSource for ScriptedSource {
    type Connection = ScriptedConnection;

    async fn open(&self) -> Result<ScriptedConnection, ApiError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Serve(Vec::new(), End::Hold));

        match step {
            Step::Refuse => Err(ApiError::Network {
                message: "connection refused".into(),
            }),
            Step::Serve(messages, end) => {
                let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_live.fetch_max(now, Ordering::SeqCst);
                Ok(ScriptedConnection {
                    messages: messages.into_iter().map(str::to_owned).collect(),
                    end,
                    live: Arc::clone(&self.live),
                })
            }
        }
    }
}

struct ScriptedConnection {
    messages: VecDeque<String>,
    end: End,
    live: Arc<AtomicUsize>,
}

impl EventConnection for ScriptedConnection {
    async fn next_message(&mut self) -> Option<Result<String, ApiError>> {
        if let Some(message) = self.messages.pop_front() {
            return Some(Ok(message));
        }
        match self.end {
            End::Hold => std::future::pending().await,
            End::Fail => Some(Err(ApiError::Stream("connection reset".into()))),
            End::Close => None,
        }
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_initial_snapshot_is_connecting() {
    let source = ScriptedSource::new([]);
    let stream = StreamController::spawn(source, RETRY);

    let snap = stream.snapshot();
    assert_eq!(snap.state, StreamState::Connecting);
    assert!(snap.loading);
    assert!(!snap.is_connected);
    assert!(snap.data.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_error_schedules_single_reconnect_after_delay() {
    let source = ScriptedSource::new([Step::Refuse]);
    let stream = StreamController::spawn(source.clone(), RETRY);

    sleep(Duration::from_millis(10)).await;
    let snap = stream.snapshot();
    assert_eq!(snap.state, StreamState::DisconnectedRetrying);
    assert!(!snap.is_connected);
    assert_eq!(
        snap.error.as_deref(),
        Some("Network error: connection refused")
    );
    assert_eq!(source.opens(), 1);

    sleep(Duration::from_millis(4980)).await;
    assert_eq!(source.opens(), 1, "reconnected before the retry delay");
    assert_eq!(stream.snapshot().reconnects, 0);

    sleep(Duration::from_millis(20)).await;
    let snap = stream.snapshot();
    assert_eq!(source.opens(), 2);
    assert_eq!(snap.reconnects, 1);
    assert_eq!(snap.state, StreamState::Connected);
    assert!(snap.is_connected);
    assert!(snap.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_messages_update_latest_data() {
    let source = ScriptedSource::new([Step::Serve(
        vec![r#"{"type":"registered","count":1}"#, r#"{"type":"registered","count":2}"#],
        End::Hold,
    )]);
    let stream = StreamController::spawn(source, RETRY);
    let mut messages = stream.subscribe_messages();

    sleep(Duration::from_millis(10)).await;

    assert_eq!(
        stream.latest(),
        Some(json!({ "type": "registered", "count": 2 }))
    );
    assert_eq!(*messages.recv().await.unwrap(), json!({ "type": "registered", "count": 1 }));
    assert_eq!(*messages.recv().await.unwrap(), json!({ "type": "registered", "count": 2 }));
    assert!(!stream.snapshot().loading);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_message_is_dropped() {
    let source = ScriptedSource::new([Step::Serve(vec!["{not json", r#"{"id":1}"#], End::Hold)]);
    let stream = StreamController::spawn(source.clone(), RETRY);
    let mut messages = stream.subscribe_messages();

    sleep(Duration::from_millis(10)).await;

    let snap = stream.snapshot();
    assert_eq!(snap.state, StreamState::Connected);
    assert_eq!(snap.data, Some(json!({ "id": 1 })));
    assert!(snap.error.is_none());
    assert_eq!(source.opens(), 1);

    assert_eq!(*messages.recv().await.unwrap(), json!({ "id": 1 }));
    assert!(messages.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_server_close_retries_and_keeps_data() {
    let source = ScriptedSource::new([
        Step::Serve(vec![r#"{"n":1}"#], End::Close),
        Step::Serve(Vec::new(), End::Hold),
    ]);
    let stream = StreamController::spawn(source.clone(), RETRY);

    sleep(Duration::from_millis(10)).await;
    let snap = stream.snapshot();
    assert_eq!(snap.state, StreamState::DisconnectedRetrying);
    assert_eq!(snap.data, Some(json!({ "n": 1 })));
    assert_eq!(snap.error.as_deref(), Some("stream closed by server"));

    sleep(RETRY).await;
    assert_eq!(source.opens(), 2);
    assert!(stream.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_reconnects() {
    let source = ScriptedSource::new([Step::Refuse]);
    let stream = StreamController::spawn(source.clone(), RETRY);

    sleep(Duration::from_millis(10)).await;
    stream.shutdown();
    sleep(Duration::from_secs(20)).await;

    assert_eq!(source.opens(), 1);
    assert_eq!(stream.snapshot().state, StreamState::Closed);
    assert!(stream.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_drop_closes_live_connection() {
    let source = ScriptedSource::new([Step::Serve(Vec::new(), End::Hold)]);
    let stream = StreamController::spawn(source.clone(), RETRY);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(source.live(), 1);

    drop(stream);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(source.live(), 0);

    sleep(Duration::from_secs(20)).await;
    assert_eq!(source.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_live_connection() {
    let source = ScriptedSource::new([
        Step::Serve(vec![r#"{"n":1}"#], End::Fail),
        Step::Serve(Vec::new(), End::Fail),
        Step::Refuse,
        Step::Serve(Vec::new(), End::Hold),
    ]);
    let stream = StreamController::spawn(source.clone(), RETRY);

    sleep(Duration::from_secs(20)).await;

    assert_eq!(source.opens(), 4);
    assert_eq!(source.max_live.load(Ordering::SeqCst), 1);
    assert_eq!(source.live(), 1);
    let snap = stream.snapshot();
    assert_eq!(snap.state, StreamState::Connected);
    assert_eq!(snap.reconnects, 3);
    assert_eq!(snap.data, Some(json!({ "n": 1 })));
}

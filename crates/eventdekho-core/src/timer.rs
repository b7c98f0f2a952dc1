// ── Cancellable delayed work ──
//
// `DelayedTask` runs a future after a delay unless cancelled first.
// Cancellation only covers the waiting phase; once the body starts it
// runs to completion. `Debouncer` keeps at most one armed task.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A future scheduled to run after a delay.
///
/// Dropping the task cancels it if it has not fired yet.
#[derive(Debug)]
pub struct DelayedTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl DelayedTask {
    /// Spawn `body` to run after `delay` on the current Tokio runtime.
    pub fn schedule<F>(delay: Duration, body: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => body.await,
            }
        });
        Self { cancel, handle }
    }

    /// Cancel the task if it is still waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// `true` until the task has fired and finished, or was cancelled.
    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Keeps a single pending [`DelayedTask`]; re-arming cancels the previous one.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    slot: Mutex<Option<DelayedTask>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `body` after the quiet period, cancelling any armed task.
    pub fn arm<F>(&self, body: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = DelayedTask::schedule(self.delay, body);
        let previous = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Cancel the armed task, if any.
    pub fn cancel(&self) {
        if let Some(task) = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.cancel();
        }
    }

    /// Whether a task is armed and has not run yet.
    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(DelayedTask::is_pending)
    }
}

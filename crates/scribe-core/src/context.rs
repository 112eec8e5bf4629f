//! Per-request execution context: an optional deadline and an optional
//! cancellation signal.

use std::time::{Duration, Instant};

use futures::future::select_all;
use tokio::sync::watch;

/// Deadline and cancellation carried through every storage operation.
///
/// Cloning is cheap; clones observe the same cancellation signals.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    /// One signal per cancellable ancestor, outermost first.
    cancel: Vec<watch::Receiver<bool>>,
}

/// Cancels the paired [`Context`] when `cancel` is called or the handle is dropped.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl Context {
    /// A context that never expires and is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: Vec::new(),
        }
    }

    /// Derive a child context that can be cancelled through the returned handle.
    ///
    /// The child keeps this context's deadline and is also cancelled when
    /// any of its ancestors is.
    pub fn cancellable(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut cancel = self.cancel.clone();
        cancel.push(rx);
        let ctx = Self {
            deadline: self.deadline,
            cancel,
        };
        (ctx, CancelHandle { tx })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Budget for a single call capped at `limit`.
    pub fn budget(&self, limit: Duration) -> Duration {
        self.remaining().map_or(limit, |left| left.min(limit))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.iter().any(|rx| *rx.borrow())
    }

    /// Resolves once the context or any ancestor is cancelled. Never
    /// resolves for a context without a cancellation signal.
    pub async fn cancelled(&self) {
        let mut waits: Vec<_> = self
            .cancel
            .iter()
            .cloned()
            .map(|mut rx| Box::pin(async move { rx.wait_for(|cancelled| *cancelled).await.is_ok() }))
            .collect();

        while !waits.is_empty() {
            let (signalled, _, rest) = select_all(waits).await;
            if signalled {
                return;
            }
            waits = rest;
        }
        std::future::pending::<()>().await
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

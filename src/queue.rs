//! # Operation Queue
//!
//! Strict-order execution for everything issued against one resource.
//!
//! ## How It Works
//!
//! ```text
//! enqueue(op) ──▶ mailbox (unbounded mpsc) ──▶ worker task ──▶ op.await ──▶ oneshot ──▶ Pending
//! ```
//!
//! Each [`OpQueue`] owns a mailbox drained by a single worker task, so at
//! most one operation is in flight and operations complete in the order
//! they were enqueued. [`OpQueue::enqueue`] is synchronous: the position in
//! the queue is fixed at call time, not when the returned [`Pending`] is
//! first polled.
//!
//! A failed operation does not cancel its successors, and neither does a
//! panicking one: the panic is caught and reported as
//! [`FsError::Panicked`] to that operation's caller only. Dropping a
//! [`Pending`] does not cancel its operation either; it still runs, the
//! result is just discarded.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};

use crate::FsError;

type Job = BoxFuture<'static, ()>;

/// A mailbox that runs queued operations one at a time, in arrival order.
///
/// Clones feed the same mailbox. The worker exits once every clone is
/// dropped and the backlog is drained.
#[derive(Debug, Clone)]
pub struct OpQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl OpQueue {
    /// Create a queue and spawn its worker task.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a Tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
        });
        Self { tx }
    }

    /// Append `op` to the queue.
    ///
    /// Never blocks. The returned [`Pending`] resolves with the operation's
    /// result once every operation enqueued before it has finished and it
    /// has run itself. `operation` labels tracing events and errors.
    pub fn enqueue<T, F>(&self, operation: &'static str, op: F) -> Pending<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, FsError>> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let job = async move {
            tracing::trace!(operation, "queued operation started");
            let result = match AssertUnwindSafe(op).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(operation, %message, "queued operation panicked");
                    Err(FsError::Panicked { operation, message })
                }
            };
            // Nobody may be waiting any more.
            let _ = reply.send(result);
        }
        .boxed();

        if self.tx.send(job).is_err() {
            // Dropping the job drops `reply`, so the Pending reports Interrupted.
            tracing::warn!(operation, "queue worker has shut down");
        }
        Pending { operation, rx }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Default for OpQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of an enqueued operation that may not have run yet.
///
/// Await it to get the operation's result.
#[derive(Debug)]
pub struct Pending<T> {
    operation: &'static str,
    rx: oneshot::Receiver<Result<T, FsError>>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T, FsError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let operation = self.operation;
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(FsError::Interrupted { operation })),
            Poll::Pending => Poll::Pending,
        }
    }
}

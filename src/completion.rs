//! Completion-notification entry points.
//!
//! Every operation in this crate is awaitable. Callers that would rather be
//! notified than await can hand the same future to [`OnComplete::on_complete`]
//! or use [`FileSystem::with_callback`]; both run on the ambient tokio
//! runtime and invoke the callback exactly once with the result.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::{Driver, FileSystem};

/// Deliver a future's output to a callback instead of awaiting it.
///
/// Implemented for every `Send + 'static` future, which covers [`Pending`]
/// results from a [`File`] and boxed [`FileSystem`] futures alike.
///
/// [`Pending`]: crate::Pending
/// [`File`]: crate::File
///
/// # Example
///
/// ```rust
/// use litefs::{FileSystem, MemoryDriver, OnComplete};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fs = FileSystem::new(MemoryDriver::new());
/// fs.write_file("/note.txt", b"").await.unwrap();
/// let file = fs.open("/note.txt").await.unwrap();
/// let (tx, rx) = tokio::sync::oneshot::channel();
/// file.write(b"hi").on_complete(move |result| {
///     let _ = tx.send(result);
/// });
/// assert_eq!(rx.await.unwrap().unwrap(), 2);
/// # file.close().await.unwrap();
/// # }
/// ```
pub trait OnComplete: Future + Send + Sized + 'static {
    /// Spawn the future and call `callback` with its output.
    ///
    /// The returned handle can be awaited to know the callback has run;
    /// dropping it detaches the task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    fn on_complete<F>(self, callback: F) -> JoinHandle<()>
    where
        Self::Output: Send + 'static,
        F: FnOnce(Self::Output) + Send + 'static,
    {
        tokio::spawn(async move {
            let output = self.await;
            callback(output);
        })
    }
}

impl<Fut: Future + Send + 'static> OnComplete for Fut {}

impl<D: Driver> FileSystem<D> {
    /// Run an operation built from a clone of this filesystem, reporting
    /// its result to `callback`.
    ///
    /// ```rust
    /// use litefs::{EntryKind, FileSystem, MemoryDriver};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let fs = FileSystem::new(MemoryDriver::new());
    /// let (tx, rx) = tokio::sync::oneshot::channel();
    /// fs.with_callback(
    ///     |fs| async move { fs.exists("/tmp").await },
    ///     move |result| {
    ///         let _ = tx.send(result);
    ///     },
    /// );
    /// assert_eq!(rx.await.unwrap().unwrap(), EntryKind::Directory);
    /// # }
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn with_callback<Op, Fut, F>(&self, op: Op, callback: F) -> JoinHandle<()>
    where
        Op: FnOnce(FileSystem<D>) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
        F: FnOnce(Fut::Output) + Send + 'static,
    {
        op(self.clone()).on_complete(callback)
    }
}

//! Open file handles.
//!
//! A [`File`] wraps at most one driver descriptor and routes every
//! operation through its own [`OpQueue`], so operations issued against the
//! same handle never interleave and complete in the order they were issued.
//!
//! # Example
//!
//! ```rust
//! use litefs::{FileSystem, FsError, MemoryDriver};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), FsError> {
//! let fs = FileSystem::new(MemoryDriver::new());
//! fs.write_file("/log.txt", b"hello world").await?;
//!
//! let file = fs.open("/log.txt").await?;
//! // Issued back to back; the read still observes the seek.
//! let seek = file.seek(6);
//! let read = file.read(5);
//! seek.await?;
//! assert_eq!(read.await?, b"world");
//! file.close().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::queue::{OpQueue, Pending};
use crate::{DEFAULT_CHUNK_LEN, Descriptor, Driver, FsError, MAX_READ_LEN, Stat, WirePayload, path};

/// Lifecycle state of a [`File`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Created but never opened.
    Unopened,
    /// Holding a live descriptor.
    Open(Descriptor),
    /// Descriptor released. The handle may be opened again.
    Closed,
}

/// Handle to a regular file, holding at most one descriptor.
///
/// All methods are synchronous and return a [`Pending`] immediately; the
/// handle's queue fixes the execution order at call time. Positional
/// operations fail with [`FsError::InvalidHandle`] unless the handle is
/// open when they run.
///
/// A handle is not closed on drop. Close it explicitly; dropping an open
/// handle leaks its descriptor and logs a warning.
pub struct File<D: Driver> {
    inner: Arc<Inner<D>>,
    queue: OpQueue,
}

struct Inner<D: Driver> {
    driver: Arc<D>,
    path: PathBuf,
    state: Mutex<HandleState>,
}

impl<D: Driver> Inner<D> {
    fn descriptor(&self, operation: &'static str) -> Result<Descriptor, FsError> {
        match *self.state.lock() {
            HandleState::Open(fd) => Ok(fd),
            HandleState::Unopened | HandleState::Closed => Err(FsError::InvalidHandle {
                path: self.path.clone(),
                operation,
            }),
        }
    }

    fn open_descriptor(&self) -> Option<Descriptor> {
        match *self.state.lock() {
            HandleState::Open(fd) => Some(fd),
            HandleState::Unopened | HandleState::Closed => None,
        }
    }
}

impl<D: Driver> Drop for Inner<D> {
    fn drop(&mut self) {
        if let HandleState::Open(fd) = *self.state.get_mut() {
            tracing::warn!(path = %self.path.display(), fd = fd.0, "file handle dropped while open");
        }
    }
}

impl<D: Driver> File<D> {
    /// Create an unopened handle for `path`.
    ///
    /// # Errors
    ///
    /// [`FsError::InvalidPath`] if `path` is not absolute.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a Tokio runtime, since the
    /// handle spawns its queue worker.
    pub fn new(driver: Arc<D>, path: impl Into<PathBuf>) -> Result<Self, FsError> {
        let path = path.into();
        path::validate(&path)?;
        Ok(Self {
            inner: Arc::new(Inner {
                driver,
                path,
                state: Mutex::new(HandleState::Unopened),
            }),
            queue: OpQueue::new(),
        })
    }

    /// Path this handle refers to.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Current lifecycle state, ignoring operations still in the queue.
    pub fn state(&self) -> HandleState {
        *self.inner.state.lock()
    }

    /// Returns `true` while the handle holds a descriptor.
    pub fn is_open(&self) -> bool {
        matches!(self.state(), HandleState::Open(_))
    }

    /// Acquire a descriptor. Does nothing if already open.
    pub fn open(&self) -> Pending<()> {
        let inner = self.inner.clone();
        self.queue.enqueue("open", async move {
            if inner.open_descriptor().is_some() {
                return Ok(());
            }
            let fd = inner.driver.open(&inner.path).await?;
            tracing::debug!(path = %inner.path.display(), fd = fd.0, "descriptor opened");
            *inner.state.lock() = HandleState::Open(fd);
            Ok(())
        })
    }

    /// Release the descriptor. Does nothing unless open.
    ///
    /// If the driver fails to close, the handle stays open.
    pub fn close(&self) -> Pending<()> {
        self.queue.enqueue("close", close_op(self.inner.clone()))
    }

    /// Guard that queues a [`close`](Self::close) when dropped armed.
    ///
    /// Composite operations hold one across their awaits so a caller that
    /// drops the operation midway does not strand the descriptor.
    pub(crate) fn close_on_drop(&self) -> CloseGuard<D> {
        CloseGuard {
            inner: self.inner.clone(),
            queue: self.queue.clone(),
            armed: true,
        }
    }

    /// Current cursor position.
    pub fn tell(&self) -> Pending<u64> {
        self.positional("tell", |inner, fd| async move { inner.driver.tell(fd).await })
    }

    /// Move the cursor to `offset`; resolves to the new position.
    pub fn seek(&self, offset: u64) -> Pending<u64> {
        self.positional("seek", move |inner, fd| async move {
            inner.driver.seek(fd, offset).await
        })
    }

    /// Set the file length; resolves to the new length.
    pub fn truncate(&self, len: u64) -> Pending<u64> {
        self.positional("truncate", move |inner, fd| async move {
            inner.driver.truncate(fd, len).await
        })
    }

    /// Read up to `len` bytes at the cursor.
    ///
    /// Requests above [`MAX_READ_LEN`] are clamped. An empty result means
    /// end-of-file.
    pub fn read(&self, len: usize) -> Pending<Vec<u8>> {
        let len = len.min(MAX_READ_LEN);
        self.positional("read", move |inner, fd| async move {
            let payload = inner.driver.read(fd, len).await?;
            payload.decode(&inner.path)
        })
    }

    /// Read one [`DEFAULT_CHUNK_LEN`] chunk at the cursor.
    pub fn read_chunk(&self) -> Pending<Vec<u8>> {
        self.read(DEFAULT_CHUNK_LEN)
    }

    /// Write `bytes` at the cursor in a single driver call.
    ///
    /// Resolves to the count the driver reports, which may be short.
    pub fn write(&self, bytes: impl AsRef<[u8]>) -> Pending<usize> {
        let payload = WirePayload::encode(bytes);
        self.positional("write", move |inner, fd| async move {
            inner.driver.write(fd, payload).await
        })
    }

    /// Metadata for the handle's path. Does not need an open descriptor.
    pub fn stat(&self) -> Pending<Stat> {
        let inner = self.inner.clone();
        self.queue.enqueue("stat", async move {
            let raw = inner.driver.stat(&inner.path).await?;
            Ok(Stat::from(raw))
        })
    }

    fn positional<T, F, Fut>(&self, operation: &'static str, op: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Inner<D>>, Descriptor) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FsError>> + Send + 'static,
    {
        let inner = self.inner.clone();
        self.queue.enqueue(operation, async move {
            let fd = inner.descriptor(operation)?;
            op(inner, fd).await
        })
    }
}

fn close_op<D: Driver>(
    inner: Arc<Inner<D>>,
) -> impl Future<Output = Result<(), FsError>> + Send + 'static {
    async move {
        let Some(fd) = inner.open_descriptor() else {
            return Ok(());
        };
        inner.driver.close(fd).await?;
        tracing::debug!(path = %inner.path.display(), fd = fd.0, "descriptor closed");
        *inner.state.lock() = HandleState::Closed;
        Ok(())
    }
}

/// Queues a close on the owning handle's queue unless disarmed.
pub(crate) struct CloseGuard<D: Driver> {
    inner: Arc<Inner<D>>,
    queue: OpQueue,
    armed: bool,
}

impl<D: Driver> CloseGuard<D> {
    /// The caller has taken over closing the handle.
    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl<D: Driver> Drop for CloseGuard<D> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::debug!(path = %self.inner.path.display(), "operation abandoned, closing handle");
        // Reply is not awaited; the queue worker still runs the close.
        drop(self.queue.enqueue("close", close_op(self.inner.clone())));
    }
}

impl<D: Driver> std::fmt::Debug for File<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DriverEntries, EntryKind, MemoryDriver};

    async fn file_with(contents: &[u8]) -> (Arc<MemoryDriver>, File<MemoryDriver>) {
        let driver = Arc::new(MemoryDriver::new());
        driver.touch(Path::new("/f.bin")).await.unwrap();
        let file = File::new(driver.clone(), "/f.bin").unwrap();
        file.open().await.unwrap();
        file.write(contents).await.unwrap();
        file.seek(0).await.unwrap();
        (driver, file)
    }

    #[tokio::test]
    async fn rejects_relative_path() {
        let driver = Arc::new(MemoryDriver::new());
        let err = File::new(driver, "f.bin").unwrap_err();
        assert!(matches!(err, FsError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn positional_ops_need_open_handle() {
        let driver = Arc::new(MemoryDriver::new());
        let file = File::new(driver, "/f.bin").unwrap();
        assert_eq!(file.state(), HandleState::Unopened);

        let err = file.seek(3).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidHandle { operation: "seek", .. }));
        assert!(matches!(file.read_chunk().await, Err(FsError::InvalidHandle { .. })));
        assert!(matches!(file.write(b"x").await, Err(FsError::InvalidHandle { .. })));
        assert!(matches!(file.tell().await, Err(FsError::InvalidHandle { .. })));
        assert!(matches!(file.truncate(0).await, Err(FsError::InvalidHandle { .. })));
    }

    #[tokio::test]
    async fn open_and_close_are_idempotent() {
        let (driver, file) = file_with(b"abc").await;
        file.open().await.unwrap();
        assert_eq!(driver.open_descriptors(), 1);

        file.close().await.unwrap();
        file.close().await.unwrap();
        assert_eq!(file.state(), HandleState::Closed);
        assert_eq!(driver.open_descriptors(), 0);

        let err = file.tell().await.unwrap_err();
        assert!(matches!(err, FsError::InvalidHandle { .. }));
    }

    #[tokio::test]
    async fn reopen_allocates_new_descriptor() {
        let (_driver, file) = file_with(b"abc").await;
        let HandleState::Open(first) = file.state() else {
            panic!("expected open handle");
        };
        file.close().await.unwrap();
        file.open().await.unwrap();
        let HandleState::Open(second) = file.state() else {
            panic!("expected open handle");
        };
        assert_ne!(first, second);
        assert_eq!(file.read_chunk().await.unwrap(), b"abc");
        file.close().await.unwrap();
    }

    #[tokio::test]
    async fn queued_ops_observe_each_other() {
        let (_driver, file) = file_with(b"0123456789").await;

        let seek = file.seek(4);
        let read = file.read(3);
        let tell = file.tell();
        let truncate = file.truncate(2);
        let after = file.stat();

        assert_eq!(seek.await.unwrap(), 4);
        assert_eq!(read.await.unwrap(), b"456");
        assert_eq!(tell.await.unwrap(), 7);
        assert_eq!(truncate.await.unwrap(), 2);
        let stat = after.await.unwrap();
        assert_eq!(stat.size, 2);
        assert_eq!(stat.kind, EntryKind::File);
        file.close().await.unwrap();
    }

    #[tokio::test]
    async fn read_at_end_is_empty() {
        let (_driver, file) = file_with(b"xy").await;
        assert_eq!(file.read_chunk().await.unwrap(), b"xy");
        assert!(file.read_chunk().await.unwrap().is_empty());
        file.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_queued_behind_read_waits_for_it() {
        let (driver, file) = file_with(b"data").await;
        let read = file.read_chunk();
        let close = file.close();
        close.await.unwrap();
        assert_eq!(read.await.unwrap(), b"data");
        assert_eq!(driver.open_descriptors(), 0);
    }

    #[tokio::test]
    async fn write_past_addressable_end_fails_without_breaking_handle() {
        let (driver, file) = file_with(b"abc").await;
        assert_eq!(file.seek(u64::MAX).await.unwrap(), u64::MAX);
        let err = file.write(b"x").await.unwrap_err();
        assert!(matches!(err, FsError::Driver(_)), "{err:?}");

        assert_eq!(file.tell().await.unwrap(), u64::MAX);
        assert_eq!(file.stat().await.unwrap().size, 3);
        file.close().await.unwrap();
        assert_eq!(driver.open_descriptors(), 0);
    }

    #[tokio::test]
    async fn armed_guard_closes_on_drop() {
        let (driver, file) = file_with(b"abc").await;
        drop(file.close_on_drop());
        let tell = file.tell();
        assert!(matches!(
            tell.await,
            Err(FsError::InvalidHandle { operation: "tell", .. })
        ));
        assert_eq!(file.state(), HandleState::Closed);
        assert_eq!(driver.open_descriptors(), 0);
    }

    #[tokio::test]
    async fn disarmed_guard_leaves_handle_open() {
        let (driver, file) = file_with(b"abc").await;
        file.close_on_drop().disarm();
        assert_eq!(file.tell().await.unwrap(), 0);
        assert!(file.is_open());
        file.close().await.unwrap();
        assert_eq!(driver.open_descriptors(), 0);
    }
}

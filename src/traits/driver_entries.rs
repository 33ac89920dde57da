//! Path-level driver primitives.

use std::future::Future;
use std::path::Path;

use crate::{EntryKind, FsError, RawStat};

/// Path-addressed primitives of a storage driver.
///
/// Each call is atomic on its own but nothing links two calls together: a
/// probe followed by an action can observe a different world. Callers that
/// depend on state re-probe instead of trusting an earlier answer.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` and return `Send` futures so
/// the calls can run inside a handle's queue worker.
pub trait DriverEntries: Send + Sync {
    /// Probe what exists at `path`.
    ///
    /// Returns [`EntryKind::Absent`] rather than failing when nothing is
    /// there.
    fn exists(&self, path: &Path) -> impl Future<Output = Result<EntryKind, FsError>> + Send;

    /// Read raw metadata for `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist (driver-specific)
    fn stat(&self, path: &Path) -> impl Future<Output = Result<RawStat, FsError>> + Send;

    /// Create a single directory. The parent must exist.
    fn mkdir(&self, path: &Path) -> impl Future<Output = Result<(), FsError>> + Send;

    /// Create an empty regular file. The parent must exist.
    fn touch(&self, path: &Path) -> impl Future<Output = Result<(), FsError>> + Send;

    /// Remove a file, or a directory together with its contents.
    fn remove(&self, path: &Path) -> impl Future<Output = Result<(), FsError>> + Send;

    /// Move an entry to a new path.
    fn rename(&self, from: &Path, to: &Path) -> impl Future<Output = Result<(), FsError>> + Send;

    /// Copy a file to a new path.
    fn copy(&self, from: &Path, to: &Path) -> impl Future<Output = Result<(), FsError>> + Send;

    /// List the names of a directory's children in driver order.
    fn read_dir(&self, path: &Path) -> impl Future<Output = Result<Vec<String>, FsError>> + Send;
}

//! Host environment constants reported by a driver.

use std::path::PathBuf;

/// Well-known directories of the host.
///
/// Read once when a [`FileSystem`](crate::FileSystem) is built.
pub trait DriverEnv: Send + Sync {
    /// The application's home directory.
    fn home_dir(&self) -> PathBuf;

    /// The application's scratch directory.
    fn temp_dir(&self) -> PathBuf;
}

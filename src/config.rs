//! Configuration fixed when a [`FileSystem`](crate::FileSystem) is built.

use std::path::{Path, PathBuf};

use crate::{DEFAULT_CHUNK_LEN, DriverEnv, MAX_READ_LEN};

/// Tunables for composite operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FsConfig {
    /// Bytes requested per read while reading a whole file.
    ///
    /// Clamped to `1..=MAX_READ_LEN` when used.
    pub read_chunk_len: usize,
    /// Keep writing until the whole payload is accepted when the driver
    /// reports a short write. When `false`, whole-file writes issue exactly
    /// one driver write and return whatever count it reports.
    pub complete_short_writes: bool,
}

impl FsConfig {
    pub(crate) fn chunk_len(&self) -> usize {
        self.read_chunk_len.clamp(1, MAX_READ_LEN)
    }
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            read_chunk_len: DEFAULT_CHUNK_LEN,
            complete_short_writes: true,
        }
    }
}

/// Well-known directories, read from the driver once.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Environment {
    home: PathBuf,
    temp: PathBuf,
}

impl Environment {
    /// Capture the directories a driver reports.
    pub fn from_driver<E: DriverEnv + ?Sized>(driver: &E) -> Self {
        Self {
            home: driver.home_dir(),
            temp: driver.temp_dir(),
        }
    }

    /// The application's home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The application's scratch directory.
    pub fn temp(&self) -> &Path {
        &self.temp
    }
}

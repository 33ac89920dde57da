//! Core types for the litefs access layer.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::FsError;

/// Chunk length used by [`File::read_chunk`](crate::File::read_chunk) and
/// whole-file reads unless configured otherwise (4 KiB).
pub const DEFAULT_CHUNK_LEN: usize = 4 * 1024;

/// Upper bound for a single read request (1 MiB).
pub const MAX_READ_LEN: usize = 1 << 20;

/// Result of an existence probe.
///
/// The driver reports this as a raw code: `0` absent, `1` directory,
/// `2` regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryKind {
    /// Nothing exists at the path.
    Absent,
    /// Directory.
    Directory,
    /// Regular file.
    File,
}

impl EntryKind {
    /// Decode a raw driver code. Unknown codes count as absent.
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => EntryKind::Directory,
            2 => EntryKind::File,
            _ => EntryKind::Absent,
        }
    }

    /// The raw driver code for this kind.
    pub const fn code(self) -> i32 {
        match self {
            EntryKind::Absent => 0,
            EntryKind::Directory => 1,
            EntryKind::File => 2,
        }
    }

    /// Returns `true` unless the kind is [`EntryKind::Absent`].
    #[inline]
    pub const fn exists(self) -> bool {
        !matches!(self, EntryKind::Absent)
    }
}

/// Opaque descriptor id issued by a driver's `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Descriptor(pub u64);

/// Metadata exactly as a driver reports it.
///
/// Timestamps are milliseconds since the Unix epoch. `ctime` is optional
/// because not every host can report a creation time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawStat {
    /// Path the metadata was read for.
    pub path: PathBuf,
    /// Length in bytes.
    pub length: u64,
    /// Creation time in epoch milliseconds.
    pub ctime: Option<i64>,
    /// Modification time in epoch milliseconds.
    pub mtime: i64,
    /// Raw kind code, see [`EntryKind::from_code`].
    pub flag: i32,
}

/// Snapshot of an entry's metadata.
///
/// Taken at query time and never updated; it may be stale as soon as it is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stat {
    /// Path of the entry.
    pub path: PathBuf,
    /// Length in bytes.
    pub size: u64,
    /// Creation time, when the driver reports one.
    pub created: Option<SystemTime>,
    /// Last modification time.
    pub modified: SystemTime,
    /// Kind of the entry.
    pub kind: EntryKind,
}

impl Stat {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

impl From<RawStat> for Stat {
    fn from(raw: RawStat) -> Self {
        Self {
            created: raw.ctime.map(epoch_millis),
            modified: epoch_millis(raw.mtime),
            kind: EntryKind::from_code(raw.flag),
            size: raw.length,
            path: raw.path,
        }
    }
}

/// Convert signed epoch milliseconds into a `SystemTime`.
pub(crate) fn epoch_millis(ms: i64) -> SystemTime {
    let offset = Duration::from_millis(ms.unsigned_abs());
    if ms >= 0 {
        UNIX_EPOCH + offset
    } else {
        UNIX_EPOCH.checked_sub(offset).unwrap_or(UNIX_EPOCH)
    }
}

/// Convert a `SystemTime` into signed epoch milliseconds.
pub(crate) fn to_epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

/// Byte payload in the driver's transport representation (lowercase hex).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WirePayload(String);

impl WirePayload {
    /// Encode raw bytes for the wire.
    pub fn encode(bytes: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(bytes))
    }

    /// Wrap an already encoded string received from a driver.
    pub fn from_wire(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Decode back into raw bytes.
    ///
    /// # Errors
    ///
    /// [`FsError::InvalidData`] if the payload is not valid hex. `path` only
    /// labels the error.
    pub fn decode(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        hex::decode(&self.0).map_err(|e| FsError::InvalidData {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// The encoded text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of raw bytes this payload carries.
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }

    /// An empty payload marks end-of-file on reads.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

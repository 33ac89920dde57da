//! # litefs
//!
//! A path-validated, asynchronous filesystem access layer over a pluggable
//! storage driver.
//!
//! Callers talk to a [`FileSystem`]; it checks path arguments, probes live
//! state before each dependent step and sequences driver calls into
//! composite operations (`mkdir -p`, guarded `touch`, whole-file reads and
//! writes). Open files are [`File`] handles whose operations run one at a
//! time, in the order they were issued, on a per-handle [`OpQueue`].
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use litefs::{EntryKind, FileSystem, FsError, MemoryDriver};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), FsError> {
//! let fs = FileSystem::new(MemoryDriver::new());
//!
//! fs.mkdir("/archive/2024", true).await?;
//! fs.write_file("/archive/2024/notes.txt", b"first line\n").await?;
//!
//! let stat = fs.stat("/archive/2024/notes.txt").await?;
//! assert!(stat.is_file());
//! assert_eq!(stat.size, 11);
//!
//! fs.rename("/archive/2024", "/archive/old").await?;
//! assert_eq!(fs.exists("/archive/2024").await?, EntryKind::Absent);
//! assert_eq!(fs.read_dir("/archive/old").await?, vec!["notes.txt".to_string()]);
//! # Ok(())
//! # }
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FileSystem`] | Caller-facing operations |
//! | [`File`] | Open handle with queued positional operations |
//! | [`Driver`] | What a storage backend implements |
//! | [`FsError`] | Error type with path context |
//! | [`Stat`] | Metadata snapshot |
//! | [`EntryKind`] | Result of an existence probe |
//!
//! ---
//!
//! ## Drivers
//!
//! [`Driver`] is the sum of [`DriverEntries`] (path-level calls),
//! [`DriverHandles`] (descriptor calls) and [`DriverEnv`] (well-known
//! directories). Two are bundled:
//!
//! - [`MemoryDriver`] keeps everything in memory.
//! - [`LocalDriver`] performs real I/O through `tokio::fs`.
//!
//! Byte payloads cross the descriptor boundary as hex text
//! ([`WirePayload`]).
//!
//! ---
//!
//! ## Callbacks
//!
//! Every operation is awaitable. [`OnComplete`] and
//! [`FileSystem::with_callback`] deliver results to a callback instead.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Stat`], [`EntryKind`] and [`FsConfig`]; `read_json`/`write_json` |

// Private modules
mod completion;
mod config;
mod drivers;
mod error;
mod ext;
mod file;
mod fs;
mod path;
mod queue;
mod traits;
mod types;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use types::{
    DEFAULT_CHUNK_LEN, Descriptor, EntryKind, MAX_READ_LEN, RawStat, Stat, WirePayload,
};

// Public re-exports - driver traits
pub use traits::{Driver, DriverEntries, DriverEnv, DriverHandles};

// Public re-exports - handles and queues
pub use file::{File, HandleState};
pub use queue::{OpQueue, Pending};

// Public re-exports - operations
pub use completion::OnComplete;
pub use config::{Environment, FsConfig};
pub use fs::FileSystem;

// Public re-exports - bundled drivers
pub use drivers::{LocalDriver, MemoryDriver};

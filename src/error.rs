//! Error types for the litefs access layer.

use std::path::PathBuf;

/// Filesystem error type with contextual variants.
///
/// Variants carry the path (and where useful the operation) that failed, so
/// kind mismatches and existence conflicts always read as a complete sentence.
/// Uses `#[non_exhaustive]` for forward compatibility.
///
/// # Examples
///
/// ```rust
/// use litefs::FsError;
/// use std::path::PathBuf;
///
/// let err = FsError::NotFound { path: PathBuf::from("/missing") };
/// assert!(err.to_string().contains("/missing"));
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Precondition Errors
    /// A path argument was not an absolute path.
    ///
    /// Raised before any driver call is made.
    #[error("path must be absolute: {path:?}")]
    InvalidPath {
        /// The rejected path argument.
        path: PathBuf,
    },

    // Entry Errors
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: PathBuf,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a regular file but found a directory.
    #[error("not a file: {path}")]
    NotAFile {
        /// The path that is not a file.
        path: PathBuf,
    },

    /// Expected a directory but found a regular file.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: PathBuf,
    },

    // Handle Errors
    /// A positional operation was issued on a handle that is not open.
    #[error("{operation}: file handle is not open: {path}")]
    InvalidHandle {
        /// The path the handle refers to.
        path: PathBuf,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The handle's queue was torn down before the operation reported back.
    ///
    /// Only happens when the runtime driving the queue shuts down.
    #[error("{operation}: interrupted before completion")]
    Interrupted {
        /// The operation that was pending.
        operation: &'static str,
    },

    /// A queued operation panicked. Operations queued after it still run.
    #[error("{operation}: operation panicked: {message}")]
    Panicked {
        /// The operation that panicked.
        operation: &'static str,
        /// The panic payload, when it was a string.
        message: String,
    },

    // Data Errors
    /// Invalid data encountered.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The path with invalid data.
        path: PathBuf,
        /// Details about the invalid data.
        details: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    // Driver Errors
    /// Opaque failure reported by the storage driver.
    #[error("driver error: {0}")]
    Driver(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Attach the operation and path to an I/O error, keeping the specific
    /// variants for the kinds this layer distinguishes.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound { path },
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists { path, operation },
            std::io::ErrorKind::IsADirectory => FsError::NotAFile { path },
            std::io::ErrorKind::NotADirectory => FsError::NotADirectory { path },
            _ => FsError::Io {
                operation,
                path,
                source: error,
            },
        }
    }
}

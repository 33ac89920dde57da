//! # Convenience Methods
//!
//! Small queries and helpers layered on the core [`FileSystem`] operations.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](FileSystem::is_file) | Check if path is a regular file |
//! | [`is_dir`](FileSystem::is_dir) | Check if path is a directory |
//! | [`file_size`](FileSystem::file_size) | Size of a file in bytes |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, `read_json` and `write_json` are
//! available as well.

use std::path::Path;

use crate::{Driver, EntryKind, FileSystem, FsError, path};

impl<D: Driver> FileSystem<D> {
    /// Check if the path points to a regular file.
    ///
    /// A missing path is `Ok(false)`, not an error.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    pub async fn is_file(&self, path: impl AsRef<Path>) -> Result<bool, FsError> {
        Ok(self.exists(path).await? == EntryKind::File)
    }

    /// Check if the path points to a directory.
    ///
    /// A missing path is `Ok(false)`, not an error.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    pub async fn is_dir(&self, path: impl AsRef<Path>) -> Result<bool, FsError> {
        Ok(self.exists(path).await? == EntryKind::Directory)
    }

    /// Size of a file in bytes.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    /// - whatever [`stat`](Self::stat) reports for a missing path
    pub async fn file_size(&self, path: impl AsRef<Path>) -> Result<u64, FsError> {
        let path = path.as_ref();
        path::validate(path)?;
        Ok(self.stat(path).await?.size)
    }
}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{Serialize, de::DeserializeOwned};

    impl<D: Driver> FileSystem<D> {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - [`FsError::NotFound`] if the file doesn't exist
        /// - [`FsError::InvalidData`] if the file isn't valid UTF-8
        /// - [`FsError::Deserialization`] if JSON parsing failed
        pub async fn read_json<T: DeserializeOwned>(
            &self,
            path: impl AsRef<Path>,
        ) -> Result<T, FsError> {
            let data = self.read_to_string(path).await?;
            serde_json::from_str(&data).map_err(|e| FsError::Deserialization(e.to_string()))
        }

        /// Serialize a value and write it as pretty-printed JSON.
        ///
        /// Goes through [`write_file`](Self::write_file), so a longer
        /// previous file keeps its tail. Remove the file first if that
        /// matters.
        ///
        /// # Errors
        ///
        /// - [`FsError::Serialization`] if serialization failed
        /// - whatever [`write_file`](Self::write_file) reports
        pub async fn write_json<T: Serialize + ?Sized>(
            &self,
            path: impl AsRef<Path>,
            value: &T,
        ) -> Result<usize, FsError> {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| FsError::Serialization(e.to_string()))?;
            self.write_file(path, json).await
        }
    }
}

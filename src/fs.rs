//! Caller-facing filesystem operations.
//!
//! [`FileSystem`] validates path arguments, probes live state before every
//! dependent step, and sequences driver and [`File`] calls into composite
//! operations. Nothing is locked across a probe and the action that follows
//! it: two callers racing on the same path can interleave.

use std::path::Path;
use std::sync::Arc;

use crate::{Driver, EntryKind, Environment, File, FsConfig, FsError, Stat, path};

/// Path-validated, asynchronous access to a driver's filesystem.
///
/// Cheap to clone; clones share the driver, environment and configuration.
///
/// # Example
///
/// ```rust
/// use litefs::{EntryKind, FileSystem, FsError, MemoryDriver};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), FsError> {
/// let fs = FileSystem::new(MemoryDriver::new());
/// fs.mkdir("/projects/demo", true).await?;
/// fs.write_file("/projects/demo/readme.md", b"# demo").await?;
///
/// assert_eq!(fs.exists("/projects/demo").await?, EntryKind::Directory);
/// assert_eq!(fs.read_file("/projects/demo/readme.md").await?, b"# demo");
/// # Ok(())
/// # }
/// ```
pub struct FileSystem<D: Driver> {
    shared: Arc<Shared<D>>,
}

struct Shared<D: Driver> {
    driver: Arc<D>,
    env: Environment,
    config: FsConfig,
}

impl<D: Driver> Clone for FileSystem<D> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<D: Driver> FileSystem<D> {
    /// Wrap a driver with the default configuration.
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, FsConfig::default())
    }

    /// Wrap a driver with an explicit configuration.
    pub fn with_config(driver: D, config: FsConfig) -> Self {
        Self::from_shared(Arc::new(driver), config)
    }

    /// Wrap a driver that is also used elsewhere.
    pub fn from_shared(driver: Arc<D>, config: FsConfig) -> Self {
        let env = Environment::from_driver(driver.as_ref());
        Self {
            shared: Arc::new(Shared {
                driver,
                env,
                config,
            }),
        }
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Arc<D> {
        &self.shared.driver
    }

    /// Configuration in effect.
    pub fn config(&self) -> &FsConfig {
        &self.shared.config
    }

    /// Directories captured from the driver at construction.
    pub fn env(&self) -> &Environment {
        &self.shared.env
    }

    /// The application's home directory.
    pub fn home(&self) -> &Path {
        self.shared.env.home()
    }

    /// The application's scratch directory.
    pub fn temp(&self) -> &Path {
        self.shared.env.temp()
    }

    pub(crate) async fn probe(&self, path: &Path) -> Result<EntryKind, FsError> {
        self.shared.driver.exists(path).await
    }

    /// What exists at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    pub async fn exists(&self, path: impl AsRef<Path>) -> Result<EntryKind, FsError> {
        let path = path.as_ref();
        path::validate(path)?;
        self.probe(path).await
    }

    /// Metadata snapshot for `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    /// - whatever the driver reports for a missing path
    pub async fn stat(&self, path: impl AsRef<Path>) -> Result<Stat, FsError> {
        let path = path.as_ref();
        path::validate(path)?;
        let raw = self.shared.driver.stat(path).await?;
        Ok(Stat::from(raw))
    }

    /// Create a directory.
    ///
    /// Succeeds without doing anything if the directory already exists. With
    /// `create_parents`, missing ancestors are created first, root to leaf.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    /// - [`FsError::AlreadyExists`] if a regular file is at `path`
    /// - [`FsError::NotADirectory`] if an ancestor is a regular file
    /// - [`FsError::NotFound`] for the parent, if it is missing and
    ///   `create_parents` is false
    pub async fn mkdir(&self, path: impl AsRef<Path>, create_parents: bool) -> Result<(), FsError> {
        let path = path.as_ref();
        path::validate(path)?;
        tracing::debug!(path = %path.display(), create_parents, "mkdir");

        // Walk up to the nearest existing directory, remembering what is missing.
        let mut missing = Vec::new();
        let mut current = path;
        loop {
            match self.probe(current).await? {
                EntryKind::Directory => break,
                EntryKind::File if current == path => {
                    return Err(FsError::AlreadyExists {
                        path: path.to_path_buf(),
                        operation: "mkdir",
                    });
                }
                EntryKind::File => {
                    return Err(FsError::NotADirectory {
                        path: current.to_path_buf(),
                    });
                }
                EntryKind::Absent => {
                    if current != path && !create_parents {
                        return Err(FsError::NotFound {
                            path: current.to_path_buf(),
                        });
                    }
                    missing.push(current);
                    let parent = path::dirname(current);
                    if parent == current {
                        break;
                    }
                    current = parent;
                }
            }
        }

        for dir in missing.into_iter().rev() {
            tracing::trace!(path = %dir.display(), "creating directory");
            self.shared.driver.mkdir(dir).await?;
        }
        Ok(())
    }

    /// Create an empty regular file.
    ///
    /// With `create_parents`, a missing parent directory is created first.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    /// - [`FsError::AlreadyExists`] if anything already exists at `path`
    /// - [`FsError::NotADirectory`] if the parent is a regular file
    /// - [`FsError::NotFound`] if the parent is missing and `create_parents`
    ///   is false
    pub async fn touch(&self, path: impl AsRef<Path>, create_parents: bool) -> Result<(), FsError> {
        let path = path.as_ref();
        path::validate(path)?;
        tracing::debug!(path = %path.display(), create_parents, "touch");

        if self.probe(path).await?.exists() {
            return Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
                operation: "touch",
            });
        }

        let parent = path::dirname(path);
        match self.probe(parent).await? {
            EntryKind::Directory => {}
            EntryKind::File => {
                return Err(FsError::NotADirectory {
                    path: parent.to_path_buf(),
                });
            }
            EntryKind::Absent if !create_parents => {
                return Err(FsError::NotFound {
                    path: parent.to_path_buf(),
                });
            }
            EntryKind::Absent => self.mkdir(parent, true).await?,
        }

        self.shared.driver.touch(path).await
    }

    /// Names of a directory's children, in the order the driver lists them.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    /// - [`FsError::NotFound`] if nothing exists at `path`
    /// - [`FsError::NotADirectory`] if `path` is a regular file
    pub async fn read_dir(&self, path: impl AsRef<Path>) -> Result<Vec<String>, FsError> {
        let path = path.as_ref();
        path::validate(path)?;
        match self.probe(path).await? {
            EntryKind::Absent => Err(FsError::NotFound {
                path: path.to_path_buf(),
            }),
            EntryKind::File => Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            }),
            EntryKind::Directory => self.shared.driver.read_dir(path).await,
        }
    }

    /// Copy `src` to `dst`. Never overwrites.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if either path is not absolute
    /// - [`FsError::NotFound`] if `src` does not exist
    /// - [`FsError::AlreadyExists`] if `dst` exists
    pub async fn copy(&self, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<(), FsError> {
        let (src, dst) = (src.as_ref(), dst.as_ref());
        path::validate_all(&[src, dst])?;
        tracing::debug!(src = %src.display(), dst = %dst.display(), "copy");
        self.check_transfer(src, dst, "copy").await?;
        self.shared.driver.copy(src, dst).await
    }

    /// Move `src` to `dst`. Never overwrites.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if either path is not absolute
    /// - [`FsError::NotFound`] if `src` does not exist
    /// - [`FsError::AlreadyExists`] if `dst` exists
    pub async fn rename(&self, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<(), FsError> {
        let (src, dst) = (src.as_ref(), dst.as_ref());
        path::validate_all(&[src, dst])?;
        tracing::debug!(src = %src.display(), dst = %dst.display(), "rename");
        self.check_transfer(src, dst, "rename").await?;
        self.shared.driver.rename(src, dst).await
    }

    async fn check_transfer(
        &self,
        src: &Path,
        dst: &Path,
        operation: &'static str,
    ) -> Result<(), FsError> {
        if !self.probe(src).await?.exists() {
            return Err(FsError::NotFound {
                path: src.to_path_buf(),
            });
        }
        if self.probe(dst).await?.exists() {
            return Err(FsError::AlreadyExists {
                path: dst.to_path_buf(),
                operation,
            });
        }
        Ok(())
    }

    /// Remove a file or directory. Removing a missing path succeeds.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<(), FsError> {
        let path = path.as_ref();
        path::validate(path)?;
        tracing::debug!(path = %path.display(), "remove");
        if !self.probe(path).await?.exists() {
            return Ok(());
        }
        self.shared.driver.remove(path).await
    }

    /// Write `content` at the start of the file, creating it if missing.
    ///
    /// Existing bytes beyond the new content are left in place. The
    /// transient handle is closed on every path; if both the write and the
    /// close fail, the write error is returned. Resolves to the number of
    /// bytes written.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    /// - [`FsError::NotAFile`] if `path` is a directory
    pub async fn write_file(
        &self,
        path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
    ) -> Result<usize, FsError> {
        let path = path.as_ref();
        let content = content.as_ref();
        path::validate(path)?;
        tracing::debug!(path = %path.display(), len = content.len(), "write_file");

        match self.probe(path).await? {
            EntryKind::Directory => {
                return Err(FsError::NotAFile {
                    path: path.to_path_buf(),
                });
            }
            EntryKind::Absent => self.shared.driver.touch(path).await?,
            EntryKind::File => {}
        }

        let file = File::new(self.shared.driver.clone(), path)?;
        let guard = file.close_on_drop();
        file.open().await?;
        let written = self.write_through(&file, content).await;
        let closing = file.close();
        guard.disarm();
        settle(path, "write_file", written, closing.await)
    }

    async fn write_through(&self, file: &File<D>, content: &[u8]) -> Result<usize, FsError> {
        if !self.shared.config.complete_short_writes {
            return file.write(content).await;
        }
        let mut written = 0;
        loop {
            let n = file.write(&content[written..]).await?;
            written = written.saturating_add(n).min(content.len());
            if written == content.len() {
                return Ok(written);
            }
            if n == 0 {
                return Err(FsError::Driver(format!(
                    "write stalled after {written} of {} bytes: {}",
                    content.len(),
                    file.path().display()
                )));
            }
            tracing::debug!(path = %file.path().display(), written, "short write, continuing");
        }
    }

    /// Read a whole file.
    ///
    /// Reads chunk by chunk until the driver reports end-of-file. The
    /// transient handle is closed on every path.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    /// - [`FsError::NotFound`] if nothing exists at `path`
    /// - [`FsError::NotAFile`] if `path` is a directory
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, FsError> {
        let path = path.as_ref();
        path::validate(path)?;
        tracing::debug!(path = %path.display(), "read_file");

        self.expect_file(path).await?;
        let file = File::new(self.shared.driver.clone(), path)?;
        let guard = file.close_on_drop();
        file.open().await?;
        let content = self.read_through(&file).await;
        let closing = file.close();
        guard.disarm();
        settle(path, "read_file", content, closing.await)
    }

    async fn read_through(&self, file: &File<D>) -> Result<Vec<u8>, FsError> {
        let chunk_len = self.shared.config.chunk_len();
        let mut content = Vec::new();
        loop {
            let chunk = file.read(chunk_len).await?;
            if chunk.is_empty() {
                return Ok(content);
            }
            content.extend_from_slice(&chunk);
        }
    }

    /// Read a whole file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Everything [`read_file`](Self::read_file) reports, plus
    /// [`FsError::InvalidData`] if the content is not valid UTF-8.
    pub async fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String, FsError> {
        let path = path.as_ref();
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes).map_err(|e| FsError::InvalidData {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// Open a handle to an existing regular file.
    ///
    /// The caller owns the handle and must close it.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` is not absolute
    /// - [`FsError::NotFound`] if nothing exists at `path`
    /// - [`FsError::NotAFile`] if `path` is a directory
    pub async fn open(&self, path: impl AsRef<Path>) -> Result<File<D>, FsError> {
        let path = path.as_ref();
        path::validate(path)?;
        tracing::debug!(path = %path.display(), "open");

        self.expect_file(path).await?;
        let file = File::new(self.shared.driver.clone(), path)?;
        let guard = file.close_on_drop();
        file.open().await?;
        guard.disarm();
        Ok(file)
    }

    async fn expect_file(&self, path: &Path) -> Result<(), FsError> {
        match self.probe(path).await? {
            EntryKind::File => Ok(()),
            EntryKind::Absent => Err(FsError::NotFound {
                path: path.to_path_buf(),
            }),
            EntryKind::Directory => Err(FsError::NotAFile {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl<D: Driver> std::fmt::Debug for FileSystem<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("env", &self.shared.env)
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

/// Combine a step's result with the close that followed it.
///
/// The step's own failure wins; a close failure only surfaces when the
/// step succeeded.
fn settle<T>(
    path: &Path,
    operation: &'static str,
    result: Result<T, FsError>,
    closed: Result<(), FsError>,
) -> Result<T, FsError> {
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            tracing::warn!(
                path = %path.display(),
                operation,
                error = %close_err,
                "close failed after an earlier error"
            );
            Err(err)
        }
    }
}

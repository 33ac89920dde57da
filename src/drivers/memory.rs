//! In-memory storage driver.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::types::to_epoch_millis;
use crate::{
    Descriptor, DriverEntries, DriverEnv, DriverHandles, EntryKind, FsError, RawStat, WirePayload,
    path,
};

/// A complete in-memory driver.
///
/// Starts with `/`, `/home` and `/tmp`. Entries live in an ordered map, so
/// directory listings come back sorted by name. Descriptors keep their own
/// cursor and address the file by path.
///
/// Files are capped at 4 GiB; writes or truncations past that fail with
/// [`FsError::Driver`]. Renaming or copying a directory into its own
/// subtree is rejected.
///
/// ## Thread Safety
///
/// Uses `RwLock` for interior mutability; every method takes `&self`.
#[derive(Debug)]
pub struct MemoryDriver {
    entries: RwLock<BTreeMap<PathBuf, Node>>,
    handles: RwLock<HashMap<u64, OpenFile>>,
    next_handle: AtomicU64,
    home: PathBuf,
    temp: PathBuf,
}

#[derive(Debug, Clone)]
struct Node {
    data: Option<Vec<u8>>,
    created: i64,
    modified: i64,
}

impl Node {
    fn dir() -> Self {
        let now = now_millis();
        Self {
            data: None,
            created: now,
            modified: now,
        }
    }

    fn file(data: Vec<u8>) -> Self {
        let now = now_millis();
        Self {
            data: Some(data),
            created: now,
            modified: now,
        }
    }

    fn kind(&self) -> EntryKind {
        if self.data.is_some() {
            EntryKind::File
        } else {
            EntryKind::Directory
        }
    }
}

#[derive(Debug)]
struct OpenFile {
    path: PathBuf,
    cursor: u64,
}

fn now_millis() -> i64 {
    to_epoch_millis(SystemTime::now())
}

/// Move `p` from under `from` to under `to`.
fn rebase(p: &Path, from: &Path, to: &Path) -> PathBuf {
    match p.strip_prefix(from) {
        Ok(rel) if !rel.as_os_str().is_empty() => to.join(rel),
        _ => to.to_path_buf(),
    }
}

/// Largest file the driver will grow a file to (4 GiB).
const MAX_FILE_LEN: u64 = 1 << 32;

/// Zero-extend `data` to `len` bytes without aborting on allocation failure.
fn grow(data: &mut Vec<u8>, len: u64) -> Result<(), FsError> {
    if len > MAX_FILE_LEN {
        return Err(FsError::Driver(format!(
            "file length {len} exceeds {MAX_FILE_LEN} bytes"
        )));
    }
    let len = usize::try_from(len)
        .map_err(|_| FsError::Driver(format!("file length {len} does not fit in memory")))?;
    if len > data.len() {
        data.try_reserve(len - data.len())
            .map_err(|e| FsError::Driver(format!("cannot grow file to {len} bytes: {e}")))?;
        data.resize(len, 0);
    }
    Ok(())
}

fn bad_descriptor(fd: Descriptor) -> FsError {
    FsError::Driver(format!("bad descriptor: {}", fd.0))
}

fn stale_descriptor(fd: Descriptor, path: &Path) -> FsError {
    FsError::Driver(format!("descriptor {} refers to missing file {}", fd.0, path.display()))
}

impl MemoryDriver {
    /// Create a driver with home `/home` and temp `/tmp`.
    pub fn new() -> Self {
        Self::with_env("/home", "/tmp")
    }

    /// Create a driver reporting the given home and temp directories.
    ///
    /// Both are created, together with their ancestors.
    pub fn with_env(home: impl Into<PathBuf>, temp: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let temp = temp.into();
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("/"), Node::dir());
        for dir in [&home, &temp] {
            for ancestor in dir.ancestors() {
                entries.entry(ancestor.to_path_buf()).or_insert_with(Node::dir);
            }
        }
        Self {
            entries: RwLock::new(entries),
            handles: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            home,
            temp,
        }
    }

    /// Number of descriptors currently open.
    pub fn open_descriptors(&self) -> usize {
        self.handles.read().len()
    }

    fn kind_of(&self, path: &Path) -> EntryKind {
        self.entries
            .read()
            .get(path)
            .map_or(EntryKind::Absent, Node::kind)
    }

    /// Checks shared by every create-style call.
    fn check_creatable(&self, path: &Path, operation: &'static str) -> Result<(), FsError> {
        if self.kind_of(path).exists() {
            return Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
                operation,
            });
        }
        let parent = path::dirname(path);
        match self.kind_of(parent) {
            EntryKind::Directory => Ok(()),
            EntryKind::File => Err(FsError::NotADirectory {
                path: parent.to_path_buf(),
            }),
            EntryKind::Absent => Err(FsError::NotFound {
                path: parent.to_path_buf(),
            }),
        }
    }

    fn subtree(entries: &BTreeMap<PathBuf, Node>, root: &Path) -> Vec<PathBuf> {
        entries
            .keys()
            .filter(|p| p.starts_with(root))
            .cloned()
            .collect()
    }

    fn with_open_file<T>(
        &self,
        fd: Descriptor,
        f: impl FnOnce(&mut OpenFile, &mut Node) -> T,
    ) -> Result<T, FsError> {
        let mut handles = self.handles.write();
        let open = handles.get_mut(&fd.0).ok_or_else(|| bad_descriptor(fd))?;
        let mut entries = self.entries.write();
        match entries.get_mut(&open.path) {
            Some(node) if node.data.is_some() => Ok(f(open, node)),
            _ => Err(stale_descriptor(fd, &open.path)),
        }
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverEnv for MemoryDriver {
    fn home_dir(&self) -> PathBuf {
        self.home.clone()
    }

    fn temp_dir(&self) -> PathBuf {
        self.temp.clone()
    }
}

impl DriverEntries for MemoryDriver {
    async fn exists(&self, path: &Path) -> Result<EntryKind, FsError> {
        Ok(self.kind_of(path))
    }

    async fn stat(&self, path: &Path) -> Result<RawStat, FsError> {
        let entries = self.entries.read();
        let node = entries.get(path).ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })?;
        Ok(RawStat {
            path: path.to_path_buf(),
            length: node.data.as_ref().map_or(0, |d| d.len() as u64),
            ctime: Some(node.created),
            mtime: node.modified,
            flag: node.kind().code(),
        })
    }

    async fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        self.check_creatable(path, "mkdir")?;
        self.entries.write().insert(path.to_path_buf(), Node::dir());
        Ok(())
    }

    async fn touch(&self, path: &Path) -> Result<(), FsError> {
        self.check_creatable(path, "touch")?;
        self.entries
            .write()
            .insert(path.to_path_buf(), Node::file(Vec::new()));
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), FsError> {
        let mut entries = self.entries.write();
        if !entries.contains_key(path) {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        for p in Self::subtree(&entries, path) {
            entries.remove(&p);
        }
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if !self.kind_of(from).exists() {
            return Err(FsError::NotFound {
                path: from.to_path_buf(),
            });
        }
        path::ensure_outside(from, to, "rename")?;
        self.check_creatable(to, "rename")?;
        let mut entries = self.entries.write();
        for p in Self::subtree(&entries, from) {
            if let Some(node) = entries.remove(&p) {
                entries.insert(rebase(&p, from, to), node);
            }
        }
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if !self.kind_of(from).exists() {
            return Err(FsError::NotFound {
                path: from.to_path_buf(),
            });
        }
        path::ensure_outside(from, to, "copy")?;
        self.check_creatable(to, "copy")?;
        let mut entries = self.entries.write();
        for p in Self::subtree(&entries, from) {
            if let Some(node) = entries.get(&p) {
                let copied = match &node.data {
                    Some(data) => Node::file(data.clone()),
                    None => Node::dir(),
                };
                entries.insert(rebase(&p, from, to), copied);
            }
        }
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        match self.kind_of(path) {
            EntryKind::Directory => {}
            EntryKind::File => {
                return Err(FsError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }
            EntryKind::Absent => {
                return Err(FsError::NotFound {
                    path: path.to_path_buf(),
                });
            }
        }
        let entries = self.entries.read();
        Ok(entries
            .keys()
            .filter(|p| p.as_path() != path && p.parent() == Some(path))
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }
}

impl DriverHandles for MemoryDriver {
    async fn open(&self, path: &Path) -> Result<Descriptor, FsError> {
        match self.kind_of(path) {
            EntryKind::File => {}
            EntryKind::Directory => {
                return Err(FsError::NotAFile {
                    path: path.to_path_buf(),
                });
            }
            // Opening creates the file, like a read-write open on most hosts.
            EntryKind::Absent => {
                self.check_creatable(path, "open")?;
                self.entries
                    .write()
                    .insert(path.to_path_buf(), Node::file(Vec::new()));
            }
        }
        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.handles.write().insert(
            id,
            OpenFile {
                path: path.to_path_buf(),
                cursor: 0,
            },
        );
        Ok(Descriptor(id))
    }

    async fn close(&self, fd: Descriptor) -> Result<(), FsError> {
        self.handles
            .write()
            .remove(&fd.0)
            .map(|_| ())
            .ok_or_else(|| bad_descriptor(fd))
    }

    async fn tell(&self, fd: Descriptor) -> Result<u64, FsError> {
        self.handles
            .read()
            .get(&fd.0)
            .map(|open| open.cursor)
            .ok_or_else(|| bad_descriptor(fd))
    }

    async fn seek(&self, fd: Descriptor, offset: u64) -> Result<u64, FsError> {
        let mut handles = self.handles.write();
        let open = handles.get_mut(&fd.0).ok_or_else(|| bad_descriptor(fd))?;
        open.cursor = offset;
        Ok(offset)
    }

    async fn truncate(&self, fd: Descriptor, len: u64) -> Result<u64, FsError> {
        self.with_open_file(fd, |_, node| -> Result<u64, FsError> {
            let data = node.data.get_or_insert_with(Vec::new);
            match usize::try_from(len) {
                Ok(new_len) if new_len <= data.len() => data.truncate(new_len),
                _ => grow(data, len)?,
            }
            node.modified = now_millis();
            Ok(len)
        })?
    }

    async fn read(&self, fd: Descriptor, max_len: usize) -> Result<WirePayload, FsError> {
        self.with_open_file(fd, |open, node| {
            let data = node.data.as_deref().unwrap_or_default();
            let start = usize::try_from(open.cursor).unwrap_or(usize::MAX).min(data.len());
            let end = start.saturating_add(max_len).min(data.len());
            open.cursor += (end - start) as u64;
            WirePayload::encode(&data[start..end])
        })
    }

    async fn write(&self, fd: Descriptor, payload: WirePayload) -> Result<usize, FsError> {
        let bytes = hex::decode(payload.as_str())
            .map_err(|e| FsError::Driver(format!("malformed payload: {e}")))?;
        self.with_open_file(fd, |open, node| -> Result<usize, FsError> {
            let end = open
                .cursor
                .checked_add(bytes.len() as u64)
                .ok_or_else(|| FsError::Driver(format!("write at offset {} overflows", open.cursor)))?;
            let data = node.data.get_or_insert_with(Vec::new);
            grow(data, end)?;
            // `grow` bounds `end`, so both offsets fit in usize.
            let start = open.cursor as usize;
            data[start..start + bytes.len()].copy_from_slice(&bytes);
            open.cursor = end;
            node.modified = now_millis();
            Ok(bytes.len())
        })?
    }
}

//! Driver backed by the host filesystem.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::types::to_epoch_millis;
use crate::{
    Descriptor, DriverEntries, DriverEnv, DriverHandles, EntryKind, FsError, RawStat, WirePayload,
    path,
};

type SharedFile = Arc<tokio::sync::Mutex<fs::File>>;

/// Driver that performs real I/O through `tokio::fs`.
///
/// Descriptors index a table of open files. Each open file sits behind its
/// own async mutex, so calls on different descriptors proceed independently.
#[derive(Debug)]
pub struct LocalDriver {
    files: Mutex<HashMap<u64, (PathBuf, SharedFile)>>,
    next_handle: AtomicU64,
    home: PathBuf,
    temp: PathBuf,
}

impl LocalDriver {
    /// Create a driver reporting the given home and temp directories.
    pub fn new(home: impl Into<PathBuf>, temp: impl Into<PathBuf>) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            home: home.into(),
            temp: temp.into(),
        }
    }

    /// Create a driver using the current user's home directory and the
    /// system temp directory.
    pub fn from_env() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self::new(home, std::env::temp_dir())
    }

    /// Number of descriptors currently open.
    pub fn open_descriptors(&self) -> usize {
        self.files.lock().len()
    }

    fn lookup(&self, fd: Descriptor) -> Result<(PathBuf, SharedFile), FsError> {
        self.files
            .lock()
            .get(&fd.0)
            .map(|(path, file)| (path.clone(), file.clone()))
            .ok_or_else(|| FsError::Driver(format!("bad descriptor: {}", fd.0)))
    }
}

fn kind_of(meta: &std::fs::Metadata) -> EntryKind {
    if meta.is_dir() {
        EntryKind::Directory
    } else if meta.is_file() {
        EntryKind::File
    } else {
        EntryKind::Absent
    }
}

async fn copy_tree(from: &Path, to: &Path) -> Result<(), FsError> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dst)) = pending.pop() {
        fs::create_dir(&dst)
            .await
            .map_err(|e| FsError::io("copy", &dst, e))?;
        let mut dir = fs::read_dir(&src)
            .await
            .map_err(|e| FsError::io("copy", &src, e))?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| FsError::io("copy", &src, e))?
        {
            let child_src = entry.path();
            let child_dst = dst.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| FsError::io("copy", &child_src, e))?;
            if file_type.is_dir() {
                pending.push((child_src, child_dst));
            } else {
                fs::copy(&child_src, &child_dst)
                    .await
                    .map_err(|e| FsError::io("copy", &child_src, e))?;
            }
        }
    }
    Ok(())
}

impl DriverEnv for LocalDriver {
    fn home_dir(&self) -> PathBuf {
        self.home.clone()
    }

    fn temp_dir(&self) -> PathBuf {
        self.temp.clone()
    }
}

impl DriverEntries for LocalDriver {
    async fn exists(&self, path: &Path) -> Result<EntryKind, FsError> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(kind_of(&meta)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EntryKind::Absent),
            Err(e) => Err(FsError::io("exists", path, e)),
        }
    }

    async fn stat(&self, path: &Path) -> Result<RawStat, FsError> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| FsError::io("stat", path, e))?;
        Ok(RawStat {
            path: path.to_path_buf(),
            length: meta.len(),
            ctime: meta.created().ok().map(to_epoch_millis),
            mtime: meta.modified().map(to_epoch_millis).unwrap_or(0),
            flag: kind_of(&meta).code(),
        })
    }

    async fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir(path)
            .await
            .map_err(|e| FsError::io("mkdir", path, e))
    }

    async fn touch(&self, path: &Path) -> Result<(), FsError> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map(drop)
            .map_err(|e| FsError::io("touch", path, e))
    }

    async fn remove(&self, path: &Path) -> Result<(), FsError> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| FsError::io("remove", path, e))?;
        let result = if meta.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };
        result.map_err(|e| FsError::io("remove", path, e))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        path::ensure_outside(from, to, "rename")?;
        fs::rename(from, to)
            .await
            .map_err(|e| FsError::io("rename", from, e))
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        path::ensure_outside(from, to, "copy")?;
        let meta = fs::metadata(from)
            .await
            .map_err(|e| FsError::io("copy", from, e))?;
        if meta.is_dir() {
            copy_tree(from, to).await
        } else {
            fs::copy(from, to)
                .await
                .map(drop)
                .map_err(|e| FsError::io("copy", from, e))
        }
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let mut dir = fs::read_dir(path)
            .await
            .map_err(|e| FsError::io("read_dir", path, e))?;
        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| FsError::io("read_dir", path, e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

impl DriverHandles for LocalDriver {
    async fn open(&self, path: &Path) -> Result<Descriptor, FsError> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await
            .map_err(|e| FsError::io("open", path, e))?;
        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.files.lock().insert(
            id,
            (path.to_path_buf(), Arc::new(tokio::sync::Mutex::new(file))),
        );
        Ok(Descriptor(id))
    }

    async fn close(&self, fd: Descriptor) -> Result<(), FsError> {
        let (path, file) = self.lookup(fd)?;
        file.lock()
            .await
            .flush()
            .await
            .map_err(|e| FsError::io("close", &path, e))?;
        self.files.lock().remove(&fd.0);
        Ok(())
    }

    async fn tell(&self, fd: Descriptor) -> Result<u64, FsError> {
        let (path, file) = self.lookup(fd)?;
        let mut file = file.lock().await;
        file.stream_position()
            .await
            .map_err(|e| FsError::io("tell", &path, e))
    }

    async fn seek(&self, fd: Descriptor, offset: u64) -> Result<u64, FsError> {
        let (path, file) = self.lookup(fd)?;
        let mut file = file.lock().await;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| FsError::io("seek", &path, e))
    }

    async fn truncate(&self, fd: Descriptor, len: u64) -> Result<u64, FsError> {
        let (path, file) = self.lookup(fd)?;
        let file = file.lock().await;
        file.set_len(len)
            .await
            .map_err(|e| FsError::io("truncate", &path, e))?;
        Ok(len)
    }

    async fn read(&self, fd: Descriptor, max_len: usize) -> Result<WirePayload, FsError> {
        let (path, file) = self.lookup(fd)?;
        let mut file = file.lock().await;
        let mut buf = vec![0u8; max_len];
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| FsError::io("read", &path, e))?;
        buf.truncate(n);
        Ok(WirePayload::encode(buf))
    }

    async fn write(&self, fd: Descriptor, payload: WirePayload) -> Result<usize, FsError> {
        let (path, file) = self.lookup(fd)?;
        let bytes = payload.decode(&path)?;
        let mut file = file.lock().await;
        file.write_all(&bytes)
            .await
            .map_err(|e| FsError::io("write", &path, e))?;
        file.flush()
            .await
            .map_err(|e| FsError::io("write", &path, e))?;
        Ok(bytes.len())
    }
}

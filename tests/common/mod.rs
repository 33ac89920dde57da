//! Shared test support: a driver wrapper that records and perturbs calls.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use litefs::{
    Descriptor, DriverEntries, DriverEnv, DriverHandles, EntryKind, FileSystem, FsError,
    MemoryDriver, RawStat, WirePayload,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// Wraps [`MemoryDriver`], logging every call and optionally injecting
/// failures, short writes, or a gate that holds `seek` until released.
#[derive(Debug, Default)]
pub struct Instrumented {
    inner: MemoryDriver,
    calls: Mutex<Vec<String>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    fail_write: AtomicBool,
    fail_read: AtomicBool,
    fail_close: AtomicBool,
    max_write: Mutex<Option<usize>>,
    seek_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl Instrumented {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls whose name matches `op`, with the op name stripped.
    pub fn calls_to(&self, op: &str) -> Vec<String> {
        let prefix = format!("{op} ");
        self.calls
            .lock()
            .iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Opens minus closes that succeeded.
    pub fn unmatched_opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst) - self.closes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_write.store(on, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, on: bool) {
        self.fail_read.store(on, Ordering::SeqCst);
    }

    pub fn fail_closes(&self, on: bool) {
        self.fail_close.store(on, Ordering::SeqCst);
    }

    /// Accept at most `n` bytes per write call.
    pub fn limit_writes(&self, n: Option<usize>) {
        *self.max_write.lock() = n;
    }

    /// Hold every `seek` until a permit is added to the returned semaphore.
    pub fn gate_seeks(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.seek_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn inner(&self) -> &MemoryDriver {
        &self.inner
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

/// A filesystem over a fresh instrumented driver.
pub fn instrumented_fs() -> (FileSystem<Instrumented>, Arc<Instrumented>) {
    let driver = Instrumented::new();
    let fs = FileSystem::from_shared(driver.clone(), Default::default());
    (fs, driver)
}

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn injected(what: &str) -> FsError {
    FsError::Driver(format!("injected {what} failure"))
}

impl DriverEnv for Instrumented {
    fn home_dir(&self) -> PathBuf {
        self.inner.home_dir()
    }

    fn temp_dir(&self) -> PathBuf {
        self.inner.temp_dir()
    }
}

impl DriverEntries for Instrumented {
    async fn exists(&self, path: &Path) -> Result<EntryKind, FsError> {
        self.record(format!("exists {}", path.display()));
        self.inner.exists(path).await
    }

    async fn stat(&self, path: &Path) -> Result<RawStat, FsError> {
        self.record(format!("stat {}", path.display()));
        self.inner.stat(path).await
    }

    async fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        self.record(format!("mkdir {}", path.display()));
        self.inner.mkdir(path).await
    }

    async fn touch(&self, path: &Path) -> Result<(), FsError> {
        self.record(format!("touch {}", path.display()));
        self.inner.touch(path).await
    }

    async fn remove(&self, path: &Path) -> Result<(), FsError> {
        self.record(format!("remove {}", path.display()));
        self.inner.remove(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.record(format!("rename {} {}", from.display(), to.display()));
        self.inner.rename(from, to).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.record(format!("copy {} {}", from.display(), to.display()));
        self.inner.copy(from, to).await
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        self.record(format!("read_dir {}", path.display()));
        self.inner.read_dir(path).await
    }
}

impl DriverHandles for Instrumented {
    async fn open(&self, path: &Path) -> Result<Descriptor, FsError> {
        self.record(format!("open {}", path.display()));
        let fd = self.inner.open(path).await?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(fd)
    }

    async fn close(&self, fd: Descriptor) -> Result<(), FsError> {
        self.record(format!("close {}", fd.0));
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(injected("close"));
        }
        self.inner.close(fd).await?;
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn tell(&self, fd: Descriptor) -> Result<u64, FsError> {
        self.record(format!("tell {}", fd.0));
        self.inner.tell(fd).await
    }

    async fn seek(&self, fd: Descriptor, offset: u64) -> Result<u64, FsError> {
        let gate = self.seek_gate.lock().clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| FsError::Driver("seek gate closed".into()))?;
            permit.forget();
        }
        self.record(format!("seek {} {offset}", fd.0));
        self.inner.seek(fd, offset).await
    }

    async fn truncate(&self, fd: Descriptor, len: u64) -> Result<u64, FsError> {
        self.record(format!("truncate {} {len}", fd.0));
        self.inner.truncate(fd, len).await
    }

    async fn read(&self, fd: Descriptor, max_len: usize) -> Result<WirePayload, FsError> {
        self.record(format!("read {} {max_len}", fd.0));
        if self.fail_read.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        self.inner.read(fd, max_len).await
    }

    async fn write(&self, fd: Descriptor, payload: WirePayload) -> Result<usize, FsError> {
        self.record(format!("write {} {}", fd.0, payload.byte_len()));
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        let limit = *self.max_write.lock();
        match limit {
            Some(max) if payload.byte_len() > max => {
                let bytes = payload.decode(Path::new("/"))?;
                self.inner
                    .write(fd, WirePayload::encode(&bytes[..max]))
                    .await
            }
            _ => self.inner.write(fd, payload).await,
        }
    }
}

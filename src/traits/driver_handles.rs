//! Descriptor-level driver primitives.
//!
//! # Overview
//!
//! A descriptor is opened by path and then addressed by its id:
//!
//! 1. `open()` - obtain a [`Descriptor`]
//! 2. `seek()` / `read()` / `write()` / `truncate()` / `tell()`
//! 3. `close()` - release it
//!
//! Payloads cross this boundary in their wire form ([`WirePayload`]); the
//! [`File`](crate::File) handle encodes and decodes them.

use std::future::Future;
use std::path::Path;

use crate::{Descriptor, FsError, WirePayload};

/// Descriptor-based primitives of a storage driver.
///
/// The driver keeps a cursor per descriptor. `read` and `write` operate at
/// the cursor and advance it.
pub trait DriverHandles: Send + Sync {
    /// Open the file at `path` for reading and writing.
    fn open(&self, path: &Path) -> impl Future<Output = Result<Descriptor, FsError>> + Send;

    /// Release a descriptor.
    fn close(&self, fd: Descriptor) -> impl Future<Output = Result<(), FsError>> + Send;

    /// Current cursor position.
    fn tell(&self, fd: Descriptor) -> impl Future<Output = Result<u64, FsError>> + Send;

    /// Move the cursor to an absolute offset; returns the new position.
    fn seek(&self, fd: Descriptor, offset: u64)
    -> impl Future<Output = Result<u64, FsError>> + Send;

    /// Set the file length; returns the new length.
    fn truncate(
        &self,
        fd: Descriptor,
        len: u64,
    ) -> impl Future<Output = Result<u64, FsError>> + Send;

    /// Read up to `max_len` bytes at the cursor.
    ///
    /// The result may be shorter than requested. An empty payload means
    /// end-of-file.
    fn read(
        &self,
        fd: Descriptor,
        max_len: usize,
    ) -> impl Future<Output = Result<WirePayload, FsError>> + Send;

    /// Write a payload at the cursor; returns the number of bytes written,
    /// which may be less than the payload carries.
    fn write(
        &self,
        fd: Descriptor,
        payload: WirePayload,
    ) -> impl Future<Output = Result<usize, FsError>> + Send;
}

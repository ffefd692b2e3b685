//! Open file handles.

use std::io::SeekFrom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use memfs_core::{FileTime, FsError, FsErrorKind, FsResult, OpenFlags};

use crate::entry::MemEntry;

/// An open cursor over a regular file.
///
/// The handle owns the entry, so content stays readable and writable after
/// the entry is unlinked from its directory. Each read or write runs under
/// the entry's write lock; that lock is the only ordering between concurrent
/// handles on the same file. Once the filesystem closes, every call fails
/// `Closed`.
pub struct MemHandle {
    entry: Arc<MemEntry>,
    fs_open: Arc<AtomicBool>,
    flags: OpenFlags,
    position: Mutex<u64>,
}

impl MemHandle {
    pub(crate) fn new(entry: Arc<MemEntry>, fs_open: Arc<AtomicBool>, flags: OpenFlags) -> Self {
        Self {
            entry,
            fs_open,
            flags,
            position: Mutex::new(0),
        }
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub fn position(&self) -> u64 {
        *self.position.lock()
    }

    fn check_open(&self, op: &'static str) -> FsResult<()> {
        if self.fs_open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(FsError::new(FsErrorKind::Closed, op))
        }
    }

    /// Read at the current position, advancing it by the bytes read. Returns
    /// zero at end-of-file.
    pub fn read(&self, buf: &mut [u8]) -> FsResult<usize> {
        const OP: &str = "handle.read";
        self.check_open(OP)?;
        if !self.flags.readable() {
            return Err(FsError::new(FsErrorKind::NonReadable, OP));
        }
        let mut position = self.position.lock();
        let mut guard = self.entry.write();
        let read = guard.content(OP)?.read_at(*position, buf);
        guard.touch_accessed(FileTime::now());
        *position += read as u64;
        Ok(read)
    }

    /// Write at the current position, advancing it by the bytes written. An
    /// `APPEND` handle repositions to end-of-file first, atomically under the
    /// entry's write lock.
    pub fn write(&self, buf: &[u8]) -> FsResult<usize> {
        const OP: &str = "handle.write";
        self.check_open(OP)?;
        if !self.flags.writable() {
            return Err(FsError::new(FsErrorKind::NonWritable, OP));
        }
        let mut position = self.position.lock();
        let mut guard = self.entry.write();
        if self.flags.contains(OpenFlags::APPEND) {
            *position = guard.content(OP)?.len();
        }
        let written = guard.content_mut(OP)?.write_at(*position, buf);
        guard.touch_modified(FileTime::now());
        *position += written as u64;
        Ok(written)
    }

    pub fn seek(&self, pos: SeekFrom) -> FsResult<u64> {
        const OP: &str = "handle.seek";
        self.check_open(OP)?;
        let mut position = self.position.lock();
        let new = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(delta) => {
                if delta >= 0 {
                    position.saturating_add(delta as u64)
                } else {
                    position
                        .checked_sub(delta.unsigned_abs())
                        .ok_or(FsError::new(FsErrorKind::InvalidInput, OP))?
                }
            }
            SeekFrom::End(delta) => {
                let len = self.entry.read().content(OP)?.len();
                if delta >= 0 {
                    len.saturating_add(delta as u64)
                } else {
                    len.checked_sub(delta.unsigned_abs())
                        .ok_or(FsError::new(FsErrorKind::InvalidInput, OP))?
                }
            }
        };
        *position = new;
        Ok(new)
    }

    pub fn len(&self) -> FsResult<u64> {
        const OP: &str = "handle.len";
        self.check_open(OP)?;
        Ok(self.entry.read().content(OP)?.len())
    }

    pub fn is_empty(&self) -> FsResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Truncate the file to `len`; growing is a no-op. The handle position is
    /// left alone.
    pub fn truncate(&self, len: u64) -> FsResult<()> {
        const OP: &str = "handle.truncate";
        self.check_open(OP)?;
        if !self.flags.writable() {
            return Err(FsError::new(FsErrorKind::NonWritable, OP));
        }
        let mut guard = self.entry.write();
        guard.content_mut(OP)?.truncate(len);
        guard.touch_modified(FileTime::now());
        Ok(())
    }
}

impl std::fmt::Debug for MemHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemHandle")
            .field("flags", &self.flags)
            .field("position", &self.position())
            .finish_non_exhaustive()
    }
}

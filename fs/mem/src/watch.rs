//! Watch-handle closed-state check.
//!
//! Event registration and dispatch live outside this crate; the engine only
//! guarantees that a handle reports `ClosedWatch` once it or its filesystem
//! has been closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use memfs_core::{FsError, FsErrorKind, FsResult};

#[derive(Debug)]
pub struct WatchHandle {
    open: AtomicBool,
    fs_open: Arc<AtomicBool>,
}

impl WatchHandle {
    pub(crate) fn new(fs_open: Arc<AtomicBool>) -> Self {
        Self {
            open: AtomicBool::new(true),
            fs_open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && self.fs_open.load(Ordering::Acquire)
    }

    pub fn check(&self) -> FsResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(FsError::new(FsErrorKind::ClosedWatch, "watch.check"))
        }
    }

    /// Idempotent.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

//! Tree entries: directories, regular files, and symlinks.
//!
//! Each entry owns a single `RwLock` over all of its mutable state. Helpers
//! operate on the guard, never re-acquiring the lock on the same call path.
//! Operations touching two entries take both write locks in [`EntryId`]
//! order via [`lock_pair`].

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use memfs_core::{EntryId, FileTime, FsError, FsErrorKind, FsPath, FsResult};

use crate::attr::ViewBundle;
use crate::content::ByteStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

/// The basic-view timestamps, millisecond granularity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Times {
    pub created: FileTime,
    pub accessed: FileTime,
    pub modified: FileTime,
}

impl Times {
    pub(crate) fn at(now: FileTime) -> Self {
        Self {
            created: now,
            accessed: now,
            modified: now,
        }
    }
}

/// A directory slot: the original-casing name plus the child itself. The
/// owning map is keyed by the case-folded name, so listing a directory never
/// needs child locks.
#[derive(Clone, Debug)]
pub(crate) struct DirSlot {
    pub name: String,
    pub entry: Arc<MemEntry>,
}

#[derive(Debug)]
pub(crate) enum EntryNode {
    Directory { children: BTreeMap<String, DirSlot> },
    File { content: ByteStore },
    Symlink { target: FsPath },
}

impl EntryNode {
    pub(crate) fn empty_dir() -> Self {
        EntryNode::Directory {
            children: BTreeMap::new(),
        }
    }

    pub(crate) fn file(content: ByteStore) -> Self {
        EntryNode::File { content }
    }

    pub(crate) fn symlink(target: FsPath) -> Self {
        EntryNode::Symlink { target }
    }

    fn kind(&self) -> EntryKind {
        match self {
            EntryNode::Directory { .. } => EntryKind::Directory,
            EntryNode::File { .. } => EntryKind::File,
            EntryNode::Symlink { .. } => EntryKind::Symlink,
        }
    }
}

/// Everything mutable about an entry, guarded by the entry's lock.
#[derive(Debug)]
pub(crate) struct EntryInner {
    pub times: Times,
    pub views: ViewBundle,
    pub node: EntryNode,
}

impl EntryInner {
    pub(crate) fn children(&self, op: &'static str) -> FsResult<&BTreeMap<String, DirSlot>> {
        match &self.node {
            EntryNode::Directory { children } => Ok(children),
            _ => Err(FsError::new(FsErrorKind::NotDir, op)),
        }
    }

    pub(crate) fn children_mut(
        &mut self,
        op: &'static str,
    ) -> FsResult<&mut BTreeMap<String, DirSlot>> {
        match &mut self.node {
            EntryNode::Directory { children } => Ok(children),
            _ => Err(FsError::new(FsErrorKind::NotDir, op)),
        }
    }

    pub(crate) fn content(&self, op: &'static str) -> FsResult<&ByteStore> {
        match &self.node {
            EntryNode::File { content } => Ok(content),
            EntryNode::Directory { .. } => Err(FsError::new(FsErrorKind::IsDir, op)),
            EntryNode::Symlink { .. } => Err(FsError::new(FsErrorKind::InvalidOperation, op)),
        }
    }

    pub(crate) fn content_mut(&mut self, op: &'static str) -> FsResult<&mut ByteStore> {
        match &mut self.node {
            EntryNode::File { content } => Ok(content),
            EntryNode::Directory { .. } => Err(FsError::new(FsErrorKind::IsDir, op)),
            EntryNode::Symlink { .. } => Err(FsError::new(FsErrorKind::InvalidOperation, op)),
        }
    }

    pub(crate) fn symlink_target(&self, op: &'static str) -> FsResult<&FsPath> {
        match &self.node {
            EntryNode::Symlink { target } => Ok(target),
            _ => Err(FsError::new(FsErrorKind::InvalidOperation, op)),
        }
    }

    /// Size as the basic view reports it.
    pub(crate) fn size(&self) -> u64 {
        match &self.node {
            EntryNode::File { content } => content.len(),
            _ => 0,
        }
    }

    // Timestamp helpers take `&mut self`, so they are always folded into an
    // operation that already holds the write lock.
    pub(crate) fn touch_modified(&mut self, now: FileTime) {
        self.times.modified = now;
        self.times.accessed = now;
    }

    pub(crate) fn touch_accessed(&mut self, now: FileTime) {
        self.times.accessed = now;
    }
}

#[derive(Debug)]
pub(crate) struct MemEntry {
    id: EntryId,
    kind: EntryKind,
    inner: RwLock<EntryInner>,
}

impl MemEntry {
    pub(crate) fn new(id: EntryId, now: FileTime, views: ViewBundle, node: EntryNode) -> Arc<Self> {
        let kind = node.kind();
        Arc::new(Self {
            id,
            kind,
            inner: RwLock::new(EntryInner {
                times: Times::at(now),
                views,
                node,
            }),
        })
    }

    pub(crate) fn id(&self) -> EntryId {
        self.id
    }

    /// The node variant, fixed at creation; readable without the lock.
    pub(crate) fn kind(&self) -> EntryKind {
        self.kind
    }

    pub(crate) fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub(crate) fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, EntryInner> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, EntryInner> {
        self.inner.write()
    }

    pub(crate) fn try_read(&self) -> Option<RwLockReadGuard<'_, EntryInner>> {
        self.inner.try_read()
    }
}

/// Write-lock two entries in id order to avoid deadlock. The first guard
/// always corresponds to `a`; the second is `None` when both arguments are
/// the same entry.
pub(crate) fn lock_pair<'a>(
    a: &'a MemEntry,
    b: &'a MemEntry,
) -> (
    RwLockWriteGuard<'a, EntryInner>,
    Option<RwLockWriteGuard<'a, EntryInner>>,
) {
    if a.id() == b.id() {
        (a.write(), None)
    } else if a.id() < b.id() {
        let first = a.write();
        let second = b.write();
        (first, Some(second))
    } else {
        let second = b.write();
        let first = a.write();
        (first, Some(second))
    }
}

//! An in-memory filesystem with POSIX, Windows, and custom path flavors.
//!
//! The engine keeps a rooted tree of entries per root, each entry carrying
//! timestamps, an attribute-view bundle, and its own read/write lock.
//! Provider operations compose traversal, access checks, and content
//! mutation into create/read/write/move/delete flows with typed failures.
//!
//! ```no_run
//! use memfs::{registry, MemFsConfig};
//!
//! fn main() -> memfs_core::FsResult<()> {
//!     let fs = registry().create("memory:demo", &MemFsConfig::posix())?;
//!     let dir = fs.path("/data", &[])?;
//!     fs.create_directory(&dir)?;
//!     let file = fs.path("/data/hello.txt", &[])?;
//!     let handle = fs.open(&file, memfs::OpenFlags::WRITE | memfs::OpenFlags::CREATE)?;
//!     handle.write(b"hello")?;
//!     fs.close();
//!     Ok(())
//! }
//! ```

mod attr;
mod config;
mod content;
mod entry;
mod fs;
mod handle;
mod principals;
mod registry;
mod tree;
mod watch;

pub use attr::{AclEntry, AclKind, AclPermissions, AclPrincipal, AttrValue};
pub use config::MemFsConfig;
pub use fs::MemFs;
pub use handle::MemHandle;
pub use principals::{
    as_group, as_user, GroupPrincipal, GroupScope, PrincipalLookup, UserPrincipal, UserScope,
};
pub use registry::{registry, FsRegistry};
pub use watch::WatchHandle;

pub use memfs_core::{
    AccessMode, CaseSensitivity, CopyFlags, FileTime, Flavor, FsError, FsErrorKind, FsPath,
    FsResult, MoveFlags, OpenFlags, ViewSet,
};

//! Core types for the memfs in-memory filesystem.
//!
//! This crate carries the semantic vocabulary shared by the engine and its
//! callers: the error surface, flag sets, identifier newtypes, timestamps,
//! and the flavored path model. The engine itself lives in the `memfs`
//! crate.

pub mod error;
pub mod flags;
pub mod ids;
pub mod path;
pub mod time;

pub use error::{FsError, FsErrorKind, FsResult};
pub use flags::{AccessMode, CopyFlags, MoveFlags, OpenFlags, ViewSet};
pub use ids::{EntryId, FsInstanceId};
pub use path::{CaseSensitivity, Components, Flavor, FsPath, PathKind, PathRules, RootName};
pub use time::FileTime;

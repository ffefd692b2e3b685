use std::fmt;

/// Semantic failure modes of the filesystem.
///
/// Kinds are "errno-like": every operation reports one of these so callers can
/// match on outcomes without parsing messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FsErrorKind {
    /// Path does not resolve to an entry.
    NotFound,
    /// Target name is already taken.
    AlreadyExists,
    /// A directory was required.
    NotDir,
    /// A non-directory was required.
    IsDir,
    /// Directory still has children.
    DirNotEmpty,
    /// An access check denied the operation.
    PermissionDenied,
    /// Symlink resolution exhausted its budget.
    TooManySymlinks,
    /// Input could not be parsed as a path under the filesystem's rules.
    InvalidPath,
    /// Rejected filesystem configuration.
    InvalidConfig,
    /// Malformed argument (unknown attribute field, bad identifier, ...).
    InvalidInput,
    /// Destination buffer is smaller than the stored value.
    BufferTooSmall,
    /// Write attempted through a handle opened without write access.
    NonWritable,
    /// Read attempted through a handle opened without read access.
    NonReadable,
    /// Operation or access mode not supported by this entry.
    NotSupported,
    /// Structurally impossible request (move into own descendant,
    /// cross-filesystem operation, operation on a root).
    InvalidOperation,
    /// The filesystem has been closed.
    Closed,
    /// The watch handle (or its filesystem) has been closed.
    ClosedWatch,
    /// No filesystem (or principal) registered under that name.
    Unregistered,
}

impl FsErrorKind {
    fn message(self) -> &'static str {
        match self {
            FsErrorKind::NotFound => "no such file or directory",
            FsErrorKind::AlreadyExists => "already exists",
            FsErrorKind::NotDir => "not a directory",
            FsErrorKind::IsDir => "is a directory",
            FsErrorKind::DirNotEmpty => "directory not empty",
            FsErrorKind::PermissionDenied => "access denied",
            FsErrorKind::TooManySymlinks => "too many levels of symbolic links",
            FsErrorKind::InvalidPath => "invalid path",
            FsErrorKind::InvalidConfig => "invalid configuration",
            FsErrorKind::InvalidInput => "invalid input",
            FsErrorKind::BufferTooSmall => "buffer too small",
            FsErrorKind::NonWritable => "handle is not writable",
            FsErrorKind::NonReadable => "handle is not readable",
            FsErrorKind::NotSupported => "not supported",
            FsErrorKind::InvalidOperation => "invalid operation",
            FsErrorKind::Closed => "filesystem is closed",
            FsErrorKind::ClosedWatch => "watch service is closed",
            FsErrorKind::Unregistered => "not registered",
        }
    }
}

/// Error carrying a [`FsErrorKind`], the operation that produced it, and
/// optionally the path the caller supplied.
///
/// The `op` tag is a stable `"module.operation"` string for diagnostics; it is
/// not part of the semantic contract.
#[derive(Clone, Debug)]
pub struct FsError {
    kind: FsErrorKind,
    op: &'static str,
    path: Option<Box<str>>,
}

impl FsError {
    pub fn new(kind: FsErrorKind, op: &'static str) -> Self {
        Self {
            kind,
            op,
            path: None,
        }
    }

    pub fn with_path(kind: FsErrorKind, op: &'static str, path: impl Into<String>) -> Self {
        Self {
            kind,
            op,
            path: Some(path.into().into_boxed_str()),
        }
    }

    pub fn kind(&self) -> FsErrorKind {
        self.kind
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    /// The path the failing operation was given, when one was recorded.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {} ({})", self.kind.message(), path, self.op),
            None => write!(f, "{} ({})", self.kind.message(), self.op),
        }
    }
}

impl std::error::Error for FsError {}

pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path_and_op() {
        let err = FsError::with_path(FsErrorKind::NotFound, "memfs.create_file", "/a");
        assert_eq!(
            err.to_string(),
            "no such file or directory: /a (memfs.create_file)"
        );
        assert_eq!(err.kind(), FsErrorKind::NotFound);
        assert_eq!(err.path(), Some("/a"));
    }

    #[test]
    fn display_without_path() {
        let err = FsError::new(FsErrorKind::Closed, "registry.get");
        assert_eq!(err.to_string(), "filesystem is closed (registry.get)");
        assert_eq!(err.path(), None);
    }
}

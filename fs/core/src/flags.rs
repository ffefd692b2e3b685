use bitflags::bitflags;

bitflags! {
    /// Access modes checked against an entry's attribute views.
    ///
    /// Only these three bits exist; checks reject any other bit pattern with
    /// `NotSupported`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AccessMode: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

bitflags! {
    /// Open semantics flags for file handles.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        /// Every write repositions to end-of-file first. Implies write access.
        const APPEND = 1 << 2;
        /// Truncate an existing file to zero length on open.
        const TRUNCATE = 1 << 3;
        /// Create the file when it does not exist.
        const CREATE = 1 << 4;
        /// Create the file; fail `AlreadyExists` when it does.
        const CREATE_NEW = 1 << 5;
        /// Do not follow a symlink in the final path component.
        const NOFOLLOW = 1 << 6;
    }
}

impl OpenFlags {
    /// Whether this flag set grants write access to content.
    pub fn writable(self) -> bool {
        self.intersects(OpenFlags::WRITE | OpenFlags::APPEND)
    }

    /// Whether this flag set grants read access to content.
    ///
    /// An empty mode set opens for reading.
    pub fn readable(self) -> bool {
        self.contains(OpenFlags::READ) || !self.writable()
    }
}

bitflags! {
    /// Options for copy operations.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CopyFlags: u32 {
        const REPLACE_EXISTING = 1 << 0;
        /// Copy attribute-view state field-by-field instead of initializing
        /// the target as a fresh creation.
        const COPY_ATTRIBUTES = 1 << 1;
    }
}

bitflags! {
    /// Options for move operations.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MoveFlags: u32 {
        const REPLACE_EXISTING = 1 << 0;
    }
}

bitflags! {
    /// The set of optional attribute views a filesystem is configured with.
    ///
    /// The basic view is always present and has no bit here.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ViewSet: u32 {
        const POSIX = 1 << 0;
        const DOS = 1 << 1;
        const ACL = 1 << 2;
        const USER = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_implies_writable() {
        assert!(OpenFlags::APPEND.writable());
        assert!(!OpenFlags::READ.writable());
    }

    #[test]
    fn empty_open_flags_are_readable() {
        assert!(OpenFlags::empty().readable());
        assert!((OpenFlags::READ | OpenFlags::WRITE).readable());
        assert!(!OpenFlags::WRITE.readable());
    }
}

//! Process-wide interning of filesystems by identifier.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use memfs_core::{FsError, FsErrorKind, FsResult};

use crate::config::MemFsConfig;
use crate::fs::MemFs;

/// Registry of live filesystems keyed by their `scheme:authority`
/// identifier.
#[derive(Debug)]
pub struct FsRegistry {
    filesystems: Mutex<BTreeMap<String, Arc<MemFs>>>,
}

impl FsRegistry {
    pub const fn new() -> Self {
        Self {
            filesystems: Mutex::new(BTreeMap::new()),
        }
    }

    /// Build a filesystem from `config` and intern it. Fails `AlreadyExists`
    /// when the identifier is taken; the check and the insert happen under
    /// one lock acquisition.
    pub fn create(&self, identifier: &str, config: &MemFsConfig) -> FsResult<Arc<MemFs>> {
        const OP: &str = "registry.create";
        let mut filesystems = self.filesystems.lock();
        if filesystems.contains_key(identifier) {
            return Err(FsError::with_path(
                FsErrorKind::AlreadyExists,
                OP,
                identifier,
            ));
        }
        let fs = MemFs::new(identifier, config)?;
        filesystems.insert(identifier.to_owned(), fs.clone());
        debug!(identifier, "registered filesystem");
        Ok(fs)
    }

    /// The interned instance, or `Unregistered`.
    pub fn get(&self, identifier: &str) -> FsResult<Arc<MemFs>> {
        self.filesystems
            .lock()
            .get(identifier)
            .cloned()
            .ok_or_else(|| {
                FsError::with_path(FsErrorKind::Unregistered, "registry.get", identifier)
            })
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.filesystems.lock().keys().cloned().collect()
    }

    /// Drop the interned instance if it is still `fs`. Called from
    /// [`MemFs::close`]; a later filesystem reusing the identifier is left
    /// alone.
    pub(crate) fn unregister(&self, fs: &MemFs) {
        let mut filesystems = self.filesystems.lock();
        if let Some(interned) = filesystems.get(fs.identifier()) {
            if interned.instance() == fs.instance() {
                filesystems.remove(fs.identifier());
                debug!(identifier = fs.identifier(), "unregistered filesystem");
            }
        }
    }
}

impl Default for FsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: FsRegistry = FsRegistry::new();

/// The process-wide registry.
pub fn registry() -> &'static FsRegistry {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_identifier_fails() {
        let registry = FsRegistry::new();
        registry
            .create("memory:dup", &MemFsConfig::posix())
            .expect("first");
        let err = registry
            .create("memory:dup", &MemFsConfig::posix())
            .expect_err("second");
        assert_eq!(err.kind(), FsErrorKind::AlreadyExists);
    }

    #[test]
    fn get_unknown_identifier_fails() {
        let registry = FsRegistry::new();
        let err = registry.get("memory:missing").expect_err("missing");
        assert_eq!(err.kind(), FsErrorKind::Unregistered);
        assert_eq!(err.path(), Some("memory:missing"));
    }

    #[test]
    fn malformed_identifier_is_rejected() {
        let registry = FsRegistry::new();
        for identifier in ["", "memory", ":authority", "memory:"] {
            let err = registry
                .create(identifier, &MemFsConfig::posix())
                .expect_err("identifier");
            assert_eq!(err.kind(), FsErrorKind::InvalidInput);
        }
    }
}

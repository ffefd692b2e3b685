//! The filesystem object and its provider operations.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use memfs_core::{
    AccessMode, CopyFlags, EntryId, FileTime, FsError, FsErrorKind, FsInstanceId, FsPath,
    FsResult, MoveFlags, OpenFlags, PathRules, RootName, ViewSet,
};

use crate::attr::{self, AclEntry, AclPermissions, AttrSelector, AttrValue, BasicAttrs, Identity, ViewBundle};
use crate::config::MemFsConfig;
use crate::content::ByteStore;
use crate::entry::{lock_pair, DirSlot, EntryInner, EntryKind, EntryNode, MemEntry};
use crate::handle::MemHandle;
use crate::principals::{
    self, GroupPrincipal, PrincipalLookup, UserPrincipal,
};
use crate::registry;
use crate::tree::{self, Resolved};
use crate::watch::WatchHandle;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

struct Root {
    name: RootName,
    entry: Arc<MemEntry>,
}

/// One in-memory filesystem: roots, rules, principals, and an open flag.
///
/// Built from a [`MemFsConfig`] and usually interned in the process registry
/// under its `scheme:authority` identifier. Closing is terminal: every
/// subsequent operation through the filesystem or any handle it produced
/// fails `Closed`.
pub struct MemFs {
    identifier: String,
    instance: FsInstanceId,
    rules: Arc<PathRules>,
    views: ViewSet,
    umask: u32,
    open: Arc<AtomicBool>,
    roots: Vec<Root>,
    principals: PrincipalLookup,
    default_dir: FsPath,
    next_entry: AtomicU64,
}

impl MemFs {
    /// Build a filesystem without interning it. Most callers go through the
    /// process registry instead.
    pub fn new(identifier: impl Into<String>, config: &MemFsConfig) -> FsResult<Arc<MemFs>> {
        const OP: &str = "memfs.new";
        let identifier = identifier.into();
        let well_formed = matches!(
            identifier.split_once(':'),
            Some((scheme, authority)) if !scheme.is_empty() && !authority.is_empty()
        );
        if !well_formed {
            return Err(FsError::with_path(FsErrorKind::InvalidInput, OP, identifier));
        }

        let rules = config.build_rules()?;
        let instance = FsInstanceId(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed));
        let open = Arc::new(AtomicBool::new(true));

        let users: Vec<UserPrincipal> = config
            .user_names()
            .into_iter()
            .map(|name| UserPrincipal::new(name, instance))
            .collect();
        let groups: Vec<GroupPrincipal> = config
            .group_names()
            .into_iter()
            .map(|name| GroupPrincipal::new(name, instance))
            .collect();
        let default_user = UserPrincipal::new(config.default_user_name(), instance);
        let default_group = GroupPrincipal::new(config.default_group_name(), instance);
        let principals = PrincipalLookup::new(
            instance,
            open.clone(),
            users,
            groups,
            default_user.clone(),
            default_group.clone(),
        );

        let next_entry = AtomicU64::new(1);
        let now = FileTime::now();
        let mut roots = Vec::with_capacity(rules.roots().len());
        for name in rules.roots() {
            let raw = next_entry.fetch_add(1, Ordering::Relaxed);
            let id = EntryId::new(raw)
                .ok_or(FsError::new(FsErrorKind::InvalidConfig, OP))?;
            let views = ViewBundle::create(
                config.views(),
                &default_user,
                &default_group,
                config.umask(),
                true,
                true,
            );
            roots.push(Root {
                name: name.clone(),
                entry: MemEntry::new(id, now, views, EntryNode::empty_dir()),
            });
        }

        let default_dir = match config.default_directory() {
            Some(dir) => {
                let parsed = rules.parse(instance, dir, &[])?;
                if !parsed.is_absolute() {
                    return Err(FsError::with_path(FsErrorKind::InvalidConfig, OP, dir));
                }
                parsed.normalize()
            }
            None => FsPath::absolute(
                instance,
                rules.clone(),
                roots[0].name.clone(),
                Default::default(),
            ),
        };

        debug!(identifier = %identifier, "created in-memory filesystem");
        Ok(Arc::new(MemFs {
            identifier,
            instance,
            rules,
            views: config.views(),
            umask: config.umask(),
            open,
            roots,
            principals,
            default_dir,
            next_entry,
        }))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn separator(&self) -> char {
        self.rules.separator()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Displayable root strings, in configuration order.
    pub fn root_names(&self) -> Vec<String> {
        self.roots
            .iter()
            .map(|root| root.name.as_str().to_owned())
            .collect()
    }

    pub fn principals(&self) -> &PrincipalLookup {
        &self.principals
    }

    pub fn default_directory(&self) -> &FsPath {
        &self.default_dir
    }

    /// Close the filesystem and unregister it. Idempotent; afterwards every
    /// operation through it or its handles fails `Closed`, while existing
    /// paths stay comparable and renderable.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!(identifier = %self.identifier, "closed in-memory filesystem");
            registry::registry().unregister(self);
        }
    }

    /// Parse a path from segments joined as if by the separator.
    pub fn path(&self, first: &str, more: &[&str]) -> FsResult<FsPath> {
        self.check_open("memfs.path")?;
        self.rules.parse(self.instance, first, more)
    }

    /// A watch handle that only reports whether it is still usable; event
    /// dispatch lives outside this crate.
    pub fn new_watch(&self) -> FsResult<WatchHandle> {
        self.check_open("memfs.new_watch")?;
        Ok(WatchHandle::new(self.open.clone()))
    }

    pub(crate) fn instance(&self) -> FsInstanceId {
        self.instance
    }

    pub(crate) fn rules(&self) -> &Arc<PathRules> {
        &self.rules
    }

    pub(crate) fn fold(&self, name: &str) -> String {
        self.rules.fold(name)
    }

    /// Look up a root, returning its configured (canonical-casing) name
    /// alongside the tree.
    pub(crate) fn root_entry(&self, name: &RootName) -> Option<(RootName, Arc<MemEntry>)> {
        self.roots
            .iter()
            .find(|root| root.name == *name)
            .map(|root| (root.name.clone(), root.entry.clone()))
    }

    /// Resolve a relative path against the default directory.
    pub(crate) fn absolute(&self, path: &FsPath) -> FsResult<FsPath> {
        if path.is_absolute() {
            Ok(path.clone())
        } else {
            self.default_dir.join(path)
        }
    }

    /// The effective principal pair: thread-scoped override, else the
    /// filesystem defaults.
    pub(crate) fn identity(&self) -> Identity {
        Identity {
            user: principals::current_user()
                .unwrap_or_else(|| self.principals.default_user().clone()),
            group: principals::current_group()
                .unwrap_or_else(|| self.principals.default_group().clone()),
        }
    }

    pub(crate) fn check_inner(
        &self,
        inner: &EntryInner,
        modes: AccessMode,
        op: &'static str,
    ) -> FsResult<()> {
        inner.views.check_access(&self.identity(), modes, op)
    }

    fn check_open(&self, op: &'static str) -> FsResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(FsError::new(FsErrorKind::Closed, op))
        }
    }

    fn own_path(&self, path: &FsPath, op: &'static str) -> FsResult<()> {
        if path.filesystem() == self.instance {
            Ok(())
        } else {
            Err(FsError::with_path(
                FsErrorKind::InvalidOperation,
                op,
                path.to_string(),
            ))
        }
    }

    /// Principals written into views must come from this filesystem.
    fn own_value(&self, value: &AttrValue, op: &'static str) -> FsResult<()> {
        let foreign = |fs: FsInstanceId| fs != self.instance;
        let bad = match value {
            AttrValue::User(user) => foreign(user.filesystem()),
            AttrValue::Group(group) => foreign(group.filesystem()),
            AttrValue::Acl(entries) => entries.iter().any(|entry| match &entry.principal {
                attr::AclPrincipal::User(user) => foreign(user.filesystem()),
                attr::AclPrincipal::Group(group) => foreign(group.filesystem()),
            }),
            _ => false,
        };
        if bad {
            Err(FsError::new(FsErrorKind::InvalidOperation, op))
        } else {
            Ok(())
        }
    }

    fn next_id(&self, op: &'static str) -> FsResult<EntryId> {
        let raw = self.next_entry.fetch_add(1, Ordering::Relaxed);
        EntryId::new(raw).ok_or(FsError::new(FsErrorKind::InvalidOperation, op))
    }

    fn new_entry(
        &self,
        node: EntryNode,
        attrs: &[(&str, AttrValue)],
        now: FileTime,
        op: &'static str,
    ) -> FsResult<Arc<MemEntry>> {
        let identity = self.identity();
        let is_dir = matches!(node, EntryNode::Directory { .. });
        let views = ViewBundle::create(
            self.views,
            &identity.user,
            &identity.group,
            self.umask,
            is_dir,
            false,
        );
        let entry = MemEntry::new(self.next_id(op)?, now, views, node);
        if !attrs.is_empty() {
            let mut guard = entry.write();
            for (spec, value) in attrs {
                let (view, field) = AttrSelector::parse_single(spec, op)?;
                self.own_value(value, op)?;
                let EntryInner { times, views, .. } = &mut *guard;
                attr::set_attribute(&view, &field, value, times, views, op)?;
            }
        }
        Ok(entry)
    }

    /// Install a freshly built entry under the resolved parent. The entry is
    /// fully initialized before the parent lock is taken, so a failure leaves
    /// the tree untouched.
    fn install_new(
        &self,
        path: &FsPath,
        node: EntryNode,
        attrs: &[(&str, AttrValue)],
        op: &'static str,
    ) -> FsResult<()> {
        self.check_open(op)?;
        self.own_path(path, op)?;
        let parent = tree::resolve_parent(self, path, op)?;
        let now = FileTime::now();
        let entry = self.new_entry(node, attrs, now, op)?;

        let mut guard = parent.dir.write();
        self.check_inner(&guard, AccessMode::WRITE, op)
            .map_err(|err| FsError::with_path(err.kind(), op, parent.dir_path.to_string()))?;
        let children = guard.children_mut(op)?;
        if children.contains_key(&parent.key) {
            return Err(FsError::with_path(
                FsErrorKind::AlreadyExists,
                op,
                path.to_string(),
            ));
        }
        children.insert(
            parent.key.clone(),
            DirSlot {
                name: parent.name.clone(),
                entry,
            },
        );
        guard.touch_modified(now);
        Ok(())
    }

    pub fn create_directory(&self, path: &FsPath) -> FsResult<()> {
        self.create_directory_with(path, &[])
    }

    /// Create a directory, applying `"view:field"` attributes to the new
    /// entry before it becomes visible.
    pub fn create_directory_with(
        &self,
        path: &FsPath,
        attrs: &[(&str, AttrValue)],
    ) -> FsResult<()> {
        const OP: &str = "memfs.create_directory";
        self.install_new(path, EntryNode::empty_dir(), attrs, OP)?;
        debug!(path = %path, "created directory");
        Ok(())
    }

    pub fn create_file(&self, path: &FsPath) -> FsResult<()> {
        self.create_file_with(path, &[])
    }

    pub fn create_file_with(&self, path: &FsPath, attrs: &[(&str, AttrValue)]) -> FsResult<()> {
        const OP: &str = "memfs.create_file";
        self.install_new(path, EntryNode::file(ByteStore::new()), attrs, OP)?;
        debug!(path = %path, "created file");
        Ok(())
    }

    /// Install a symlink whose target is stored verbatim, unresolved.
    pub fn create_symlink(&self, link: &FsPath, target: &FsPath) -> FsResult<()> {
        const OP: &str = "memfs.create_symlink";
        self.own_path(target, OP)?;
        self.install_new(link, EntryNode::symlink(target.clone()), &[], OP)?;
        debug!(link = %link, target = %target, "created symlink");
        Ok(())
    }

    pub fn open(&self, path: &FsPath, flags: OpenFlags) -> FsResult<MemHandle> {
        self.open_with(path, flags, &[])
    }

    /// Open a file handle. `CREATE`/`CREATE_NEW` create a missing file under
    /// the parent-directory rules; `TRUNCATE` empties an existing file when
    /// the handle is writable.
    pub fn open_with(
        &self,
        path: &FsPath,
        flags: OpenFlags,
        attrs: &[(&str, AttrValue)],
    ) -> FsResult<MemHandle> {
        const OP: &str = "memfs.open";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let create = flags.intersects(OpenFlags::CREATE | OpenFlags::CREATE_NEW);
        let follow = !flags.contains(OpenFlags::NOFOLLOW);
        let mut just_created = false;

        loop {
            match tree::resolve(self, path, follow, OP) {
                Ok(resolved) => {
                    if flags.contains(OpenFlags::CREATE_NEW) && !just_created {
                        return Err(FsError::with_path(
                            FsErrorKind::AlreadyExists,
                            OP,
                            path.to_string(),
                        ));
                    }
                    return self.open_resolved(resolved, path, flags, OP);
                }
                Err(err) if err.kind() == FsErrorKind::NotFound && create => {
                    match self.install_new(path, EntryNode::file(ByteStore::new()), attrs, OP) {
                        Ok(()) => {
                            just_created = true;
                            debug!(path = %path, "created file on open");
                        }
                        // Lost the creation race; reopen the winner unless
                        // exclusivity was requested.
                        Err(race)
                            if race.kind() == FsErrorKind::AlreadyExists
                                && !flags.contains(OpenFlags::CREATE_NEW) => {}
                        Err(race) => return Err(race),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn open_resolved(
        &self,
        resolved: Resolved,
        path: &FsPath,
        flags: OpenFlags,
        op: &'static str,
    ) -> FsResult<MemHandle> {
        match resolved.entry.kind() {
            EntryKind::Directory => {
                return Err(FsError::with_path(FsErrorKind::IsDir, op, path.to_string()));
            }
            // Only reachable with NOFOLLOW on the final component.
            EntryKind::Symlink => {
                return Err(FsError::with_path(
                    FsErrorKind::TooManySymlinks,
                    op,
                    path.to_string(),
                ));
            }
            EntryKind::File => {}
        }

        let mut modes = AccessMode::empty();
        if flags.readable() {
            modes |= AccessMode::READ;
        }
        if flags.writable() {
            modes |= AccessMode::WRITE;
        }
        {
            let guard = resolved.entry.read();
            self.check_inner(&guard, modes, op)
                .map_err(|err| FsError::with_path(err.kind(), op, path.to_string()))?;
        }
        if flags.contains(OpenFlags::TRUNCATE) && flags.writable() {
            let mut guard = resolved.entry.write();
            guard.content_mut(op)?.clear();
            guard.touch_modified(FileTime::now());
        }
        Ok(MemHandle::new(resolved.entry, self.open.clone(), flags))
    }

    /// Remove the entry (a symlink is removed, not followed). Open handles on
    /// a removed file keep its content alive.
    pub fn delete(&self, path: &FsPath) -> FsResult<()> {
        const OP: &str = "memfs.delete";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let resolved = tree::resolve(self, path, false, OP)?;
        let (parent, key) = match (resolved.parent, resolved.key) {
            (Some(parent), Some(key)) => (parent, key),
            _ => {
                return Err(FsError::with_path(
                    FsErrorKind::InvalidOperation,
                    OP,
                    path.to_string(),
                ));
            }
        };

        let now = FileTime::now();
        let (mut parent_guard, child_guard) = lock_pair(&parent, &resolved.entry);
        self.check_inner(&parent_guard, AccessMode::WRITE, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;

        // The entry may have been moved or replaced since resolution.
        match parent_guard.children(OP)?.get(&key) {
            Some(slot) if Arc::ptr_eq(&slot.entry, &resolved.entry) => {}
            _ => {
                return Err(FsError::with_path(
                    FsErrorKind::NotFound,
                    OP,
                    path.to_string(),
                ));
            }
        }
        if resolved.entry.is_dir() {
            let empty = match &child_guard {
                Some(guard) => guard.children(OP)?.is_empty(),
                None => true,
            };
            if !empty {
                return Err(FsError::with_path(
                    FsErrorKind::DirNotEmpty,
                    OP,
                    path.to_string(),
                ));
            }
        }
        parent_guard.children_mut(OP)?.remove(&key);
        parent_guard.touch_modified(now);
        debug!(path = %path, "deleted entry");
        Ok(())
    }

    /// Check whether the target slot can be filled, removing a replaceable
    /// occupant. `Ok(false)` asks the caller to back off and retry: the
    /// occupant's lock was contended and taking it out of id order could
    /// deadlock.
    fn prepare_target(
        &self,
        dst: &mut EntryInner,
        key: &str,
        target: &FsPath,
        replace: bool,
        op: &'static str,
    ) -> FsResult<bool> {
        let Some(existing) = dst.children(op)?.get(key) else {
            return Ok(true);
        };
        if !replace {
            return Err(FsError::with_path(
                FsErrorKind::AlreadyExists,
                op,
                target.to_string(),
            ));
        }
        if existing.entry.is_dir() {
            let Some(guard) = existing.entry.try_read() else {
                return Ok(false);
            };
            if !guard.children(op)?.is_empty() {
                return Err(FsError::with_path(
                    FsErrorKind::DirNotEmpty,
                    op,
                    target.to_string(),
                ));
            }
        }
        dst.children_mut(op)?.remove(key);
        Ok(true)
    }

    /// Move `source` to `target`, atomically relinking under both parents'
    /// write locks (taken in entry-id order).
    pub fn move_entry(&self, source: &FsPath, target: &FsPath, flags: MoveFlags) -> FsResult<()> {
        const OP: &str = "memfs.move";
        self.check_open(OP)?;
        self.own_path(source, OP)?;
        self.own_path(target, OP)?;

        let src = tree::resolve(self, source, false, OP)?;
        let (src_parent, src_key) = match (src.parent, src.key) {
            (Some(parent), Some(key)) => (parent, key),
            _ => {
                return Err(FsError::with_path(
                    FsErrorKind::InvalidOperation,
                    OP,
                    source.to_string(),
                ));
            }
        };
        let dst_parent = tree::resolve_parent(self, target, OP)?;

        if src.entry.is_dir() && dst_parent.dir_path.starts_with(&src.path) {
            return Err(FsError::with_path(
                FsErrorKind::InvalidOperation,
                OP,
                target.to_string(),
            ));
        }
        if Arc::ptr_eq(&src_parent, &dst_parent.dir) && src_key == dst_parent.key {
            return Ok(());
        }

        let replace = flags.contains(MoveFlags::REPLACE_EXISTING);
        let now = FileTime::now();
        loop {
            let (mut src_guard, dst_guard) = lock_pair(&src_parent, &dst_parent.dir);
            let ready = match dst_guard {
                Some(mut dst_guard) => {
                    self.check_inner(&src_guard, AccessMode::WRITE, OP)
                        .map_err(|err| FsError::with_path(err.kind(), OP, source.to_string()))?;
                    self.check_inner(&dst_guard, AccessMode::WRITE, OP)
                        .map_err(|err| FsError::with_path(err.kind(), OP, target.to_string()))?;
                    self.verify_slot(&src_guard, &src_key, &src.entry, source, OP)?;
                    if !self.prepare_target(&mut dst_guard, &dst_parent.key, target, replace, OP)? {
                        false
                    } else {
                        let slot = src_guard
                            .children_mut(OP)?
                            .remove(&src_key)
                            .ok_or_else(|| {
                                FsError::with_path(FsErrorKind::NotFound, OP, source.to_string())
                            })?;
                        dst_guard.children_mut(OP)?.insert(
                            dst_parent.key.clone(),
                            DirSlot {
                                name: dst_parent.name.clone(),
                                entry: slot.entry,
                            },
                        );
                        src_guard.touch_modified(now);
                        dst_guard.touch_modified(now);
                        true
                    }
                }
                None => {
                    // Rename within one directory: a single guard covers both
                    // roles.
                    self.check_inner(&src_guard, AccessMode::WRITE, OP)
                        .map_err(|err| FsError::with_path(err.kind(), OP, source.to_string()))?;
                    self.verify_slot(&src_guard, &src_key, &src.entry, source, OP)?;
                    if !self.prepare_target(&mut src_guard, &dst_parent.key, target, replace, OP)? {
                        false
                    } else {
                        let slot = src_guard
                            .children_mut(OP)?
                            .remove(&src_key)
                            .ok_or_else(|| {
                                FsError::with_path(FsErrorKind::NotFound, OP, source.to_string())
                            })?;
                        src_guard.children_mut(OP)?.insert(
                            dst_parent.key.clone(),
                            DirSlot {
                                name: dst_parent.name.clone(),
                                entry: slot.entry,
                            },
                        );
                        src_guard.touch_modified(now);
                        true
                    }
                }
            };
            if ready {
                debug!(source = %source, target = %target, "moved entry");
                return Ok(());
            }
            std::thread::yield_now();
        }
    }

    fn verify_slot(
        &self,
        guard: &EntryInner,
        key: &str,
        expected: &Arc<MemEntry>,
        path: &FsPath,
        op: &'static str,
    ) -> FsResult<()> {
        match guard.children(op)?.get(key) {
            Some(slot) if Arc::ptr_eq(&slot.entry, expected) => Ok(()),
            _ => Err(FsError::with_path(
                FsErrorKind::NotFound,
                op,
                path.to_string(),
            )),
        }
    }

    /// Copy `source` to `target`. Directories copy shallowly (a fresh empty
    /// directory); `COPY_ATTRIBUTES` carries the basic times and every view
    /// present on both sides field-by-field.
    pub fn copy_entry(&self, source: &FsPath, target: &FsPath, flags: CopyFlags) -> FsResult<()> {
        const OP: &str = "memfs.copy";
        self.check_open(OP)?;
        self.own_path(source, OP)?;
        self.own_path(target, OP)?;

        let src = tree::resolve(self, source, true, OP)?;
        let (node, src_views, src_times) = {
            let guard = src.entry.read();
            self.check_inner(&guard, AccessMode::READ, OP)
                .map_err(|err| FsError::with_path(err.kind(), OP, source.to_string()))?;
            let node = match &guard.node {
                EntryNode::Directory { .. } => EntryNode::empty_dir(),
                EntryNode::File { content } => EntryNode::file(content.clone()),
                EntryNode::Symlink { target } => EntryNode::symlink(target.clone()),
            };
            (node, guard.views.clone(), guard.times)
        };

        let dst_parent = tree::resolve_parent(self, target, OP)?;
        let target_real = match dst_parent.dir_path.join_str(&dst_parent.name) {
            Ok(path) => path,
            Err(err) => return Err(err),
        };
        if target_real == src.path {
            return Ok(());
        }

        let now = FileTime::now();
        let entry = self.new_entry(node, &[], now, OP)?;
        if flags.contains(CopyFlags::COPY_ATTRIBUTES) {
            let mut guard = entry.write();
            guard.times = src_times;
            guard.views.copy_from(&src_views);
        }

        let replace = flags.contains(CopyFlags::REPLACE_EXISTING);
        loop {
            let mut dst_guard = dst_parent.dir.write();
            self.check_inner(&dst_guard, AccessMode::WRITE, OP)
                .map_err(|err| FsError::with_path(err.kind(), OP, target.to_string()))?;
            if self.prepare_target(&mut dst_guard, &dst_parent.key, target, replace, OP)? {
                dst_guard.children_mut(OP)?.insert(
                    dst_parent.key.clone(),
                    DirSlot {
                        name: dst_parent.name.clone(),
                        entry: entry.clone(),
                    },
                );
                dst_guard.touch_modified(now);
                debug!(source = %source, target = %target, "copied entry");
                return Ok(());
            }
            drop(dst_guard);
            std::thread::yield_now();
        }
    }

    pub fn list_directory(&self, path: &FsPath) -> FsResult<Vec<FsPath>> {
        self.list_directory_with(path, |_| true)
    }

    /// Snapshot the directory's entries, then filter. The returned list is
    /// stable against later tree mutation.
    pub fn list_directory_with(
        &self,
        path: &FsPath,
        mut filter: impl FnMut(&FsPath) -> bool,
    ) -> FsResult<Vec<FsPath>> {
        const OP: &str = "memfs.list_directory";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let resolved = tree::resolve(self, path, true, OP)?;
        let names: Vec<String> = {
            let guard = resolved.entry.read();
            self.check_inner(&guard, AccessMode::READ, OP)
                .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
            guard
                .children(OP)
                .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?
                .values()
                .map(|slot| slot.name.clone())
                .collect()
        };
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let child = path.join_str(&name)?;
            if filter(&child) {
                out.push(child);
            }
        }
        Ok(out)
    }

    /// Read the attributes a `"view:field,field"` selector names. Unknown
    /// fields are silently skipped.
    pub fn read_attributes(
        &self,
        path: &FsPath,
        spec: &str,
    ) -> FsResult<BTreeMap<String, AttrValue>> {
        const OP: &str = "memfs.read_attributes";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let selector = AttrSelector::parse(spec, OP)?;
        let resolved = tree::resolve(self, path, true, OP)?;
        let guard = resolved.entry.read();
        self.check_inner(&guard, AccessMode::READ, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        let basic = self.basic_attrs(&resolved, &guard);
        attr::read_attributes(&selector, &basic, &guard.views, OP)
    }

    fn basic_attrs(&self, resolved: &Resolved, guard: &EntryInner) -> BasicAttrs {
        BasicAttrs {
            created: guard.times.created,
            accessed: guard.times.accessed,
            modified: guard.times.modified,
            size: guard.size(),
            is_file: resolved.entry.kind() == EntryKind::File,
            is_dir: resolved.entry.kind() == EntryKind::Directory,
            is_symlink: resolved.entry.kind() == EntryKind::Symlink,
        }
    }

    /// Write one `"view:field"` attribute. Unknown fields fail
    /// `InvalidInput`. DOS flags are settable without a `WRITE` check
    /// (platform-accurate); everything else requires `WRITE`.
    pub fn set_attribute(&self, path: &FsPath, spec: &str, value: AttrValue) -> FsResult<()> {
        const OP: &str = "memfs.set_attribute";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let (view, field) = AttrSelector::parse_single(spec, OP)?;
        self.own_value(&value, OP)?;
        let resolved = tree::resolve(self, path, true, OP)?;
        let mut guard = resolved.entry.write();
        if view != attr::VIEW_DOS {
            self.check_inner(&guard, AccessMode::WRITE, OP)
                .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        }
        let EntryInner { times, views, .. } = &mut *guard;
        attr::set_attribute(&view, &field, &value, times, views, OP)
    }

    /// Set any of the basic-view timestamps; `None` leaves a field alone.
    pub fn set_times(
        &self,
        path: &FsPath,
        modified: Option<FileTime>,
        accessed: Option<FileTime>,
        created: Option<FileTime>,
    ) -> FsResult<()> {
        const OP: &str = "memfs.set_times";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let resolved = tree::resolve(self, path, true, OP)?;
        let mut guard = resolved.entry.write();
        self.check_inner(&guard, AccessMode::WRITE, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        if let Some(time) = modified {
            guard.times.modified = time;
        }
        if let Some(time) = accessed {
            guard.times.accessed = time;
        }
        if let Some(time) = created {
            guard.times.created = time;
        }
        Ok(())
    }

    /// Set the 9-bit POSIX permission mask.
    pub fn set_permissions(&self, path: &FsPath, mode: u32) -> FsResult<()> {
        self.set_attribute(path, "posix:permissions", AttrValue::Mode(mode))
    }

    pub fn owner(&self, path: &FsPath) -> FsResult<UserPrincipal> {
        const OP: &str = "memfs.owner";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let resolved = tree::resolve(self, path, true, OP)?;
        let guard = resolved.entry.read();
        self.check_inner(&guard, AccessMode::READ, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        guard
            .views
            .owner()
            .cloned()
            .ok_or(FsError::new(FsErrorKind::NotSupported, OP))
    }

    pub fn set_owner(&self, path: &FsPath, owner: UserPrincipal) -> FsResult<()> {
        self.set_attribute(path, "owner:owner", AttrValue::User(owner))
    }

    pub fn set_group(&self, path: &FsPath, group: GroupPrincipal) -> FsResult<()> {
        self.set_attribute(path, "posix:group", AttrValue::Group(group))
    }

    /// Read the ACL; requires `READ_ACL` under the ACL's own scan.
    pub fn acl(&self, path: &FsPath) -> FsResult<Vec<AclEntry>> {
        const OP: &str = "memfs.acl";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let resolved = tree::resolve(self, path, true, OP)?;
        let guard = resolved.entry.read();
        let Some(acl) = &guard.views.acl else {
            return Err(FsError::new(FsErrorKind::NotSupported, OP));
        };
        acl.check(&self.identity(), AclPermissions::READ_ACL, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        Ok(acl.entries.clone())
    }

    /// Replace the ACL; requires `WRITE_ACL` under the current ACL's scan.
    pub fn set_acl(&self, path: &FsPath, entries: Vec<AclEntry>) -> FsResult<()> {
        const OP: &str = "memfs.set_acl";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        self.own_value(&AttrValue::Acl(entries.clone()), OP)?;
        let resolved = tree::resolve(self, path, true, OP)?;
        let mut guard = resolved.entry.write();
        let Some(acl) = &mut guard.views.acl else {
            return Err(FsError::new(FsErrorKind::NotSupported, OP));
        };
        acl.check(&self.identity(), AclPermissions::WRITE_ACL, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        acl.entries = entries;
        Ok(())
    }

    pub fn list_user_attributes(&self, path: &FsPath) -> FsResult<Vec<String>> {
        const OP: &str = "memfs.user_attributes";
        let resolved = self.user_view_target(path, OP)?;
        let guard = resolved.entry.read();
        self.check_inner(&guard, AccessMode::READ, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        let user = guard
            .views
            .user
            .as_ref()
            .ok_or(FsError::new(FsErrorKind::NotSupported, OP))?;
        Ok(user.list())
    }

    pub fn user_attribute_size(&self, path: &FsPath, name: &str) -> FsResult<usize> {
        const OP: &str = "memfs.user_attribute_size";
        let resolved = self.user_view_target(path, OP)?;
        let guard = resolved.entry.read();
        self.check_inner(&guard, AccessMode::READ, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        let user = guard
            .views
            .user
            .as_ref()
            .ok_or(FsError::new(FsErrorKind::NotSupported, OP))?;
        user.size(name)
    }

    /// Copy a user-defined attribute value into `buf`; fails
    /// `BufferTooSmall` when it does not fit.
    pub fn read_user_attribute(
        &self,
        path: &FsPath,
        name: &str,
        buf: &mut [u8],
    ) -> FsResult<usize> {
        const OP: &str = "memfs.read_user_attribute";
        let resolved = self.user_view_target(path, OP)?;
        let guard = resolved.entry.read();
        self.check_inner(&guard, AccessMode::READ, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        let user = guard
            .views
            .user
            .as_ref()
            .ok_or(FsError::new(FsErrorKind::NotSupported, OP))?;
        user.read(name, buf)
    }

    pub fn write_user_attribute(&self, path: &FsPath, name: &str, value: &[u8]) -> FsResult<()> {
        const OP: &str = "memfs.write_user_attribute";
        let resolved = self.user_view_target(path, OP)?;
        let mut guard = resolved.entry.write();
        self.check_inner(&guard, AccessMode::WRITE, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        let user = guard
            .views
            .user
            .as_mut()
            .ok_or(FsError::new(FsErrorKind::NotSupported, OP))?;
        user.write(name, value);
        Ok(())
    }

    pub fn delete_user_attribute(&self, path: &FsPath, name: &str) -> FsResult<()> {
        const OP: &str = "memfs.delete_user_attribute";
        let resolved = self.user_view_target(path, OP)?;
        let mut guard = resolved.entry.write();
        self.check_inner(&guard, AccessMode::WRITE, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))?;
        let user = guard
            .views
            .user
            .as_mut()
            .ok_or(FsError::new(FsErrorKind::NotSupported, OP))?;
        user.delete(name);
        Ok(())
    }

    fn user_view_target(&self, path: &FsPath, op: &'static str) -> FsResult<Resolved> {
        self.check_open(op)?;
        self.own_path(path, op)?;
        tree::resolve(self, path, true, op)
    }

    /// Conjunction of every access-check-capable view on the entry.
    pub fn check_access(&self, path: &FsPath, modes: AccessMode) -> FsResult<()> {
        const OP: &str = "memfs.check_access";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let resolved = tree::resolve(self, path, true, OP)?;
        let guard = resolved.entry.read();
        self.check_inner(&guard, modes, OP)
            .map_err(|err| FsError::with_path(err.kind(), OP, path.to_string()))
    }

    pub fn exists(&self, path: &FsPath) -> bool {
        self.is_open()
            && path.filesystem() == self.instance
            && tree::resolve(self, path, true, "memfs.exists").is_ok()
    }

    pub fn is_regular_file(&self, path: &FsPath) -> bool {
        self.entry_kind(path, true) == Some(EntryKind::File)
    }

    pub fn is_directory(&self, path: &FsPath) -> bool {
        self.entry_kind(path, true) == Some(EntryKind::Directory)
    }

    /// Whether the path names a symlink itself (the final component is not
    /// followed).
    pub fn is_symlink(&self, path: &FsPath) -> bool {
        self.entry_kind(path, false) == Some(EntryKind::Symlink)
    }

    fn entry_kind(&self, path: &FsPath, follow: bool) -> Option<EntryKind> {
        if !self.is_open() || path.filesystem() != self.instance {
            return None;
        }
        tree::resolve(self, path, follow, "memfs.entry_kind")
            .ok()
            .map(|resolved| resolved.entry.kind())
    }

    /// The stored symlink target, verbatim.
    pub fn read_symlink(&self, path: &FsPath) -> FsResult<FsPath> {
        const OP: &str = "memfs.read_symlink";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        let resolved = tree::resolve(self, path, false, OP)?;
        let guard = resolved.entry.read();
        match guard.symlink_target(OP) {
            Ok(target) => Ok(target.clone()),
            Err(err) => Err(FsError::with_path(err.kind(), OP, path.to_string())),
        }
    }

    /// Fully resolved absolute path: symlinks followed (budget 40), case as
    /// stored in the tree.
    pub fn to_real_path(&self, path: &FsPath) -> FsResult<FsPath> {
        const OP: &str = "memfs.to_real_path";
        self.check_open(OP)?;
        self.own_path(path, OP)?;
        Ok(tree::resolve(self, path, true, OP)?.path)
    }
}

impl std::fmt::Debug for MemFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemFs")
            .field("identifier", &self.identifier)
            .field("instance", &self.instance)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

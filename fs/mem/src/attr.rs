//! Per-entry attribute views and their access-check contributions.
//!
//! Every entry carries the always-present basic view (its timestamps, size,
//! and type, stored on the entry itself) plus an optional bundle chosen at
//! creation from the filesystem's configured set. Lookup is by canonical view
//! name; an `owner` request resolves to `posix` when present, else `acl`.

use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;

use memfs_core::{AccessMode, FileTime, FsError, FsErrorKind, FsResult, ViewSet};

use crate::entry::Times;
use crate::principals::{GroupPrincipal, UserPrincipal};

pub(crate) const VIEW_BASIC: &str = "basic";
pub(crate) const VIEW_POSIX: &str = "posix";
pub(crate) const VIEW_DOS: &str = "dos";
pub(crate) const VIEW_ACL: &str = "acl";
pub(crate) const VIEW_OWNER: &str = "owner";
pub(crate) const VIEW_USER: &str = "user";

/// The effective principal pair an access check runs as.
#[derive(Clone, Debug)]
pub(crate) struct Identity {
    pub user: UserPrincipal,
    pub group: GroupPrincipal,
}

bitflags! {
    /// Permissions named by ACL entries.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AclPermissions: u32 {
        const READ_DATA = 1 << 0;
        const WRITE_DATA = 1 << 1;
        const EXECUTE = 1 << 2;
        const READ_ACL = 1 << 3;
        const WRITE_ACL = 1 << 4;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AclKind {
    Allow,
    Deny,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AclPrincipal {
    User(UserPrincipal),
    Group(GroupPrincipal),
}

/// One ordered ACL entry: `(principal, permissions, type)`.
#[derive(Clone, Debug, PartialEq)]
pub struct AclEntry {
    pub principal: AclPrincipal,
    pub kind: AclKind,
    pub permissions: AclPermissions,
}

impl AclEntry {
    fn matches(&self, identity: &Identity) -> bool {
        match &self.principal {
            AclPrincipal::User(user) => *user == identity.user,
            AclPrincipal::Group(group) => *group == identity.group,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PosixView {
    pub owner: UserPrincipal,
    pub group: GroupPrincipal,
    /// 9-bit rwxrwxrwx mask.
    pub mode: u32,
}

impl PosixView {
    fn check(&self, identity: &Identity, mode: AccessMode, op: &'static str) -> FsResult<()> {
        let shift = if identity.user == self.owner {
            6
        } else if identity.group == self.group {
            3
        } else {
            0
        };
        let bit = if mode == AccessMode::READ {
            0o4
        } else if mode == AccessMode::WRITE {
            0o2
        } else if mode == AccessMode::EXECUTE {
            0o1
        } else {
            return Err(FsError::new(FsErrorKind::NotSupported, op));
        };
        if (self.mode >> shift) & bit == 0 {
            return Err(FsError::new(FsErrorKind::PermissionDenied, op));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DosView {
    pub read_only: bool,
    pub hidden: bool,
    pub system: bool,
    pub archive: bool,
}

impl DosView {
    fn check(&self, mode: AccessMode, op: &'static str) -> FsResult<()> {
        if mode == AccessMode::WRITE && self.read_only {
            return Err(FsError::new(FsErrorKind::PermissionDenied, op));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct AclView {
    pub owner: UserPrincipal,
    pub entries: Vec<AclEntry>,
}

impl AclView {
    /// Ordered scan: the first matching entry that names the permission
    /// decides. No matching entry grants.
    pub(crate) fn check(
        &self,
        identity: &Identity,
        permission: AclPermissions,
        op: &'static str,
    ) -> FsResult<()> {
        for entry in &self.entries {
            if entry.matches(identity) && entry.permissions.contains(permission) {
                return match entry.kind {
                    AclKind::Allow => Ok(()),
                    AclKind::Deny => Err(FsError::new(FsErrorKind::PermissionDenied, op)),
                };
            }
        }
        Ok(())
    }

    fn check_mode(&self, identity: &Identity, mode: AccessMode, op: &'static str) -> FsResult<()> {
        let permission = if mode == AccessMode::READ {
            AclPermissions::READ_DATA
        } else if mode == AccessMode::WRITE {
            AclPermissions::WRITE_DATA
        } else if mode == AccessMode::EXECUTE {
            AclPermissions::EXECUTE
        } else {
            return Err(FsError::new(FsErrorKind::NotSupported, op));
        };
        self.check(identity, permission, op)
    }
}

/// User-defined extended attributes. The map allocates on first write to keep
/// per-entry overhead minimal.
#[derive(Clone, Debug, Default)]
pub(crate) struct UserView {
    values: Option<HashMap<String, Vec<u8>>>,
}

impl UserView {
    pub(crate) fn list(&self) -> Vec<String> {
        match &self.values {
            Some(values) => values.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    fn value(&self, name: &str, op: &'static str) -> FsResult<&Vec<u8>> {
        self.values
            .as_ref()
            .and_then(|values| values.get(name))
            .ok_or_else(|| FsError::with_path(FsErrorKind::NotFound, op, name))
    }

    pub(crate) fn size(&self, name: &str) -> FsResult<usize> {
        Ok(self.value(name, "attr.user_size")?.len())
    }

    /// Copy the stored value into `buf`; fails `BufferTooSmall` when the
    /// buffer cannot hold the whole value.
    pub(crate) fn read(&self, name: &str, buf: &mut [u8]) -> FsResult<usize> {
        const OP: &str = "attr.user_read";
        let value = self.value(name, OP)?;
        if buf.len() < value.len() {
            return Err(FsError::with_path(FsErrorKind::BufferTooSmall, OP, name));
        }
        buf[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    pub(crate) fn write(&mut self, name: &str, value: &[u8]) {
        self.values
            .get_or_insert_with(HashMap::new)
            .insert(name.to_owned(), value.to_vec());
    }

    pub(crate) fn delete(&mut self, name: &str) {
        if let Some(values) = &mut self.values {
            values.remove(name);
        }
    }
}

/// The optional views of one entry.
#[derive(Clone, Debug, Default)]
pub(crate) struct ViewBundle {
    pub posix: Option<PosixView>,
    pub dos: Option<DosView>,
    pub acl: Option<AclView>,
    pub user: Option<UserView>,
}

impl ViewBundle {
    /// Build the bundle for a fresh entry from the filesystem's configured
    /// view set. Directories get the execute bits OR-ed into the mask so
    /// traversal stays possible; root entries start DOS-hidden and
    /// DOS-system.
    pub(crate) fn create(
        views: ViewSet,
        owner: &UserPrincipal,
        group: &GroupPrincipal,
        umask: u32,
        is_dir: bool,
        is_root: bool,
    ) -> Self {
        let posix = views.contains(ViewSet::POSIX).then(|| PosixView {
            owner: owner.clone(),
            group: group.clone(),
            mode: if is_dir { umask | 0o111 } else { umask },
        });
        let dos = views.contains(ViewSet::DOS).then(|| DosView {
            hidden: is_root,
            system: is_root,
            ..DosView::default()
        });
        let acl = views.contains(ViewSet::ACL).then(|| AclView {
            owner: owner.clone(),
            entries: Vec::new(),
        });
        let user = views.contains(ViewSet::USER).then(UserView::default);
        Self {
            posix,
            dos,
            acl,
            user,
        }
    }

    /// Conjunction of every access-check-capable view. The basic view always
    /// grants and contributes nothing. Modes outside read/write/execute are
    /// `NotSupported`.
    pub(crate) fn check_access(
        &self,
        identity: &Identity,
        modes: AccessMode,
        op: &'static str,
    ) -> FsResult<()> {
        if modes.bits() & !AccessMode::all().bits() != 0 {
            return Err(FsError::new(FsErrorKind::NotSupported, op));
        }
        for mode in [AccessMode::READ, AccessMode::WRITE, AccessMode::EXECUTE] {
            if !modes.contains(mode) {
                continue;
            }
            if let Some(dos) = &self.dos {
                dos.check(mode, op)?;
            }
            if let Some(posix) = &self.posix {
                posix.check(identity, mode, op)?;
            }
            if let Some(acl) = &self.acl {
                acl.check_mode(identity, mode, op)?;
            }
        }
        Ok(())
    }

    /// Owner per Table 1: `posix` takes precedence over `acl`.
    pub(crate) fn owner(&self) -> Option<&UserPrincipal> {
        self.posix
            .as_ref()
            .map(|posix| &posix.owner)
            .or_else(|| self.acl.as_ref().map(|acl| &acl.owner))
    }

    pub(crate) fn set_owner(&mut self, owner: UserPrincipal, op: &'static str) -> FsResult<()> {
        if let Some(posix) = &mut self.posix {
            posix.owner = owner;
            return Ok(());
        }
        if let Some(acl) = &mut self.acl {
            acl.owner = owner;
            return Ok(());
        }
        Err(FsError::new(FsErrorKind::NotSupported, op))
    }

    /// Field-by-field copy of every view present on both sides, for
    /// `COPY_ATTRIBUTES`.
    pub(crate) fn copy_from(&mut self, source: &ViewBundle) {
        if let (Some(dst), Some(src)) = (&mut self.posix, &source.posix) {
            dst.group = src.group.clone();
            dst.mode = src.mode;
        }
        if let (Some(dst), Some(src)) = (&mut self.dos, &source.dos) {
            *dst = src.clone();
        }
        if let (Some(dst), Some(src)) = (&mut self.acl, &source.acl) {
            dst.entries = src.entries.clone();
        }
        if let (Some(dst), Some(src)) = (&mut self.user, &source.user) {
            *dst = src.clone();
        }
    }
}

/// A parsed `"view:field,field"` attribute selector.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AttrSelector {
    pub view: String,
    pub fields: Vec<String>,
    pub all: bool,
}

impl AttrSelector {
    /// Parse a read selector. A missing view prefix means `basic`; `*`
    /// selects every field of the view.
    pub(crate) fn parse(spec: &str, op: &'static str) -> FsResult<Self> {
        let (view, rest) = match spec.split_once(':') {
            Some((view, rest)) => (view, rest),
            None => (VIEW_BASIC, spec),
        };
        if view.is_empty() || rest.is_empty() {
            return Err(FsError::with_path(FsErrorKind::InvalidInput, op, spec));
        }
        let mut fields = Vec::new();
        let mut all = false;
        for field in rest.split(',') {
            let field = field.trim();
            if field.is_empty() {
                return Err(FsError::with_path(FsErrorKind::InvalidInput, op, spec));
            }
            if field == "*" {
                all = true;
            } else {
                fields.push(field.to_owned());
            }
        }
        Ok(Self {
            view: view.to_owned(),
            fields,
            all,
        })
    }

    /// Parse a single-field write selector.
    pub(crate) fn parse_single(spec: &str, op: &'static str) -> FsResult<(String, String)> {
        let selector = Self::parse(spec, op)?;
        if selector.all || selector.fields.len() != 1 {
            return Err(FsError::with_path(FsErrorKind::InvalidInput, op, spec));
        }
        let mut fields = selector.fields;
        Ok((selector.view, fields.pop().expect("one field")))
    }

    fn wants(&self, field: &str) -> bool {
        self.all || self.fields.iter().any(|f| f == field)
    }
}

/// A single attribute value, typed per field.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Size(u64),
    Time(FileTime),
    /// 9-bit permission mask.
    Mode(u32),
    User(UserPrincipal),
    Group(GroupPrincipal),
    Bytes(Vec<u8>),
    Acl(Vec<AclEntry>),
}

/// Snapshot of the always-present basic view.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BasicAttrs {
    pub created: FileTime,
    pub accessed: FileTime,
    pub modified: FileTime,
    pub size: u64,
    pub is_file: bool,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl BasicAttrs {
    fn fill(&self, selector: &AttrSelector, out: &mut BTreeMap<String, AttrValue>) {
        let fields: [(&str, AttrValue); 7] = [
            ("lastModifiedTime", AttrValue::Time(self.modified)),
            ("lastAccessTime", AttrValue::Time(self.accessed)),
            ("creationTime", AttrValue::Time(self.created)),
            ("size", AttrValue::Size(self.size)),
            ("isRegularFile", AttrValue::Bool(self.is_file)),
            ("isDirectory", AttrValue::Bool(self.is_dir)),
            ("isSymbolicLink", AttrValue::Bool(self.is_symlink)),
        ];
        for (name, value) in fields {
            if selector.wants(name) {
                out.insert(name.to_owned(), value);
            }
        }
    }
}

/// Read the attributes a selector names. Unknown fields are silently
/// skipped; an unconfigured view fails `NotSupported`.
pub(crate) fn read_attributes(
    selector: &AttrSelector,
    basic: &BasicAttrs,
    bundle: &ViewBundle,
    op: &'static str,
) -> FsResult<BTreeMap<String, AttrValue>> {
    let mut out = BTreeMap::new();
    match selector.view.as_str() {
        VIEW_BASIC => basic.fill(selector, &mut out),
        VIEW_POSIX => {
            let posix = bundle
                .posix
                .as_ref()
                .ok_or(FsError::new(FsErrorKind::NotSupported, op))?;
            basic.fill(selector, &mut out);
            if selector.wants("owner") {
                out.insert("owner".to_owned(), AttrValue::User(posix.owner.clone()));
            }
            if selector.wants("group") {
                out.insert("group".to_owned(), AttrValue::Group(posix.group.clone()));
            }
            if selector.wants("permissions") {
                out.insert("permissions".to_owned(), AttrValue::Mode(posix.mode));
            }
        }
        VIEW_DOS => {
            let dos = bundle
                .dos
                .as_ref()
                .ok_or(FsError::new(FsErrorKind::NotSupported, op))?;
            basic.fill(selector, &mut out);
            let fields: [(&str, bool); 4] = [
                ("readonly", dos.read_only),
                ("hidden", dos.hidden),
                ("system", dos.system),
                ("archive", dos.archive),
            ];
            for (name, value) in fields {
                if selector.wants(name) {
                    out.insert(name.to_owned(), AttrValue::Bool(value));
                }
            }
        }
        VIEW_ACL => {
            let acl = bundle
                .acl
                .as_ref()
                .ok_or(FsError::new(FsErrorKind::NotSupported, op))?;
            if selector.wants("owner") {
                out.insert("owner".to_owned(), AttrValue::User(acl.owner.clone()));
            }
            if selector.wants("acl") {
                out.insert("acl".to_owned(), AttrValue::Acl(acl.entries.clone()));
            }
        }
        VIEW_OWNER => {
            let owner = bundle
                .owner()
                .ok_or(FsError::new(FsErrorKind::NotSupported, op))?;
            if selector.wants("owner") {
                out.insert("owner".to_owned(), AttrValue::User(owner.clone()));
            }
        }
        VIEW_USER => {
            let user = bundle
                .user
                .as_ref()
                .ok_or(FsError::new(FsErrorKind::NotSupported, op))?;
            for name in user.list() {
                if selector.wants(&name) {
                    let mut buf = vec![0u8; user.size(&name)?];
                    user.read(&name, &mut buf)?;
                    out.insert(name, AttrValue::Bytes(buf));
                }
            }
        }
        _ => return Err(FsError::new(FsErrorKind::NotSupported, op)),
    }
    Ok(out)
}

/// Write one attribute. Unknown fields fail `InvalidInput`; an unconfigured
/// view fails `NotSupported`; a value of the wrong type fails
/// `InvalidInput`.
pub(crate) fn set_attribute(
    view: &str,
    field: &str,
    value: &AttrValue,
    times: &mut Times,
    bundle: &mut ViewBundle,
    op: &'static str,
) -> FsResult<()> {
    let invalid = || FsError::with_path(FsErrorKind::InvalidInput, op, field);
    match view {
        VIEW_BASIC => {
            let AttrValue::Time(time) = value else {
                return Err(invalid());
            };
            match field {
                "lastModifiedTime" => times.modified = *time,
                "lastAccessTime" => times.accessed = *time,
                "creationTime" => times.created = *time,
                _ => return Err(invalid()),
            }
        }
        VIEW_POSIX => {
            let posix = bundle
                .posix
                .as_mut()
                .ok_or(FsError::new(FsErrorKind::NotSupported, op))?;
            match (field, value) {
                ("permissions", AttrValue::Mode(mode)) => {
                    if mode & !0o777 != 0 {
                        return Err(invalid());
                    }
                    posix.mode = *mode;
                }
                ("owner", AttrValue::User(owner)) => posix.owner = owner.clone(),
                ("group", AttrValue::Group(group)) => posix.group = group.clone(),
                _ => return Err(invalid()),
            }
        }
        VIEW_DOS => {
            let dos = bundle
                .dos
                .as_mut()
                .ok_or(FsError::new(FsErrorKind::NotSupported, op))?;
            let AttrValue::Bool(flag) = value else {
                return Err(invalid());
            };
            match field {
                "readonly" => dos.read_only = *flag,
                "hidden" => dos.hidden = *flag,
                "system" => dos.system = *flag,
                "archive" => dos.archive = *flag,
                _ => return Err(invalid()),
            }
        }
        VIEW_ACL => {
            let acl = bundle
                .acl
                .as_mut()
                .ok_or(FsError::new(FsErrorKind::NotSupported, op))?;
            match (field, value) {
                ("acl", AttrValue::Acl(entries)) => acl.entries = entries.clone(),
                ("owner", AttrValue::User(owner)) => acl.owner = owner.clone(),
                _ => return Err(invalid()),
            }
        }
        VIEW_OWNER => {
            let AttrValue::User(owner) = value else {
                return Err(invalid());
            };
            if field != "owner" {
                return Err(invalid());
            }
            bundle.set_owner(owner.clone(), op)?;
        }
        VIEW_USER => {
            let user = bundle
                .user
                .as_mut()
                .ok_or(FsError::new(FsErrorKind::NotSupported, op))?;
            let AttrValue::Bytes(bytes) = value else {
                return Err(invalid());
            };
            user.write(field, bytes);
        }
        _ => return Err(FsError::new(FsErrorKind::NotSupported, op)),
    }
    Ok(())
}

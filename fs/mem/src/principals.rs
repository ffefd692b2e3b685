//! User and group principals, the per-filesystem lookup service, and the
//! thread-scoped current-principal override.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use memfs_core::{FsError, FsErrorKind, FsInstanceId, FsResult};

/// A named user bound to one filesystem instance.
///
/// Two principals are equal iff they carry the same name and come from the
/// same filesystem.
#[derive(Clone, Debug)]
pub struct UserPrincipal {
    name: Arc<str>,
    fs: FsInstanceId,
}

impl UserPrincipal {
    pub(crate) fn new(name: impl Into<Arc<str>>, fs: FsInstanceId) -> Self {
        Self {
            name: name.into(),
            fs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filesystem(&self) -> FsInstanceId {
        self.fs
    }
}

impl PartialEq for UserPrincipal {
    fn eq(&self, other: &Self) -> bool {
        self.fs == other.fs && self.name == other.name
    }
}

impl Eq for UserPrincipal {}

impl Hash for UserPrincipal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fs.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for UserPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A named group bound to one filesystem instance.
#[derive(Clone, Debug)]
pub struct GroupPrincipal {
    name: Arc<str>,
    fs: FsInstanceId,
}

impl GroupPrincipal {
    pub(crate) fn new(name: impl Into<Arc<str>>, fs: FsInstanceId) -> Self {
        Self {
            name: name.into(),
            fs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filesystem(&self) -> FsInstanceId {
        self.fs
    }
}

impl PartialEq for GroupPrincipal {
    fn eq(&self, other: &Self) -> bool {
        self.fs == other.fs && self.name == other.name
    }
}

impl Eq for GroupPrincipal {}

impl Hash for GroupPrincipal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fs.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for GroupPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Principal lookup service of one filesystem.
///
/// Shares the filesystem's open flag: lookups on a closed filesystem fail
/// `Closed`.
#[derive(Debug)]
pub struct PrincipalLookup {
    fs: FsInstanceId,
    open: Arc<AtomicBool>,
    users: Vec<UserPrincipal>,
    groups: Vec<GroupPrincipal>,
    default_user: UserPrincipal,
    default_group: GroupPrincipal,
}

impl PrincipalLookup {
    pub(crate) fn new(
        fs: FsInstanceId,
        open: Arc<AtomicBool>,
        users: Vec<UserPrincipal>,
        groups: Vec<GroupPrincipal>,
        default_user: UserPrincipal,
        default_group: GroupPrincipal,
    ) -> Self {
        Self {
            fs,
            open,
            users,
            groups,
            default_user,
            default_group,
        }
    }

    fn check_open(&self, op: &'static str) -> FsResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(FsError::new(FsErrorKind::Closed, op))
        }
    }

    pub fn lookup_user(&self, name: &str) -> FsResult<UserPrincipal> {
        self.check_open("principals.lookup_user")?;
        self.users
            .iter()
            .find(|user| user.name() == name)
            .cloned()
            .ok_or_else(|| {
                FsError::with_path(FsErrorKind::Unregistered, "principals.lookup_user", name)
            })
    }

    pub fn lookup_group(&self, name: &str) -> FsResult<GroupPrincipal> {
        self.check_open("principals.lookup_group")?;
        self.groups
            .iter()
            .find(|group| group.name() == name)
            .cloned()
            .ok_or_else(|| {
                FsError::with_path(FsErrorKind::Unregistered, "principals.lookup_group", name)
            })
    }

    pub fn default_user(&self) -> &UserPrincipal {
        &self.default_user
    }

    pub fn default_group(&self) -> &GroupPrincipal {
        &self.default_group
    }

    /// The filesystem this service is bound to.
    pub fn filesystem(&self) -> FsInstanceId {
        self.fs
    }
}

thread_local! {
    static USER_OVERRIDES: RefCell<Vec<UserPrincipal>> = const { RefCell::new(Vec::new()) };
    static GROUP_OVERRIDES: RefCell<Vec<GroupPrincipal>> = const { RefCell::new(Vec::new()) };
}

/// Scope guard for a pushed current-user override; pops on drop.
#[must_use = "the override is popped when this guard drops"]
pub struct UserScope(());

impl Drop for UserScope {
    fn drop(&mut self) {
        USER_OVERRIDES.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Scope guard for a pushed current-group override; pops on drop.
#[must_use = "the override is popped when this guard drops"]
pub struct GroupScope(());

impl Drop for GroupScope {
    fn drop(&mut self) {
        GROUP_OVERRIDES.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run the rest of the scope as `user`. Nested overrides form a stack; the
/// effective user is the top, falling back to the filesystem default when the
/// stack is empty.
pub fn as_user(user: UserPrincipal) -> UserScope {
    USER_OVERRIDES.with(|stack| stack.borrow_mut().push(user));
    UserScope(())
}

/// Run the rest of the scope as `group`.
pub fn as_group(group: GroupPrincipal) -> GroupScope {
    GROUP_OVERRIDES.with(|stack| stack.borrow_mut().push(group));
    GroupScope(())
}

pub(crate) fn current_user() -> Option<UserPrincipal> {
    USER_OVERRIDES.with(|stack| stack.borrow().last().cloned())
}

pub(crate) fn current_group() -> Option<GroupPrincipal> {
    GROUP_OVERRIDES.with(|stack| stack.borrow().last().cloned())
}

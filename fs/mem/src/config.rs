//! Resolved filesystem configuration.
//!
//! Parsing an environment map into this struct is the embedder's job; the
//! engine only consumes the resolved value.

use std::sync::Arc;

use memfs_core::{CaseSensitivity, Flavor, FsError, FsErrorKind, FsResult, PathRules, ViewSet};

/// Configuration for one in-memory filesystem.
#[derive(Clone, Debug)]
pub struct MemFsConfig {
    flavor: Flavor,
    separator: Option<char>,
    roots: Vec<String>,
    case: CaseSensitivity,
    forbidden: Vec<char>,
    views: ViewSet,
    users: Vec<String>,
    groups: Vec<String>,
    default_user: Option<String>,
    default_group: Option<String>,
    umask: u32,
    default_directory: Option<String>,
}

impl MemFsConfig {
    /// Single `/` root, case-sensitive, POSIX and user-defined views.
    pub fn posix() -> Self {
        Self {
            flavor: Flavor::Posix,
            separator: None,
            roots: Vec::new(),
            case: CaseSensitivity::Sensitive,
            forbidden: Vec::new(),
            views: ViewSet::POSIX | ViewSet::USER,
            users: Vec::new(),
            groups: Vec::new(),
            default_user: None,
            default_group: None,
            umask: 0o644,
            default_directory: None,
        }
    }

    /// A single `C:\` drive, ASCII-case-insensitive, DOS and user-defined
    /// views.
    pub fn windows() -> Self {
        Self {
            flavor: Flavor::Windows,
            separator: None,
            roots: vec!["C:\\".to_owned()],
            case: CaseSensitivity::InsensitiveAscii,
            forbidden: Vec::new(),
            views: ViewSet::DOS | ViewSet::USER,
            users: Vec::new(),
            groups: Vec::new(),
            default_user: None,
            default_group: None,
            umask: 0o644,
            default_directory: None,
        }
    }

    /// Single-root flavor with a caller-chosen separator. The separator is
    /// validated when the filesystem is built.
    pub fn custom(separator: char) -> Self {
        Self {
            flavor: Flavor::Custom,
            separator: Some(separator),
            roots: Vec::new(),
            case: CaseSensitivity::Sensitive,
            forbidden: Vec::new(),
            views: ViewSet::empty(),
            users: Vec::new(),
            groups: Vec::new(),
            default_user: None,
            default_group: None,
            umask: 0o644,
            default_directory: None,
        }
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_case_sensitivity(mut self, case: CaseSensitivity) -> Self {
        self.case = case;
        self
    }

    pub fn with_forbidden_characters<I: IntoIterator<Item = char>>(mut self, chars: I) -> Self {
        self.forbidden = chars.into_iter().collect();
        self
    }

    pub fn with_views(mut self, views: ViewSet) -> Self {
        self.views = views;
        self
    }

    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users = users.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = Some(user.into());
        self
    }

    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.default_group = Some(group.into());
        self
    }

    /// Default 9-bit permission mask for created files. Directories get the
    /// execute bits OR-ed in.
    pub fn with_umask(mut self, umask: u32) -> Self {
        self.umask = umask;
        self
    }

    /// Absolute path that relative paths resolve against. Defaults to the
    /// first root.
    pub fn with_default_directory(mut self, dir: impl Into<String>) -> Self {
        self.default_directory = Some(dir.into());
        self
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn views(&self) -> ViewSet {
        self.views
    }

    pub fn umask(&self) -> u32 {
        self.umask
    }

    pub(crate) fn build_rules(&self) -> FsResult<Arc<PathRules>> {
        if self.umask & !0o777 != 0 {
            return Err(FsError::new(FsErrorKind::InvalidConfig, "config.umask"));
        }
        PathRules::new(
            self.flavor,
            self.separator,
            self.case,
            &self.forbidden,
            &self.roots,
        )
    }

    /// Configured user names plus the default user, deduplicated.
    pub(crate) fn user_names(&self) -> Vec<String> {
        let mut names = self.users.clone();
        let default = self.default_user_name();
        if !names.contains(&default) {
            names.push(default);
        }
        names
    }

    pub(crate) fn group_names(&self) -> Vec<String> {
        let mut names = self.groups.clone();
        let default = self.default_group_name();
        if !names.contains(&default) {
            names.push(default);
        }
        names
    }

    pub(crate) fn default_user_name(&self) -> String {
        self.default_user
            .clone()
            .or_else(|| self.users.first().cloned())
            .unwrap_or_else(|| "user".to_owned())
    }

    pub(crate) fn default_group_name(&self) -> String {
        self.default_group
            .clone()
            .or_else(|| self.groups.first().cloned())
            .unwrap_or_else(|| "group".to_owned())
    }

    pub(crate) fn default_directory(&self) -> Option<&str> {
        self.default_directory.as_deref()
    }
}

//! The flavored path model: parsing, normalization, comparison, rendering.
//!
//! A [`PathRules`] value is built once per filesystem from its configuration
//! and shared by every path that filesystem produces. Paths are bound to the
//! producing filesystem instance; values from different instances never
//! compare equal.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{FsError, FsErrorKind, FsResult};
use crate::ids::FsInstanceId;

/// The family of path syntax and semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// Single root `/`, separator `/`.
    Posix,
    /// Drive roots `A:`..`Z:`, separator `\` with `/` accepted on input.
    Windows,
    /// Single root with a caller-chosen separator.
    Custom,
}

/// How names compare within one filesystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaseSensitivity {
    Sensitive,
    InsensitiveAscii,
    InsensitiveUnicode,
}

impl CaseSensitivity {
    /// Fold a name to its comparison key.
    pub fn fold(self, name: &str) -> String {
        match self {
            CaseSensitivity::Sensitive => name.to_owned(),
            CaseSensitivity::InsensitiveAscii => name.to_ascii_lowercase(),
            CaseSensitivity::InsensitiveUnicode => name.chars().flat_map(char::to_lowercase).collect(),
        }
    }
}

/// A root's displayable name (`"/"`, `"C:\"`).
///
/// Equality and hashing fold ASCII case so that `C:\` and `c:\` name the same
/// root, while the original casing is preserved for display.
#[derive(Clone, Debug)]
pub struct RootName(Arc<str>);

impl RootName {
    pub fn new(display: impl Into<Arc<str>>) -> Self {
        Self(display.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The case-folded comparison key.
    pub fn key(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl PartialEq for RootName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for RootName {}

impl Hash for RootName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for RootName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Characters forbidden inside Windows path components.
///
/// The separators `\` and `/` never survive splitting and need no entry here.
const WINDOWS_FORBIDDEN: &[char] = &[':', '?', '"', '<', '>', '|'];

/// Parsing, folding, and rendering rules for one filesystem.
#[derive(Debug)]
pub struct PathRules {
    flavor: Flavor,
    separator: char,
    alt_separator: Option<char>,
    case: CaseSensitivity,
    forbidden: Vec<char>,
    roots: Vec<RootName>,
}

impl PathRules {
    /// Build rules from a resolved configuration.
    ///
    /// `separator` defaults per flavor (`/`, `\`) and is mandatory for
    /// [`Flavor::Custom`]. Roots must match the flavor: exactly one
    /// separator-named root for single-root flavors, one or more drive roots
    /// for Windows.
    pub fn new(
        flavor: Flavor,
        separator: Option<char>,
        case: CaseSensitivity,
        extra_forbidden: &[char],
        roots: &[String],
    ) -> FsResult<Arc<Self>> {
        const OP: &str = "path.rules";
        let separator = match (flavor, separator) {
            (Flavor::Posix, None) => '/',
            (Flavor::Windows, None) => '\\',
            (Flavor::Custom, None) => {
                return Err(FsError::new(FsErrorKind::InvalidConfig, OP));
            }
            (_, Some(sep)) => {
                if !valid_separator(sep) {
                    return Err(FsError::new(FsErrorKind::InvalidConfig, OP));
                }
                sep
            }
        };

        let mut forbidden: Vec<char> = match flavor {
            Flavor::Windows => WINDOWS_FORBIDDEN.to_vec(),
            _ => Vec::new(),
        };
        for &c in extra_forbidden {
            if c != separator && !forbidden.contains(&c) {
                forbidden.push(c);
            }
        }

        let roots = Self::validate_roots(flavor, separator, roots)?;

        Ok(Arc::new(Self {
            flavor,
            separator,
            alt_separator: match flavor {
                Flavor::Windows => Some('/'),
                _ => None,
            },
            case,
            forbidden,
            roots,
        }))
    }

    fn validate_roots(
        flavor: Flavor,
        separator: char,
        roots: &[String],
    ) -> FsResult<Vec<RootName>> {
        const OP: &str = "path.rules";
        match flavor {
            Flavor::Posix | Flavor::Custom => {
                let expected: String = separator.to_string();
                match roots {
                    [] => Ok(vec![RootName::new(expected)]),
                    [only] if *only == expected => Ok(vec![RootName::new(expected)]),
                    _ => Err(FsError::new(FsErrorKind::InvalidConfig, OP)),
                }
            }
            Flavor::Windows => {
                if roots.is_empty() {
                    return Err(FsError::new(FsErrorKind::InvalidConfig, OP));
                }
                let mut out = Vec::with_capacity(roots.len());
                for root in roots {
                    let mut chars = root.chars();
                    let ok = matches!(
                        (chars.next(), chars.next(), chars.next(), chars.next()),
                        (Some(letter), Some(':'), Some(sep), None)
                            if letter.is_ascii_alphabetic() && (sep == '\\' || sep == '/')
                    );
                    if !ok {
                        return Err(FsError::new(FsErrorKind::InvalidConfig, OP));
                    }
                    let name = RootName::new(root.as_str());
                    if out.contains(&name) {
                        return Err(FsError::new(FsErrorKind::InvalidConfig, OP));
                    }
                    out.push(name);
                }
                Ok(out)
            }
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    pub fn roots(&self) -> &[RootName] {
        &self.roots
    }

    /// Fold a component name to its comparison key under these rules.
    pub fn fold(&self, name: &str) -> String {
        self.case.fold(name)
    }

    /// Parse a path from segments joined as if by the separator.
    ///
    /// Empty segments are discarded. A component containing a forbidden
    /// character fails `InvalidPath`; `.` and `..` are legal until
    /// normalization.
    pub fn parse(
        self: &Arc<Self>,
        fs: FsInstanceId,
        first: &str,
        more: &[&str],
    ) -> FsResult<FsPath> {
        const OP: &str = "path.parse";
        let mut inputs: SmallVec<[&str; 4]> = SmallVec::new();
        inputs.push(first);
        inputs.extend(more.iter().copied());

        let head = inputs.iter().position(|s| !s.is_empty());

        if self.flavor == Flavor::Windows {
            if let Some(i) = head {
                if let Some((letter, rest)) = strip_drive(inputs[i]) {
                    let root = self.match_drive(letter, &inputs)?;
                    let mut components = Components::new();
                    self.split_into(rest, &mut components, &inputs)?;
                    for input in &inputs[i + 1..] {
                        self.split_into(input, &mut components, &inputs)?;
                    }
                    return Ok(FsPath {
                        fs,
                        rules: self.clone(),
                        kind: PathKind::Absolute { root, components },
                    });
                }
                if has_stray_drive(inputs[i]) {
                    return Err(self.invalid_path(OP, &inputs));
                }
            }
            let mut components = Components::new();
            for input in &inputs {
                self.split_into(input, &mut components, &inputs)?;
            }
            return Ok(FsPath {
                fs,
                rules: self.clone(),
                kind: PathKind::Relative { components },
            });
        }

        let absolute = head.is_some_and(|i| inputs[i].starts_with(self.separator));
        let mut components = Components::new();
        for input in &inputs {
            self.split_into(input, &mut components, &inputs)?;
        }
        let kind = if absolute {
            PathKind::Absolute {
                root: self.roots[0].clone(),
                components,
            }
        } else {
            PathKind::Relative { components }
        };
        Ok(FsPath {
            fs,
            rules: self.clone(),
            kind,
        })
    }

    fn split_into(
        &self,
        input: &str,
        out: &mut Components,
        inputs: &[&str],
    ) -> FsResult<()> {
        const OP: &str = "path.parse";
        let is_sep = |c: char| c == self.separator || Some(c) == self.alt_separator;
        for part in input.split(is_sep) {
            if part.is_empty() {
                continue;
            }
            if part.chars().any(|c| self.forbidden.contains(&c)) {
                return Err(self.invalid_path(OP, inputs));
            }
            out.push(part.to_owned());
        }
        Ok(())
    }

    fn match_drive(&self, letter: char, inputs: &[&str]) -> FsResult<RootName> {
        let configured = self.roots.iter().any(|root| {
            root.as_str()
                .chars()
                .next()
                .is_some_and(|c| c.eq_ignore_ascii_case(&letter))
        });
        if !configured {
            return Err(self.invalid_path("path.parse", inputs));
        }
        Ok(RootName::new(format!("{letter}:{}", self.separator)))
    }

    fn invalid_path(&self, op: &'static str, inputs: &[&str]) -> FsError {
        let mut display = String::new();
        for input in inputs.iter().filter(|s| !s.is_empty()) {
            if !display.is_empty() {
                display.push(self.separator);
            }
            display.push_str(input);
        }
        FsError::with_path(FsErrorKind::InvalidPath, op, display)
    }
}

/// A custom separator must be a single ASCII-graphic, non-alphanumeric
/// character. This rules out combining marks, whitespace, controls, and
/// symbol glyphs such as U+2603.
fn valid_separator(c: char) -> bool {
    c.is_ascii_graphic() && !c.is_ascii_alphanumeric()
}

/// `"C:\temp"` -> `('C', "\temp")`. Drive-relative forms (`"C:temp"`) do not
/// match and are rejected by the caller.
fn strip_drive(input: &str) -> Option<(char, &str)> {
    let mut chars = input.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() || chars.next()? != ':' {
        return None;
    }
    let rest = &input[2..];
    match rest.chars().next() {
        None | Some('\\') | Some('/') => Some((letter, rest)),
        Some(_) => None,
    }
}

/// Whether the input carries a drive prefix that `strip_drive` refused
/// (drive-relative path like `"C:temp"`).
fn has_stray_drive(input: &str) -> bool {
    let mut chars = input.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

pub type Components = SmallVec<[String; 8]>;

#[derive(Clone, Debug)]
pub enum PathKind {
    Absolute {
        root: RootName,
        components: Components,
    },
    Relative {
        components: Components,
    },
}

/// A parsed path bound to the filesystem instance that produced it.
///
/// Comparison folds component names (and the drive letter) per the
/// filesystem's case-sensitivity mode; rendering preserves the casing the
/// path was created with.
#[derive(Clone, Debug)]
pub struct FsPath {
    fs: FsInstanceId,
    rules: Arc<PathRules>,
    kind: PathKind,
}

impl FsPath {
    pub fn absolute(
        fs: FsInstanceId,
        rules: Arc<PathRules>,
        root: RootName,
        components: Components,
    ) -> Self {
        Self {
            fs,
            rules,
            kind: PathKind::Absolute { root, components },
        }
    }

    pub fn relative(fs: FsInstanceId, rules: Arc<PathRules>, components: Components) -> Self {
        Self {
            fs,
            rules,
            kind: PathKind::Relative { components },
        }
    }

    pub fn filesystem(&self) -> FsInstanceId {
        self.fs
    }

    pub fn rules(&self) -> &Arc<PathRules> {
        &self.rules
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self.kind, PathKind::Absolute { .. })
    }

    pub fn root(&self) -> Option<&RootName> {
        match &self.kind {
            PathKind::Absolute { root, .. } => Some(root),
            PathKind::Relative { .. } => None,
        }
    }

    pub fn components(&self) -> &[String] {
        match &self.kind {
            PathKind::Absolute { components, .. } => components,
            PathKind::Relative { components } => components,
        }
    }

    /// The final component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.components().last().map(String::as_str)
    }

    /// The path without its final component. `None` for a root or an empty
    /// relative path, and for a single-component relative path.
    pub fn parent(&self) -> Option<FsPath> {
        match &self.kind {
            PathKind::Absolute { root, components } => {
                let (_, rest) = components.split_last()?;
                Some(FsPath::absolute(
                    self.fs,
                    self.rules.clone(),
                    root.clone(),
                    rest.iter().cloned().collect(),
                ))
            }
            PathKind::Relative { components } => {
                let (_, rest) = components.split_last()?;
                if rest.is_empty() {
                    return None;
                }
                Some(FsPath::relative(
                    self.fs,
                    self.rules.clone(),
                    rest.iter().cloned().collect(),
                ))
            }
        }
    }

    /// Remove `.` components and collapse `..` against the preceding
    /// component. Leading `..` survives on a relative path and is dropped
    /// from an absolute one. Idempotent.
    pub fn normalize(&self) -> FsPath {
        let absolute = self.is_absolute();
        let mut out = Components::new();
        for component in self.components() {
            match component.as_str() {
                "." => {}
                ".." => match out.last().map(String::as_str) {
                    Some(last) if last != ".." => {
                        out.pop();
                    }
                    _ if absolute => {}
                    _ => out.push("..".to_owned()),
                },
                _ => out.push(component.clone()),
            }
        }
        let kind = match &self.kind {
            PathKind::Absolute { root, .. } => PathKind::Absolute {
                root: root.clone(),
                components: out,
            },
            PathKind::Relative { .. } => PathKind::Relative { components: out },
        };
        FsPath {
            fs: self.fs,
            rules: self.rules.clone(),
            kind,
        }
    }

    /// Resolve `other` against `self`: an absolute `other` wins, a relative
    /// one is appended. Fails `InvalidOperation` across filesystems.
    pub fn join(&self, other: &FsPath) -> FsResult<FsPath> {
        if self.fs != other.fs {
            return Err(FsError::new(FsErrorKind::InvalidOperation, "path.join"));
        }
        if other.is_absolute() {
            return Ok(other.clone());
        }
        let mut components: Components = self.components().iter().cloned().collect();
        components.extend(other.components().iter().cloned());
        let kind = match &self.kind {
            PathKind::Absolute { root, .. } => PathKind::Absolute {
                root: root.clone(),
                components,
            },
            PathKind::Relative { .. } => PathKind::Relative { components },
        };
        Ok(FsPath {
            fs: self.fs,
            rules: self.rules.clone(),
            kind,
        })
    }

    /// Parse `other` under this path's rules and [`join`](Self::join) it.
    pub fn join_str(&self, other: &str) -> FsResult<FsPath> {
        let parsed = self.rules.parse(self.fs, other, &[])?;
        self.join(&parsed)
    }

    /// Prefix test under the filesystem's case folding. An absolute prefix
    /// requires the same root; a relative prefix only matches a relative
    /// path.
    pub fn starts_with(&self, prefix: &FsPath) -> bool {
        if self.fs != prefix.fs {
            return false;
        }
        match (&self.kind, &prefix.kind) {
            (
                PathKind::Absolute { root, components },
                PathKind::Absolute {
                    root: prefix_root,
                    components: prefix_components,
                },
            ) => root == prefix_root && self.components_start_with(components, prefix_components),
            (
                PathKind::Relative { components },
                PathKind::Relative {
                    components: prefix_components,
                },
            ) => self.components_start_with(components, prefix_components),
            _ => false,
        }
    }

    fn components_start_with(&self, components: &[String], prefix: &[String]) -> bool {
        if prefix.len() > components.len() {
            return false;
        }
        components
            .iter()
            .zip(prefix)
            .all(|(a, b)| self.rules.fold(a) == self.rules.fold(b))
    }

    fn folded_components(&self) -> Vec<String> {
        self.components()
            .iter()
            .map(|c| self.rules.fold(c))
            .collect()
    }
}

impl PartialEq for FsPath {
    fn eq(&self, other: &Self) -> bool {
        if self.fs != other.fs || self.is_absolute() != other.is_absolute() {
            return false;
        }
        if self.root() != other.root() {
            return false;
        }
        let (a, b) = (self.components(), other.components());
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| self.rules.fold(x) == self.rules.fold(y))
    }
}

impl Eq for FsPath {}

impl Hash for FsPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fs.hash(state);
        self.is_absolute().hash(state);
        if let Some(root) = self.root() {
            root.hash(state);
        }
        for component in self.components() {
            self.rules.fold(component).hash(state);
        }
    }
}

impl PartialOrd for FsPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FsPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs
            .cmp(&other.fs)
            .then_with(|| other.is_absolute().cmp(&self.is_absolute()))
            .then_with(|| {
                let a = self.root().map(RootName::key);
                let b = other.root().map(RootName::key);
                a.cmp(&b)
            })
            .then_with(|| self.folded_components().cmp(&other.folded_components()))
    }
}

// Rendering uses the primary separator; the root display already carries its
// trailing separator.
impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = self.rules.separator();
        if let PathKind::Absolute { root, .. } = &self.kind {
            f.write_str(root.as_str())?;
        }
        for (i, component) in self.components().iter().enumerate() {
            if i > 0 {
                write!(f, "{separator}")?;
            }
            f.write_str(component)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posix() -> Arc<PathRules> {
        PathRules::new(Flavor::Posix, None, CaseSensitivity::Sensitive, &[], &[]).expect("rules")
    }

    fn windows() -> Arc<PathRules> {
        PathRules::new(
            Flavor::Windows,
            None,
            CaseSensitivity::InsensitiveAscii,
            &[],
            &["C:\\".to_owned(), "D:\\".to_owned()],
        )
        .expect("rules")
    }

    const FS: FsInstanceId = FsInstanceId(1);

    #[test]
    fn posix_parse_splits_and_discards_empties() {
        let rules = posix();
        let path = rules.parse(FS, "/a//b/", &["c"]).expect("parse");
        assert!(path.is_absolute());
        assert_eq!(path.components(), ["a", "b", "c"]);
        assert_eq!(path.to_string(), "/a/b/c");
    }

    #[test]
    fn posix_absolute_follows_first_nonempty_segment() {
        let rules = posix();
        assert!(!rules.parse(FS, "", &["a"]).expect("parse").is_absolute());
        assert!(rules.parse(FS, "", &["/a"]).expect("parse").is_absolute());
    }

    #[test]
    fn normalize_collapses_dot_and_dotdot() {
        let rules = posix();
        let path = rules.parse(FS, "/a/./b/../c", &[]).expect("parse");
        let normalized = path.normalize();
        assert_eq!(normalized.components(), ["a", "c"]);
        assert_eq!(normalized.normalize(), normalized);
    }

    #[test]
    fn normalize_keeps_leading_dotdot_only_when_relative() {
        let rules = posix();
        let relative = rules.parse(FS, "../a", &[]).expect("parse").normalize();
        assert_eq!(relative.components(), ["..", "a"]);
        let absolute = rules.parse(FS, "/../a", &[]).expect("parse").normalize();
        assert_eq!(absolute.components(), ["a"]);
    }

    #[test]
    fn parse_render_roundtrip_matches_normalized() {
        let rules = posix();
        let path = rules.parse(FS, "/x/./y/../z", &[]).expect("parse");
        let rendered = path.to_string();
        let reparsed = rules.parse(FS, &rendered, &[]).expect("reparse");
        assert_eq!(reparsed.normalize(), path.normalize());
    }

    #[test]
    fn windows_paths_fold_case_but_keep_display() {
        let rules = windows();
        let upper = rules.parse(FS, "C:\\TEMP", &[]).expect("parse");
        let lower = rules.parse(FS, "c:\\temp", &[]).expect("parse");
        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "C:\\TEMP");
        assert_eq!(lower.to_string(), "c:\\temp");

        let prefix = rules.parse(FS, "c:\\", &[]).expect("parse");
        assert!(upper.starts_with(&prefix));
    }

    #[test]
    fn windows_hashes_agree_for_equal_paths() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(path: &FsPath) -> u64 {
            let mut hasher = DefaultHasher::new();
            path.hash(&mut hasher);
            hasher.finish()
        }

        let rules = windows();
        let a = rules.parse(FS, "C:\\TEMP", &[]).expect("parse");
        let b = rules.parse(FS, "c:/temp", &[]).expect("parse");
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn windows_accepts_slash_alias_and_renders_backslash() {
        let rules = windows();
        let path = rules.parse(FS, "D:/a/b", &[]).expect("parse");
        assert_eq!(path.to_string(), "D:\\a\\b");
    }

    #[test]
    fn windows_rejects_forbidden_component_chars() {
        let rules = windows();
        let err = rules.parse(FS, "C:\\a<b", &[]).expect_err("parse");
        assert_eq!(err.kind(), FsErrorKind::InvalidPath);
        let err = rules.parse(FS, "C:\\ok", &["x|y"]).expect_err("parse");
        assert_eq!(err.kind(), FsErrorKind::InvalidPath);
    }

    #[test]
    fn windows_rejects_unknown_drive_and_drive_relative() {
        let rules = windows();
        let err = rules.parse(FS, "Z:\\a", &[]).expect_err("parse");
        assert_eq!(err.kind(), FsErrorKind::InvalidPath);
        let err = rules.parse(FS, "C:a", &[]).expect_err("parse");
        assert_eq!(err.kind(), FsErrorKind::InvalidPath);
    }

    #[test]
    fn custom_separator_validation() {
        assert!(PathRules::new(
            Flavor::Custom,
            Some('\\'),
            CaseSensitivity::Sensitive,
            &[],
            &[]
        )
        .is_ok());

        let err = PathRules::new(
            Flavor::Custom,
            Some('\u{2603}'),
            CaseSensitivity::Sensitive,
            &[],
            &[],
        )
        .expect_err("snowman");
        assert_eq!(err.kind(), FsErrorKind::InvalidConfig);

        let err = PathRules::new(
            Flavor::Custom,
            Some('\u{0301}'),
            CaseSensitivity::Sensitive,
            &[],
            &[],
        )
        .expect_err("combining mark");
        assert_eq!(err.kind(), FsErrorKind::InvalidConfig);

        let err =
            PathRules::new(Flavor::Custom, None, CaseSensitivity::Sensitive, &[], &[])
                .expect_err("missing separator");
        assert_eq!(err.kind(), FsErrorKind::InvalidConfig);
    }

    #[test]
    fn custom_separator_parses_with_that_separator() {
        let rules = PathRules::new(
            Flavor::Custom,
            Some(':'),
            CaseSensitivity::Sensitive,
            &[],
            &[],
        )
        .expect("rules");
        let path = rules.parse(FS, ":a:b", &[]).expect("parse");
        assert!(path.is_absolute());
        assert_eq!(path.components(), ["a", "b"]);
        assert_eq!(path.to_string(), ":a:b");
    }

    #[test]
    fn join_appends_relative_and_yields_to_absolute() {
        let rules = posix();
        let base = rules.parse(FS, "/a", &[]).expect("parse");
        let rel = rules.parse(FS, "b/c", &[]).expect("parse");
        assert_eq!(base.join(&rel).expect("join").to_string(), "/a/b/c");

        let abs = rules.parse(FS, "/elsewhere", &[]).expect("parse");
        assert_eq!(base.join(&abs).expect("join"), abs);

        let foreign = rules.parse(FsInstanceId(2), "b", &[]).expect("parse");
        let err = base.join(&foreign).expect_err("cross-fs join");
        assert_eq!(err.kind(), FsErrorKind::InvalidOperation);
    }

    #[test]
    fn parent_and_file_name() {
        let rules = posix();
        let path = rules.parse(FS, "/a/b", &[]).expect("parse");
        assert_eq!(path.file_name(), Some("b"));
        assert_eq!(path.parent().expect("parent").to_string(), "/a");

        let root = rules.parse(FS, "/", &[]).expect("parse");
        assert!(root.parent().is_none());
        assert!(root.file_name().is_none());

        let single = rules.parse(FS, "a", &[]).expect("parse");
        assert!(single.parent().is_none());
    }

    #[test]
    fn paths_from_different_filesystems_are_unequal() {
        let rules = posix();
        let a = rules.parse(FsInstanceId(1), "/a", &[]).expect("parse");
        let b = rules.parse(FsInstanceId(2), "/a", &[]).expect("parse");
        assert_ne!(a, b);
    }

    #[test]
    fn unicode_folding_compares_non_ascii_names() {
        let rules = PathRules::new(
            Flavor::Posix,
            None,
            CaseSensitivity::InsensitiveUnicode,
            &[],
            &[],
        )
        .expect("rules");
        let a = rules.parse(FS, "/Straße", &[]).expect("parse");
        let b = rules.parse(FS, "/STRASSE", &[]).expect("parse");
        // to_lowercase maps U+1E9E to "ss" but plain "ß" stays "ß"; equality
        // here only requires the same folded form on both sides.
        assert_eq!(a, rules.parse(FS, "/STRAßE", &[]).expect("parse"));
        assert_ne!(a, b);
    }
}

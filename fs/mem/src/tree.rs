//! Path resolution over the entry tree.
//!
//! Traversal takes one directory read lock per hop and never holds two entry
//! locks at once; symlinks restart the walk with a decremented follow budget.

use std::sync::Arc;

use memfs_core::{AccessMode, Components, FsError, FsErrorKind, FsPath, FsResult, RootName};

use crate::entry::MemEntry;
use crate::fs::MemFs;

/// Maximum symlink follows per resolution.
pub(crate) const SYMLINK_BUDGET: u32 = 40;

/// Outcome of resolving a path to an entry.
pub(crate) struct Resolved {
    pub entry: Arc<MemEntry>,
    /// The directory the entry was found in; `None` for a root.
    pub parent: Option<Arc<MemEntry>>,
    /// Folded child key of the entry in its parent; `None` for a root.
    pub key: Option<String>,
    /// Real absolute normalized path, in original casing.
    pub path: FsPath,
}

/// Outcome of resolving a path's parent directory for create/link
/// operations.
pub(crate) struct ResolvedParent {
    pub dir: Arc<MemEntry>,
    pub dir_path: FsPath,
    /// Final component as the caller wrote it.
    pub name: String,
    /// Folded child key of the final component.
    pub key: String,
}

pub(crate) fn resolve(
    fs: &MemFs,
    path: &FsPath,
    follow_final: bool,
    op: &'static str,
) -> FsResult<Resolved> {
    let mut budget = SYMLINK_BUDGET;
    let start = fs.absolute(path)?.normalize();
    walk(fs, start, follow_final, &mut budget, op)
}

pub(crate) fn resolve_parent(fs: &MemFs, path: &FsPath, op: &'static str) -> FsResult<ResolvedParent> {
    let abs = fs.absolute(path)?.normalize();
    let name = match abs.file_name() {
        Some(name) => name.to_owned(),
        // The path names a root; there is no parent to operate in.
        None => {
            return Err(FsError::with_path(
                FsErrorKind::InvalidOperation,
                op,
                abs.to_string(),
            ));
        }
    };
    let parent_path = match abs.parent() {
        Some(parent) => parent,
        None => {
            return Err(FsError::with_path(
                FsErrorKind::InvalidOperation,
                op,
                abs.to_string(),
            ));
        }
    };
    let mut budget = SYMLINK_BUDGET;
    let resolved = walk(fs, parent_path, true, &mut budget, op)?;
    if !resolved.entry.is_dir() {
        return Err(FsError::with_path(
            FsErrorKind::NotDir,
            op,
            resolved.path.to_string(),
        ));
    }
    Ok(ResolvedParent {
        dir: resolved.entry,
        dir_path: resolved.path,
        key: fs.fold(&name),
        name,
    })
}

fn walk(
    fs: &MemFs,
    mut path: FsPath,
    follow_final: bool,
    budget: &mut u32,
    op: &'static str,
) -> FsResult<Resolved> {
    loop {
        let parsed_root = match path.root() {
            Some(root) => root.clone(),
            None => {
                return Err(FsError::with_path(
                    FsErrorKind::InvalidPath,
                    op,
                    path.to_string(),
                ));
            }
        };
        // Real paths carry the configured casing of the root, not the
        // caller's.
        let (root_name, root) = fs
            .root_entry(&parsed_root)
            .ok_or_else(|| FsError::with_path(FsErrorKind::NotFound, op, path.to_string()))?;

        let components: Vec<String> = path.components().to_vec();
        let mut current = root;
        let mut parent: Option<Arc<MemEntry>> = None;
        let mut key: Option<String> = None;
        let mut walked = Components::new();
        let mut restarted = false;

        for (index, component) in components.iter().enumerate() {
            let last = index + 1 == components.len();
            if !current.is_dir() {
                return Err(FsError::with_path(
                    FsErrorKind::NotDir,
                    op,
                    render(fs, &root_name, &walked),
                ));
            }
            let folded = fs.fold(component);
            let slot = {
                let guard = current.read();
                fs.check_inner(&guard, AccessMode::EXECUTE, op).map_err(|err| {
                    FsError::with_path(err.kind(), op, render(fs, &root_name, &walked))
                })?;
                match guard.children(op)?.get(&folded) {
                    Some(slot) => slot.clone(),
                    None => {
                        walked.push(component.clone());
                        return Err(FsError::with_path(
                            FsErrorKind::NotFound,
                            op,
                            render(fs, &root_name, &walked),
                        ));
                    }
                }
            };

            if slot.entry.is_symlink() && (!last || follow_final) {
                if *budget == 0 {
                    walked.push(component.clone());
                    return Err(FsError::with_path(
                        FsErrorKind::TooManySymlinks,
                        op,
                        render(fs, &root_name, &walked),
                    ));
                }
                *budget -= 1;
                let target = slot.entry.read().symlink_target(op)?.clone();
                // Relative targets resolve from the symlink's directory,
                // absolute ones from their own root.
                let dir_path = FsPath::absolute(
                    fs.instance(),
                    fs.rules().clone(),
                    root_name.clone(),
                    walked.clone(),
                );
                let resolved_target = dir_path.join(&target)?;
                let next_root = resolved_target
                    .root()
                    .cloned()
                    .unwrap_or_else(|| root_name.clone());
                let mut next: Components =
                    resolved_target.components().iter().cloned().collect();
                next.extend(components[index + 1..].iter().cloned());
                path = FsPath::absolute(fs.instance(), fs.rules().clone(), next_root, next)
                    .normalize();
                restarted = true;
                break;
            }

            walked.push(slot.name.clone());
            parent = Some(current.clone());
            key = Some(folded);
            current = slot.entry;
        }

        if restarted {
            continue;
        }
        let real = FsPath::absolute(fs.instance(), fs.rules().clone(), root_name, walked);
        return Ok(Resolved {
            entry: current,
            parent,
            key,
            path: real,
        });
    }
}

fn render(fs: &MemFs, root: &RootName, walked: &Components) -> String {
    FsPath::absolute(fs.instance(), fs.rules().clone(), root.clone(), walked.clone()).to_string()
}

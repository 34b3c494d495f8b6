//! Repository discovery.
//!
//! Walks a directory tree and records every repository root it finds. Once a
//! directory is identified as a repository its children are never queued, so
//! `objects/`, `refs/` or `.git/` internals can't be mistaken for nested
//! repositories.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::git::error::{GitError, GitResult};
use crate::git::types::{RepoKind, RepositoryHandle};

/// Walk `root` and return the handles of every outermost repository below it.
///
/// The whole tree is walked before returning so callers get a stable total.
/// Unreadable directories are logged and skipped.
pub fn locate(root: impl AsRef<Path>) -> GitResult<Vec<RepositoryHandle>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(GitError::NotADirectory(root.to_path_buf()));
    }

    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        if let Some(kind) = detect(&dir) {
            debug!(path = %dir.display(), %kind, "found repository");
            if seen.insert(dir.clone()) {
                found.push(RepositoryHandle::new(dir, kind));
            }
            continue;
        }

        let mut children = match subdirectories(&dir) {
            Ok(children) => children,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };

        // reversed so the stack pops them in name order
        children.sort();
        stack.extend(children.into_iter().rev());
    }

    Ok(found)
}

/// Classify `dir` as a repository root, if it is one.
pub fn detect(dir: &Path) -> Option<RepoKind> {
    if dir.join("objects").is_dir() && dir.join("refs").is_dir() && dir.join("HEAD").is_file() {
        Some(RepoKind::Bare)
    } else if dir.join(".git").exists() {
        Some(RepoKind::Tree)
    } else {
        None
    }
}

/// real (non-symlinked) child directories
fn subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        // file_type does not follow symlinks
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

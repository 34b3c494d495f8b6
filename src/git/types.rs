//! core type-safe wrappers around git primitives and located repositories.

use std::fmt;
use std::path::{Path, PathBuf};

use git2::Oid;
use serde::Serialize;

/// This makes sure we don't accidentally pass a tree ID where a commit ID
/// is expected. The inner Oid is only accessible within the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitId(pub(crate) Oid);

impl CommitId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    /// raw Oid (for internal use only)
    pub(crate) fn raw(&self) -> Oid {
        self.0
    }

    /// short form of the commit ID
    pub fn short(&self) -> String {
        self.0.to_string()[..7].to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git tree identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(pub(crate) Oid);

impl TreeId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two on-disk shapes of a repository we know how to migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    /// metadata and objects only, no checked-out files
    Bare,
    /// a checked-out tree with a `.git` entry
    Tree,
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoKind::Bare => write!(f, "bare"),
            RepoKind::Tree => write!(f, "tree"),
        }
    }
}

/// A located repository root.
///
/// Handles are produced by the locator and never change afterwards; the
/// batch engine owns them for the length of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryHandle {
    path: PathBuf,
    name: String,
    kind: RepoKind,
}

impl RepositoryHandle {
    /// create a handle for the repository rooted at `path`
    pub fn new(path: impl Into<PathBuf>, kind: RepoKind) -> Self {
        let path = path.into();
        let name = short_name(&path);
        Self { path, name, kind }
    }

    /// root directory of the repository
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// basename of the root directory
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RepoKind {
        self.kind
    }

    /// Name used for the hosted repository.
    ///
    /// Bare repositories are conventionally named `foo.git`; the hosted side
    /// only wants `foo`.
    pub fn canonical_name(&self) -> &str {
        match self.name.strip_suffix(".git") {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => &self.name,
        }
    }
}

impl fmt::Display for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.kind, self.path.display())
    }
}

/// basename with trailing separators ignored
fn short_name(path: &Path) -> String {
    let trimmed = path
        .to_str()
        .map(|s| s.trim_end_matches(['/', '\\']))
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf());

    trimmed
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_string_lossy().into_owned())
}

/// a validated branch name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// the default primary branch name
    pub const MAIN: &'static str = "main";

    /// create a new BranchName
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        // git is more permissive, we only need enough to build refspecs safely
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if name.contains("..") || name.ends_with('/') || name.starts_with('/') {
            return Err(InvalidNameError::InvalidPath(name));
        }
        for (i, c) in name.chars().enumerate() {
            if c.is_whitespace() || matches!(c, ':' | '~' | '^' | '?' | '*' | '[' | '\\') {
                return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
            }
        }
        Ok(Self(name))
    }

    /// the `main` branch
    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    /// get the full ref path (e.g., "refs/heads/main")
    pub fn as_ref_path(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// refspec pushing this branch to the same name on the remote
    pub fn push_refspec(&self) -> String {
        let path = self.as_ref_path();
        format!("{path}:{path}")
    }

    /// get the short name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BranchName {
    fn default() -> Self {
        Self::main()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// git signature (author/committer info)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSignature {
    pub name: String,
    pub email: String,
}

impl GitSignature {
    /// create a new signature
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// identity used for license commits
    pub fn migrator() -> Self {
        Self::new("Repository Migrator", "migrator@localhost")
    }

    /// convert to git2::Signature
    pub(crate) fn to_git2_signature(&self) -> Result<git2::Signature<'static>, git2::Error> {
        git2::Signature::now(&self.name, &self.email)
    }
}

impl Default for GitSignature {
    fn default() -> Self {
        Self::migrator()
    }
}

/// error type for invalid branch and remote names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    InvalidCharacter { char: char, position: usize },
    InvalidPath(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character '{}' at position {}", char, position)
            }
            Self::InvalidPath(path) => write!(f, "invalid path: '{}'", path),
        }
    }
}

impl std::error::Error for InvalidNameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_short_name() {
        let handle = RepositoryHandle::new("/repos/alpha", RepoKind::Tree);
        assert_eq!(handle.name(), "alpha");

        let handle = RepositoryHandle::new("/repos/beta.git/", RepoKind::Bare);
        assert_eq!(handle.name(), "beta.git");
        assert_eq!(handle.canonical_name(), "beta");
    }

    #[test]
    fn test_canonical_name_keeps_bare_dot_git() {
        let handle = RepositoryHandle::new("/repos/.git", RepoKind::Bare);
        assert_eq!(handle.canonical_name(), ".git");
    }

    #[test]
    fn test_branch_name_valid() {
        assert!(BranchName::new("main").is_ok());
        assert!(BranchName::new("release/1.0").is_ok());
    }

    #[test]
    fn test_branch_name_invalid() {
        assert_eq!(BranchName::new(""), Err(InvalidNameError::Empty));
        assert!(BranchName::new("a..b").is_err());
        assert!(BranchName::new("/main").is_err());
        assert!(BranchName::new("has space").is_err());
        assert!(BranchName::new("a:b").is_err());
    }

    #[test]
    fn test_branch_refspec() {
        let branch = BranchName::main();
        assert_eq!(branch.as_ref_path(), "refs/heads/main");
        assert_eq!(branch.push_refspec(), "refs/heads/main:refs/heads/main");
    }
}

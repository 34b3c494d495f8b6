//! Local git layer error types
//!
//! All errors that can occur while locating, reading or writing local
//! repositories are defined here.

use std::path::PathBuf;

use thiserror::Error;

/// the main error type for local repository operations
#[derive(Debug, Error)]
pub enum GitError {
    /// error from the underlying Git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// a root argument that cannot be walked
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// the path does not hold a repository
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// the specified branch/ref was not found
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// the commit was not found
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// the named remote is not configured
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// the remote refused one of the pushed references
    #[error("push of {refname} rejected: {message}")]
    PushRejected { refname: String, message: String },

    /// a branch moved since the commit meant for it was authored
    #[error("{refname} moved to {tip}, cannot fast-forward to {commit}")]
    NotFastForward {
        refname: String,
        tip: String,
        commit: String,
    },

    /// internal error that shouldn't happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl GitError {
    /// check if this error concerns a bad command-line root rather than a repository
    pub fn is_fatal_argument(&self) -> bool {
        matches!(self, GitError::NotADirectory(_))
    }
}

/// result type alias for local repository operations
pub type GitResult<T> = Result<T, GitError>;

//! Migration error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::git::GitError;
use crate::hosted::HostedError;

/// Result type for migration operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Errors that can occur while migrating a repository.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Local repository error.
    #[error("{0}")]
    Git(#[from] GitError),

    /// Hosted service error.
    #[error("hosted service: {0}")]
    Hosted(#[from] HostedError),

    /// Filesystem error outside of git (scratch area, license assets).
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MigrateError {
    /// Attach the offending path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// A failure of one supplied root path, not of any repository.
    pub fn is_fatal_argument(&self) -> bool {
        matches!(self, MigrateError::Git(e) if e.is_fatal_argument())
    }

    /// Whether retrying the same repository later may succeed.
    ///
    /// Configuration errors can't heal between attempts; everything a
    /// repository attempt can raise is treated as transient.
    pub fn is_transient(&self) -> bool {
        !matches!(self, MigrateError::InvalidConfig(_)) && !self.is_fatal_argument()
    }
}

//! Branch and remote reference lookups.

use git2::{ErrorCode, Repository};

use crate::git::error::{GitError, GitResult};
use crate::git::types::{BranchName, CommitId};

/// Resolves git references.
pub struct RefManager;

impl RefManager {
    /// Resolve a branch name to its current commit ID.
    pub fn resolve_branch(repo: &Repository, branch: &BranchName) -> GitResult<CommitId> {
        let reference = repo
            .find_reference(&branch.as_ref_path())
            .map_err(|_| GitError::RefNotFound(branch.to_string()))?;

        let commit = reference
            .peel_to_commit()
            .map_err(|_| GitError::RefNotFound(branch.to_string()))?;

        Ok(CommitId::new(commit.id()))
    }

    /// URL of a configured remote, `None` when the remote isn't configured.
    pub fn remote_url(repo: &Repository, name: &str) -> GitResult<Option<String>> {
        match repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(str::to_string)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Git(e)),
        }
    }
}

//! Commit authoring and inspection on a named branch.
//!
//! The license workflow authors exactly one commit per repository, always on
//! top of the current branch tip, and later needs to check that a commit
//! still sits directly on a tip before adopting it.

use git2::Repository;

use crate::git::error::{GitError, GitResult};
use crate::git::refs::RefManager;
use crate::git::types::{BranchName, CommitId, GitSignature, TreeId};

/// Commit `tree` on top of the tip of `branch` and advance the branch.
///
/// Author and committer are both `signature`.
pub fn commit_on_branch(
    repo: &Repository,
    branch: &BranchName,
    tree: TreeId,
    message: &str,
    signature: &GitSignature,
) -> GitResult<CommitId> {
    let tip = RefManager::resolve_branch(repo, branch)?;
    let parent = find(repo, tip)?;
    let tree = repo.find_tree(tree.raw())?;
    let sig = signature.to_git2_signature()?;

    let oid = repo.commit(
        Some(&branch.as_ref_path()),
        &sig,
        &sig,
        message,
        &tree,
        &[&parent],
    )?;
    Ok(CommitId::new(oid))
}

/// Parents of `id`, in order.
pub fn parent_ids(repo: &Repository, id: CommitId) -> GitResult<Vec<CommitId>> {
    Ok(find(repo, id)?.parent_ids().map(CommitId::new).collect())
}

/// names of the entries at the root of a commit's tree
pub fn root_entries(repo: &Repository, id: CommitId) -> GitResult<Vec<String>> {
    let tree = find(repo, id)?.tree()?;
    Ok(tree
        .iter()
        .filter_map(|entry| entry.name().map(str::to_string))
        .collect())
}

fn find(repo: &Repository, id: CommitId) -> GitResult<git2::Commit<'_>> {
    repo.find_commit(id.raw())
        .map_err(|_| GitError::CommitNotFound(id.to_string()))
}

//!   Local repository wrapper.
//!
//!  This wraps `git2::Repository` and provides the handful of high-level
//!  operations the migration layer needs: branch probes, remote
//!  configuration, cloning, committing a working tree, pushing and
//!  fast-forwarding a working tree from a clone.
//!
//! The migration layer never touches git2 directly.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::time::Duration;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, IndexAddOption, ObjectType, PushOptions, RemoteCallbacks, Repository};
use parking_lot::RwLock;
use tracing::debug;

use crate::git::commit;
use crate::git::error::{GitError, GitResult};
use crate::git::refs::RefManager;
use crate::git::types::{BranchName, CommitId, GitSignature, TreeId};

/// password paired with an OAuth token used as the HTTPS username
const TOKEN_PASSWORD: &str = "x-oauth-basic";

/// A local repository opened from disk.
pub struct LocalRepository {
    repo: RwLock<Repository>,
    path: PathBuf,
}

impl LocalRepository {
    /// Open an existing repository (bare or working tree) at exactly `path`.
    pub fn open(path: impl AsRef<Path>) -> GitResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|_| GitError::NotARepository(path.to_path_buf()))?;

        Ok(Self {
            repo: RwLock::new(repo),
            path: path.to_path_buf(),
        })
    }

    /// Clone `source` into `dest`, checking out `branch`.
    ///
    /// The clone's `origin` points back at `source`.
    pub fn clone_from(source: &Path, dest: &Path, branch: &BranchName) -> GitResult<Self> {
        let repo = RepoBuilder::new()
            .branch(branch.as_str())
            .clone(path_url(source)?, dest)?;
        debug!(source = %source.display(), dest = %dest.display(), "cloned repository");

        Ok(Self {
            repo: RwLock::new(repo),
            path: dest.to_path_buf(),
        })
    }

    /// Get the repository path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checked-out directory, `None` for bare repositories.
    pub fn workdir(&self) -> Option<PathBuf> {
        self.repo.read().workdir().map(Path::to_path_buf)
    }

    /// Execute a function with read access to the repository.
    pub fn with_repo<F, T>(&self, f: F) -> GitResult<T>
    where
        F: FnOnce(&Repository) -> GitResult<T>,
    {
        let repo = self.repo.read();
        f(&repo)
    }

    /// Execute a function with write access to the repository.
    pub fn with_repo_mut<F, T>(&self, f: F) -> GitResult<T>
    where
        F: FnOnce(&Repository) -> GitResult<T>,
    {
        let repo = self.repo.write();
        f(&repo)
    }

    // ==================== Branches ====================

    /// Current tip of `branch`.
    pub fn branch_tip(&self, branch: &BranchName) -> GitResult<CommitId> {
        self.with_repo(|repo| RefManager::resolve_branch(repo, branch))
    }

    /// Whether the root tree of `branch` has an entry called exactly `name`.
    pub fn has_root_entry(&self, branch: &BranchName, name: &str) -> GitResult<bool> {
        let tip = self.branch_tip(branch)?;
        self.with_repo(|repo| Ok(commit::root_entries(repo, tip)?.iter().any(|entry| entry == name)))
    }

    /// Fetch `commit` from the repository at `source` and fast-forward
    /// `branch` to it.
    ///
    /// `commit` must sit directly on the current tip. When `branch` is checked
    /// out, the index and working tree follow it; local changes in the way
    /// abort the update and leave the branch untouched.
    pub fn fast_forward_from(&self, source: &Path, branch: &BranchName, commit: CommitId) -> GitResult<()> {
        let url = path_url(source)?;
        self.with_repo_mut(|repo| {
            let refname = branch.as_ref_path();
            repo.remote_anonymous(url)?
                .fetch(&[refname.as_str()], None, None)?;

            let tip = RefManager::resolve_branch(repo, branch)?;
            if commit::parent_ids(repo, commit)?.first() != Some(&tip) {
                return Err(GitError::NotFastForward {
                    refname,
                    tip: tip.to_string(),
                    commit: commit.to_string(),
                });
            }

            if is_checked_out(repo, &refname) {
                let target = repo.find_object(commit.raw(), Some(ObjectType::Commit))?;
                repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
            }
            repo.find_reference(&refname)?
                .set_target(commit.raw(), "gitmigrate: fast-forward")?;

            debug!(path = %self.path.display(), %branch, commit = %commit.short(), "fast-forwarded");
            Ok(())
        })
    }

    // ==================== Remotes ====================

    /// URL of the named remote, if configured.
    pub fn remote_url(&self, name: &str) -> GitResult<Option<String>> {
        self.with_repo(|repo| RefManager::remote_url(repo, name))
    }

    /// Create the named remote unless it already exists.
    ///
    /// An existing remote keeps its URL. Returns true if the remote was created.
    pub fn ensure_remote(&self, name: &str, url: &str) -> GitResult<bool> {
        self.with_repo_mut(|repo| {
            if RefManager::remote_url(repo, name)?.is_some() {
                return Ok(false);
            }
            repo.remote(name, url)?;
            Ok(true)
        })
    }

    // ==================== Working tree ====================

    /// Stage everything in the working tree plus the `forced` paths (which
    /// may be ignored by `.gitignore`) and commit on top of `branch`.
    pub fn commit_worktree(
        &self,
        branch: &BranchName,
        forced: &[&str],
        message: &str,
        signature: &GitSignature,
    ) -> GitResult<CommitId> {
        self.with_repo_mut(|repo| {
            if repo.is_bare() {
                return Err(GitError::Internal(format!(
                    "cannot commit a working tree in bare repository {}",
                    self.path.display()
                )));
            }

            let mut index = repo.index()?;
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
            for path in forced {
                index.add_path(Path::new(path))?;
            }
            index.write()?;
            let tree_id = TreeId::new(index.write_tree()?);

            commit::commit_on_branch(repo, branch, tree_id, message, signature)
        })
    }

    // ==================== Push ====================

    /// Push `branch` to the named remote.
    ///
    /// `token` is offered as HTTPS credentials when the transport asks for
    /// them. Reference rejections reported by the remote become
    /// [`GitError::PushRejected`].
    pub fn push(&self, remote_name: &str, branch: &BranchName, token: Option<&str>) -> GitResult<()> {
        self.with_repo(|repo| {
            let mut remote = repo.find_remote(remote_name).map_err(|e| {
                if e.code() == git2::ErrorCode::NotFound {
                    GitError::RemoteNotFound(remote_name.to_string())
                } else {
                    GitError::Git(e)
                }
            })?;

            let rejection: RefCell<Option<(String, String)>> = RefCell::new(None);
            let asked = Cell::new(false);

            let mut callbacks = RemoteCallbacks::new();
            callbacks.credentials(|_url, username_from_url, allowed| {
                // libgit2 keeps asking while credentials are refused
                if asked.replace(true) {
                    return Err(git2::Error::from_str("authentication failed"));
                }
                match token {
                    Some(token) if allowed.is_user_pass_plaintext() => {
                        Cred::userpass_plaintext(token, TOKEN_PASSWORD)
                    }
                    _ if allowed.is_ssh_key() => {
                        Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
                    }
                    _ => Cred::default(),
                }
            });
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    *rejection.borrow_mut() = Some((refname.to_string(), message.to_string()));
                }
                Ok(())
            });

            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            remote.push(&[branch.push_refspec()], Some(&mut options))?;
            drop(options);

            if let Some((refname, message)) = rejection.into_inner() {
                return Err(GitError::PushRejected { refname, message });
            }

            debug!(remote = remote_name, %branch, "pushed");
            Ok(())
        })
    }
}

/// Bound how long git waits to connect to, and then hear from, a remote.
///
/// Process-wide. Call once at startup, before any fetch or push.
pub fn set_network_timeout(timeout: Duration) -> GitResult<()> {
    let millis = timeout_millis(timeout);
    // SAFETY: libgit2 options are global; this runs before any thread touches a remote
    unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)?;
        git2::opts::set_server_timeout_in_milliseconds(millis)?;
    }
    debug!(millis, "git network timeout set");
    Ok(())
}

/// zero would mean "no timeout" to libgit2, so clamp to at least 1 ms
fn timeout_millis(timeout: Duration) -> i32 {
    i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX).max(1)
}

fn path_url(path: &Path) -> GitResult<&str> {
    path.to_str()
        .ok_or_else(|| GitError::Internal(format!("non utf-8 path: {}", path.display())))
}

/// whether a working tree has `refname` checked out
fn is_checked_out(repo: &Repository, refname: &str) -> bool {
    !repo.is_bare()
        && repo
            .head()
            .ok()
            .is_some_and(|head| head.name() == Some(refname))
}

//! Publishing the primary branch to the hosted remote.

use tracing::info;

use crate::git::{BranchName, LocalRepository, RepositoryHandle};
use crate::migrate::binder::RemoteBinding;
use crate::migrate::error::MigrateResult;
use crate::session::Session;

/// Pushes the primary branch through a binding's remote.
///
/// Failures are returned as-is; retrying is the batch engine's job.
pub struct PushDriver<'s> {
    session: &'s Session,
    branch: BranchName,
}

impl<'s> PushDriver<'s> {
    pub fn new(session: &'s Session, branch: BranchName) -> Self {
        Self { session, branch }
    }

    pub fn publish(&self, handle: &RepositoryHandle, binding: &RemoteBinding) -> MigrateResult<()> {
        let repo = LocalRepository::open(handle.path())?;
        repo.push(&binding.remote_name, &self.branch, self.session.token())?;
        info!(repo = handle.name(), remote = %binding.remote_name, branch = %self.branch, "published");
        Ok(())
    }
}

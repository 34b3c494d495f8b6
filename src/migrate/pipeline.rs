//! One repository's migration: bind, license if needed, publish.

use crate::config::MigrateConfig;
use crate::git::RepositoryHandle;
use crate::migrate::binder::{RemoteBinder, RemoteBinding};
use crate::migrate::error::MigrateResult;
use crate::migrate::injector::LicenseInjector;
use crate::migrate::push::PushDriver;
use crate::session::Session;

/// What a successful migration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub binding: RemoteBinding,
    /// true when a license commit was added
    pub injected: bool,
}

/// A single migration attempt for one repository.
pub trait Migrate {
    fn migrate(&mut self, handle: &RepositoryHandle) -> MigrateResult<MigrationOutcome>;
}

/// Remote binder, license injector and push driver run in sequence.
pub struct Pipeline<'a> {
    binder: RemoteBinder<'a>,
    injector: LicenseInjector<'a>,
    pusher: PushDriver<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a MigrateConfig, session: &'a Session) -> Self {
        Self {
            binder: RemoteBinder::new(session, config.remote_name.clone()),
            injector: LicenseInjector::new(config),
            pusher: PushDriver::new(session, config.branch.clone()),
        }
    }
}

impl Migrate for Pipeline<'_> {
    fn migrate(&mut self, handle: &RepositoryHandle) -> MigrateResult<MigrationOutcome> {
        let binding = self.binder.ensure_bound(handle)?;
        let injected = self.injector.inject_if_missing(handle)?;
        self.pusher.publish(handle, &binding)?;
        Ok(MigrationOutcome { binding, injected })
    }
}

//! Remote binding: hosted repository lookup-or-create plus the local remote.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::git::{LocalRepository, RepositoryHandle};
use crate::migrate::error::MigrateResult;
use crate::session::Session;

/// A local repository's link to its hosted counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBinding {
    /// local remote name pushes go through
    pub remote_name: String,
    /// clone URL reported by the hosted service
    pub clone_url: String,
    /// true when the hosted repository was created by this run
    pub created: bool,
}

/// Ensures hosted repositories and local remotes exist.
///
/// Bindings are cached per repository path for the rest of the run, so a
/// repository retried in a later cycle never triggers a second lookup or
/// create.
pub struct RemoteBinder<'s> {
    session: &'s Session,
    remote_name: String,
    cache: Mutex<HashMap<PathBuf, RemoteBinding>>,
}

impl<'s> RemoteBinder<'s> {
    pub fn new(session: &'s Session, remote_name: impl Into<String>) -> Self {
        Self {
            session,
            remote_name: remote_name.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Bind `handle` to its hosted repository, creating either side as needed.
    ///
    /// An existing local remote of the configured name keeps its URL.
    pub fn ensure_bound(&self, handle: &RepositoryHandle) -> MigrateResult<RemoteBinding> {
        // the lock is held across lookup-or-create so a name is created at most once
        let mut cache = self.cache.lock();
        if let Some(binding) = cache.get(handle.path()) {
            debug!(repo = handle.name(), "using cached binding");
            return Ok(binding.clone());
        }

        let org = self.session.organization();
        let name = handle.canonical_name();
        let service = self.session.service();

        let (hosted, created) = match service.get_repo(org, name)? {
            Some(hosted) => (hosted, false),
            None => {
                let hosted = service.create_repo(org, name)?;
                info!(repo = name, full_name = %hosted.full_name, "created hosted repository");
                (hosted, true)
            }
        };

        let local = LocalRepository::open(handle.path())?;
        if local.ensure_remote(&self.remote_name, &hosted.clone_url)? {
            debug!(repo = name, remote = %self.remote_name, url = %hosted.clone_url, "added remote");
        } else if let Some(existing) = local.remote_url(&self.remote_name)? {
            if existing != hosted.clone_url {
                warn!(repo = name, remote = %self.remote_name, %existing, hosted = %hosted.clone_url, "remote points elsewhere, keeping it");
            }
        }

        let binding = RemoteBinding {
            remote_name: self.remote_name.clone(),
            clone_url: hosted.clone_url,
            created,
        };
        cache.insert(handle.path().to_path_buf(), binding.clone());
        Ok(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{bare_with, RepoKind};
    use crate::hosted::fake::FakeHostedService;
    use crate::hosted::HostedService;
    use crate::migrate::MigrateError;
    use git2::Repository;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        hosted_root: PathBuf,
        handle: RepositoryHandle,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let repo_path = dir.path().join("local/tools.git");
        bare_with(&repo_path, &[("a.txt", "a")]);
        Fixture {
            hosted_root: dir.path().join("hosted"),
            handle: RepositoryHandle::new(repo_path, RepoKind::Bare),
            _dir: dir,
        }
    }

    fn session(service: FakeHostedService) -> Session {
        Session::with_service(Box::new(service), None, "acme").unwrap()
    }

    #[test]
    fn test_creates_missing_hosted_repo_once() {
        let fx = fixture();
        let fake = FakeHostedService::new("acme", &fx.hosted_root);
        let expected_url = fake.repo_path("tools").to_string_lossy().into_owned();
        let session = session(fake.clone());
        let binder = RemoteBinder::new(&session, "hosted");

        let first = binder.ensure_bound(&fx.handle).unwrap();
        assert!(first.created);
        assert_eq!(first.clone_url, expected_url);

        let second = binder.ensure_bound(&fx.handle).unwrap();
        assert_eq!(first, second);
        assert_eq!(fake.creates(), 1);
        assert_eq!(fake.lookups(), 1);

        let local = LocalRepository::open(fx.handle.path()).unwrap();
        assert_eq!(local.remote_url("hosted").unwrap(), Some(expected_url));
    }

    #[test]
    fn test_idempotent_across_binders() {
        let fx = fixture();
        let fake = FakeHostedService::new("acme", &fx.hosted_root);
        let session = session(fake.clone());

        let first = RemoteBinder::new(&session, "hosted").ensure_bound(&fx.handle).unwrap();
        let second = RemoteBinder::new(&session, "hosted").ensure_bound(&fx.handle).unwrap();
        assert!(first.created);
        // the second binder finds the repository the first one created
        assert!(!second.created);
        assert_eq!(fake.creates(), 1);
    }

    #[test]
    fn test_existing_remote_url_untouched() {
        let fx = fixture();
        Repository::open(fx.handle.path())
            .unwrap()
            .remote("hosted", "https://mirror.example.com/custom.git")
            .unwrap();

        let session = session(FakeHostedService::new("acme", &fx.hosted_root).with_repo("tools"));
        let binding = RemoteBinder::new(&session, "hosted").ensure_bound(&fx.handle).unwrap();
        assert!(!binding.created);

        let local = LocalRepository::open(fx.handle.path()).unwrap();
        assert_eq!(
            local.remote_url("hosted").unwrap().as_deref(),
            Some("https://mirror.example.com/custom.git")
        );
    }

    #[test]
    fn test_hosted_failure_propagates_and_is_not_cached() {
        let fx = fixture();
        let fake = FakeHostedService::new("acme", &fx.hosted_root);
        fake.fail_lookups(1);
        let session = session(fake.clone());
        let binder = RemoteBinder::new(&session, "hosted");

        let err = binder.ensure_bound(&fx.handle).unwrap_err();
        assert!(matches!(err, MigrateError::Hosted(_)));
        assert!(err.is_transient());

        assert!(binder.ensure_bound(&fx.handle).unwrap().created);
        assert_eq!(fake.lookups(), 2);
        assert!(session.service().get_repo("acme", "tools").unwrap().is_some());
    }
}

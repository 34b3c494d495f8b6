//! In-process hosted service backed by local bare repositories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::Repository;
use parking_lot::Mutex;

use crate::hosted::{HostedError, HostedRepo, HostedResult, HostedService, Organization};

#[derive(Default)]
struct FakeState {
    repos: HashMap<String, HostedRepo>,
    lookups: usize,
    creates: usize,
    failing_lookups: usize,
    org_checks: usize,
    failing_org_checks: usize,
}

/// Every "hosted" repository is a bare repository under `root`, so pushes to
/// its clone URL go over the local transport. Clones share state, so a test
/// can keep one to inspect call counts after boxing the other into a session.
#[derive(Clone)]
pub(crate) struct FakeHostedService {
    org: String,
    root: PathBuf,
    state: Arc<Mutex<FakeState>>,
}

impl FakeHostedService {
    pub(crate) fn new(org: &str, root: &Path) -> Self {
        Self {
            org: org.to_string(),
            root: root.to_path_buf(),
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Pre-create a hosted repository.
    pub(crate) fn with_repo(self, name: &str) -> Self {
        let repo = self.init(name);
        self.state.lock().repos.insert(name.to_string(), repo);
        self
    }

    /// Make the next `n` lookups fail like a rate-limited API.
    pub(crate) fn fail_lookups(&self, n: usize) {
        self.state.lock().failing_lookups = n;
    }

    /// Make the next `n` organization checks fail like a rate-limited API.
    pub(crate) fn fail_organization(&self, n: usize) {
        self.state.lock().failing_org_checks = n;
    }

    pub(crate) fn organization_checks(&self) -> usize {
        self.state.lock().org_checks
    }

    pub(crate) fn lookups(&self) -> usize {
        self.state.lock().lookups
    }

    pub(crate) fn creates(&self) -> usize {
        self.state.lock().creates
    }

    /// On-disk location of a hosted repository.
    pub(crate) fn repo_path(&self, name: &str) -> PathBuf {
        self.root.join(&self.org).join(format!("{name}.git"))
    }

    fn init(&self, name: &str) -> HostedRepo {
        let path = self.repo_path(name);
        Repository::init_bare(&path).expect("init fake hosted repository");
        HostedRepo {
            name: name.to_string(),
            full_name: format!("{}/{}", self.org, name),
            clone_url: path.to_string_lossy().into_owned(),
        }
    }
}

impl HostedService for FakeHostedService {
    fn organization(&self, org: &str) -> HostedResult<Organization> {
        let mut state = self.state.lock();
        state.org_checks += 1;
        if state.failing_org_checks > 0 {
            state.failing_org_checks -= 1;
            return Err(HostedError::api_error(403, "API rate limit exceeded"));
        }
        if org == self.org {
            Ok(Organization { login: org.to_string() })
        } else {
            Err(HostedError::NotFound(format!("organization {org}")))
        }
    }

    fn get_repo(&self, org: &str, name: &str) -> HostedResult<Option<HostedRepo>> {
        let mut state = self.state.lock();
        state.lookups += 1;
        if state.failing_lookups > 0 {
            state.failing_lookups -= 1;
            return Err(HostedError::api_error(403, "API rate limit exceeded"));
        }
        if org != self.org {
            return Ok(None);
        }
        Ok(state.repos.get(name).cloned())
    }

    fn create_repo(&self, org: &str, name: &str) -> HostedResult<HostedRepo> {
        if org != self.org {
            return Err(HostedError::NotFound(format!("organization {org}")));
        }
        let mut state = self.state.lock();
        if state.repos.contains_key(name) {
            return Err(HostedError::api_error(422, "name already exists on this account"));
        }
        state.creates += 1;
        let repo = self.init(name);
        state.repos.insert(name.to_string(), repo.clone());
        Ok(repo)
    }
}

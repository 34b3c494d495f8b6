//! Per-run session: credentials plus an authenticated hosted client.
//!
//! Built once by the caller before the batch starts and passed by reference
//! to the binder and push driver. Nothing is initialized lazily behind their
//! backs.

use std::thread;

use tracing::{info, warn};

use crate::config::{MigrateConfig, RetryPolicy};
use crate::hosted::{
    default_hosts_file, Credentials, GitHubClient, HostedError, HostedResult, HostedService,
    Organization,
};

pub struct Session {
    credentials: Option<Credentials>,
    service: Box<dyn HostedService>,
    organization: Organization,
}

impl Session {
    /// Load credentials, build the GitHub client and check the organization.
    ///
    /// The organization check is retried under the configured policy while
    /// it fails transiently (network, rate limit, server error).
    pub fn establish(config: &MigrateConfig) -> HostedResult<Self> {
        let hosts_file = config
            .hosts_file
            .clone()
            .or_else(default_hosts_file)
            .ok_or_else(|| HostedError::Credentials("no hosts file and HOME is not set".into()))?;

        let credentials = Credentials::load(&hosts_file, &config.host)?;
        info!(
            host = credentials.host(),
            user = credentials.user().unwrap_or("-"),
            "loaded credentials"
        );
        let client = GitHubClient::new(&config.api_url, &credentials, config.http_timeout)?
            .private(config.private);

        Self::with_retry(Box::new(client), Some(credentials), &config.organization, &config.retry)
    }

    /// Wrap an already-built service, verifying `organization` exists.
    pub fn with_service(
        service: Box<dyn HostedService>,
        credentials: Option<Credentials>,
        organization: &str,
    ) -> HostedResult<Self> {
        Self::with_retry(service, credentials, organization, &RetryPolicy::attempts(1))
    }

    /// Like [`Session::with_service`], retrying transient failures of the
    /// organization check under `policy`.
    pub fn with_retry(
        service: Box<dyn HostedService>,
        credentials: Option<Credentials>,
        organization: &str,
        policy: &RetryPolicy,
    ) -> HostedResult<Self> {
        let mut attempt = 0;
        let organization = loop {
            attempt += 1;
            let delay = policy.delay_before(attempt);
            if !delay.is_zero() {
                thread::sleep(delay);
            }

            match service.organization(organization) {
                Ok(found) => break found,
                Err(e) if e.is_transient() && policy.allows_retry(attempt) => {
                    warn!(org = organization, attempt, error = %e, "organization check failed, retrying");
                }
                Err(e) => return Err(e),
            }
        };
        info!(org = %organization.login, "hosted session established");

        Ok(Self {
            credentials,
            service,
            organization,
        })
    }

    pub fn service(&self) -> &dyn HostedService {
        self.service.as_ref()
    }

    /// Owning organization login.
    pub fn organization(&self) -> &str {
        &self.organization.login
    }

    /// Token offered to git when a push needs credentials.
    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(Credentials::token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosted::fake::FakeHostedService;
    use tempfile::TempDir;

    #[test]
    fn test_session_checks_organization() {
        let dir = TempDir::new().unwrap();

        let session = Session::with_service(
            Box::new(FakeHostedService::new("acme", dir.path())),
            Some(Credentials::new("github.com", "tok")),
            "acme",
        )
        .unwrap();
        assert_eq!(session.organization(), "acme");
        assert_eq!(session.token(), Some("tok"));

        let missing = Session::with_service(
            Box::new(FakeHostedService::new("acme", dir.path())),
            None,
            "other",
        );
        assert!(matches!(missing, Err(HostedError::NotFound(_))));
    }

    #[test]
    fn test_rate_limited_organization_check_is_retried() {
        let dir = TempDir::new().unwrap();
        let fake = FakeHostedService::new("acme", dir.path());
        fake.fail_organization(2);

        let session =
            Session::with_retry(Box::new(fake.clone()), None, "acme", &RetryPolicy::attempts(3))
                .unwrap();
        assert_eq!(session.organization(), "acme");
        assert_eq!(fake.organization_checks(), 3);
    }

    #[test]
    fn test_organization_check_gives_up() {
        let dir = TempDir::new().unwrap();
        let fake = FakeHostedService::new("acme", dir.path());
        fake.fail_organization(5);

        let result =
            Session::with_retry(Box::new(fake.clone()), None, "acme", &RetryPolicy::attempts(2));
        assert!(matches!(result, Err(HostedError::ApiError { status: 403, .. })));
        assert_eq!(fake.organization_checks(), 2);
    }

    #[test]
    fn test_missing_organization_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let fake = FakeHostedService::new("acme", dir.path());

        let result =
            Session::with_retry(Box::new(fake.clone()), None, "other", &RetryPolicy::attempts(5));
        assert!(matches!(result, Err(HostedError::NotFound(_))));
        assert_eq!(fake.organization_checks(), 1);
    }

    #[test]
    fn test_establish_without_hosts_file() {
        let dir = TempDir::new().unwrap();
        let config = MigrateConfig::new("acme").hosts_file(dir.path().join("absent.json"));

        let result = Session::establish(&config);
        assert!(matches!(result, Err(HostedError::Credentials(_))));
    }
}

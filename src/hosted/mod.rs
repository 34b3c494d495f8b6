//! Hosted-repository service.
//!
//! The migration only needs three calls from the hosting side: check the
//! owning organization, look a repository up by name and create it. They
//! sit behind [`HostedService`] so the binder can run against GitHub or
//! against a local fake in tests.

mod credentials;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod github;

use serde::Deserialize;

pub use credentials::{default_hosts_file, Credentials};
pub use error::{HostedError, HostedResult};
pub use github::{GitHubClient, DEFAULT_API_URL};

/// An organization on the hosted service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Organization {
    pub login: String,
}

/// A repository on the hosted service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostedRepo {
    pub name: String,
    pub full_name: String,
    /// URL the local repository pushes to
    pub clone_url: String,
}

/// Operations consumed from the hosted service.
pub trait HostedService {
    /// Look up the owning organization; fails if it doesn't exist.
    fn organization(&self, org: &str) -> HostedResult<Organization>;

    /// Look up `org/name`; `Ok(None)` when it doesn't exist.
    fn get_repo(&self, org: &str, name: &str) -> HostedResult<Option<HostedRepo>>;

    /// Create `org/name`.
    fn create_repo(&self, org: &str, name: &str) -> HostedResult<HostedRepo>;
}

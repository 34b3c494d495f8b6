//! Migration configuration.
//!
//! Defines every tunable of a run: the owning organization, which branch and
//! remote to use, where scratch clones live, the license assets, the
//! hosted API endpoint and the retry policy.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::git::{BranchName, GitSignature};
use crate::hosted::DEFAULT_API_URL;
use crate::migrate::{MigrateError, MigrateResult};

/// Message of the license commit.
pub const LICENSE_COMMIT_MESSAGE: &str = "Adding LICENSE info";

/// How often a failing repository is retried and how long to wait between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per repository before it is given up on; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Pause before the second cycle; doubled for every further cycle.
    pub base_delay: Duration,
    /// Upper bound for the pause between cycles.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Retry forever without pausing.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Give up after `max_attempts`, without pausing.
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::unbounded()
        }
    }

    pub fn with_delay(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    /// Whether an item that has failed `attempts` times may be queued again.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }

    /// Pause before starting cycle `cycle` (1-based); the first cycle never waits.
    pub fn delay_before(&self, cycle: u32) -> Duration {
        if cycle <= 1 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(cycle.saturating_sub(2).min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Configuration of a migration run.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Organization owning the hosted repositories.
    pub organization: String,
    /// Primary branch that is probed, committed to and pushed.
    pub branch: BranchName,
    /// Name of the local remote pointing at the hosted repository.
    pub remote_name: String,
    /// Parent directory for license-injection clones.
    pub scratch_root: PathBuf,
    /// License text copied into repositories that lack one.
    pub license_file: PathBuf,
    /// Default README appended to (or copied into) those repositories.
    pub readme_file: PathBuf,
    /// Repository names that are located but never migrated.
    pub excluded: Vec<String>,
    /// Author and committer of the license commit.
    pub signature: GitSignature,
    pub commit_message: String,
    /// Hosted API base URL.
    pub api_url: String,
    /// Key of the hosts file entry holding the token.
    pub host: String,
    /// Hosts file; `None` uses the per-user default.
    pub hosts_file: Option<PathBuf>,
    /// Bound on every hosted API request.
    pub http_timeout: Duration,
    /// Create hosted repositories as private.
    pub private: bool,
    pub retry: RetryPolicy,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            organization: String::new(),
            branch: BranchName::main(),
            remote_name: "origin-hosted".to_string(),
            scratch_root: std::env::temp_dir().join("gitmigrate-scratch"),
            license_file: bundled_asset("LICENSE"),
            readme_file: bundled_asset("README.md"),
            excluded: Vec::new(),
            signature: GitSignature::migrator(),
            commit_message: LICENSE_COMMIT_MESSAGE.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            host: "github.com".to_string(),
            hosts_file: None,
            http_timeout: Duration::from_secs(30),
            private: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl MigrateConfig {
    /// Create a configuration for `organization` with defaults.
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            ..Self::default()
        }
    }

    /// Set the primary branch.
    pub fn branch(mut self, branch: BranchName) -> Self {
        self.branch = branch;
        self
    }

    /// Set the hosted remote name.
    pub fn remote_name(mut self, name: impl Into<String>) -> Self {
        self.remote_name = name.into();
        self
    }

    /// Set the scratch root.
    pub fn scratch_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_root = path.into();
        self
    }

    /// Set the license and default README sources.
    pub fn license_assets(mut self, license: impl Into<PathBuf>, readme: impl Into<PathBuf>) -> Self {
        self.license_file = license.into();
        self.readme_file = readme.into();
        self
    }

    /// Add a repository name to skip.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.excluded.push(name.into());
        self
    }

    /// Set the hosted API endpoint.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the hosts file.
    pub fn hosts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_file = Some(path.into());
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create hosted repositories as private.
    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> MigrateResult<()> {
        if self.organization.trim().is_empty() {
            return Err(MigrateError::InvalidConfig("organization cannot be empty".into()));
        }

        if self.remote_name.trim().is_empty() || self.remote_name.contains(char::is_whitespace) {
            return Err(MigrateError::InvalidConfig(format!(
                "invalid remote name '{}'",
                self.remote_name
            )));
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(MigrateError::InvalidConfig(
                "api_url must start with http:// or https://".into(),
            ));
        }

        if self.http_timeout.is_zero() {
            return Err(MigrateError::InvalidConfig("http_timeout must be greater than 0".into()));
        }

        if self.retry.max_attempts == Some(0) {
            return Err(MigrateError::InvalidConfig("max_attempts must be greater than 0".into()));
        }

        for asset in [&self.license_file, &self.readme_file] {
            if !asset.is_file() {
                return Err(MigrateError::InvalidConfig(format!(
                    "missing license asset {}",
                    asset.display()
                )));
            }
        }

        Ok(())
    }
}

/// `assets/<name>` next to the executable, falling back to the working directory.
fn bundled_asset(name: &str) -> PathBuf {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .map(|dir| dir.join("assets").join(name));

    match beside_exe {
        Some(path) if path.is_file() => path,
        _ => PathBuf::from("assets").join(name),
    }
}

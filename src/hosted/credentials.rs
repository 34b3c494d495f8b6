//! Per-host OAuth tokens read from a local JSON hosts file.
//!
//! ```json
//! { "github.com": { "oauth_token": "gho_...", "user": "someone" } }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::hosted::error::{HostedError, HostedResult};

#[derive(Debug, Deserialize)]
struct HostEntry {
    oauth_token: String,
    #[serde(default)]
    user: Option<String>,
}

/// Token for a single host.
#[derive(Clone)]
pub struct Credentials {
    host: String,
    token: String,
    user: Option<String>,
}

impl Credentials {
    /// Build credentials directly from a token.
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            user: None,
        }
    }

    /// Read the hosts file at `path` and pick the entry for `host`.
    pub fn load(path: &Path, host: &str) -> HostedResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            HostedError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text, host)
    }

    /// Parse a hosts document and pick the entry for `host`.
    pub fn from_json(text: &str, host: &str) -> HostedResult<Self> {
        let mut hosts: HashMap<String, HostEntry> = serde_json::from_str(text)
            .map_err(|e| HostedError::Credentials(format!("malformed hosts file: {e}")))?;

        let entry = hosts
            .remove(host)
            .ok_or_else(|| HostedError::Credentials(format!("no entry for host {host}")))?;

        if entry.oauth_token.trim().is_empty() {
            return Err(HostedError::Credentials(format!("empty oauth_token for host {host}")));
        }

        Ok(Self {
            host: host.to_string(),
            token: entry.oauth_token.trim().to_string(),
            user: entry.user,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// `$HOME/.config/gitmigrate/hosts.json`
pub fn default_hosts_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("gitmigrate")
            .join("hosts.json")
    })
}

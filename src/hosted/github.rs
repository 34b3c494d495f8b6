//! GitHub REST backend for [`HostedService`].
//!
//! Blocking client: the migration runs one repository at a time, so there is
//! nothing to gain from an async runtime here.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::hosted::credentials::Credentials;
use crate::hosted::error::{HostedError, HostedResult};
use crate::hosted::{HostedRepo, HostedService, Organization};

/// Default public API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT_JSON: &str = "application/vnd.github+json";

#[derive(Debug, Serialize)]
struct CreateRepo<'a> {
    name: &'a str,
    private: bool,
}

/// HTTP client for the GitHub repository API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// Base URL of the API (e.g., "https://api.github.com")
    base_url: String,
    /// HTTP client instance carrying the auth headers
    client: Client,
    /// Create new repositories as private
    private: bool,
}

impl GitHubClient {
    /// Create an authenticated client.
    ///
    /// Every request made through it is bounded by `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        credentials: &Credentials,
        timeout: Duration,
    ) -> HostedResult<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credentials.token()))
            .map_err(|_| HostedError::Credentials("token is not a valid header value".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let base_url = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            private: false,
        })
    }

    /// Create repositories as private instead of public.
    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body.
    fn handle_response<T: DeserializeOwned>(&self, response: Response) -> HostedResult<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HostedError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .map_err(|e| HostedError::ParseError(format!("failed to parse JSON response: {}", e)))
    }
}

impl HostedService for GitHubClient {
    fn organization(&self, org: &str) -> HostedResult<Organization> {
        let url = format!("{}/orgs/{}", self.base_url, org);
        let response = self.client.get(&url).send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(HostedError::NotFound(format!("organization {org}")));
        }
        self.handle_response(response)
    }

    fn get_repo(&self, org: &str, name: &str) -> HostedResult<Option<HostedRepo>> {
        let url = format!("{}/repos/{}/{}", self.base_url, org, name);
        let response = self.client.get(&url).send()?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(org, name, "hosted repository does not exist");
            return Ok(None);
        }
        self.handle_response(response).map(Some)
    }

    fn create_repo(&self, org: &str, name: &str) -> HostedResult<HostedRepo> {
        let url = format!("{}/orgs/{}/repos", self.base_url, org);
        let body = CreateRepo {
            name,
            private: self.private,
        };
        let response = self.client.post(&url).json(&body).send()?;

        self.handle_response(response)
    }
}

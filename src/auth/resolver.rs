//! auth::resolver
//!
//! Installation discovery for a (owner, repo) pair.
//!
//! # Design
//!
//! GitHub answers "which installation covers this repository" at
//! `GET /repos/{owner}/{repo}/installation`, authenticated with a bare
//! identity assertion. A 404 is a routine outcome - many repositories have
//! no installation - and is reported as `Ok(None)`, never as an error.
//!
//! The resolver is stateless: every call signs a fresh assertion and
//! re-resolves. Resolution is cheap relative to token exchange, so callers
//! that need caching layer it themselves.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::errors::AuthError;
use super::signer::AssertionSigner;
use super::{DEFAULT_API_BASE, USER_AGENT_VALUE};

/// Response from `GET /repos/{owner}/{repo}/installation`.
#[derive(Debug, Deserialize)]
struct InstallationResponse {
    id: u64,
}

/// App metadata from `GET /app`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppInfo {
    /// Numeric app id
    pub id: u64,
    /// URL-safe app name
    pub slug: Option<String>,
    /// Display name
    pub name: String,
}

/// Resolves which installation covers a repository.
pub struct InstallationResolver {
    client: Client,
    signer: Arc<AssertionSigner>,
    api_base: String,
}

impl InstallationResolver {
    /// Create a resolver against the public GitHub API.
    pub fn new(signer: Arc<AssertionSigner>) -> Self {
        Self::with_api_base(signer, DEFAULT_API_BASE)
    }

    /// Create a resolver with a custom API base URL (GitHub Enterprise).
    pub fn with_api_base(signer: Arc<AssertionSigner>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            signer,
            api_base: api_base.into(),
        }
    }

    /// Resolve the installation id for a repository.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(id))` - the app is installed on the repository
    /// * `Ok(None)` - no installation (GitHub returned 404)
    ///
    /// # Errors
    ///
    /// Any other non-success status surfaces as [`AuthError::GitHubApi`];
    /// transport failures as [`AuthError::Network`].
    pub async fn resolve(&self, owner: &str, repo: &str) -> Result<Option<u64>, AuthError> {
        let url = format!("{}/repos/{}/{}/installation", self.api_base, owner, repo);
        let response = self.get_with_assertion(&url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AuthError::from_response(response).await);
        }

        let data: InstallationResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        Ok(Some(data.id))
    }

    /// Fetch metadata about the app itself.
    pub async fn app_info(&self) -> Result<AppInfo, AuthError> {
        let url = format!("{}/app", self.api_base);
        let response = self.get_with_assertion(&url).await?;

        if !response.status().is_success() {
            return Err(AuthError::from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    /// Issue a GET with a freshly signed assertion as the bearer credential.
    async fn get_with_assertion(&self, url: &str) -> Result<reqwest::Response, AuthError> {
        let assertion = self.signer.sign()?;
        let response = self
            .client
            .get(url)
            .bearer_auth(assertion.token())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, USER_AGENT_VALUE)
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await?;
        Ok(response)
    }
}

impl std::fmt::Debug for InstallationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationResolver")
            .field("app_id", &self.signer.app_id())
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test-key.pem"));

    fn test_resolver(api_base: &str) -> InstallationResolver {
        let signer =
            Arc::new(AssertionSigner::from_pem(7, TEST_KEY.as_bytes()).expect("test key"));
        InstallationResolver::with_api_base(signer, api_base)
    }

    #[test]
    fn default_api_base_is_public_github() {
        let signer =
            Arc::new(AssertionSigner::from_pem(7, TEST_KEY.as_bytes()).expect("test key"));
        let resolver = InstallationResolver::new(signer);
        assert_eq!(resolver.api_base, "https://api.github.com");
    }

    #[test]
    fn debug_shows_app_id_not_key() {
        let resolver = test_resolver("http://localhost:0");
        let debug = format!("{:?}", resolver);
        assert!(debug.contains('7'));
        assert!(!debug.contains("PRIVATE KEY"));
    }

    #[test]
    fn installation_response_decodes_id() {
        let data: InstallationResponse =
            serde_json::from_str(r#"{"id": 99, "account": {"login": "octocat"}}"#)
                .expect("decode");
        assert_eq!(data.id, 99);
    }

    #[test]
    fn installation_response_requires_id() {
        let result: Result<InstallationResponse, _> =
            serde_json::from_str(r#"{"account": {"login": "octocat"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn app_info_decodes_subset() {
        let info: AppInfo = serde_json::from_str(
            r#"{"id": 12, "slug": "ci-bot", "name": "CI Bot", "owner": {"login": "org"}}"#,
        )
        .expect("decode");
        assert_eq!(info.id, 12);
        assert_eq!(info.slug.as_deref(), Some("ci-bot"));
        assert_eq!(info.name, "CI Bot");
    }
}

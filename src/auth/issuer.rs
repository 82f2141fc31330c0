//! auth::issuer
//!
//! Exchange of identity assertions for installation access tokens.
//!
//! # Design
//!
//! GitHub App credentials work in two hops: a self-signed assertion proves
//! "I am app X", then `POST /app/installations/{id}/access_tokens` exchanges
//! it for a scoped, time-limited token usable against the normal REST API.
//! The issuer orchestrates the hop and fronts it with the expiry-aware
//! [`TokenCache`]:
//!
//! 1. On a cache hit the token is returned with no network call.
//! 2. On a miss, staleness, or forced refresh: sign, exchange, cache, return.
//!
//! A non-success exchange surfaces as [`AuthError::GitHubApi`] and caches
//! nothing. There is no automatic retry here; a caller that observes a 401
//! downstream forces one refresh and retries once (see [`crate::github`]).
//!
//! Callers may narrow the token below the installation's default grant by
//! supplying a requested-permissions map.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::cache::{parse_expires_at, TokenCache};
use super::errors::AuthError;
use super::signer::AssertionSigner;
use super::{DEFAULT_API_BASE, USER_AGENT_VALUE};

/// Requested capability restrictions for an exchange, e.g.
/// `{"contents": "read"}`.
pub type Permissions = HashMap<String, String>;

/// Response from `POST /app/installations/{id}/access_tokens`.
///
/// Both fields are required; a payload missing either is rejected rather
/// than half-decoded.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: String,
}

/// Issues installation access tokens, caching them per installation.
pub struct TokenIssuer {
    client: Client,
    signer: Arc<AssertionSigner>,
    cache: TokenCache,
    api_base: String,
}

impl TokenIssuer {
    /// Create an issuer against the public GitHub API.
    pub fn new(signer: Arc<AssertionSigner>) -> Self {
        Self::with_api_base(signer, DEFAULT_API_BASE)
    }

    /// Create an issuer with a custom API base URL (GitHub Enterprise).
    pub fn with_api_base(signer: Arc<AssertionSigner>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            signer,
            cache: TokenCache::new(),
            api_base: api_base.into(),
        }
    }

    /// Get a valid access token for an installation.
    ///
    /// Served from cache while fresh; otherwise a new exchange is performed
    /// and cached. `force_refresh` skips the cache consultation entirely.
    pub async fn get_token(
        &self,
        installation: u64,
        force_refresh: bool,
    ) -> Result<String, AuthError> {
        self.get_token_with(installation, None, force_refresh).await
    }

    /// Get a token restricted to the given permissions.
    ///
    /// Permission-restricted tokens bypass the shared cache on both read and
    /// write: the cache holds only default-grant tokens, so a narrowed token
    /// can never leak to a caller expecting the full grant.
    pub async fn get_token_with(
        &self,
        installation: u64,
        permissions: Option<&Permissions>,
        force_refresh: bool,
    ) -> Result<String, AuthError> {
        if !force_refresh && permissions.is_none() {
            if let Some(token) = self.cache.get(installation) {
                return Ok(token);
            }
        }

        let (token, expires_at) = self.exchange(installation, permissions).await?;
        if permissions.is_none() {
            self.cache.put(installation, &token, expires_at);
        }
        Ok(token)
    }

    /// The adjusted expiry of the currently cached token, if fresh.
    pub fn token_expires_at(&self, installation: u64) -> Option<DateTime<Utc>> {
        self.cache.expires_at(installation)
    }

    /// Perform one assertion-authenticated exchange call.
    async fn exchange(
        &self,
        installation: u64,
        permissions: Option<&Permissions>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let assertion = self.signer.sign()?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_base, installation
        );

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(assertion.token())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, USER_AGENT_VALUE)
            .header("X-GitHub-Api-Version", "2022-11-28");

        if let Some(permissions) = permissions {
            request = request.json(&serde_json::json!({ "permissions": permissions }));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AuthError::from_response(response).await);
        }

        let data: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let expires_at = parse_expires_at(&data.expires_at)?;

        Ok((data.token, expires_at))
    }
}

// Custom Debug to avoid exposing cached tokens or key material
impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("app_id", &self.signer.app_id())
            .field("api_base", &self.api_base)
            .field("cached_installations", &self.cache.len())
            .finish()
    }
}

//! auth::broker
//!
//! Public facade for obtaining repository credentials.
//!
//! # Design
//!
//! The broker joins installation discovery and token issuance behind one
//! call: given (owner, repo) it resolves the covering installation, then
//! asks the issuer for a token. A repository with no installation yields
//! `Ok(None)` - an expected, reportable condition for orchestration code to
//! branch on, never an error.
//!
//! When a single installation id is known up front (configured rather than
//! discovered) the broker skips resolution entirely and issues against that
//! id directly.
//!
//! On top of the raw token, two derivations for CI hand-off:
//! - [`clone_command`](CredentialBroker::clone_command) - an authenticated
//!   `git clone` invocation
//! - [`credentials_bundle`](CredentialBroker::credentials_bundle) - a
//!   structured `{token, token_type, expires_at}` record for JSON export

use std::sync::Arc;

use serde::Serialize;

use super::errors::AuthError;
use super::issuer::TokenIssuer;
use super::resolver::{AppInfo, InstallationResolver};
use super::signer::AssertionSigner;
use crate::config::Config;

/// Default host used in authenticated clone URLs.
pub const DEFAULT_HOST: &str = "github.com";

/// Structured credential record for hand-off to an external orchestrator.
#[derive(Clone, Serialize)]
pub struct CredentialsBundle {
    /// The installation access token
    pub token: String,
    /// Always `"installation"`
    pub token_type: String,
    /// Adjusted expiry as RFC 3339, when known
    pub expires_at: Option<String>,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for CredentialsBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsBundle")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Facade over resolution and issuance.
///
/// Cheap to share behind an [`Arc`]; the embedded token cache is the
/// process-wide one.
pub struct CredentialBroker {
    resolver: InstallationResolver,
    issuer: TokenIssuer,
    /// Pre-known installation id; skips per-repository resolution when set.
    installation_id: Option<u64>,
    /// Host embedded in clone URLs.
    host: String,
}

impl CredentialBroker {
    /// Create a broker against the public GitHub API.
    pub fn new(signer: Arc<AssertionSigner>) -> Self {
        Self::with_api_base(signer, super::DEFAULT_API_BASE)
    }

    /// Create a broker with a custom API base URL.
    pub fn with_api_base(signer: Arc<AssertionSigner>, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        Self {
            resolver: InstallationResolver::with_api_base(Arc::clone(&signer), api_base.clone()),
            issuer: TokenIssuer::with_api_base(signer, api_base),
            installation_id: None,
            host: DEFAULT_HOST.to_string(),
        }
    }

    /// Build a broker from validated configuration.
    ///
    /// Loads and parses the private key; a missing or malformed key fails
    /// here with [`AuthError::KeyLoad`], before any network activity.
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        let signer = Arc::new(AssertionSigner::from_key_file(
            config.app_id,
            &config.private_key_path,
        )?);
        let mut broker = Self::with_api_base(signer, &config.api_base).with_host(&config.host);
        if let Some(id) = config.installation_id {
            broker = broker.with_installation(id);
        }
        Ok(broker)
    }

    /// Use a pre-known installation id instead of per-repository resolution.
    pub fn with_installation(mut self, installation_id: u64) -> Self {
        self.installation_id = Some(installation_id);
        self
    }

    /// Set the host used in clone URLs.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// The installation covering a repository, honoring the configured bypass.
    pub async fn installation_for(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<u64>, AuthError> {
        match self.installation_id {
            Some(id) => Ok(Some(id)),
            None => self.resolver.resolve(owner, repo).await,
        }
    }

    /// Get a usable access token for a repository.
    ///
    /// Returns `Ok(None)` when the app has no installation there; no token
    /// exchange is attempted in that case.
    pub async fn credential_for(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<String>, AuthError> {
        match self.installation_for(owner, repo).await? {
            Some(id) => Ok(Some(self.issuer.get_token(id, false).await?)),
            None => Ok(None),
        }
    }

    /// Force a fresh exchange for a repository's token.
    ///
    /// Used by consumers that observed an authentication-rejected response
    /// and want to retry exactly once with a new token.
    pub async fn refresh_credential_for(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<String>, AuthError> {
        match self.installation_for(owner, repo).await? {
            Some(id) => Ok(Some(self.issuer.get_token(id, true).await?)),
            None => Ok(None),
        }
    }

    /// An authenticated `git clone` command for a repository.
    pub async fn clone_command(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<String>, AuthError> {
        let Some(token) = self.credential_for(owner, repo).await? else {
            return Ok(None);
        };
        Ok(Some(format!(
            "git clone https://x-access-token:{}@{}/{}/{}.git",
            token, self.host, owner, repo
        )))
    }

    /// A structured credential record for a repository.
    pub async fn credentials_bundle(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<CredentialsBundle>, AuthError> {
        let Some(installation) = self.installation_for(owner, repo).await? else {
            return Ok(None);
        };
        let token = self.issuer.get_token(installation, false).await?;
        let expires_at = self
            .issuer
            .token_expires_at(installation)
            .map(|t| t.to_rfc3339());

        Ok(Some(CredentialsBundle {
            token,
            token_type: "installation".to_string(),
            expires_at,
        }))
    }

    /// Metadata about the app itself.
    pub async fn app_info(&self) -> Result<AppInfo, AuthError> {
        self.resolver.app_info().await
    }
}

impl std::fmt::Debug for CredentialBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBroker")
            .field("installation_id", &self.installation_id)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

//! auth - GitHub App credential issuance
//!
//! This module implements the two-hop GitHub App trust model: a self-signed
//! RS256 assertion proves the app's identity, and an exchange call converts
//! it into a scoped, time-limited installation access token for ordinary
//! REST calls.
//!
//! # Components
//!
//! - [`AssertionSigner`] - loads the private key, mints 10-minute assertions
//! - [`InstallationResolver`] - maps (owner, repo) to an installation id
//! - [`TokenCache`] - expiry-aware store with a 5-minute safety margin
//! - [`TokenIssuer`] - cache-first orchestration of the exchange
//! - [`CredentialBroker`] - the public surface consumers use
//!
//! Data flows one direction: signer → issuer → cache ⇄ issuer → broker.
//! The resolver feeds the broker independently.
//!
//! # Security
//!
//! Tokens and key material never appear in logs, errors, or debug output.
//! All types holding secrets implement custom `Debug` that redacts them.
//!
//! # Example
//!
//! ```ignore
//! use ghcred::auth::{AssertionSigner, CredentialBroker};
//! use std::sync::Arc;
//!
//! let signer = Arc::new(AssertionSigner::from_key_file(app_id, &key_path)?);
//! let broker = CredentialBroker::new(signer);
//!
//! match broker.credential_for("octocat", "hello-world").await? {
//!     Some(token) => println!("got a token, {} chars", token.len()),
//!     None => eprintln!("app not installed for that repository"),
//! }
//! ```

pub mod broker;
pub mod cache;
mod errors;
mod issuer;
mod resolver;
mod signer;

pub use broker::{CredentialBroker, CredentialsBundle, DEFAULT_HOST};
pub use cache::{parse_expires_at, TokenCache, EXPIRY_MARGIN_SECS};
pub use errors::AuthError;
pub use issuer::{Permissions, TokenIssuer};
pub use resolver::{AppInfo, InstallationResolver};
pub use signer::{Assertion, AssertionSigner, ASSERTION_TTL_SECS};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
pub(crate) const USER_AGENT_VALUE: &str = "ghcred";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_ttl_is_ten_minutes() {
        assert_eq!(ASSERTION_TTL_SECS, 600);
    }

    #[test]
    fn expiry_margin_is_five_minutes() {
        assert_eq!(EXPIRY_MARGIN_SECS, 300);
    }

    #[test]
    fn default_api_base_is_public_github() {
        assert_eq!(DEFAULT_API_BASE, "https://api.github.com");
    }
}

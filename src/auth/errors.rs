//! auth::errors
//!
//! Error types for GitHub App credential issuance.
//!
//! # Design
//!
//! Expected absence (a repository with no app installation) is never an
//! error; those paths return `Option` instead. The variants here cover the
//! genuine failure modes: unusable key material, rejected or malformed API
//! responses, and transport failures.
//!
//! Error messages never contain token values or key bytes. Anything that
//! might carry a secret uses redacted placeholders.

use thiserror::Error;

/// Errors from credential issuance and authenticated API calls.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Private key is missing, unreadable, or not valid PEM.
    ///
    /// Fatal. Raised at signer construction, before any network call.
    #[error("failed to load private key: {0}")]
    KeyLoad(String),

    /// GitHub returned a non-success status.
    #[error("GitHub API error: {status} - {message}")]
    GitHubApi {
        /// HTTP status code
        status: u16,
        /// Error body from GitHub
        message: String,
    },

    /// A success response was missing required fields or carried values
    /// that could not be parsed.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The app has no installation covering the repository.
    ///
    /// Only raised by callers that require a token to proceed; the broker
    /// itself reports absence as `None`.
    #[error("no app installation found for {owner}/{repo}")]
    NoInstallation {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
    },

    /// Internal error (should not happen).
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Check if this error is fatal and should never be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuthError::KeyLoad(_))
    }

    /// Check if this error is a transient failure that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }

    /// Check if this error means the app must be installed on the repository.
    pub fn needs_app_install(&self) -> bool {
        matches!(self, AuthError::NoInstallation { .. })
    }

    /// Build a `GitHubApi` error from a non-success response, consuming the body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        AuthError::GitHubApi { status, message }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_load_is_fatal() {
        assert!(AuthError::KeyLoad("missing".into()).is_fatal());
        assert!(!AuthError::Network("timeout".into()).is_fatal());
    }

    #[test]
    fn is_transient_classification() {
        assert!(AuthError::Network("reset".into()).is_transient());

        assert!(!AuthError::KeyLoad("bad pem".into()).is_transient());
        assert!(!AuthError::GitHubApi {
            status: 500,
            message: "oops".into()
        }
        .is_transient());
    }

    #[test]
    fn needs_app_install_classification() {
        assert!(AuthError::NoInstallation {
            owner: "o".into(),
            repo: "r".into()
        }
        .needs_app_install());

        assert!(!AuthError::Network("err".into()).needs_app_install());
    }

    #[test]
    fn github_api_error_formatting() {
        let err = AuthError::GitHubApi {
            status: 401,
            message: "Bad credentials".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Bad credentials"));
    }

    #[test]
    fn no_installation_names_the_repo() {
        let err = AuthError::NoInstallation {
            owner: "octocat".to_string(),
            repo: "hello-world".to_string(),
        };
        assert!(err.to_string().contains("octocat/hello-world"));
    }

    #[test]
    fn error_messages_never_contain_token_patterns() {
        let errors = vec![
            AuthError::KeyLoad("no such file".to_string()),
            AuthError::GitHubApi {
                status: 404,
                message: "Not Found".to_string(),
            },
            AuthError::InvalidResponse("missing field `token`".to_string()),
            AuthError::Network("connection refused".to_string()),
            AuthError::NoInstallation {
                owner: "owner".to_string(),
                repo: "repo".to_string(),
            },
            AuthError::Internal("internal error".to_string()),
        ];

        for err in errors {
            let msg = err.to_string();
            assert!(
                !msg.contains("ghs_"),
                "Error message contains installation token pattern: {}",
                msg
            );
        }
    }
}

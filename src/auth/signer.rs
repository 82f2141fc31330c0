//! auth::signer
//!
//! RS256 assertion signing for GitHub App identity.
//!
//! # Design
//!
//! A GitHub App proves its identity with a short-lived JWT signed by the
//! app's private key: `iat` = now, `exp` = now + 10 minutes, `iss` = app id.
//! Ten minutes is the hard ceiling GitHub enforces, so the window is fixed
//! rather than configurable.
//!
//! The key is read and parsed once, at construction. A missing file or
//! malformed PEM fails immediately with [`AuthError::KeyLoad`] - no network
//! call is ever attempted with unusable key material.
//!
//! # Security
//!
//! Raw key bytes are dropped after parsing and are never logged or exposed.
//! [`Assertion`] and [`AssertionSigner`] both implement redacted `Debug`.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use super::errors::AuthError;

/// Assertion lifetime in seconds (the maximum GitHub accepts).
pub const ASSERTION_TTL_SECS: i64 = 600;

/// JWT claims for a GitHub App identity assertion.
#[derive(Debug, Serialize)]
struct AssertionClaims {
    /// Issued at (Unix timestamp)
    iat: i64,
    /// Expiration (Unix timestamp)
    exp: i64,
    /// Issuer (app id)
    iss: String,
}

/// A signed, time-bounded identity assertion.
///
/// Minted fresh for each exchange; never reused across calls.
#[derive(Clone)]
pub struct Assertion {
    token: String,
    /// When the assertion was signed.
    pub issued_at: DateTime<Utc>,
    /// When GitHub stops accepting it.
    pub expires_at: DateTime<Utc>,
}

impl Assertion {
    /// The encoded JWT, for use as a bearer credential.
    pub fn token(&self) -> &str {
        &self.token
    }
}

// Custom Debug to avoid exposing the signed token
impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assertion")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Signs identity assertions for one GitHub App.
///
/// Holds the parsed private key for the life of the process; no other state.
pub struct AssertionSigner {
    app_id: u64,
    key: EncodingKey,
}

impl AssertionSigner {
    /// Create a signer from a PEM private key file.
    ///
    /// # Errors
    ///
    /// [`AuthError::KeyLoad`] if the file cannot be read or is not a valid
    /// RSA private key.
    pub fn from_key_file(app_id: u64, path: &Path) -> Result<Self, AuthError> {
        let pem = std::fs::read(path).map_err(|e| {
            AuthError::KeyLoad(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_pem(app_id, &pem)
    }

    /// Create a signer from PEM private key bytes.
    pub fn from_pem(app_id: u64, pem: &[u8]) -> Result<Self, AuthError> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| AuthError::KeyLoad(format!("not a valid RSA private key: {}", e)))?;
        Ok(Self { app_id, key })
    }

    /// The app id this signer asserts as.
    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    /// Sign a fresh assertion valid for the next ten minutes.
    pub fn sign(&self) -> Result<Assertion, AuthError> {
        // Truncate to whole seconds so the claims and the returned instants agree.
        let now = Utc::now().timestamp();
        let issued_at = Utc
            .timestamp_opt(now, 0)
            .single()
            .ok_or_else(|| AuthError::Internal("timestamp out of range".to_string()))?;
        let expires_at = Utc
            .timestamp_opt(now + ASSERTION_TTL_SECS, 0)
            .single()
            .ok_or_else(|| AuthError::Internal("timestamp out of range".to_string()))?;

        let claims = AssertionClaims {
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
            iss: self.app_id.to_string(),
        };

        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| AuthError::Internal(format!("JWT signing failed: {}", e)))?;

        Ok(Assertion {
            token,
            issued_at,
            expires_at,
        })
    }
}

// Custom Debug to avoid exposing key material
impl std::fmt::Debug for AssertionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionSigner")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

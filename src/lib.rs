//! ghcred - GitHub App credential helper for CI pipelines
//!
//! ghcred issues and manages short-lived GitHub App credentials: it signs
//! identity assertions, exchanges them for installation access tokens,
//! caches tokens until a safety margin before expiry, and hands them to
//! downstream automation as raw tokens, JSON bundles, shell exports, or
//! authenticated clone commands.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to auth)
//! - [`auth`] - Assertion signing, installation resolution, token issuance
//!   and caching, and the credential broker facade
//! - [`github`] - Downstream REST operations consuming broker tokens
//! - [`config`] - Environment-driven configuration with fail-fast validation
//!
//! # Correctness Invariants
//!
//! 1. A token is returned only while now is before its margin-adjusted expiry
//! 2. A valid cached token is never re-exchanged unless a refresh is forced
//! 3. Missing installations are reported as absence, never as errors
//! 4. Key material and tokens never appear in logs, errors, or debug output

pub mod auth;
pub mod cli;
pub mod config;
pub mod github;

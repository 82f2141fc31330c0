//! auth::cache
//!
//! Expiry-aware cache for installation access tokens.
//!
//! # Design
//!
//! The cache maps installation id to a token and an adjusted expiry instant.
//! On insert, five minutes are subtracted from the expiry GitHub advertises,
//! so a token handed to a caller cannot lapse mid-request. An entry past its
//! adjusted expiry is treated as absent; stale entries are superseded by the
//! next successful exchange rather than swept.
//!
//! The cache is in-memory and process-scoped. Entries for different
//! installations are independent; there is no size bound beyond the number
//! of installations the app observes.
//!
//! # Concurrency
//!
//! All access goes through an interior mutex, so a get or put of one entry
//! is atomic - concurrent callers never observe a torn token/expiry pair.
//! Two callers racing on a miss may both exchange; that is harmless, and the
//! cache simply keeps whichever write lands last.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::errors::AuthError;

/// Safety margin subtracted from advertised expiry, in seconds.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// A cached installation token with its adjusted expiry.
#[derive(Clone)]
struct CachedToken {
    token: String,
    /// Advertised expiry minus the safety margin.
    adjusted_expiry: DateTime<Utc>,
}

/// In-memory token store keyed by installation id.
#[derive(Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<u64, CachedToken>>,
}

impl TokenCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached token for an installation, if still fresh.
    ///
    /// Returns `None` when no entry exists or `now >= adjusted expiry`.
    pub fn get(&self, installation: u64) -> Option<String> {
        let entries = self.entries.lock().expect("token cache poisoned");
        entries
            .get(&installation)
            .filter(|e| Utc::now() < e.adjusted_expiry)
            .map(|e| e.token.clone())
    }

    /// Store a token, applying the safety margin to its advertised expiry.
    pub fn put(&self, installation: u64, token: &str, expires_at: DateTime<Utc>) {
        let entry = CachedToken {
            token: token.to_string(),
            adjusted_expiry: expires_at - chrono::Duration::seconds(EXPIRY_MARGIN_SECS),
        };
        let mut entries = self.entries.lock().expect("token cache poisoned");
        entries.insert(installation, entry);
    }

    /// The adjusted expiry of a fresh entry, if one exists.
    pub fn expires_at(&self, installation: u64) -> Option<DateTime<Utc>> {
        let entries = self.entries.lock().expect("token cache poisoned");
        entries
            .get(&installation)
            .filter(|e| Utc::now() < e.adjusted_expiry)
            .map(|e| e.adjusted_expiry)
    }

    /// Number of entries held (fresh or stale).
    pub fn len(&self) -> usize {
        self.entries.lock().expect("token cache poisoned").len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Custom Debug to avoid exposing cached tokens
impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Parse an `expires_at` timestamp from a token exchange response.
///
/// GitHub emits RFC 3339 with a trailing `Z`; an explicit `+00:00` offset is
/// the same instant and must parse identically. The result is normalized to
/// UTC before storage.
pub fn parse_expires_at(raw: &str) -> Result<DateTime<Utc>, AuthError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AuthError::InvalidResponse(format!("bad expires_at '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    mod parse_expires_at_tests {
        use super::*;

        #[test]
        fn zulu_suffix() {
            let parsed = parse_expires_at("2024-01-01T12:00:00Z").expect("parse");
            assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");
        }

        #[test]
        fn explicit_offset() {
            let parsed = parse_expires_at("2024-01-01T12:00:00+00:00").expect("parse");
            assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");
        }

        #[test]
        fn zulu_and_offset_are_the_same_instant() {
            let zulu = parse_expires_at("2024-01-01T12:00:00Z").expect("parse");
            let offset = parse_expires_at("2024-01-01T12:00:00+00:00").expect("parse");
            assert_eq!(zulu, offset);
        }

        #[test]
        fn nonzero_offset_normalizes_to_utc() {
            let parsed = parse_expires_at("2024-01-01T13:00:00+01:00").expect("parse");
            let zulu = parse_expires_at("2024-01-01T12:00:00Z").expect("parse");
            assert_eq!(parsed, zulu);
        }

        #[test]
        fn garbage_is_invalid_response() {
            let result = parse_expires_at("not-a-timestamp");
            assert!(matches!(result, Err(AuthError::InvalidResponse(_))));
        }
    }

    mod token_cache_tests {
        use super::*;

        #[test]
        fn new_is_empty() {
            let cache = TokenCache::new();
            assert!(cache.is_empty());
            assert_eq!(cache.len(), 0);
        }

        #[test]
        fn put_and_get() {
            let cache = TokenCache::new();
            cache.put(42, "ghs_abc", Utc::now() + Duration::hours(1));

            assert_eq!(cache.get(42).as_deref(), Some("ghs_abc"));
        }

        #[test]
        fn get_unknown_installation_is_none() {
            let cache = TokenCache::new();
            assert!(cache.get(42).is_none());
        }

        #[test]
        fn installations_are_independent() {
            let cache = TokenCache::new();
            cache.put(1, "ghs_one", Utc::now() + Duration::hours(1));
            cache.put(2, "ghs_two", Utc::now() + Duration::hours(1));

            assert_eq!(cache.get(1).as_deref(), Some("ghs_one"));
            assert_eq!(cache.get(2).as_deref(), Some("ghs_two"));
        }

        #[test]
        fn margin_is_applied_on_put() {
            let cache = TokenCache::new();
            let expires = Utc::now() + Duration::hours(1);
            cache.put(42, "ghs_abc", expires);

            let adjusted = cache.expires_at(42).expect("entry");
            assert_eq!(expires - adjusted, Duration::seconds(EXPIRY_MARGIN_SECS));
        }

        #[test]
        fn entry_inside_margin_is_a_miss() {
            let cache = TokenCache::new();
            // Three minutes of advertised validity left; margin is five.
            cache.put(42, "ghs_abc", Utc::now() + Duration::minutes(3));

            assert!(cache.get(42).is_none());
            assert!(cache.expires_at(42).is_none());
        }

        #[test]
        fn entry_outside_margin_is_a_hit() {
            let cache = TokenCache::new();
            cache.put(42, "ghs_abc", Utc::now() + Duration::minutes(6));

            assert_eq!(cache.get(42).as_deref(), Some("ghs_abc"));
        }

        #[test]
        fn stale_entry_is_superseded_by_refresh() {
            let cache = TokenCache::new();
            cache.put(42, "ghs_old", Utc::now() + Duration::minutes(1));
            assert!(cache.get(42).is_none());

            cache.put(42, "ghs_new", Utc::now() + Duration::hours(1));
            assert_eq!(cache.get(42).as_deref(), Some("ghs_new"));
            // Superseded, not accumulated
            assert_eq!(cache.len(), 1);
        }

        #[test]
        fn debug_output_does_not_expose_tokens() {
            let cache = TokenCache::new();
            cache.put(42, "ghs_secret", Utc::now() + Duration::hours(1));

            let debug = format!("{:?}", cache);
            assert!(!debug.contains("ghs_secret"));
        }

        #[test]
        fn concurrent_put_and_get_are_atomic() {
            use std::sync::Arc;
            use std::thread;

            let cache = Arc::new(TokenCache::new());
            let expires = Utc::now() + Duration::hours(1);

            let writers: Vec<_> = (0..4)
                .map(|i| {
                    let cache = Arc::clone(&cache);
                    thread::spawn(move || {
                        for _ in 0..100 {
                            cache.put(42, &format!("ghs_{}", i), expires);
                        }
                    })
                })
                .collect();

            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    thread::spawn(move || {
                        for _ in 0..100 {
                            if let Some(token) = cache.get(42) {
                                assert!(token.starts_with("ghs_"));
                            }
                        }
                    })
                })
                .collect();

            for handle in writers.into_iter().chain(readers) {
                handle.join().expect("thread");
            }
        }
    }
}

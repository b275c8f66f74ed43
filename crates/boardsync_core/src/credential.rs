//! API keys accepted by the HTTP surface.
//!
//! Only the SHA-256 digest of a key is kept; the raw key never reaches the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A registered API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Hex-encoded SHA-256 digest of the raw key.
    pub key_hash: String,
    /// Keys are rejected from this instant on.
    pub expires_at: DateTime<Utc>,
}

impl ApiKey {
    /// Creates an entry for `raw_key`.
    pub fn new(raw_key: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            key_hash: hash_api_key(raw_key),
            expires_at,
        }
    }

    /// Returns true if the key is not yet expired at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Hex digest of a raw API key.
#[must_use]
pub fn hash_api_key(raw_key: &str) -> String {
    let digest = Sha256::digest(raw_key.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn hash_is_stable_hex() {
        let h = hash_api_key("secret");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_api_key("secret"));
        assert_ne!(h, hash_api_key("secret2"));
        assert!(!h.contains("secret"));
    }

    #[test]
    fn expiry_is_exclusive() {
        let now = Utc::now();
        let key = ApiKey::new("k", now + Duration::hours(1));
        assert!(key.is_valid_at(now));
        assert!(!key.is_valid_at(now + Duration::hours(1)));
    }
}

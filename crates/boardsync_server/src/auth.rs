//! API key authentication.
//!
//! Clients send a raw key in the `api-key` header. The store keeps only the
//! SHA-256 digest of each key together with its expiry.

use crate::error::{ServerError, ServerResult};
use boardsync_core::RecordStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "api-key";

/// Validates API keys against the record store.
#[derive(Clone)]
pub struct ApiKeyValidator {
    store: Arc<dyn RecordStore>,
}

impl ApiKeyValidator {
    /// Creates a validator backed by `store`.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Validates a key at the current time.
    pub fn validate(&self, key: Option<&str>) -> ServerResult<()> {
        self.validate_at(key, Utc::now())
    }

    /// Validates a key at `now`.
    pub fn validate_at(&self, key: Option<&str>, now: DateTime<Utc>) -> ServerResult<()> {
        let key = key.map(str::trim).filter(|k| !k.is_empty());
        let Some(key) = key else {
            return Err(ServerError::NotAuthorized);
        };
        if self.store.is_api_key_valid(key, now)? {
            Ok(())
        } else {
            Err(ServerError::NotAuthorized)
        }
    }
}

impl std::fmt::Debug for ApiKeyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsync_core::LocalRecordStore;
    use chrono::Duration;

    fn validator() -> (ApiKeyValidator, DateTime<Utc>) {
        let store = Arc::new(LocalRecordStore::open_in_memory());
        let now = Utc::now();
        store.add_api_key("secret", now + Duration::days(1)).unwrap();
        (ApiKeyValidator::new(store), now)
    }

    #[test]
    fn known_key_is_accepted() {
        let (validator, now) = validator();
        assert!(validator.validate_at(Some("secret"), now).is_ok());
        assert!(validator.validate_at(Some(" secret "), now).is_ok());
    }

    #[test]
    fn missing_unknown_and_expired_keys_are_rejected() {
        let (validator, now) = validator();
        for key in [None, Some(""), Some("other")] {
            let err = validator.validate_at(key, now).unwrap_err();
            assert!(matches!(err, ServerError::NotAuthorized));
        }
        let later = now + Duration::days(2);
        assert!(validator.validate_at(Some("secret"), later).is_err());
    }
}

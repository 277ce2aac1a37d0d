//! Credential persistence
//!
//! Two layers, mirroring the split between a generic key-value backend and
//! token-specific bookkeeping:
//!
//! - [`CredentialStorage`]: pluggable get/set/remove backend. Browser-hosted
//!   builds bind this to persistent local storage; non-interactive contexts
//!   use [`MemoryStorage`] or [`NoopStorage`]. No environment sniffing.
//! - [`CredentialStore`]: the typed schema on top, five durable entries
//!   (access token, refresh token, ID token, absolute expiry, cached user)
//!   plus the ephemeral single-use PKCE verifier slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::clock::Clock;
use crate::types::{TokenBundle, UserProfile};

/// Durable key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "auth_token";
/// Durable key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "auth_refresh_token";
/// Durable key for the ID token.
pub const ID_TOKEN_KEY: &str = "auth_id_token";
/// Durable key for the absolute expiry timestamp (epoch ms, stringified).
pub const TOKEN_EXPIRY_KEY: &str = "auth_token_expiry";
/// Durable key for the serialized user profile.
pub const USER_KEY: &str = "auth_user";
/// Ephemeral key for the outstanding PKCE verifier.
pub const PKCE_VERIFIER_KEY: &str = "pkce_verifier";

/// Safety buffer applied to expiry checks: a token counts as expired one
/// minute before its actual expiry so refresh always wins the race.
pub const EXPIRY_BUFFER_MS: i64 = 60_000;

/// Trait for key-value credential backends
///
/// Modeled on browser local/session storage: string keys, string values,
/// infallible operations. Implementations must be safe to share across
/// tasks.
pub trait CredentialStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str);

    /// Remove the entry under `key`, if present.
    fn remove(&self, key: &str);
}

/// In-memory storage backend
///
/// Used by tests and by non-interactive contexts where nothing should
/// survive the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether the backend holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok().and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// Storage backend that persists nothing
///
/// Every read misses; useful where a session must never outlive a call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl CredentialStorage for NoopStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) {}

    fn remove(&self, _key: &str) {}
}

/// Typed credential schema over a storage backend
///
/// Owns the key layout and the expiry arithmetic. The token bundle is
/// persisted as four separate entries; because [`TokenBundle`] requires all
/// four fields, a partial bundle is never written.
pub struct CredentialStore<S, T> {
    storage: Arc<S>,
    clock: Arc<T>,
}

impl<S, T> CredentialStore<S, T>
where
    S: CredentialStorage,
    T: Clock,
{
    /// Create a store over the given backend and clock.
    #[must_use]
    pub fn new(storage: Arc<S>, clock: Arc<T>) -> Self {
        Self { storage, clock }
    }

    /// Persist a token bundle as four entries plus the computed absolute
    /// expiry (`now + expires_in * 1000`, no buffer applied at write time).
    pub fn store_bundle(&self, bundle: &TokenBundle) {
        let expiry = self.clock.now_millis() + bundle.expires_in * 1_000;

        self.storage.set(ACCESS_TOKEN_KEY, &bundle.access_token);
        self.storage.set(REFRESH_TOKEN_KEY, &bundle.refresh_token);
        self.storage.set(ID_TOKEN_KEY, &bundle.id_token);
        self.storage.set(TOKEN_EXPIRY_KEY, &expiry.to_string());

        debug!(expiry_ms = expiry, "token bundle stored");
    }

    /// Stored access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.storage.get(ACCESS_TOKEN_KEY)
    }

    /// Stored refresh token, if any.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(REFRESH_TOKEN_KEY)
    }

    /// Stored ID token, if any.
    #[must_use]
    pub fn id_token(&self) -> Option<String> {
        self.storage.get(ID_TOKEN_KEY)
    }

    /// Stored absolute expiry in epoch milliseconds, if parseable.
    #[must_use]
    pub fn token_expiry(&self) -> Option<i64> {
        self.storage.get(TOKEN_EXPIRY_KEY).and_then(|raw| raw.parse().ok())
    }

    /// Whether the stored access token is expired
    ///
    /// Conservative: true when `now >= expiry - 60_000`, and also when no
    /// expiry is recorded at all. Pure read; repeated calls give the same
    /// answer until the clock crosses the boundary or a new bundle lands.
    #[must_use]
    pub fn is_token_expired(&self) -> bool {
        match self.token_expiry() {
            Some(expiry) => self.clock.now_millis() >= expiry - EXPIRY_BUFFER_MS,
            None => true,
        }
    }

    /// Cache the decoded user profile alongside the tokens.
    pub fn store_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(json) => self.storage.set(USER_KEY, &json),
            Err(e) => debug!(error = %e, "failed to serialize user profile"),
        }
    }

    /// Cached user profile, if present and parseable.
    #[must_use]
    pub fn stored_user(&self) -> Option<UserProfile> {
        self.storage.get(USER_KEY).and_then(|json| serde_json::from_str(&json).ok())
    }

    /// Hold the PKCE verifier between the authorize redirect and the
    /// callback. A second authorize attempt overwrites it, invalidating the
    /// first flow (accepted race: one authorize flow per browsing context).
    pub fn store_verifier(&self, verifier: &str) {
        self.storage.set(PKCE_VERIFIER_KEY, verifier);
    }

    /// Take the outstanding PKCE verifier, removing it
    ///
    /// Remove-on-read enforces single use: whether the subsequent exchange
    /// succeeds or fails, the verifier is already gone.
    #[must_use]
    pub fn take_verifier(&self) -> Option<String> {
        let verifier = self.storage.get(PKCE_VERIFIER_KEY);
        self.storage.remove(PKCE_VERIFIER_KEY);
        verifier
    }

    /// Remove all five durable credential entries.
    pub fn clear(&self) {
        self.storage.remove(ACCESS_TOKEN_KEY);
        self.storage.remove(REFRESH_TOKEN_KEY);
        self.storage.remove(ID_TOKEN_KEY);
        self.storage.remove(TOKEN_EXPIRY_KEY);
        self.storage.remove(USER_KEY);

        debug!("credentials cleared");
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for storage.
    use std::time::Duration;

    use super::*;
    use crate::clock::MockClock;

    fn sample_bundle() -> TokenBundle {
        TokenBundle {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            id_token: "id".to_string(),
            expires_in: 300,
        }
    }

    fn store_at(start_ms: i64) -> (CredentialStore<MemoryStorage, MockClock>, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(start_ms));
        (CredentialStore::new(Arc::new(MemoryStorage::new()), clock.clone()), clock)
    }

    /// Validates `CredentialStore::store_bundle` behavior for the round-trip
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the individual accessors return the stored four values.
    /// - Confirms the expiry is `now + expires_in * 1000`.
    #[test]
    fn test_bundle_roundtrip() {
        let (store, _clock) = store_at(1_000_000);
        store.store_bundle(&sample_bundle());

        assert_eq!(store.access_token().as_deref(), Some("access"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh"));
        assert_eq!(store.id_token().as_deref(), Some("id"));
        assert_eq!(store.token_expiry(), Some(1_000_000 + 300_000));
    }

    /// Validates `CredentialStore::is_token_expired` behavior at the buffer
    /// boundary.
    ///
    /// With `expires_in = 300` at time T the token expires at T+300s, so the
    /// buffered predicate flips at T+240s.
    ///
    /// Assertions:
    /// - Ensures the predicate is false at T+239s and true at T+241s.
    /// - Ensures repeated calls are idempotent while time stands still.
    #[test]
    fn test_expiry_boundary() {
        let (store, clock) = store_at(0);
        store.store_bundle(&sample_bundle());

        clock.set(239_000);
        assert!(!store.is_token_expired());
        assert!(!store.is_token_expired());

        clock.set(241_000);
        assert!(store.is_token_expired());
        assert!(store.is_token_expired());
    }

    /// Validates `CredentialStore::is_token_expired` behavior for the missing
    /// expiry scenario.
    ///
    /// Assertions:
    /// - Ensures an absent expiry entry counts as expired.
    #[test]
    fn test_missing_expiry_counts_as_expired() {
        let (store, _clock) = store_at(0);
        assert!(store.is_token_expired());
    }

    /// Validates `CredentialStore::take_verifier` behavior for the single-use
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the first take returns the verifier.
    /// - Ensures the second take returns nothing.
    #[test]
    fn test_verifier_is_single_use() {
        let (store, _clock) = store_at(0);
        store.store_verifier("verifier-123");

        assert_eq!(store.take_verifier().as_deref(), Some("verifier-123"));
        assert!(store.take_verifier().is_none());
    }

    /// Validates `CredentialStore::clear` behavior for the full-wipe
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms five entries exist after a login-shaped write.
    /// - Ensures all durable entries are gone after `clear`.
    #[test]
    fn test_clear_removes_all_entries() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(storage.clone(), Arc::new(MockClock::new(0)));

        store.store_bundle(&sample_bundle());
        store.store_user(&UserProfile {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: String::new(),
            display_name: "alice".to_string(),
            avatar_url: None,
        });
        assert_eq!(storage.len(), 5);

        store.clear();
        assert!(storage.is_empty());
        assert!(store.access_token().is_none());
        assert!(store.stored_user().is_none());
    }

    /// Validates `CredentialStore::stored_user` behavior for the cached
    /// profile scenario.
    ///
    /// Assertions:
    /// - Confirms the cached profile round-trips through storage.
    /// - Ensures corrupt JSON reads back as `None` rather than failing.
    #[test]
    fn test_user_roundtrip_and_corrupt_entry() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(storage.clone(), Arc::new(MockClock::new(0)));

        let user = UserProfile {
            id: "u2".to_string(),
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            display_name: "Bob".to_string(),
            avatar_url: Some("https://cdn.example.com/bob.png".to_string()),
        };
        store.store_user(&user);
        assert_eq!(store.stored_user(), Some(user));

        storage.set(USER_KEY, "{not json");
        assert!(store.stored_user().is_none());
    }

    /// Validates `NoopStorage` behavior for the nothing-persists scenario.
    ///
    /// Assertions:
    /// - Ensures writes are dropped and reads always miss.
    #[test]
    fn test_noop_storage_persists_nothing() {
        let store = CredentialStore::new(Arc::new(NoopStorage), Arc::new(MockClock::new(0)));
        store.store_bundle(&sample_bundle());
        assert!(store.access_token().is_none());
        assert!(store.is_token_expired());
    }
}

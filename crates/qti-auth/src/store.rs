//! Credential cache backed by durable storage.
//!
//! Memory is authoritative once loaded. Every mutation updates memory first
//! and then writes through to the `KeyValueStore` while still holding the
//! lock, so storage never lags behind a later mutation. A failed write is
//! reported to the caller but leaves the in-memory state in place.

use crate::{AuthResult, AuthTokens, AuthenticationMethod, Credentials};
use parking_lot::RwLock;
use qti_storage::{CredentialKey, KeyValueStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Current credentials of one client.
pub struct CredentialStore {
    key: String,
    storage: Arc<dyn KeyValueStore>,
    current: RwLock<Option<Credentials>>,
}

impl CredentialStore {
    /// Load the credentials stored under `key`.
    ///
    /// A stored document that no longer parses is removed and the store
    /// starts logged out.
    pub fn open(storage: Arc<dyn KeyValueStore>, key: &CredentialKey) -> AuthResult<Self> {
        let key = key.as_storage_key();
        let current = match storage.get(&key)? {
            Some(raw) => match serde_json::from_str::<Credentials>(&raw) {
                Ok(credentials) => {
                    debug!(
                        key = %key,
                        method = credentials.method.name(),
                        "Loaded stored credentials"
                    );
                    Some(credentials)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding unreadable stored credentials");
                    storage.remove(&key)?;
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            key,
            storage,
            current: RwLock::new(current),
        })
    }

    /// The storage key this store writes under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Snapshot of the held credentials.
    pub fn current(&self) -> Option<Credentials> {
        self.current.read().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .as_ref()
            .map(|c| c.access_token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current
            .read()
            .as_ref()
            .and_then(|c| c.refresh_token().map(str::to_string))
    }

    pub fn method(&self) -> Option<AuthenticationMethod> {
        self.current.read().as_ref().map(|c| c.method.clone())
    }

    /// Replace the held credentials wholesale (sign-in).
    pub fn replace(&self, credentials: Credentials) -> AuthResult<()> {
        let mut current = self.current.write();
        let raw = serde_json::to_string(&credentials)?;
        *current = Some(credentials);
        self.storage.set(&self.key, &raw)?;
        Ok(())
    }

    /// Apply renewed tokens.
    ///
    /// The access token is always replaced; the refresh token only when the
    /// provider rotated it; the subject only when supplied. Returns `false`
    /// without writing anything when the store was cleared in the meantime.
    pub fn apply_refresh(&self, tokens: &AuthTokens) -> AuthResult<bool> {
        self.update(|credentials| {
            credentials.access_token = tokens.access_token.clone();
            if let Some(rotated) = tokens.refresh_token.as_ref().filter(|t| !t.is_empty()) {
                credentials.refresh_token = Some(rotated.clone());
            }
            if let Some(subject) = tokens.subject_id.as_ref() {
                credentials.subject_id = Some(subject.clone());
            }
        })
    }

    /// Mutate the held credentials in place and persist them.
    ///
    /// Returns `false` when no credentials are held.
    pub fn update(&self, f: impl FnOnce(&mut Credentials)) -> AuthResult<bool> {
        let mut current = self.current.write();
        let Some(credentials) = current.as_mut() else {
            return Ok(false);
        };
        f(credentials);
        let raw = serde_json::to_string(&*credentials)?;
        self.storage.set(&self.key, &raw)?;
        Ok(true)
    }

    /// Drop the held credentials, memory first, then storage.
    ///
    /// Clearing an empty store is a no-op apart from the storage removal.
    pub fn clear(&self) -> AuthResult<()> {
        let mut current = self.current.write();
        let had_credentials = current.take().is_some();
        self.storage.remove(&self.key)?;
        if had_credentials {
            debug!(key = %self.key, "Cleared credentials");
        }
        Ok(())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &self.key)
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}

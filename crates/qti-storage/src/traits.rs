//! Storage trait definitions.

use crate::StorageResult;

/// Synchronous key-value backend for durable client state.
///
/// Implementations must be safe to share between client instances: several
/// clients pointed at the same store behave like browser tabs sharing one
/// local storage.
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value. Returns whether something was removed.
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

//! Durable key-value storage for QTI API clients.
//!
//! This crate provides the storage backends client credentials are persisted in:
//! - **Memory**: process-local map, shareable between client instances
//! - **File**: a single JSON document on disk, written through on every change

mod file;
mod keys;
mod memory;
mod traits;

pub use file::FileStore;
pub use keys::{CredentialKey, StorageKeys};
pub use memory::MemoryStore;
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

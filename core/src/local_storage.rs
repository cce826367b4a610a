//! Device-local key-value persistence.
//!
//! The notification log lives only on the resident's device. It is stored as a
//! single string value under one key, read and written whole.
//!
//! # Implementations
//!
//! - `FileKeyValueStore` (in `communitree`): one file per key under a directory
//! - `InMemoryKeyValueStore` (in `communitree-testing`): `HashMap` with failure injection

use crate::document_store::BoxFuture;
use thiserror::Error;

/// Errors that can occur during local storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocalStorageError {
    /// Reading or writing the underlying medium failed.
    #[error("Local storage I/O error: {0}")]
    Io(String),

    /// The storage backend is not available.
    #[error("Local storage unavailable: {0}")]
    Unavailable(String),
}

/// Key-value persistence scoped to one device.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `LocalStorageError` if the medium cannot be read.
    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, LocalStorageError>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `LocalStorageError` if the medium cannot be written.
    fn write<'a>(&'a self, key: &'a str, value: String)
    -> BoxFuture<'a, Result<(), LocalStorageError>>;
}

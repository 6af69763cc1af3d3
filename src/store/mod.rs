//! store
//!
//! Remote object storage behind a flat key/value interface.
//!
//! # Design
//!
//! The [`ObjectStore`] trait is async because every operation is network
//! I/O. Concrete backends ([`GcsStore`]) and the in-memory test double
//! ([`MemoryStore`]) both implement it; [`RetryingStore`] wraps any
//! implementation with transient-failure retry.
//!
//! Keys are opaque slash-separated strings; the cache layer owns the
//! `owner/name/...` layout.

pub mod gcs;
mod memory;
mod retry;

pub use gcs::GcsStore;
pub use memory::{FailOn, MemoryStore};
pub use retry::{RetryConfig, RetryingStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::errors::ErrorKind;

/// Errors from object-store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No object exists at the key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Authentication failed or is missing.
    #[error("storage authentication failed: {0}")]
    Auth(String),

    /// The backend returned an error status.
    #[error("storage error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// An object exceeded the size limit while being read.
    #[error("object {key} exceeds maximum size of {limit} bytes")]
    TooLarge { key: String, limit: u64 },

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::FileNotFound,
            StoreError::TooLarge { .. } => ErrorKind::FileSizeExceeded,
            StoreError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::ObjectStore,
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Matches the transient set: network failures and the usual
    /// throttling / server-error statuses.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Network(_) => true,
            StoreError::Api { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

/// Metadata for one stored object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Full key of the object.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, if the backend reports one.
    pub updated: Option<DateTime<Utc>>,
}

/// Flat key -> bytes remote store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `key`, overwriting any prior object.
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Fetch the object at `key`.
    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// List all keys beginning with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// List keys with metadata.
    async fn list_with_metadata(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError>;

    /// Delete the object at `key`. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            let err = StoreError::Api {
                status,
                message: String::new(),
            };
            assert!(err.is_transient(), "{status} should be transient");
        }
        for status in [400, 401, 403, 404, 409, 412] {
            let err = StoreError::Api {
                status,
                message: String::new(),
            };
            assert!(!err.is_transient(), "{status} should not be transient");
        }
    }

    #[test]
    fn non_transient_kinds() {
        assert!(!StoreError::NotFound("k".into()).is_transient());
        assert!(!StoreError::Auth("denied".into()).is_transient());
        assert!(!StoreError::Cancelled.is_transient());
        assert!(StoreError::Network("timeout".into()).is_transient());
    }

    #[test]
    fn kinds_map_to_taxonomy() {
        assert_eq!(
            StoreError::NotFound("k".into()).kind(),
            ErrorKind::FileNotFound
        );
        assert_eq!(
            StoreError::Auth("x".into()).kind(),
            ErrorKind::ObjectStore
        );
        assert_eq!(
            StoreError::TooLarge { key: "k".into(), limit: 1 }.kind(),
            ErrorKind::FileSizeExceeded
        );
    }
}

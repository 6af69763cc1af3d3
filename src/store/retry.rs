//! store::retry
//!
//! Transient-failure retry wrapper for any [`ObjectStore`].
//!
//! # Policy
//!
//! Up to 3 retries with exponential backoff: 500 ms initially, doubling
//! per attempt, capped at 30 s. Only transient failures (network errors
//! and 408/429/5xx statuses) are retried. Uploads are never retried -
//! the wrapper surfaces the error and the caller decides whether to
//! resubmit, so a half-written stream is never silently replayed.

use std::time::Duration;

use async_trait::async_trait;

use super::{ObjectInfo, ObjectStore, StoreError};

/// Retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (0-based).
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// [`ObjectStore`] wrapper adding retry.
#[derive(Debug, Clone)]
pub struct RetryingStore<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: ObjectStore> RetryingStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, RetryConfig::default())
    }

    pub fn with_config(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    tokio::time::sleep(self.config.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for RetryingStore<S> {
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        // Not retried; see the module docs.
        self.inner.upload(key, data).await
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.run(|| self.inner.download(key)).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.run(|| self.inner.list(prefix)).await
    }

    async fn list_with_metadata(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        self.run(|| self.inner.list_with_metadata(prefix)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.run(|| self.inner.delete(key)).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.run(|| self.inner.exists(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FailOn, MemoryStore};

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Api {
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.backoff(0), Duration::from_millis(500));
        assert_eq!(cfg.backoff(1), Duration::from_secs(1));
        assert_eq!(cfg.backoff(2), Duration::from_secs(2));
        assert_eq!(cfg.backoff(6), Duration::from_secs(30));
        assert_eq!(cfg.backoff(20), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn transient_download_failures_are_retried() {
        let store = MemoryStore::new();
        store.put("k", "v");
        store.fail_times(FailOn::Download, unavailable(), 2);

        let retrying = RetryingStore::with_config(store, fast_config());
        assert_eq!(retrying.download("k").await.unwrap(), b"v");
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let store = MemoryStore::new();
        store.put("k", "v");
        store.fail_times(FailOn::Download, unavailable(), 10);

        let retrying = RetryingStore::with_config(store, fast_config());
        assert!(retrying.download("k").await.is_err());
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let store = MemoryStore::new();
        store.fail_times(FailOn::Download, StoreError::NotFound("k".into()), 1);
        // A second scripted failure would also fire if a retry happened.

        let retrying = RetryingStore::with_config(store, fast_config());
        let err = retrying.download("k").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn uploads_are_not_retried() {
        let store = MemoryStore::new();
        store.fail_times(FailOn::Upload, unavailable(), 1);

        let retrying = RetryingStore::with_config(store.clone(), fast_config());
        assert!(retrying.upload("k", b"v").await.is_err());

        // The single scripted failure was consumed by the one attempt.
        retrying.upload("k", b"v").await.unwrap();
        assert_eq!(store.get("k").unwrap(), b"v");
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let store = MemoryStore::new();
        store.put("k", "v");
        store.fail_times(FailOn::Exists, StoreError::Auth("denied".into()), 1);

        let retrying = RetryingStore::with_config(store, fast_config());
        assert!(matches!(
            retrying.exists("k").await,
            Err(StoreError::Auth(_))
        ));
    }
}

//! store::memory
//!
//! In-memory object store for deterministic testing.
//!
//! Mirrors the remote's observable behavior (overwrite semantics,
//! idempotent delete, prefix listing) and supports scripted failures so
//! retry and error paths can be exercised without a network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use super::{ObjectInfo, ObjectStore, StoreError};

/// Which operation a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    Upload,
    Download,
    List,
    Delete,
    Exists,
}

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, Vec<u8>>,
    /// Remaining scripted failures per operation. Each triggered failure
    /// decrements the count until the operation succeeds again.
    failures: HashMap<FailOn, (StoreError, usize)>,
}

impl Inner {
    fn take_failure(&mut self, op: FailOn) -> Option<StoreError> {
        match self.failures.get_mut(&op) {
            Some((err, n)) if *n > 0 => {
                *n -= 1;
                let err = err.clone();
                if self.failures[&op].1 == 0 {
                    self.failures.remove(&op);
                }
                Some(err)
            }
            _ => None,
        }
    }
}

/// In-memory [`ObjectStore`].
///
/// Clones share state, matching the `Arc<Mutex<...>>` idiom used by the
/// rest of the test doubles.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `count` consecutive failures for `op`.
    pub fn fail_times(&self, op: FailOn, err: StoreError, count: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures.insert(op, (err, count));
    }

    /// Raw object bytes, for assertions.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().objects.get(key).cloned()
    }

    /// Insert raw object bytes, bypassing `upload` (and its scripted
    /// failures).
    pub fn put(&self, key: &str, data: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert(key.to_string(), data.into());
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.take_failure(FailOn::Upload) {
            return Err(err);
        }
        inner.objects.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.take_failure(FailOn::Download) {
            return Err(err);
        }
        inner
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.take_failure(FailOn::List) {
            return Err(err);
        }
        let mut keys: Vec<String> = inner
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn list_with_metadata(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.take_failure(FailOn::List) {
            return Err(err);
        }
        let mut infos: Vec<ObjectInfo> = inner
            .objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| ObjectInfo {
                key: k.clone(),
                size: v.len() as u64,
                updated: Some(Utc::now()),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.take_failure(FailOn::Delete) {
            return Err(err);
        }
        inner.objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.take_failure(FailOn::Exists) {
            return Err(err);
        }
        Ok(inner.objects.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_download() {
        let store = MemoryStore::new();
        store.upload("a/b", b"data").await.unwrap();
        assert_eq!(store.download("a/b").await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn download_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.download("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryStore::new();
        store.upload("a/1", b"x").await.unwrap();
        store.upload("a/2", b"y").await.unwrap();
        store.upload("b/1", b"z").await.unwrap();

        let keys = store.list("a/").await.unwrap();
        assert_eq!(keys, vec!["a/1", "a/2"]);

        // list contains k iff exists(k) and k starts with the prefix
        for k in &keys {
            assert!(store.exists(k).await.unwrap());
        }
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.upload("a", b"x").await.unwrap();
        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert!(!store.exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn upload_overwrites() {
        let store = MemoryStore::new();
        store.upload("a", b"old").await.unwrap();
        store.upload("a", b"new").await.unwrap();
        assert_eq!(store.download("a").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn scripted_failures_expire() {
        let store = MemoryStore::new();
        store.put("a", "x");
        store.fail_times(
            FailOn::Download,
            StoreError::Api {
                status: 503,
                message: "unavailable".into(),
            },
            2,
        );

        assert!(store.download("a").await.is_err());
        assert!(store.download("a").await.is_err());
        assert_eq!(store.download("a").await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn metadata_reports_size() {
        let store = MemoryStore::new();
        store.upload("a/1", b"12345").await.unwrap();
        let infos = store.list_with_metadata("a/").await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].size, 5);
    }
}

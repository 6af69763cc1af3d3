//! store::gcs
//!
//! Google Cloud Storage adapter using the JSON API.
//!
//! # Design
//!
//! Talks to the GCS JSON API directly over `reqwest`. Authentication is
//! a bearer token supplied by the caller (a static token from config or
//! the output of an `access_token_command` such as
//! `gcloud auth print-access-token`); public buckets work without one.
//!
//! Downloads are streamed and capped at 2 MiB so a corrupt or hostile
//! object cannot balloon memory.
//!
//! The API base is overridable for emulators
//! (`STORAGE_EMULATOR_HOST`-style setups) and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::{ObjectInfo, ObjectStore, StoreError};
use crate::core::constants::MAX_FILE_SIZE;

/// Default GCS API endpoint.
const DEFAULT_API_BASE: &str = "https://storage.googleapis.com";

/// GCS-backed [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct GcsStore {
    client: Client,
    bucket: String,
    token: Option<String>,
    api_base: String,
}

impl GcsStore {
    /// Create a store for `bucket` using anonymous access.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            bucket: bucket.into(),
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Create a store for `bucket` with an OAuth bearer token.
    pub fn with_token(bucket: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::new(bucket)
        }
    }

    /// Override the API base URL (emulators, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    /// URL of the object resource (metadata; add `alt=media` for content).
    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            self.bucket,
            encode_key(key)
        )
    }

    /// URL of the object collection (list).
    fn objects_url(&self) -> String {
        format!("{}/storage/v1/b/{}/o", self.api_base, self.bucket)
    }

    /// URL for media upload.
    fn upload_url(&self) -> String {
        format!("{}/upload/storage/v1/b/{}/o", self.api_base, self.bucket)
    }

    /// Check whether a response failed, mapping status codes to typed
    /// errors. Consumes the response body for the error message.
    async fn check(response: Response, key: &str) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(key.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Auth(truncate(&message)),
            _ => StoreError::Api {
                status: status.as_u16(),
                message: truncate(&message),
            },
        })
    }
}

fn network_err(e: reqwest::Error) -> StoreError {
    StoreError::Network(e.to_string())
}

fn truncate(message: &str) -> String {
    const LIMIT: usize = 256;
    let trimmed = message.trim();
    if trimmed.len() > LIMIT {
        format!("{}...", &trimmed[..LIMIT])
    } else {
        trimmed.to_string()
    }
}

/// Percent-encode an object key for use as a single path segment.
///
/// GCS requires `/` inside object names to be encoded when the name is
/// placed in the URL path.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    /// GCS serializes sizes as decimal strings.
    size: Option<String>,
    updated: Option<String>,
}

impl ListEntry {
    fn into_info(self) -> ObjectInfo {
        ObjectInfo {
            size: self.size.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0),
            updated: self
                .updated
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            key: self.name,
        }
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.upload_url())
            .headers(self.headers())
            .query(&[("uploadType", "media"), ("name", key)])
            .body(data.to_vec())
            .send()
            .await
            .map_err(network_err)?;

        Self::check(response, key).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get(self.object_url(key))
            .headers(self.headers())
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(network_err)?;

        let mut response = Self::check(response, key).await?;

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(network_err)? {
            if (data.len() + chunk.len()) as u64 > MAX_FILE_SIZE {
                return Err(StoreError::TooLarge {
                    key: key.to_string(),
                    limit: MAX_FILE_SIZE,
                });
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .list_with_metadata(prefix)
            .await?
            .into_iter()
            .map(|info| info.key)
            .collect())
    }

    async fn list_with_metadata(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let mut infos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("prefix".to_string(), prefix.to_string()),
                (
                    "fields".to_string(),
                    "items(name,size,updated),nextPageToken".to_string(),
                ),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken".to_string(), token.clone()));
            }

            let response = self
                .client
                .get(self.objects_url())
                .headers(self.headers())
                .query(&query)
                .send()
                .await
                .map_err(network_err)?;

            let response = Self::check(response, prefix).await?;
            let page: ListResponse = response.json().await.map_err(network_err)?;

            infos.extend(page.items.into_iter().map(ListEntry::into_info));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(infos)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.object_url(key))
            .headers(self.headers())
            .send()
            .await
            .map_err(network_err)?;

        // Idempotent: deleting a missing object is success.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response, key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .get(self.object_url(key))
            .headers(self.headers())
            .send()
            .await
            .map_err(network_err)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => {
                Self::check(response, key).await?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_key_escapes_slashes() {
        assert_eq!(encode_key("acme/api/HEAD"), "acme%2Fapi%2FHEAD");
        assert_eq!(encode_key(".env.age"), ".env.age");
        assert_eq!(encode_key("a b+c"), "a%20b%2Bc");
    }

    #[test]
    fn object_url_uses_encoded_key() {
        let store = GcsStore::new("bkt");
        assert_eq!(
            store.object_url("acme/api/.env.age"),
            "https://storage.googleapis.com/storage/v1/b/bkt/o/acme%2Fapi%2F.env.age"
        );
    }

    #[test]
    fn api_base_is_overridable() {
        let store = GcsStore::new("bkt").with_api_base("http://localhost:4443");
        assert!(store.object_url("k").starts_with("http://localhost:4443/"));
        assert_eq!(
            store.upload_url(),
            "http://localhost:4443/upload/storage/v1/b/bkt/o"
        );
    }

    #[test]
    fn bearer_header_present_only_with_token() {
        let anon = GcsStore::new("bkt");
        assert!(anon.headers().get(AUTHORIZATION).is_none());

        let authed = GcsStore::with_token("bkt", "tok123");
        assert_eq!(
            authed.headers().get(AUTHORIZATION).unwrap(),
            "Bearer tok123"
        );
    }

    #[test]
    fn list_entry_parses_size_and_time() {
        let entry = ListEntry {
            name: "acme/api/.env.age".into(),
            size: Some("512".into()),
            updated: Some("2024-05-01T10:00:00Z".into()),
        };
        let info = entry.into_info();
        assert_eq!(info.key, "acme/api/.env.age");
        assert_eq!(info.size, 512);
        assert!(info.updated.is_some());
    }

    #[test]
    fn list_entry_tolerates_missing_fields() {
        let entry = ListEntry {
            name: "k".into(),
            size: None,
            updated: None,
        };
        let info = entry.into_info();
        assert_eq!(info.size, 0);
        assert!(info.updated.is_none());
    }
}

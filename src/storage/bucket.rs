//! Cloud bucket storage backend
//!
//! Talks to the bucket through the GCS JSON API over `reqwest`,
//! authenticating with short-lived access tokens fetched from the
//! deployment sidecar. Keys map one-to-one onto object names, so the
//! layout matches the filesystem backend.
//!
//! Reads and listings are forgiving: transport failures are logged and
//! reported as absence, mirroring how the rest of the system treats
//! missing documents. Writes propagate their errors so callers can
//! surface storage failures.

use super::ObjectStore;
use crate::error::{AerinError, Result};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://storage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bucket-backed object store
pub struct BucketStorage {
    client: reqwest::Client,
    bucket: String,
    sidecar_endpoint: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct SidecarCredential {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectItem>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
}

impl BucketStorage {
    /// Create a bucket store for `bucket`, fetching tokens from the sidecar
    pub fn new(bucket: impl Into<String>, sidecar_endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            bucket: bucket.into(),
            sidecar_endpoint: sidecar_endpoint.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Override the storage API base URL (for tests against a mock server)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Fetch an access token from the sidecar
    ///
    /// Tokens are short-lived and the sidecar caches them, so one fetch
    /// per operation keeps this client stateless.
    async fn access_token(&self) -> Result<String> {
        let url = format!("{}/credential", self.sidecar_endpoint);
        let credential: SidecarCredential = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AerinError::Storage(format!("Sidecar credential fetch failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AerinError::Storage(format!("Sidecar credential fetch failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AerinError::Storage(format!("Sidecar credential parse failed: {}", e)))?;
        Ok(credential.access_token)
    }

    fn encoded_key(key: &str) -> String {
        utf8_percent_encode(key, NON_ALPHANUMERIC).to_string()
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            self.bucket,
            Self::encoded_key(key)
        )
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.api_base,
            self.bucket,
            Self::encoded_key(key)
        )
    }

    fn list_url(&self, prefix: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o?prefix={}&fields=items(name)",
            self.api_base,
            self.bucket,
            Self::encoded_key(prefix)
        )
    }
}

#[async_trait]
impl ObjectStore for BucketStorage {
    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        let token = self.access_token().await?;
        let body = serde_json::to_string_pretty(value)
            .map_err(|e| AerinError::Storage(e.to_string()))?;

        let response = self
            .client
            .post(self.upload_url(key))
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .body(body)
            .send()
            .await
            .map_err(|e| AerinError::Storage(format!("Failed to upload {}: {}", key, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            if detail.to_lowercase().contains("quota") {
                return Err(AerinError::StorageQuota(detail).into());
            }
            return Err(AerinError::Storage(format!(
                "Failed to upload {}: status {} {}",
                key, status, detail
            ))
            .into());
        }
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Error loading {}: {}", key, e);
                return Ok(None);
            }
        };

        let response = match self
            .client
            .get(format!("{}?alt=media", self.object_url(key)))
            .bearer_auth(&token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error loading {}: {}", key, e);
                return Ok(None);
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            tracing::error!("Error loading {}: status {}", key, response.status());
            return Ok(None);
        }

        match response.json().await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::error!("Error parsing {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Error deleting {}: {}", key, e);
                return Ok(());
            }
        };

        match self
            .client
            .delete(self.object_url(key))
            .bearer_auth(&token)
            .send()
            .await
        {
            Ok(response) => {
                // 404 means already gone, which is the outcome we wanted.
                if !response.status().is_success()
                    && response.status() != reqwest::StatusCode::NOT_FOUND
                {
                    tracing::error!("Error deleting {}: status {}", key, response.status());
                }
            }
            Err(e) => tracing::error!("Error deleting {}: {}", key, e),
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Error listing {}: {}", prefix, e);
                return Ok(Vec::new());
            }
        };

        let response = match self
            .client
            .get(self.list_url(prefix))
            .bearer_auth(&token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error listing {}: {}", prefix, e);
                return Ok(Vec::new());
            }
        };

        let listing: ObjectList = match response.json().await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::error!("Error parsing listing for {}: {}", prefix, e);
                return Ok(Vec::new());
            }
        };

        // Keep only the immediate children of the prefix.
        let names = listing
            .items
            .into_iter()
            .filter_map(|item| {
                item.name
                    .strip_prefix(prefix)
                    .map(|rest| rest.trim_start_matches('/').to_string())
            })
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .collect();
        Ok(names)
    }

    async fn exists(&self, key: &str) -> bool {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(_) => return false,
        };
        match self
            .client
            .get(self.object_url(key))
            .bearer_auth(&token)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_sidecar() -> MockServer {
        let sidecar = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/credential"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "test-token"})),
            )
            .mount(&sidecar)
            .await;
        sidecar
    }

    #[tokio::test]
    async fn test_save_uploads_object() {
        let sidecar = mock_sidecar().await;
        let api = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/aerin-bucket/o"))
            .and(query_param("uploadType", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "x"})))
            .expect(1)
            .mount(&api)
            .await;

        let storage =
            BucketStorage::new("aerin-bucket", sidecar.uri()).with_api_base(api.uri());
        storage
            .save("conversations/users/u1/index.json", &json!({"ok": true}))
            .await
            .expect("save failed");
    }

    #[tokio::test]
    async fn test_save_quota_error_maps_to_storage_quota() {
        let sidecar = mock_sidecar().await;
        let api = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Quota exceeded for bucket"))
            .mount(&api)
            .await;

        let storage =
            BucketStorage::new("aerin-bucket", sidecar.uri()).with_api_base(api.uri());
        let err = storage
            .save("k.json", &json!({}))
            .await
            .expect_err("save should fail");
        assert!(matches!(
            err.downcast_ref::<AerinError>(),
            Some(AerinError::StorageQuota(_))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_object_returns_none() {
        let sidecar = mock_sidecar().await;
        let api = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&api)
            .await;

        let storage =
            BucketStorage::new("aerin-bucket", sidecar.uri()).with_api_base(api.uri());
        let loaded = storage.load("missing.json").await.expect("load failed");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_transport_failure_is_absence() {
        // Sidecar unreachable: load reports absence rather than erroring.
        let storage = BucketStorage::new("aerin-bucket", "http://127.0.0.1:1")
            .with_api_base("http://127.0.0.1:1");
        let loaded = storage.load("k.json").await.expect("load failed");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_list_strips_prefix_and_nested_children() {
        let sidecar = mock_sidecar().await;
        let api = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/storage/v1/b/aerin-bucket/o"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "users/u1/conversations/a.json"},
                    {"name": "users/u1/conversations/b.json"},
                    {"name": "users/u1/conversations/nested/c.json"}
                ]
            })))
            .mount(&api)
            .await;

        let storage =
            BucketStorage::new("aerin-bucket", sidecar.uri()).with_api_base(api.uri());
        let mut names = storage
            .list("users/u1/conversations")
            .await
            .expect("list failed");
        names.sort();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn test_delete_swallows_failures() {
        let sidecar = mock_sidecar().await;
        let api = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&api)
            .await;

        let storage =
            BucketStorage::new("aerin-bucket", sidecar.uri()).with_api_base(api.uri());
        storage.delete("k.json").await.expect("delete should not error");
    }

    #[test]
    fn test_key_encoding_escapes_separators() {
        let encoded = BucketStorage::encoded_key("a/b c.json");
        assert_eq!(encoded, "a%2Fb%20c%2Ejson");
    }
}

//! S3 object store accessor for FOLIO.
//!
//! Thin wrapper over `aws-sdk-s3` scoped to a single bucket: upload a staged
//! file under a caller-supplied key, delete by key, and translate between
//! keys and the deterministic public URLs persisted alongside catalog rows.

use std::path::Path;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::delete_object::DeleteObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::byte_stream::error::Error as ByteStreamError;
use serde::Deserialize;
use thiserror::Error;

/// Connection settings for the object store.
///
/// When the static credential fields are unset the SDK default provider
/// chain (environment, profile, IMDS) is used instead.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreConfig {
    #[serde(default = "ObjectStoreConfig::default_region")]
    pub region: String,
    #[serde(default = "ObjectStoreConfig::default_bucket")]
    pub bucket: String,
    /// Prefix uploaded objects are filed under.
    #[serde(default = "ObjectStoreConfig::default_key_prefix")]
    pub key_prefix: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    /// Endpoint override for S3-compatible stores; switches the client to
    /// path-style addressing.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ObjectStoreConfig {
    fn default_region() -> String {
        "us-east-1".to_string()
    }

    fn default_bucket() -> String {
        "folio-images".to_string()
    }

    fn default_key_prefix() -> String {
        "images".to_string()
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            region: Self::default_region(),
            bucket: Self::default_bucket(),
            key_prefix: Self::default_key_prefix(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint: None,
        }
    }
}

/// Errors surfaced by the object store accessor.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("failed to upload object '{key}'")]
    Put {
        key: String,
        #[source]
        source: SdkError<PutObjectError>,
    },

    #[error("failed to delete object '{key}'")]
    Delete {
        key: String,
        #[source]
        source: SdkError<DeleteObjectError>,
    },

    #[error("failed to read staged payload '{path}'")]
    Payload {
        path: String,
        #[source]
        source: ByteStreamError,
    },
}

/// Client for a single bucket.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    key_prefix: String,
    endpoint: Option<String>,
}

impl ObjectStore {
    /// Build a client from settings. Static credentials take precedence over
    /// the SDK default provider chain.
    pub async fn connect(cfg: &ObjectStoreConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));

        if let (Some(key_id), Some(secret)) = (&cfg.access_key_id, &cfg.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                cfg.session_token.clone(),
                None,
                "folio-settings",
            ));
        }

        let sdk_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &cfg.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(aws_sdk_s3::Client::from_conf(builder.build()), cfg)
    }

    /// Wrap an existing SDK client.
    pub fn new(client: aws_sdk_s3::Client, cfg: &ObjectStoreConfig) -> Self {
        Self {
            client,
            bucket: cfg.bucket.clone(),
            region: cfg.region.clone(),
            key_prefix: cfg.key_prefix.trim_matches('/').to_string(),
            endpoint: cfg
                .endpoint
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string()),
        }
    }

    /// Full object key for an already collision-free file name.
    /// Uniqueness is owned by the caller (see the upload intake).
    pub fn object_key(&self, file_name: &str) -> String {
        format!("{}/{}", self.key_prefix, file_name)
    }

    /// Upload a staged file and return its public URL.
    pub async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|source| ObjectStoreError::Payload {
                path: path.display().to_string(),
                source,
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|source| ObjectStoreError::Put {
                key: key.to_string(),
                source,
            })?;

        Ok(self.object_url(key))
    }

    /// Remove an object. S3 deletes are idempotent: a missing key succeeds,
    /// so callers only see connectivity and permission failures.
    pub async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|source| ObjectStoreError::Delete {
                key: key.to_string(),
                source,
            })
    }

    /// Deterministic public URL for a key.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url(), key)
    }

    /// Recover the object key from a URL previously produced by
    /// [`ObjectStore::object_url`]. Returns `None` for URLs that do not
    /// match this bucket's layout.
    pub fn key_for_url(&self, url: &str) -> Option<String> {
        let base = self.base_url();
        let key = url.strip_prefix(base.as_str())?.strip_prefix('/')?;
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint, self.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(cfg: &ObjectStoreConfig) -> ObjectStore {
        let client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new(cfg.region.clone()))
                .build(),
        );
        ObjectStore::new(client, cfg)
    }

    #[test]
    fn object_url_is_virtual_hosted_by_default() {
        let cfg = ObjectStoreConfig {
            bucket: "covers".to_string(),
            region: "eu-west-1".to_string(),
            ..ObjectStoreConfig::default()
        };
        let store = store(&cfg);

        assert_eq!(
            store.object_url("images/abc-cover.png"),
            "https://covers.s3.eu-west-1.amazonaws.com/images/abc-cover.png"
        );
    }

    #[test]
    fn object_url_honors_endpoint_override() {
        let cfg = ObjectStoreConfig {
            bucket: "covers".to_string(),
            endpoint: Some("http://127.0.0.1:9000/".to_string()),
            ..ObjectStoreConfig::default()
        };
        let store = store(&cfg);

        assert_eq!(
            store.object_url("images/abc-cover.png"),
            "http://127.0.0.1:9000/covers/images/abc-cover.png"
        );
    }

    #[test]
    fn key_for_url_inverts_object_url() {
        let store = store(&ObjectStoreConfig::default());
        let key = store.object_key("abc-cover.png");
        let url = store.object_url(&key);

        assert_eq!(store.key_for_url(&url).as_deref(), Some(key.as_str()));
    }

    #[test]
    fn key_for_url_rejects_foreign_urls() {
        let store = store(&ObjectStoreConfig::default());

        assert_eq!(store.key_for_url("https://example.com/images/x.png"), None);
        assert_eq!(
            store.key_for_url("https://other.s3.us-east-1.amazonaws.com/images/x.png"),
            None
        );
    }

    #[test]
    fn object_key_applies_prefix() {
        let store = store(&ObjectStoreConfig::default());
        assert_eq!(store.object_key("abc-cover.png"), "images/abc-cover.png");
    }
}

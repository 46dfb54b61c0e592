//! S3-compatible storage client
//!
//! Path-style requests through `object_store`'s Amazon S3 backend, signed
//! with SigV4 when credentials are configured and sent anonymously
//! otherwise.

use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{ClientOptions, ObjectStore, PutPayload};
use std::time::Duration;
use tracing::debug;

use crate::error::{BenchError, Result};

/// Configuration for S3 client
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint URL for S3-compatible services, AWS when unset
    pub endpoint: Option<String>,
    /// Region used for request signing and the default AWS endpoint
    pub region: String,
    /// Access key ID
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// Session token for temporary credentials
    pub session_token: Option<String>,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".into(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 300,
        }
    }
}

fn env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

impl S3Config {
    /// Defaults overridden by the environment
    ///
    /// Reads `S3_ENDPOINT`, `S3_REGION` (or `AWS_REGION`), `AWS_ACCESS_KEY_ID`
    /// (or `S3_ACCESS_KEY`), `AWS_SECRET_ACCESS_KEY` (or `S3_SECRET_KEY`) and
    /// `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env_var(&["S3_ENDPOINT"]),
            region: env_var(&["S3_REGION", "AWS_REGION"]).unwrap_or(defaults.region),
            access_key_id: env_var(&["AWS_ACCESS_KEY_ID", "S3_ACCESS_KEY"]),
            secret_access_key: env_var(&["AWS_SECRET_ACCESS_KEY", "S3_SECRET_KEY"]),
            session_token: env_var(&["AWS_SESSION_TOKEN"]),
            ..defaults
        }
    }

    /// True when requests go out unsigned
    pub fn is_anonymous(&self) -> bool {
        self.access_key_id.is_none() || self.secret_access_key.is_none()
    }

    fn builder(&self, bucket: &str) -> AmazonS3Builder {
        let options = ClientOptions::new()
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs));

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(self.region.clone())
            .with_client_options(options);

        if let Some(endpoint) = &self.endpoint {
            builder = builder
                .with_endpoint(endpoint.trim_end_matches('/'))
                .with_allow_http(endpoint.starts_with("http://"));
        }

        match (&self.access_key_id, &self.secret_access_key) {
            (Some(key), Some(secret)) => {
                builder = builder.with_access_key_id(key).with_secret_access_key(secret);
                if let Some(token) = &self.session_token {
                    builder = builder.with_token(token);
                }
            }
            _ => builder = builder.with_skip_signature(true),
        }
        builder
    }
}

/// S3-compatible storage client scoped to one bucket prefix
pub struct S3Client {
    store: AmazonS3,
    bucket: String,
    prefix: String,
}

impl S3Client {
    /// Create a new S3 client
    pub fn new(config: S3Config, bucket: impl Into<String>, prefix: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        let store = config
            .builder(&bucket)
            .build()
            .map_err(|e| BenchError::StorageError {
                message: format!("Failed to create S3 client for {}: {}", bucket, e),
            })?;

        debug!(
            "S3 client for bucket {} in {} ({})",
            bucket,
            config.region,
            if config.is_anonymous() { "anonymous" } else { "signed" }
        );

        Ok(Self {
            store,
            bucket,
            prefix: prefix.into().trim_matches('/').to_string(),
        })
    }

    /// Full object name inside the bucket
    fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    fn object_path(&self, key: &str) -> Path {
        Path::from(self.full_key(key))
    }

    /// Key relative to the prefix, for a listed object name
    fn relative_key<'a>(&self, name: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            Some(name)
        } else {
            name.strip_prefix(self.prefix.as_str())?.strip_prefix('/')
        }
    }

    /// Get an object from S3
    pub async fn get_object(&self, key: &str) -> Result<Bytes> {
        let result = self
            .store
            .get(&self.object_path(key))
            .await
            .map_err(|e| map_store_error("Get object", key, e))?;
        result.bytes().await.map_err(|e| map_store_error("Read body", key, e))
    }

    /// Put an object to S3
    pub async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        let len = data.len();
        let result = self
            .store
            .put(&self.object_path(key), PutPayload::from(data))
            .await
            .map_err(|e| map_store_error("Put object", key, e))?;

        debug!(
            "Put {} complete ({} bytes), etag={}",
            key,
            len,
            result.e_tag.as_deref().unwrap_or("")
        );
        Ok(())
    }

    /// List every key under the prefix, relative to it
    pub async fn list_objects(&self) -> Result<Vec<String>> {
        let prefix = (!self.prefix.is_empty()).then(|| Path::from(self.prefix.as_str()));
        let mut stream = self.store.list(prefix.as_ref());

        let mut keys = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| map_store_error("List objects", &self.prefix, e))?;
            if let Some(key) = self.relative_key(meta.location.as_ref()) {
                keys.push(key.to_string());
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Check if an object exists
    pub async fn object_exists(&self, key: &str) -> Result<bool> {
        match self.store.head(&self.object_path(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(map_store_error("Head object", key, e)),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

fn map_store_error(op: &str, key: &str, e: object_store::Error) -> BenchError {
    match e {
        object_store::Error::NotFound { .. } => BenchError::ObjectNotFound { key: key.into() },
        other => BenchError::StorageError {
            message: format!("{} failed for {}: {}", op, key, other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_scoped_to_prefix() {
        let client = S3Client::new(S3Config::default(), "datasets", "/imagenet/train/").unwrap();
        assert_eq!(client.prefix(), "imagenet/train");
        assert_eq!(
            client.object_path("imagenet-train-000000.tar").as_ref(),
            "imagenet/train/imagenet-train-000000.tar"
        );

        assert_eq!(client.relative_key("imagenet/train/a.tar"), Some("a.tar"));
        assert_eq!(client.relative_key("imagenet/train/images/chunks/c0"), Some("images/chunks/c0"));
        // Sibling prefixes sharing a stem are not ours
        assert_eq!(client.relative_key("imagenet/train2/a.tar"), None);
    }

    #[test]
    fn test_empty_prefix() {
        let client = S3Client::new(S3Config::default(), "datasets", "").unwrap();
        assert_eq!(client.object_path("meta.json").as_ref(), "meta.json");
        assert_eq!(client.relative_key("meta.json"), Some("meta.json"));
    }

    #[test]
    fn test_signed_and_anonymous_configs_build() {
        let anonymous = S3Config {
            endpoint: Some("http://minio:9000/".into()),
            region: "eu-west-1".into(),
            ..Default::default()
        };
        assert!(anonymous.is_anonymous());
        assert!(S3Client::new(anonymous.clone(), "datasets", "").is_ok());

        let signed = S3Config {
            access_key_id: Some("minioadmin".into()),
            secret_access_key: Some("minioadmin".into()),
            ..anonymous
        };
        assert!(!signed.is_anonymous());
        let client = S3Client::new(signed, "datasets", "ds").unwrap();
        assert_eq!(client.bucket(), "datasets");
    }

    #[test]
    fn test_blank_env_var_falls_through() {
        std::env::set_var("SHARDBENCH_TEST_BLANK_REGION", " ");
        std::env::set_var("SHARDBENCH_TEST_REGION", "eu-central-1");
        assert_eq!(
            env_var(&["SHARDBENCH_TEST_BLANK_REGION", "SHARDBENCH_TEST_REGION"]).as_deref(),
            Some("eu-central-1")
        );
        assert_eq!(env_var(&["SHARDBENCH_TEST_UNSET_REGION"]), None);
    }

    #[test]
    fn test_not_found_maps_to_object_not_found() {
        let err = map_store_error(
            "Get object",
            "meta.json",
            object_store::Error::NotFound {
                path: "ds/meta.json".into(),
                source: "missing".into(),
            },
        );
        assert!(matches!(err, BenchError::ObjectNotFound { key } if key == "meta.json"));
    }
}

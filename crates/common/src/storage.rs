//! Object storage abstraction for complaint media.
//!
//! Supports both local filesystem and S3-compatible object storage.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::{AppError, AppResult};

/// Metadata for an object written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Storage key (path or object key).
    pub key: String,
    /// Public URL to access the object.
    pub url: String,
    /// Object size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write an object under `key`.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<StoredObject>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Shared handle to a storage backend.
pub type StorageService = Arc<dyn StorageBackend>;

/// Append `key` to `base`, percent-encoding each `/`-separated segment.
///
/// A relative base such as `/files` yields a relative URL.
fn object_url(base: &str, key: &str) -> String {
    if let Ok(mut url) = Url::parse(base) {
        let appended = url
            .path_segments_mut()
            .map(|mut segments| {
                segments.pop_if_empty().extend(key.split('/'));
            })
            .is_ok();
        if appended {
            return url.into();
        }
    }

    // Resolve against a placeholder origin and keep only the path.
    match Url::parse("http://localhost/").and_then(|root| root.join(base)) {
        Ok(mut url) => {
            let appended = match url.path_segments_mut() {
                Ok(mut segments) => {
                    segments.pop_if_empty().extend(key.split('/'));
                    true
                }
                Err(()) => false,
            };
            if appended {
                url.path().to_string()
            } else {
                format!("{}/{}", base.trim_end_matches('/'), key)
            }
        }
        Err(_) => format!("{}/{}", base.trim_end_matches('/'), key),
    }
}

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self { base_path, base_url }
    }

    /// Directory the backend writes into.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a key to a path below the base directory.
    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(AppError::Upload(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<StoredObject> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Upload(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Upload(format!("Failed to write file: {e}")))?;

        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Upload(format!("Failed to delete file: {e}"))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        object_url(&self.base_url, key)
    }
}

/// S3-compatible object storage backend.
#[cfg(feature = "s3")]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_url: Option<String>,
    prefix: Option<String>,
}

#[cfg(feature = "s3")]
impl S3Storage {
    /// Create a new S3 storage backend.
    #[must_use]
    pub fn new(
        endpoint: &str,
        bucket: String,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
        public_url: Option<String>,
        prefix: Option<String>,
    ) -> Self {
        use aws_config::Region;
        use aws_sdk_s3::config::Credentials;

        let credentials =
            Credentials::new(access_key_id, secret_access_key, None, None, "fixmycity");

        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(config),
            bucket,
            public_url,
            prefix,
        }
    }

    /// Build a backend from the `[storage]` section.
    pub fn from_config(config: &crate::config::StorageConfig) -> AppResult<Self> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| AppError::Config(format!("storage.{name} is required for s3")))
        };

        Ok(Self::new(
            &required(&config.endpoint, "endpoint")?,
            required(&config.bucket, "bucket")?,
            config.region.as_deref().unwrap_or("us-east-1"),
            &required(&config.access_key_id, "access_key_id")?,
            &required(&config.secret_access_key, "secret_access_key")?,
            config.public_url.clone(),
            config.prefix.clone(),
        ))
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => key.to_string(),
        }
    }
}

#[cfg(feature = "s3")]
#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<StoredObject> {
        use aws_sdk_s3::primitives::ByteStream;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .body(ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("S3 upload failed: {e}")))?;

        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.full_key(key))
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("S3 delete failed: {e}")))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        let full_key = self.full_key(key);
        match &self.public_url {
            Some(base) => object_url(base, &full_key),
            None => object_url(&format!("https://{}.s3.amazonaws.com", self.bucket), &full_key),
        }
    }
}

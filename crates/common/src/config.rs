//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Media storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Reverse geocoding configuration.
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Admin access configuration.
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL, or `memory://` for an in-process store.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl DatabaseConfig {
    /// Whether the in-process complaint store was requested.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory:")
    }
}

/// Which object storage backend holds complaint media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Files on the local filesystem, served by this server.
    #[default]
    Local,
    /// S3-compatible object storage.
    S3,
}

/// Media storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: StorageKind,
    /// Base directory for the local backend.
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
    /// Public base URL for locally stored files. Defaults to `{server.url}/files`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Largest accepted photo or audio payload in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
    /// S3 endpoint URL.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// S3 bucket name.
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 region.
    #[serde(default)]
    pub region: Option<String>,
    /// S3 access key ID.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// S3 secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Public URL prefix for objects in the bucket.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Key prefix within the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::Local,
            local_path: default_local_path(),
            base_url: None,
            max_upload_size: default_max_upload_size(),
            endpoint: None,
            bucket: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            public_url: None,
            prefix: None,
        }
    }
}

impl StorageConfig {
    /// Base URL under which locally stored files are served.
    #[must_use]
    pub fn resolved_base_url(&self, server_url: &str) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            format!("{}/files", server_url.trim_end_matches('/'))
        })
    }
}

/// Reverse geocoding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    /// Whether lookups are performed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Reverse geocoding endpoint (Nominatim-compatible).
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_secs: u64,
    /// User agent sent with every lookup.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_geocoding_endpoint(),
            timeout_secs: default_geocoding_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Admin access configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Bearer token granting access to admin endpoints.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./files")
}

const fn default_max_upload_size() -> usize {
    20 * 1024 * 1024
}

fn default_geocoding_endpoint() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

const fn default_geocoding_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("FixMyCity/{}", env!("CARGO_PKG_VERSION"))
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `FIXMYCITY_ENV`)
    /// 3. Environment variables with `FIXMYCITY_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("FIXMYCITY_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FIXMYCITY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FIXMYCITY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        Url::parse(&self.server.url)
            .map_err(|e| config::ConfigError::Message(format!("server.url: {e}")))?;
        Url::parse(&self.geocoding.endpoint)
            .map_err(|e| config::ConfigError::Message(format!("geocoding.endpoint: {e}")))?;

        if self.storage.max_upload_size == 0 {
            return Err(config::ConfigError::Message(
                "storage.max_upload_size must be positive".to_string(),
            ));
        }

        if self.storage.backend == StorageKind::S3 && self.storage.bucket.is_none() {
            return Err(config::ConfigError::Message(
                "storage.bucket is required for the s3 backend".to_string(),
            ));
        }

        Ok(())
    }
}

//! Reverse geocoding of captured coordinates.
//!
//! Lookups never fail the caller: when the remote service cannot produce an
//! address, the coordinate pair itself becomes the location label.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fixmycity_common::{AppError, AppResult, config::GeocodingConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// A finite latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Build a pair, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> AppResult<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(AppError::Validation(
                "Coordinates must be finite numbers".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::Validation(format!(
                "Latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::Validation(format!(
                "Longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// `"<lat>, <lon>"`, used when no address can be resolved.
    #[must_use]
    pub fn fallback_label(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}

/// Why a lookup produced no address. Never leaves this module.
#[derive(Debug, Error)]
enum GeocodeFailure {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("response has no display_name")]
    MissingDisplayName,
}

/// Converts coordinates to a human-readable address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve an address, or fall back to [`Coordinates::fallback_label`].
    async fn reverse_geocode(&self, coordinates: Coordinates) -> String;
}

/// Shared handle to a geocoder.
pub type GeocoderService = Arc<dyn Geocoder>;

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
}

/// Nominatim-compatible reverse geocoding client.
#[derive(Clone)]
pub struct GeocodingClient {
    client: Client,
    endpoint: Url,
}

impl GeocodingClient {
    /// Create a client with an explicit timeout.
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> AppResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AppError::Config(format!("Invalid geocoding endpoint: {e}")))?;

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    /// Create a client from the `[geocoding]` section.
    pub fn from_config(config: &GeocodingConfig) -> AppResult<Self> {
        Self::new(
            &config.endpoint,
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Build the geocoder selected by configuration.
    pub fn service(config: &GeocodingConfig) -> AppResult<GeocoderService> {
        if config.enabled {
            Ok(Arc::new(Self::from_config(config)?))
        } else {
            Ok(Arc::new(NoOpGeocoder))
        }
    }

    fn request_url(&self, coordinates: Coordinates) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("lat", &coordinates.latitude.to_string())
            .append_pair("lon", &coordinates.longitude.to_string());
        url
    }

    async fn lookup(&self, coordinates: Coordinates) -> Result<String, GeocodeFailure> {
        let response = self.client.get(self.request_url(coordinates)).send().await?;

        if !response.status().is_success() {
            return Err(GeocodeFailure::Status(response.status()));
        }

        let body: ReverseResponse = response.json().await?;
        body.display_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(GeocodeFailure::MissingDisplayName)
    }
}

#[async_trait]
impl Geocoder for GeocodingClient {
    async fn reverse_geocode(&self, coordinates: Coordinates) -> String {
        match self.lookup(coordinates).await {
            Ok(address) => {
                debug!(address = %address, "Resolved complaint location");
                address
            }
            Err(e) => {
                warn!(
                    error = %e,
                    latitude = coordinates.latitude,
                    longitude = coordinates.longitude,
                    "Reverse geocoding failed, using coordinates"
                );
                coordinates.fallback_label()
            }
        }
    }
}

/// Geocoder used when lookups are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpGeocoder;

#[async_trait]
impl Geocoder for NoOpGeocoder {
    async fn reverse_geocode(&self, coordinates: Coordinates) -> String {
        coordinates.fallback_label()
    }
}

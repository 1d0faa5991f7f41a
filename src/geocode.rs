//! Geocoder implementations.
//!
//! - [`BcGeocoder`]: BC government address API (default, no key needed)
//! - [`GoogleGeocoder`]: Google Maps geocoding API
//! - [`CachedGeocoder`]: memoizes another geocoder by address

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::GeocodeError;
use crate::model::Coordinate;
use crate::traits::Geocoder;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BcGeocoderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BcGeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://geocoder.api.gov.bc.ca".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Geocoder backed by the BC government `addresses.json` endpoint.
#[derive(Debug, Clone)]
pub struct BcGeocoder {
    config: BcGeocoderConfig,
    client: reqwest::blocking::Client,
}

impl BcGeocoder {
    pub fn new(config: BcGeocoderConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl Geocoder for BcGeocoder {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let url = format!("{}/addresses.json", self.config.base_url.trim_end_matches('/'));
        let body = self
            .client
            .get(url)
            .query(&[("addressString", address), ("maxResults", "1")])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<BcFeatureCollection>())
            .map_err(GeocodeError::from_reqwest)?;

        body.first_coordinate()
    }
}

#[derive(Debug, Deserialize)]
struct BcFeatureCollection {
    #[serde(default)]
    features: Vec<BcFeature>,
}

#[derive(Debug, Deserialize)]
struct BcFeature {
    geometry: BcGeometry,
}

#[derive(Debug, Deserialize)]
struct BcGeometry {
    /// GeoJSON order: `[lng, lat]`.
    coordinates: Vec<f64>,
}

impl BcFeatureCollection {
    fn first_coordinate(&self) -> Result<Coordinate, GeocodeError> {
        let feature = self.features.first().ok_or(GeocodeError::NoResult)?;
        match feature.geometry.coordinates.as_slice() {
            [lng, lat, ..] => Ok(Coordinate::new(*lat, *lng)?),
            other => Err(GeocodeError::InvalidResponse(format!(
                "expected [lng, lat], got {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GoogleGeocoderConfig {
    /// Falls back to the `GM_API_KEY` environment variable when unset.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Optional `components` filter, e.g. `administrative_area:BC|country:CA`.
    pub components: Option<String>,
}

impl Default for GoogleGeocoderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            timeout_secs: 10,
            components: None,
        }
    }
}

/// Geocoder backed by the Google Maps geocoding API.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    api_key: String,
    config: GoogleGeocoderConfig,
    client: reqwest::blocking::Client,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>, config: GoogleGeocoderConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }
}

impl Geocoder for GoogleGeocoder {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let mut query = vec![("address", address), ("key", self.api_key.as_str())];
        if let Some(components) = &self.config.components {
            query.push(("components", components.as_str()));
        }

        let body = self
            .client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<GoogleResponse>())
            .map_err(GeocodeError::from_reqwest)?;

        body.first_coordinate()
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GoogleResult>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

impl GoogleResponse {
    fn first_coordinate(&self) -> Result<Coordinate, GeocodeError> {
        match self.status.as_str() {
            "OK" => {
                let result = self.results.first().ok_or(GeocodeError::NoResult)?;
                let location = &result.geometry.location;
                Ok(Coordinate::new(location.lat, location.lng)?)
            }
            "ZERO_RESULTS" => Err(GeocodeError::NoResult),
            status => Err(GeocodeError::InvalidResponse(match &self.error_message {
                Some(message) => format!("{status}: {message}"),
                None => status.to_string(),
            })),
        }
    }
}

/// Remembers every answer of the wrapped geocoder, failures included.
///
/// Concurrent lookups of the same uncached address may both reach the inner
/// geocoder; the later answer wins.
#[derive(Debug)]
pub struct CachedGeocoder<G> {
    inner: G,
    cache: Mutex<HashMap<String, Result<Coordinate, GeocodeError>>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Result<Coordinate, GeocodeError>>> {
        // A panic mid-insert cannot leave a half-written entry.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        if let Some(cached) = self.lock().get(address) {
            debug!(address, "geocode cache hit");
            return cached.clone();
        }
        let result = self.inner.geocode(address);
        self.lock().insert(address.to_string(), result.clone());
        result
    }
}

//! Planner configuration.
//!
//! Loaded from JSON; every field has a default, so `{}` is a valid file.
//!
//! ```json
//! {
//!   "city": "Victoria",
//!   "geocoder": { "service": "bcgov" },
//!   "cost": { "provider": "haversine", "road_factor": 1.3 },
//!   "solve": { "capacity": 6, "seed": 7, "restarts": 10 },
//!   "drivers": [{ "name": "Sam", "home": { "lat": 48.45, "lng": -123.37 } }]
//! }
//! ```

use std::env;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::assembler::Driver;
use crate::error::ConfigError;
use crate::geocode::{BcGeocoder, BcGeocoderConfig, CachedGeocoder, GoogleGeocoder, GoogleGeocoderConfig};
use crate::haversine::HaversineCost;
use crate::osrm::{OsrmClient, OsrmConfig};
use crate::planner::OptimizeOptions;
use crate::solver::SolveOptions;
use crate::traits::{CostProvider, Geocoder};

/// Environment variable consulted when no Google API key is configured.
pub const GOOGLE_API_KEY_VAR: &str = "GM_API_KEY";

/// Points farther than this from the depot are treated as bad geocodes.
pub const DEFAULT_MAX_DEPOT_DISTANCE_M: f64 = 10_000.0;

/// Which geocoding service to call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum GeocoderConfig {
    Bcgov(BcGeocoderConfig),
    Google(GoogleGeocoderConfig),
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        GeocoderConfig::Bcgov(BcGeocoderConfig::default())
    }
}

/// Which cost model to build the matrix with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum CostConfig {
    Haversine(HaversineCost),
    Osrm(OsrmConfig),
}

impl Default for CostConfig {
    fn default() -> Self {
        CostConfig::Haversine(HaversineCost::default())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub city: Option<String>,
    pub geocoder: GeocoderConfig,
    /// Answer repeated addresses from memory.
    pub cache_geocoding: bool,
    pub cost: CostConfig,
    /// Geocoding calls allowed in flight.
    pub concurrency: usize,
    /// `null` disables the distance filter.
    pub max_depot_distance_m: Option<f64>,
    /// `false` makes routes end at their last delivery.
    pub return_to_depot: bool,
    pub solve: SolveOptions,
    pub drivers: Vec<Driver>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            city: None,
            geocoder: GeocoderConfig::default(),
            cache_geocoding: true,
            cost: CostConfig::default(),
            concurrency: 4,
            max_depot_distance_m: Some(DEFAULT_MAX_DEPOT_DISTANCE_M),
            return_to_depot: true,
            solve: SolveOptions::default(),
            drivers: Vec::new(),
        }
    }
}

impl PlannerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if let CostConfig::Haversine(cost) = &self.cost {
            if !cost.road_factor.is_finite() || cost.road_factor <= 0.0 {
                return Err(ConfigError::InvalidRoadFactor(cost.road_factor));
            }
        }
        Ok(())
    }

    /// Builds the configured geocoder, wrapped in a cache when enabled.
    pub fn build_geocoder(&self) -> Result<Box<dyn Geocoder>, ConfigError> {
        let geocoder: Box<dyn Geocoder> = match &self.geocoder {
            GeocoderConfig::Bcgov(config) => Box::new(BcGeocoder::new(config.clone())?),
            GeocoderConfig::Google(config) => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| env::var(GOOGLE_API_KEY_VAR).ok())
                    .filter(|key| !key.is_empty())
                    .ok_or(ConfigError::MissingApiKey)?;
                Box::new(GoogleGeocoder::new(api_key, config.clone())?)
            }
        };

        if self.cache_geocoding {
            Ok(Box::new(CachedGeocoder::new(geocoder)))
        } else {
            Ok(geocoder)
        }
    }

    pub fn build_cost_provider(&self) -> Result<Box<dyn CostProvider>, ConfigError> {
        self.validate()?;
        Ok(match &self.cost {
            CostConfig::Haversine(cost) => Box::new(cost.clone()),
            CostConfig::Osrm(config) => Box::new(OsrmClient::new(config.clone())?),
        })
    }

    /// Run options for [`crate::planner::optimize`].
    pub fn optimize_options(&self) -> OptimizeOptions {
        OptimizeOptions {
            city: self.city.clone(),
            concurrency: self.concurrency,
            max_depot_distance_m: self.max_depot_distance_m,
            return_to_depot: self.return_to_depot,
            solve: self.solve.clone(),
            drivers: self.drivers.clone(),
        }
    }
}

//! Great-circle cost provider (the default, needs no network).
//!
//! Costs are metres along the great circle, optionally scaled by a road
//! factor to approximate driving distance.

use serde::Deserialize;

use crate::error::DistanceError;
use crate::model::Coordinate;
use crate::traits::CostProvider;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Straight-line distance is used as-is unless configured otherwise.
pub const DEFAULT_ROAD_FACTOR: f64 = 1.0;

/// Haversine-based cost provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HaversineCost {
    /// Multiplier applied to the great-circle distance.
    pub road_factor: f64,
}

impl Default for HaversineCost {
    fn default() -> Self {
        Self {
            road_factor: DEFAULT_ROAD_FACTOR,
        }
    }
}

impl HaversineCost {
    pub fn new(road_factor: f64) -> Self {
        Self { road_factor }
    }
}

impl CostProvider for HaversineCost {
    fn cost(&self, from: Coordinate, to: Coordinate) -> Result<f64, DistanceError> {
        Ok(haversine_m(from, to) * self.road_factor)
    }

    fn is_symmetric(&self) -> bool {
        true
    }
}

/// Great-circle distance in kilometers.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let (lat1, lng1) = from.as_tuple();
    let (lat2, lng2) = to.as_tuple();

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // Clamp guards asin against rounding just above 1 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Great-circle distance in metres.
pub fn haversine_m(from: Coordinate, to: Coordinate) -> f64 {
    haversine_km(from, to) * 1000.0
}

/// Initial compass bearing from `from` to `to`, in degrees `[0, 360)`.
pub fn initial_bearing(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.lat().to_radians();
    let lat2 = to.lat().to_radians();
    let delta_lng = (to.lng() - from.lng()).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

//! Error taxonomy for the planning pipeline.
//!
//! Per-record failures ([`GeocodeError`]) are carried as data in the
//! unresolved list. Everything else aborts the run and surfaces through
//! [`PlanError`], which names the stage that failed.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::RecordId;

/// A latitude/longitude pair outside the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// Failure to place a single address.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeError {
    /// The provider answered but found nothing for the address.
    #[error("no result for address")]
    NoResult,
    /// The request could not be sent or returned an error status.
    #[error("geocoding request failed: {0}")]
    Http(String),
    /// The provider's response could not be interpreted.
    #[error("unexpected geocoder response: {0}")]
    InvalidResponse(String),
    /// The provider returned a coordinate outside the valid range.
    #[error("geocoder returned an invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),
}

impl GeocodeError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GeocodeError::InvalidResponse(err.to_string())
        } else {
            GeocodeError::Http(err.to_string())
        }
    }
}

/// Failure to price a single pair of points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistanceError {
    #[error("distance request failed: {0}")]
    Http(String),
    #[error("unexpected distance response: {0}")]
    InvalidResponse(String),
    /// The provider has no path between the two points.
    #[error("no route between points")]
    Unreachable,
}

impl DistanceError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DistanceError::InvalidResponse(err.to_string())
        } else {
            DistanceError::Http(err.to_string())
        }
    }
}

/// The cost matrix could not be completed or failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    #[error("row {row} has {len} entries, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("cost from {from} to {to} is {value}, expected a finite non-negative number")]
    InvalidCost { from: usize, to: usize, value: f64 },
    #[error("cost from {index} to itself is {value}, expected 0")]
    NonZeroDiagonal { index: usize, value: f64 },
    #[error("no route from point {from} to point {to}")]
    Unreachable { from: usize, to: usize },
    #[error("cost from {from} to {to} is unavailable: {source}")]
    Provider {
        from: usize,
        to: usize,
        #[source]
        source: DistanceError,
    },
    /// A whole-table request failed before any pair could be read.
    #[error("cost table request failed: {0}")]
    Table(#[source] DistanceError),
    #[error("provider returned a {actual}x{actual} table for {expected} locations")]
    SizeMismatch { expected: usize, actual: usize },
}

impl MatrixError {
    pub(crate) fn from_distance(from: usize, to: usize, source: DistanceError) -> Self {
        match source {
            DistanceError::Unreachable => MatrixError::Unreachable { from, to },
            source => MatrixError::Provider { from, to, source },
        }
    }
}

/// The optimizer was called with input that breaks its contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizationError {
    #[error("cost matrix is empty; index 0 must hold the depot")]
    EmptyMatrix,
    #[error("vehicle count must be at least 1")]
    InvalidVehicleCount,
    #[error("vehicle capacity must be at least 1")]
    InvalidCapacity,
    #[error("{vehicles} vehicles of capacity {capacity} cannot serve {points} stops")]
    InsufficientCapacity {
        vehicles: usize,
        capacity: usize,
        points: usize,
    },
    #[error("index {index} is out of range for a matrix of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
    #[error("malformed tour: {0}")]
    MalformedTour(String),
    #[error("sweep partitioning needs point coordinates")]
    MissingCoordinates,
    #[error("got {actual} coordinates for a matrix of size {expected}")]
    CoordinateCountMismatch { expected: usize, actual: usize },
}

/// An optimizer result failed the assembler's consistency checks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("route {vehicle} reports cost {reported} but its edges sum to {recomputed}")]
    CostMismatch {
        vehicle: usize,
        reported: f64,
        recomputed: f64,
    },
    #[error("route {vehicle} is invalid: {reason}")]
    InvalidRoute { vehicle: usize, reason: String },
    #[error("stop {index} appears in more than one position")]
    DuplicateStop { index: usize },
    #[error("stop {index} is not visited by any route")]
    MissingStop { index: usize },
    #[error("resolved point refers to unknown record {0}")]
    UnknownRecord(RecordId),
    #[error("matrix has {matrix} entries but there are {points} resolved points plus the depot")]
    PointCountMismatch { matrix: usize, points: usize },
}

/// A batch-fatal failure, tagged with the stage that produced it.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("input rejected: record id {0} appears more than once")]
    DuplicateRecord(RecordId),
    #[error("distance matrix stage failed: {0}")]
    Matrix(#[from] MatrixError),
    #[error("optimization stage failed: {0}")]
    Optimization(#[from] OptimizationError),
    #[error("assembly stage failed: {0}")]
    Assembly(#[from] AssemblyError),
}

/// Configuration could not be loaded or turned into collaborators.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("road factor must be finite and positive, got {0}")]
    InvalidRoadFactor(f64),
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,
    #[error("google geocoding needs an api_key or the GM_API_KEY environment variable")]
    MissingApiKey,
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_distance_maps_to_unreachable_pair() {
        let err = MatrixError::from_distance(2, 5, DistanceError::Unreachable);
        assert_eq!(err, MatrixError::Unreachable { from: 2, to: 5 });
    }

    #[test]
    fn provider_failures_keep_their_source() {
        let err = MatrixError::from_distance(0, 1, DistanceError::Http("timeout".into()));
        assert!(matches!(err, MatrixError::Provider { from: 0, to: 1, .. }));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn plan_error_names_the_stage() {
        let err = PlanError::from(OptimizationError::InvalidVehicleCount);
        assert!(err.to_string().starts_with("optimization stage failed"));

        let err = PlanError::from(MatrixError::Unreachable { from: 0, to: 3 });
        assert!(err.to_string().starts_with("distance matrix stage failed"));
    }
}

//! route-planner core
//!
//! Turns a batch of delivery addresses into depot-anchored routes:
//! geocode, build a cost matrix, order the stops, assemble the result.

pub mod address;
pub mod assembler;
pub mod config;
pub mod error;
pub mod geocode;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod osrm;
pub mod partition;
pub mod planner;
pub mod resolver;
pub mod solver;
pub mod traits;

pub use assembler::{Driver, PlanResult, RouteResult, Stop};
pub use config::PlannerConfig;
pub use error::{
    AssemblyError, ConfigError, CoordinateError, DistanceError, GeocodeError, MatrixError,
    OptimizationError, PlanError,
};
pub use matrix::CostMatrix;
pub use model::{AddressRecord, Coordinate, RecordId, ResolvedPoint, UnresolvedReason, UnresolvedRecord};
pub use planner::{optimize, OptimizeOptions, Planner};
pub use resolver::Cancellation;
pub use solver::{PartitionStrategy, Route, SolveOptions};
pub use traits::{CostProvider, Geocoder};

//! Capability traits for the planner's external collaborators.
//!
//! Both are deliberately small: one lookup method with an explicit failure
//! type. Concrete providers are picked from configuration when the planner
//! is built.

use crate::error::{DistanceError, GeocodeError, MatrixError};
use crate::matrix::{pairwise_matrix, CostMatrix};
use crate::model::Coordinate;

/// Resolves a free-text address to a coordinate.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError>;
}

impl<G: Geocoder + ?Sized> Geocoder for Box<G> {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        (**self).geocode(address)
    }
}

impl<G: Geocoder + ?Sized> Geocoder for &G {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        (**self).geocode(address)
    }
}

/// Prices travel between two coordinates.
///
/// The matrix is indexed by the provided location order.
pub trait CostProvider: Send + Sync {
    fn cost(&self, from: Coordinate, to: Coordinate) -> Result<f64, DistanceError>;

    /// Whether `cost(a, b) == cost(b, a)` for every pair. Symmetric providers
    /// are only asked for the upper triangle.
    fn is_symmetric(&self) -> bool {
        false
    }

    /// Full matrix over `locations`. Providers with a bulk endpoint override
    /// this; the default prices every pair through [`CostProvider::cost`].
    fn matrix_for(&self, locations: &[Coordinate]) -> Result<CostMatrix, MatrixError> {
        pairwise_matrix(self, locations)
    }
}

impl<P: CostProvider + ?Sized> CostProvider for Box<P> {
    fn cost(&self, from: Coordinate, to: Coordinate) -> Result<f64, DistanceError> {
        (**self).cost(from, to)
    }

    fn is_symmetric(&self) -> bool {
        (**self).is_symmetric()
    }

    fn matrix_for(&self, locations: &[Coordinate]) -> Result<CostMatrix, MatrixError> {
        (**self).matrix_for(locations)
    }
}

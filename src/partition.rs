//! Splitting stops between vehicles before routing.
//!
//! Each group is later routed on its own by the single-vehicle solver, so a
//! partition only has to decide membership, not order.

use tracing::debug;

use crate::error::OptimizationError;
use crate::haversine::initial_bearing;
use crate::matrix::{CostMatrix, DEPOT};
use crate::model::Coordinate;
use crate::solver::{nearest_position, PartitionStrategy};

/// Resolved vehicle count and per-vehicle stop capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehiclePlan {
    pub vehicles: usize,
    pub capacity: usize,
}

impl VehiclePlan {
    /// Derives the plan from the caller's options.
    ///
    /// Returns `None` when neither option is set (one unconstrained route) or
    /// when there are no stops to split.
    pub fn from_options(
        vehicle_count: Option<usize>,
        capacity: Option<usize>,
        points: usize,
    ) -> Result<Option<Self>, OptimizationError> {
        if vehicle_count == Some(0) {
            return Err(OptimizationError::InvalidVehicleCount);
        }
        if capacity == Some(0) {
            return Err(OptimizationError::InvalidCapacity);
        }
        if points == 0 {
            return Ok(None);
        }

        let plan = match (vehicle_count, capacity) {
            (None, None) => return Ok(None),
            (None, Some(capacity)) => Self {
                vehicles: points.div_ceil(capacity),
                capacity,
            },
            (Some(vehicles), None) => Self {
                vehicles,
                capacity: points.div_ceil(vehicles),
            },
            (Some(vehicles), Some(capacity)) => {
                if vehicles.saturating_mul(capacity) < points {
                    return Err(OptimizationError::InsufficientCapacity {
                        vehicles,
                        capacity,
                        points,
                    });
                }
                Self { vehicles, capacity }
            }
        };
        Ok(Some(plan))
    }
}

/// Splits stops `1..matrix.size()` into at most `plan.vehicles` non-empty
/// groups of at most `plan.capacity` stops.
pub fn partition(
    matrix: &CostMatrix,
    coordinates: Option<&[Coordinate]>,
    plan: &VehiclePlan,
    strategy: PartitionStrategy,
) -> Result<Vec<Vec<usize>>, OptimizationError> {
    let groups = match strategy {
        PartitionStrategy::NearestNeighbor => nearest_neighbor_groups(matrix, plan),
        PartitionStrategy::Sweep => {
            let coordinates = coordinates.ok_or(OptimizationError::MissingCoordinates)?;
            if coordinates.len() != matrix.size() {
                return Err(OptimizationError::CoordinateCountMismatch {
                    expected: matrix.size(),
                    actual: coordinates.len(),
                });
            }
            sweep_groups(coordinates, plan)
        }
    };

    debug!(
        ?strategy,
        vehicles = plan.vehicles,
        capacity = plan.capacity,
        sizes = ?groups.iter().map(Vec::len).collect::<Vec<_>>(),
        "stops partitioned"
    );
    Ok(groups)
}

/// Greedy fill: each vehicle leaves the depot and keeps taking the nearest
/// unassigned stop until it is full.
fn nearest_neighbor_groups(matrix: &CostMatrix, plan: &VehiclePlan) -> Vec<Vec<usize>> {
    let mut remaining: Vec<usize> = (1..matrix.size()).collect();
    let mut groups = Vec::with_capacity(plan.vehicles.min(remaining.len()));

    // Vehicle count and capacity come from the caller and may be huge.
    while !remaining.is_empty() && groups.len() < plan.vehicles {
        let mut group = Vec::with_capacity(plan.capacity.min(remaining.len()));
        let mut current = DEPOT;
        while group.len() < plan.capacity && !remaining.is_empty() {
            current = remaining.remove(nearest_position(matrix, current, &remaining));
            group.push(current);
        }
        groups.push(group);
    }
    groups
}

/// Orders stops clockwise by bearing from the depot (north first), then cuts
/// the sequence into capacity-sized groups.
fn sweep_groups(coordinates: &[Coordinate], plan: &VehiclePlan) -> Vec<Vec<usize>> {
    let depot = coordinates[DEPOT];
    let mut order: Vec<(f64, usize)> = coordinates
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, &point)| (initial_bearing(depot, point), index))
        .collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let indices: Vec<usize> = order.into_iter().map(|(_, index)| index).collect();
    indices.chunks(plan.capacity).map(<[usize]>::to_vec).collect()
}

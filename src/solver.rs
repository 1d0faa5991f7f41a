//! Route solver: nearest-neighbour construction plus 2-opt improvement.
//!
//! Deterministic for a given matrix and options. Ties always go to the lowest
//! index, and the optional restarts draw from a seeded RNG.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::OptimizationError;
use crate::matrix::{CostMatrix, DEPOT};
use crate::model::Coordinate;
use crate::partition::{self, VehiclePlan};

/// Moves must beat the current cost by more than this to count as improving.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// How stops are split between vehicles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// Fill each vehicle in nearest-neighbour order from the depot.
    #[default]
    NearestNeighbor,
    /// Group stops by compass bearing from the depot.
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Number of vehicles available. `None` means "as many as capacity needs".
    pub vehicle_count: Option<usize>,
    /// Maximum stops per vehicle.
    pub capacity: Option<usize>,
    /// Seed for the restart perturbations.
    pub seed: Option<u64>,
    /// Extra perturb-and-improve rounds per route.
    pub restarts: usize,
    /// Maximum 2-opt passes per improvement run.
    pub max_iterations: usize,
    pub partition: PartitionStrategy,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            vehicle_count: None,
            capacity: None,
            seed: None,
            restarts: 0,
            max_iterations: 1000,
            partition: PartitionStrategy::NearestNeighbor,
        }
    }
}

/// A closed tour starting and ending at the depot.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    stops: Vec<usize>,
    total_cost: f64,
}

impl Route {
    /// Wraps a stop sequence and its claimed cost without checking either.
    /// The assembler verifies both.
    pub fn new(stops: Vec<usize>, total_cost: f64) -> Self {
        Self { stops, total_cost }
    }

    fn priced(matrix: &CostMatrix, stops: Vec<usize>) -> Self {
        let total_cost = route_cost(matrix, &stops);
        Self { stops, total_cost }
    }

    /// All stops, depot at both ends.
    pub fn stops(&self) -> &[usize] {
        &self.stops
    }

    /// Stops between the two depot visits.
    pub fn deliveries(&self) -> &[usize] {
        match self.stops.len() {
            0..=2 => &[],
            len => &self.stops[1..len - 1],
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }
}

/// Sum of consecutive edge costs, accumulated in stop order.
pub fn route_cost(matrix: &CostMatrix, stops: &[usize]) -> f64 {
    stops
        .windows(2)
        .fold(0.0, |total, leg| total + matrix.get(leg[0], leg[1]))
}

/// Solves the routing problem described by `matrix`.
///
/// Index 0 of the matrix is the depot. `coordinates`, when given, must line
/// up with the matrix indices; only sweep partitioning needs them.
pub fn solve(
    matrix: &CostMatrix,
    coordinates: Option<&[Coordinate]>,
    options: &SolveOptions,
) -> Result<Vec<Route>, OptimizationError> {
    if matrix.is_empty() {
        return Err(OptimizationError::EmptyMatrix);
    }
    let points = matrix.size() - 1;
    let plan = VehiclePlan::from_options(options.vehicle_count, options.capacity, points)?;

    if points == 0 {
        return Ok(vec![Route::priced(matrix, vec![DEPOT, DEPOT])]);
    }

    let groups = match plan {
        Some(plan) => partition::partition(matrix, coordinates, &plan, options.partition)?,
        None => vec![(1..=points).collect()],
    };

    let symmetric = matrix.is_symmetric();
    let mut rng = StdRng::seed_from_u64(options.seed.unwrap_or(0));
    let routes: Vec<Route> = groups
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| solve_group(matrix, group, symmetric, options, &mut rng))
        .collect();

    info!(
        points,
        routes = routes.len(),
        total_cost = routes.iter().map(Route::total_cost).sum::<f64>(),
        "routes optimized"
    );
    Ok(routes)
}

fn solve_group(
    matrix: &CostMatrix,
    group: &[usize],
    symmetric: bool,
    options: &SolveOptions,
    rng: &mut StdRng,
) -> Route {
    let mut best = nearest_neighbor_tour(matrix, group);
    let constructed = route_cost(matrix, &best);
    improve(matrix, &mut best, symmetric, options.max_iterations);
    let mut best_cost = route_cost(matrix, &best);
    debug!(stops = group.len(), constructed, improved = best_cost, "2-opt finished");

    for restart in 0..options.restarts {
        let Some(mut candidate) = double_bridge(&best, rng) else {
            break;
        };
        improve(matrix, &mut candidate, symmetric, options.max_iterations);
        let candidate_cost = route_cost(matrix, &candidate);
        if candidate_cost < best_cost - IMPROVEMENT_EPSILON {
            debug!(restart, from = best_cost, to = candidate_cost, "restart improved route");
            best = candidate;
            best_cost = candidate_cost;
        }
    }

    Route::priced(matrix, best)
}

/// Greedy tour over `group`: always extend to the cheapest unvisited stop.
pub fn nearest_neighbor_tour(matrix: &CostMatrix, group: &[usize]) -> Vec<usize> {
    let mut remaining = group.to_vec();
    remaining.sort_unstable();

    let mut tour = Vec::with_capacity(group.len() + 2);
    tour.push(DEPOT);
    let mut current = DEPOT;
    while !remaining.is_empty() {
        current = remaining.remove(nearest_position(matrix, current, &remaining));
        tour.push(current);
    }
    tour.push(DEPOT);
    tour
}

/// Position in `candidates` (sorted ascending) of the cheapest stop from
/// `from`. Ties keep the earliest, i.e. lowest, index.
pub(crate) fn nearest_position(matrix: &CostMatrix, from: usize, candidates: &[usize]) -> usize {
    let mut best = 0;
    for (position, &candidate) in candidates.iter().enumerate().skip(1) {
        if matrix.get(from, candidate) < matrix.get(from, candidates[best]) {
            best = position;
        }
    }
    best
}

/// Runs 2-opt over a caller-supplied closed tour.
///
/// The tour must start and end at the depot and visit each other index at
/// most once.
pub fn two_opt(
    matrix: &CostMatrix,
    mut tour: Vec<usize>,
    max_iterations: usize,
) -> Result<Route, OptimizationError> {
    validate_tour(matrix, &tour)?;
    improve(matrix, &mut tour, matrix.is_symmetric(), max_iterations);
    Ok(Route::priced(matrix, tour))
}

fn validate_tour(matrix: &CostMatrix, tour: &[usize]) -> Result<(), OptimizationError> {
    if matrix.is_empty() {
        return Err(OptimizationError::EmptyMatrix);
    }
    if let Some(&index) = tour.iter().find(|&&index| index >= matrix.size()) {
        return Err(OptimizationError::IndexOutOfRange {
            index,
            size: matrix.size(),
        });
    }
    if tour.len() < 2 || tour[0] != DEPOT || tour[tour.len() - 1] != DEPOT {
        return Err(OptimizationError::MalformedTour(
            "tour must start and end at the depot".to_string(),
        ));
    }

    let mut seen = vec![false; matrix.size()];
    for &index in &tour[1..tour.len() - 1] {
        if index == DEPOT {
            return Err(OptimizationError::MalformedTour(
                "depot may only appear at the ends".to_string(),
            ));
        }
        if std::mem::replace(&mut seen[index], true) {
            return Err(OptimizationError::MalformedTour(format!(
                "stop {index} is visited twice"
            )));
        }
    }
    Ok(())
}

/// 2-opt: reverse `tour[i + 1..=j]` whenever that strictly lowers the cost.
///
/// Each pass scans every pair of non-adjacent edges and applies improving
/// moves as it finds them. Stops after a pass without a move or after
/// `max_iterations` passes. Returns the number of passes made.
fn improve(matrix: &CostMatrix, tour: &mut [usize], symmetric: bool, max_iterations: usize) -> usize {
    let len = tour.len();
    if len < 4 {
        return 0;
    }

    let mut passes = 0;
    while passes < max_iterations {
        passes += 1;
        let mut improved = false;

        for i in 0..len - 3 {
            for j in i + 2..len - 1 {
                let delta = reversal_delta(matrix, tour, i, j, symmetric);
                if delta < -IMPROVEMENT_EPSILON {
                    tour[i + 1..=j].reverse();
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }
    passes
}

/// Cost change from reversing `tour[i + 1..=j]`.
fn reversal_delta(matrix: &CostMatrix, tour: &[usize], i: usize, j: usize, symmetric: bool) -> f64 {
    let (a, b, c, d) = (tour[i], tour[i + 1], tour[j], tour[j + 1]);
    let edges = matrix.get(a, c) + matrix.get(b, d) - matrix.get(a, b) - matrix.get(c, d);
    if symmetric {
        return edges;
    }

    // Reversal also flips every edge inside the segment.
    let segment = &tour[i + 1..=j];
    let inner: f64 = segment
        .windows(2)
        .map(|leg| matrix.get(leg[1], leg[0]) - matrix.get(leg[0], leg[1]))
        .sum();
    edges + inner
}

/// Double-bridge perturbation: cut the deliveries into four segments
/// `A B C D` and reconnect them as `A C B D`.
///
/// Returns `None` for tours too short to perturb.
fn double_bridge(tour: &[usize], rng: &mut StdRng) -> Option<Vec<usize>> {
    let deliveries = &tour[1..tour.len() - 1];
    let n = deliveries.len();
    if n < 4 {
        return None;
    }

    let mut cuts = sample(rng, n - 1, 3).into_vec();
    cuts.sort_unstable();
    let (p, q, r) = (cuts[0] + 1, cuts[1] + 1, cuts[2] + 1);

    let mut perturbed = Vec::with_capacity(tour.len());
    perturbed.push(DEPOT);
    perturbed.extend_from_slice(&deliveries[..p]);
    perturbed.extend_from_slice(&deliveries[q..r]);
    perturbed.extend_from_slice(&deliveries[p..q]);
    perturbed.extend_from_slice(&deliveries[r..]);
    perturbed.push(DEPOT);
    Some(perturbed)
}

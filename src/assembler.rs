//! Result assembly: maps solver routes back to the input records.
//!
//! The assembler re-derives every cumulative cost from the matrix and checks
//! it against the solver's totals, so a defect in the solver surfaces as an
//! [`AssemblyError`] instead of a wrong route.

use std::collections::HashMap;

use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AssemblyError;
use crate::haversine::haversine_m;
use crate::matrix::{CostMatrix, DEPOT};
use crate::model::{AddressRecord, Coordinate, RecordId, ResolvedPoint, UnresolvedRecord};
use crate::solver::Route;

/// A named driver who can be matched to a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub name: String,
    /// Where the driver would like to finish. Unknown homes are matched last.
    #[serde(default)]
    pub home: Option<Coordinate>,
}

impl Driver {
    pub fn new(name: impl Into<String>, home: Option<Coordinate>) -> Self {
        Self {
            name: name.into(),
            home,
        }
    }
}

/// One position in a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    /// Position in the route, starting at 0 for the departing depot.
    pub sequence: usize,
    /// Matrix index of the stop.
    pub index: usize,
    /// The delivery's record; `None` at the depot.
    pub record: Option<AddressRecord>,
    pub coordinate: Coordinate,
    /// Cost travelled from the depot up to and including this stop.
    pub cumulative_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    pub vehicle: usize,
    pub driver: Option<String>,
    pub stops: Vec<Stop>,
    pub total_cost: f64,
}

impl RouteResult {
    /// Stops between the two depot visits.
    pub fn deliveries(&self) -> &[Stop] {
        match self.stops.len() {
            0..=2 => &[],
            len => &self.stops[1..len - 1],
        }
    }

    /// Record ids in visiting order.
    pub fn record_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.stops
            .iter()
            .filter_map(|stop| stop.record.as_ref().map(|record| &record.id))
    }
}

/// The terminal artifact of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResult {
    pub routes: Vec<RouteResult>,
    pub unresolved: Vec<UnresolvedRecord>,
}

impl PlanResult {
    pub fn total_cost(&self) -> f64 {
        self.routes.iter().map(|route| route.total_cost).sum()
    }
}

/// Everything the solver saw, in matrix index order.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    pub records: &'a [AddressRecord],
    pub depot: Coordinate,
    /// Matrix index `k + 1` belongs to `resolved[k]`.
    pub resolved: &'a [ResolvedPoint],
    pub matrix: &'a CostMatrix,
}

/// Builds the final result, verifying routes against the matrix.
pub fn assemble(
    routes: &[Route],
    input: &AssemblyInput<'_>,
    unresolved: Vec<UnresolvedRecord>,
    drivers: &[Driver],
) -> Result<PlanResult, AssemblyError> {
    let size = input.matrix.size();
    if size != input.resolved.len() + 1 {
        return Err(AssemblyError::PointCountMismatch {
            matrix: size,
            points: input.resolved.len(),
        });
    }

    let records: HashMap<&RecordId, &AddressRecord> =
        input.records.iter().map(|record| (&record.id, record)).collect();
    let mut visited = vec![false; size];

    let mut results = routes
        .iter()
        .enumerate()
        .map(|(vehicle, route)| assemble_route(vehicle, route, input, &records, &mut visited))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(index) = (1..size).find(|&index| !visited[index]) {
        return Err(AssemblyError::MissingStop { index });
    }

    for (route, driver) in results.iter_mut().zip(assign_drivers(&results_ends(routes, input), drivers)) {
        route.driver = driver;
    }

    let result = PlanResult {
        routes: results,
        unresolved,
    };
    info!(
        routes = result.routes.len(),
        unresolved = result.unresolved.len(),
        total_cost = result.total_cost(),
        "plan assembled"
    );
    Ok(result)
}

fn assemble_route(
    vehicle: usize,
    route: &Route,
    input: &AssemblyInput<'_>,
    records: &HashMap<&RecordId, &AddressRecord>,
    visited: &mut [bool],
) -> Result<RouteResult, AssemblyError> {
    let stops = route.stops();
    let invalid = |reason: &str| AssemblyError::InvalidRoute {
        vehicle,
        reason: reason.to_string(),
    };
    if stops.len() < 2 || stops[0] != DEPOT || stops[stops.len() - 1] != DEPOT {
        return Err(invalid("route must start and end at the depot"));
    }

    let size = input.matrix.size();
    let mut result = Vec::with_capacity(stops.len());
    let mut cumulative_cost = 0.0;
    for (sequence, &index) in stops.iter().enumerate() {
        if index >= size {
            return Err(invalid(&format!("stop {index} is outside the matrix")));
        }
        let is_end = sequence == 0 || sequence == stops.len() - 1;
        if index == DEPOT && !is_end {
            return Err(invalid("depot appears between deliveries"));
        }
        if sequence > 0 {
            cumulative_cost += input.matrix.get(stops[sequence - 1], index);
        }

        let (record, coordinate) = if index == DEPOT {
            (None, input.depot)
        } else {
            if std::mem::replace(&mut visited[index], true) {
                return Err(AssemblyError::DuplicateStop { index });
            }
            let point = &input.resolved[index - 1];
            let record = records
                .get(&point.record_id)
                .ok_or_else(|| AssemblyError::UnknownRecord(point.record_id.clone()))?;
            (Some((*record).clone()), point.coordinate)
        };

        result.push(Stop {
            sequence,
            index,
            record,
            coordinate,
            cumulative_cost,
        });
    }

    if cumulative_cost != route.total_cost() {
        return Err(AssemblyError::CostMismatch {
            vehicle,
            reported: route.total_cost(),
            recomputed: cumulative_cost,
        });
    }

    debug!(vehicle, stops = result.len(), total_cost = cumulative_cost, "route assembled");
    Ok(RouteResult {
        vehicle,
        driver: None,
        stops: result,
        total_cost: cumulative_cost,
    })
}

/// Coordinate of each route's last delivery; `None` for empty routes.
fn results_ends(routes: &[Route], input: &AssemblyInput<'_>) -> Vec<Option<Coordinate>> {
    routes
        .iter()
        .map(|route| {
            route
                .deliveries()
                .last()
                .map(|&index| input.resolved[index - 1].coordinate)
        })
        .collect()
}

/// Cost of sending a driver without a known home anywhere. Larger than any
/// great-circle distance, so located drivers are always preferred.
const NO_HOME_COST_M: i64 = 100_000_000;

/// Matches drivers to route ends, minimizing the total distance between each
/// route's last delivery and its driver's home.
///
/// Each route gets at most one driver and each driver at most one route.
/// Routes without deliveries are skipped. When drivers and routes differ in
/// number the cost matrix is padded to square with zero-cost dummies; a route
/// matched to a dummy stays unassigned.
pub fn assign_drivers(route_ends: &[Option<Coordinate>], drivers: &[Driver]) -> Vec<Option<String>> {
    let mut assigned: Vec<Option<String>> = vec![None; route_ends.len()];
    let routes: Vec<(usize, Coordinate)> = route_ends
        .iter()
        .enumerate()
        .filter_map(|(route, end)| end.map(|end| (route, end)))
        .collect();
    if routes.is_empty() || drivers.is_empty() {
        return assigned;
    }

    let size = routes.len().max(drivers.len());
    let mut weights = Matrix::new(size, size, 0_i64);
    for (row, &(_, end)) in routes.iter().enumerate() {
        for (column, driver) in drivers.iter().enumerate() {
            weights[(row, column)] = driver
                .home
                .map_or(NO_HOME_COST_M, |home| haversine_m(end, home).round() as i64);
        }
    }

    let (total_m, columns) = kuhn_munkres_min(&weights);
    for (row, (&(route, _), &column)) in routes.iter().zip(&columns).enumerate() {
        let Some(driver) = drivers.get(column) else {
            continue;
        };
        debug!(route, driver = %driver.name, distance_m = weights[(row, column)], "driver assigned");
        assigned[route] = Some(driver.name.clone());
    }
    debug!(total_m, "drivers assigned");
    assigned
}

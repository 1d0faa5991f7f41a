//! End-to-end planning: resolve, build the matrix, solve, assemble.

use std::collections::HashSet;

use tracing::{info, info_span};

use crate::address::normalize_address;
use crate::assembler::{assemble, AssemblyInput, Driver, PlanResult};
use crate::config::PlannerConfig;
use crate::error::{ConfigError, GeocodeError, PlanError};
use crate::matrix::{build_matrix, MatrixOptions};
use crate::model::{AddressRecord, Coordinate};
use crate::resolver::{resolve, Cancellation, DepotFilter, ResolveOptions};
use crate::solver::{solve, SolveOptions};
use crate::traits::{CostProvider, Geocoder};

/// Per-run options for [`optimize`].
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    pub city: Option<String>,
    pub concurrency: usize,
    /// Resolved points farther than this from the depot are left out.
    pub max_depot_distance_m: Option<f64>,
    pub return_to_depot: bool,
    pub solve: SolveOptions,
    pub drivers: Vec<Driver>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            city: None,
            concurrency: 1,
            max_depot_distance_m: None,
            return_to_depot: true,
            solve: SolveOptions::default(),
            drivers: Vec::new(),
        }
    }
}

/// Plans routes for `records` starting and ending at `depot`.
///
/// Records that cannot be placed come back in `unresolved`; any other
/// failure aborts the run with the stage that caused it. Cancelling during
/// resolution still yields a plan over the records resolved so far.
pub fn optimize<G, P>(
    records: &[AddressRecord],
    depot: Coordinate,
    options: &OptimizeOptions,
    geocoder: &G,
    provider: &P,
    cancellation: &Cancellation,
) -> Result<PlanResult, PlanError>
where
    G: Geocoder + ?Sized,
    P: CostProvider + ?Sized,
{
    let _span = info_span!("optimize", records = records.len()).entered();

    let mut seen = HashSet::with_capacity(records.len());
    if let Some(duplicate) = records.iter().find(|record| !seen.insert(&record.id)) {
        return Err(PlanError::DuplicateRecord(duplicate.id.clone()));
    }

    let resolve_options = ResolveOptions {
        city: options.city.clone(),
        concurrency: options.concurrency,
        depot_filter: options.max_depot_distance_m.map(|max_distance_m| DepotFilter {
            depot,
            max_distance_m,
        }),
    };
    let resolution = resolve(records, geocoder, &resolve_options, cancellation);

    let matrix_options = MatrixOptions {
        return_to_depot: options.return_to_depot,
    };
    let matrix = build_matrix(depot, &resolution.resolved, provider, &matrix_options)?;

    let coordinates: Vec<Coordinate> = std::iter::once(depot)
        .chain(resolution.resolved.iter().map(|point| point.coordinate))
        .collect();
    let routes = solve(&matrix, Some(&coordinates), &options.solve)?;

    let input = AssemblyInput {
        records,
        depot,
        resolved: &resolution.resolved,
        matrix: &matrix,
    };
    let result = assemble(&routes, &input, resolution.unresolved, &options.drivers)?;

    info!(
        routes = result.routes.len(),
        unresolved = result.unresolved.len(),
        "planning finished"
    );
    Ok(result)
}

/// Owns the collaborators selected by configuration.
pub struct Planner {
    geocoder: Box<dyn Geocoder>,
    provider: Box<dyn CostProvider>,
    options: OptimizeOptions,
}

impl Planner {
    pub fn new(geocoder: Box<dyn Geocoder>, provider: Box<dyn CostProvider>, options: OptimizeOptions) -> Self {
        Self {
            geocoder,
            provider,
            options,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.build_geocoder()?,
            config.build_cost_provider()?,
            config.optimize_options(),
        ))
    }

    pub fn options(&self) -> &OptimizeOptions {
        &self.options
    }

    /// Looks up the depot address with the same clean-up as deliveries.
    pub fn geocode_depot(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let address = normalize_address(address, self.options.city.as_deref())
            .or_else(|| self.options.city.clone())
            .ok_or(GeocodeError::NoResult)?;
        self.geocoder.geocode(&address)
    }

    pub fn optimize(
        &self,
        records: &[AddressRecord],
        depot: Coordinate,
        cancellation: &Cancellation,
    ) -> Result<PlanResult, PlanError> {
        optimize(
            records,
            depot,
            &self.options,
            self.geocoder.as_ref(),
            self.provider.as_ref(),
            cancellation,
        )
    }
}

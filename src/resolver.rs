//! Coordinate resolution stage.
//!
//! Every record ends up in exactly one of the two output lists. Geocoding
//! failures are recorded as data and never abort the batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::address::normalize_address;
use crate::haversine::haversine_m;
use crate::model::{AddressRecord, Coordinate, ResolvedPoint, UnresolvedReason, UnresolvedRecord};
use crate::traits::Geocoder;

/// Cooperative cancellation shared between the caller and the resolver.
///
/// Clones share the same flag. A deadline, when set, cancels automatically
/// once it has passed.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Rejects points implausibly far from the depot.
#[derive(Debug, Clone, Copy)]
pub struct DepotFilter {
    pub depot: Coordinate,
    pub max_distance_m: f64,
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Appended to addresses that do not already mention it.
    pub city: Option<String>,
    /// Number of geocoding calls allowed in flight.
    pub concurrency: usize,
    pub depot_filter: Option<DepotFilter>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            city: None,
            concurrency: 1,
            depot_filter: None,
        }
    }
}

/// Outcome of resolving one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Point(ResolvedPoint),
    Unresolved(UnresolvedRecord),
}

/// Resolver output, both lists in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub resolved: Vec<ResolvedPoint>,
    pub unresolved: Vec<UnresolvedRecord>,
}

impl FromIterator<Resolved> for Resolution {
    fn from_iter<I: IntoIterator<Item = Resolved>>(outcomes: I) -> Self {
        let mut resolution = Resolution::default();
        for outcome in outcomes {
            match outcome {
                Resolved::Point(point) => resolution.resolved.push(point),
                Resolved::Unresolved(record) => resolution.unresolved.push(record),
            }
        }
        resolution
    }
}

/// Geocodes every record once, in parallel when `concurrency > 1`.
pub fn resolve<G>(
    records: &[AddressRecord],
    geocoder: &G,
    options: &ResolveOptions,
    cancellation: &Cancellation,
) -> Resolution
where
    G: Geocoder + ?Sized,
{
    let resolve_one = |record: &AddressRecord| resolve_record(record, geocoder, options, cancellation);

    let outcomes: Vec<Resolved> = if options.concurrency > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(options.concurrency)
            .thread_name(|i| format!("geocode-{i}"))
            .build()
        {
            // Indexed collect keeps input order regardless of completion order.
            Ok(pool) => pool.install(|| records.par_iter().map(resolve_one).collect()),
            Err(err) => {
                warn!(error = %err, "geocoding pool unavailable, resolving sequentially");
                records.iter().map(resolve_one).collect()
            }
        }
    } else {
        records.iter().map(resolve_one).collect()
    };

    let resolution: Resolution = outcomes.into_iter().collect();
    info!(
        resolved = resolution.resolved.len(),
        unresolved = resolution.unresolved.len(),
        "addresses resolved"
    );
    if cancellation.is_cancelled() {
        warn!(
            resolved = resolution.resolved.len(),
            "resolution cancelled, continuing with the records resolved so far"
        );
    }
    resolution
}

fn resolve_record<G>(
    record: &AddressRecord,
    geocoder: &G,
    options: &ResolveOptions,
    cancellation: &Cancellation,
) -> Resolved
where
    G: Geocoder + ?Sized,
{
    let unresolved = |reason| {
        Resolved::Unresolved(UnresolvedRecord {
            record_id: record.id.clone(),
            reason,
        })
    };

    if cancellation.is_cancelled() {
        return unresolved(UnresolvedReason::Cancelled);
    }
    let Some(address) = normalize_address(&record.address, options.city.as_deref()) else {
        warn!(record = %record.id, "empty address");
        return unresolved(UnresolvedReason::EmptyAddress);
    };

    let coordinate = match geocoder.geocode(&address) {
        Ok(coordinate) => coordinate,
        Err(err) => {
            warn!(record = %record.id, address = %address, error = %err, "no coordinates found");
            return unresolved(UnresolvedReason::Geocode(err));
        }
    };

    if let Some(filter) = options.depot_filter {
        let distance_m = haversine_m(filter.depot, coordinate);
        if distance_m > filter.max_distance_m {
            warn!(record = %record.id, distance_m, limit_m = filter.max_distance_m, "skipping distant address");
            return unresolved(UnresolvedReason::OutOfRange {
                distance_m,
                limit_m: filter.max_distance_m,
            });
        }
    }

    debug!(record = %record.id, lat = coordinate.lat(), lng = coordinate.lng(), "resolved");
    Resolved::Point(ResolvedPoint {
        record_id: record.id.clone(),
        coordinate,
    })
}

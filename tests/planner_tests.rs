//! End-to-end planning tests using real Victoria, BC locations.
//!
//! Geocoding is answered from the fixture table and costs are great-circle
//! distances, so nothing here touches the network.

mod fixtures;

use std::collections::HashSet;
use std::time::Instant;

use route_planner::haversine::HaversineCost;
use route_planner::{
    optimize, AddressRecord, Cancellation, Driver, GeocodeError, OptimizeOptions, PlanError,
    PlanResult, Planner, PlannerConfig, RecordId, SolveOptions, UnresolvedReason,
};

use fixtures::{
    all_stops, records_for, CancellingGeocoder, Location, RoadClosure, StubGeocoder, BUTCHART_GARDENS,
    CITY_HALL, DOWNTOWN, SUBURBS,
};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn victoria_options(capacity: Option<usize>) -> OptimizeOptions {
    OptimizeOptions {
        city: Some("Victoria".to_string()),
        concurrency: 4,
        max_depot_distance_m: Some(10_000.0),
        solve: SolveOptions {
            capacity,
            seed: Some(7),
            restarts: 5,
            ..SolveOptions::default()
        },
        ..OptimizeOptions::default()
    }
}

fn geocoder_with_depot(stops: &[Location]) -> StubGeocoder {
    let mut known = stops.to_vec();
    known.push(CITY_HALL);
    known.push(BUTCHART_GARDENS);
    StubGeocoder::new(&known)
}

fn plan(records: &[AddressRecord], options: &OptimizeOptions) -> PlanResult {
    optimize(
        records,
        CITY_HALL.coordinate(),
        options,
        &geocoder_with_depot(&all_stops()),
        &HaversineCost::default(),
        &Cancellation::new(),
    )
    .expect("planning succeeds")
}

fn planned_ids(result: &PlanResult) -> Vec<RecordId> {
    result
        .routes
        .iter()
        .flat_map(|route| route.record_ids().cloned())
        .collect()
}

fn assert_well_formed(result: &PlanResult) {
    for route in &result.routes {
        let first = route.stops.first().expect("route has stops");
        let last = route.stops.last().expect("route has stops");
        assert!(first.record.is_none() && last.record.is_none(), "routes start and end at the depot");
        assert_eq!(first.cumulative_cost, 0.0);
        assert_eq!(last.cumulative_cost, route.total_cost);
        for (sequence, pair) in route.stops.windows(2).enumerate() {
            assert_eq!(pair[0].sequence, sequence);
            assert!(pair[1].cumulative_cost >= pair[0].cumulative_cost);
        }
    }
}

// ============================================================================
// Full pipeline
// ============================================================================

#[test]
fn every_resolved_record_is_delivered_once() {
    let stops = all_stops();
    let records = records_for(&stops);

    let result = plan(&records, &victoria_options(Some(6)));

    assert!(result.unresolved.is_empty());
    assert_eq!(result.routes.len(), 3);
    assert!(result.routes.iter().all(|route| route.deliveries().len() <= 6));
    let ids = planned_ids(&result);
    assert_eq!(ids.len(), records.len());
    assert_eq!(
        ids.into_iter().collect::<HashSet<_>>(),
        records.iter().map(|record| record.id.clone()).collect::<HashSet<_>>()
    );
    assert_well_formed(&result);
}

#[test]
fn failures_are_isolated_per_record() {
    let mut records = records_for(DOWNTOWN);
    records.push(AddressRecord::new("unknown", "42 Nowhere Lane"));
    records.push(AddressRecord::new("blank", "   "));
    records.push(AddressRecord::new("far", BUTCHART_GARDENS.name));

    let result = plan(&records, &victoria_options(None));

    let reasons: Vec<(&str, &UnresolvedReason)> = result
        .unresolved
        .iter()
        .map(|record| (record.record_id.as_str(), &record.reason))
        .collect();
    assert_eq!(reasons.len(), 3);
    assert_eq!(reasons[0], ("unknown", &UnresolvedReason::Geocode(GeocodeError::NoResult)));
    assert_eq!(reasons[1], ("blank", &UnresolvedReason::EmptyAddress));
    assert_eq!(reasons[2].0, "far");
    assert!(matches!(
        reasons[2].1,
        UnresolvedReason::OutOfRange { distance_m, limit_m } if *distance_m > *limit_m
    ));

    assert_eq!(result.routes.len(), 1);
    assert_eq!(planned_ids(&result).len(), DOWNTOWN.len());
    assert_well_formed(&result);
}

#[test]
fn concurrency_does_not_change_the_plan() {
    let records = records_for(&all_stops());
    let sequential = OptimizeOptions {
        concurrency: 1,
        ..victoria_options(Some(5))
    };

    assert_eq!(plan(&records, &sequential), plan(&records, &victoria_options(Some(5))));
}

#[test]
fn open_routes_end_without_a_return_leg() {
    let records = records_for(SUBURBS);
    let options = OptimizeOptions {
        return_to_depot: false,
        ..victoria_options(Some(4))
    };

    let result = plan(&records, &options);

    for route in &result.routes {
        let n = route.stops.len();
        assert_eq!(route.stops[n - 1].cumulative_cost, route.stops[n - 2].cumulative_cost);
    }
    assert_well_formed(&result);
}

#[test]
fn drivers_are_matched_to_distinct_routes() {
    let records = records_for(&all_stops());
    let options = OptimizeOptions {
        drivers: vec![
            Driver::new("Sam", Some(Location::new("home", 48.4634, -123.3117).coordinate())),
            Driver::new("Alex", Some(Location::new("home", 48.4140, -123.3850).coordinate())),
            Driver::new("Jordan", None),
        ],
        ..victoria_options(Some(8))
    };

    let result = plan(&records, &options);

    assert_eq!(result.routes.len(), 2);
    let drivers: HashSet<&str> = result
        .routes
        .iter()
        .map(|route| route.driver.as_deref().expect("every route has a driver"))
        .collect();
    assert_eq!(drivers.len(), 2);
    assert!(!drivers.contains("Jordan"), "drivers with a home are preferred");
}

#[test]
fn result_serializes_to_json() {
    let records = records_for(&DOWNTOWN[..2]);

    let result = plan(&records, &victoria_options(None));
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["routes"][0]["stops"].as_array().map(Vec::len), Some(4));
    assert!(json["unresolved"].as_array().is_some_and(Vec::is_empty));
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn cancelled_run_returns_depot_only_plan() {
    let records = records_for(&all_stops());
    let geocoder = geocoder_with_depot(&all_stops());
    let cancellation = Cancellation::new();
    cancellation.cancel();

    let result = optimize(
        &records,
        CITY_HALL.coordinate(),
        &victoria_options(Some(6)),
        &geocoder,
        &HaversineCost::default(),
        &cancellation,
    )
    .unwrap();

    assert_eq!(geocoder.calls(), 0);
    assert_eq!(result.routes.len(), 1);
    assert_eq!(result.routes[0].stops.len(), 2);
    assert_eq!(result.unresolved.len(), records.len());
    assert!(result.unresolved.iter().all(|record| record.reason == UnresolvedReason::Cancelled));
}

#[test]
fn expired_deadline_counts_as_cancelled() {
    let records = records_for(DOWNTOWN);

    let result = optimize(
        &records,
        CITY_HALL.coordinate(),
        &victoria_options(None),
        &geocoder_with_depot(DOWNTOWN),
        &HaversineCost::default(),
        &Cancellation::with_deadline(Instant::now()),
    )
    .unwrap();

    assert!(planned_ids(&result).is_empty());
    assert_eq!(result.unresolved.len(), DOWNTOWN.len());
}

#[test]
fn cancellation_midway_keeps_what_was_resolved() {
    let records = records_for(&all_stops());
    let cancellation = Cancellation::new();
    let geocoder = CancellingGeocoder {
        inner: geocoder_with_depot(&all_stops()),
        cancellation: &cancellation,
        cancel_after: 5,
    };
    let options = OptimizeOptions {
        concurrency: 1,
        ..victoria_options(None)
    };

    let result = optimize(
        &records,
        CITY_HALL.coordinate(),
        &options,
        &geocoder,
        &HaversineCost::default(),
        &cancellation,
    )
    .unwrap();

    let planned: HashSet<RecordId> = planned_ids(&result).into_iter().collect();
    let expected: HashSet<RecordId> = records[..5].iter().map(|record| record.id.clone()).collect();
    assert_eq!(planned, expected);
    assert_eq!(result.unresolved.len(), records.len() - 5);
    assert!(result.unresolved.iter().all(|record| record.reason == UnresolvedReason::Cancelled));
    assert_well_formed(&result);
}

// ============================================================================
// Fatal errors
// ============================================================================

#[test]
fn unreachable_stop_fails_the_matrix_stage() {
    let records = records_for(DOWNTOWN);

    let err = optimize(
        &records,
        CITY_HALL.coordinate(),
        &victoria_options(None),
        &geocoder_with_depot(DOWNTOWN),
        &RoadClosure {
            closed_lat: DOWNTOWN[2].lat,
        },
        &Cancellation::new(),
    )
    .unwrap_err();

    assert!(matches!(err, PlanError::Matrix(_)), "got {err:?}");
    assert!(err.to_string().contains("matrix"));
}

#[test]
fn duplicate_record_ids_are_rejected() {
    let records = vec![
        AddressRecord::new("1", DOWNTOWN[0].name),
        AddressRecord::new("1", DOWNTOWN[1].name),
    ];

    let err = optimize(
        &records,
        CITY_HALL.coordinate(),
        &victoria_options(None),
        &geocoder_with_depot(DOWNTOWN),
        &HaversineCost::default(),
        &Cancellation::new(),
    )
    .unwrap_err();

    assert!(matches!(err, PlanError::DuplicateRecord(id) if id.as_str() == "1"));
}

#[test]
fn impossible_fleet_fails_the_optimization_stage() {
    let records = records_for(DOWNTOWN);
    let mut options = victoria_options(Some(2));
    options.solve.vehicle_count = Some(1);

    let err = optimize(
        &records,
        CITY_HALL.coordinate(),
        &options,
        &geocoder_with_depot(DOWNTOWN),
        &HaversineCost::default(),
        &Cancellation::new(),
    )
    .unwrap_err();

    assert!(matches!(err, PlanError::Optimization(_)), "got {err:?}");
}

// ============================================================================
// Planner facade
// ============================================================================

#[test]
fn planner_geocodes_depot_and_plans() {
    let planner = Planner::new(
        Box::new(geocoder_with_depot(&all_stops())),
        Box::new(HaversineCost::default()),
        victoria_options(Some(6)),
    );

    let depot = planner.geocode_depot(CITY_HALL.name).unwrap();
    assert_eq!(depot, CITY_HALL.coordinate());

    let result = planner
        .optimize(&records_for(SUBURBS), depot, &Cancellation::new())
        .unwrap();
    assert_eq!(planned_ids(&result).len(), SUBURBS.len());
}

#[test]
fn planner_reports_unknown_depot() {
    let planner = Planner::new(
        Box::new(StubGeocoder::new(DOWNTOWN)),
        Box::new(HaversineCost::default()),
        OptimizeOptions::default(),
    );

    assert_eq!(planner.geocode_depot("1 Unknown Rd"), Err(GeocodeError::NoResult));
    assert_eq!(planner.geocode_depot(""), Err(GeocodeError::NoResult));
}

#[test]
fn planner_builds_from_default_config() {
    let config = PlannerConfig::from_json_str(r#"{"city": "Victoria", "solve": {"capacity": 6}}"#).unwrap();

    let planner = Planner::from_config(&config).unwrap();

    assert_eq!(planner.options().city.as_deref(), Some("Victoria"));
    assert_eq!(planner.options().solve.capacity, Some(6));
}

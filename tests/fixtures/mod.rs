//! Test fixtures for route-planner.
//!
//! Provides realistic test data including:
//! - Real Victoria, BC locations
//! - Stub geocoders and cost providers that never touch the network

#![allow(dead_code)]

pub mod victoria_locations;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use route_planner::{
    AddressRecord, Cancellation, Coordinate, CostProvider, DistanceError, GeocodeError, Geocoder,
};

pub use victoria_locations::*;

/// Geocoder answering from a fixed table.
///
/// Lookups use the text before the first comma, so the city suffix added
/// during address clean-up does not matter.
#[derive(Debug, Default)]
pub struct StubGeocoder {
    known: HashMap<String, Coordinate>,
    calls: AtomicUsize,
}

impl StubGeocoder {
    pub fn new(locations: &[Location]) -> Self {
        Self {
            known: locations
                .iter()
                .map(|location| (location.name.to_string(), location.coordinate()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Geocoder for StubGeocoder {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = address.split(',').next().unwrap_or_default().trim();
        self.known.get(key).copied().ok_or(GeocodeError::NoResult)
    }
}

/// Wraps a geocoder and cancels the run after a fixed number of lookups.
pub struct CancellingGeocoder<'a> {
    pub inner: StubGeocoder,
    pub cancellation: &'a Cancellation,
    pub cancel_after: usize,
}

impl Geocoder for CancellingGeocoder<'_> {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let result = self.inner.geocode(address);
        if self.inner.calls() >= self.cancel_after {
            self.cancellation.cancel();
        }
        result
    }
}

/// Cost provider that has no route to any point at the given latitude.
pub struct RoadClosure {
    pub closed_lat: f64,
}

impl CostProvider for RoadClosure {
    fn cost(&self, from: Coordinate, to: Coordinate) -> Result<f64, DistanceError> {
        if to.lat() == self.closed_lat || from.lat() == self.closed_lat {
            Err(DistanceError::Unreachable)
        } else {
            Ok((from.lat() - to.lat()).abs() + (from.lng() - to.lng()).abs())
        }
    }
}

/// One record per location, ids `"1"`, `"2"`, ... in order.
pub fn records_for(locations: &[Location]) -> Vec<AddressRecord> {
    locations
        .iter()
        .enumerate()
        .map(|(i, location)| AddressRecord::new((i + 1).to_string(), location.name))
        .collect()
}

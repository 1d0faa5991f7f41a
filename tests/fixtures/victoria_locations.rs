//! Real Victoria, BC locations for realistic test fixtures.
//!
//! Coordinates are approximate building or landmark centres.

use route_planner::Coordinate;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng).expect("fixture coordinates are valid")
    }
}

// ============================================================================
// Depot
// ============================================================================

pub const CITY_HALL: Location = Location::new("Victoria City Hall", 48.4284, -123.3656);

// ============================================================================
// Delivery stops within ~10 km of City Hall
// ============================================================================

pub const DOWNTOWN: &[Location] = &[
    Location::new("Royal BC Museum", 48.4196, -123.3675),
    Location::new("Market Square", 48.4285, -123.3680),
    Location::new("Beacon Hill Park", 48.4128, -123.3646),
    Location::new("Ogden Point", 48.4140, -123.3850),
    Location::new("Cook Street Village", 48.4140, -123.3560),
    Location::new("Fernwood Square", 48.4318, -123.3440),
];

pub const SUBURBS: &[Location] = &[
    Location::new("Craigdarroch Castle", 48.4225, -123.3439),
    Location::new("Government House", 48.4190, -123.3410),
    Location::new("Oak Bay Village", 48.4265, -123.3153),
    Location::new("Royal Jubilee Hospital", 48.4330, -123.3275),
    Location::new("Hillside Centre", 48.4382, -123.3285),
    Location::new("Mayfair Shopping Centre", 48.4436, -123.3705),
    Location::new("Uptown", 48.4546, -123.3766),
    Location::new("University of Victoria", 48.4634, -123.3117),
    Location::new("Esquimalt Plaza", 48.4325, -123.4140),
];

// ============================================================================
// Far from the depot (outside the default 10 km filter)
// ============================================================================

pub const BUTCHART_GARDENS: Location = Location::new("Butchart Gardens", 48.5636, -123.4690);

/// Every in-range stop.
pub fn all_stops() -> Vec<Location> {
    DOWNTOWN.iter().chain(SUBURBS.iter()).cloned().collect()
}

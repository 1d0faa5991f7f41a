//! Records, coordinates and per-record resolution outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoordinateError, GeocodeError};

/// Opaque, stable identifier of an input record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single delivery address as read from the input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: RecordId,
    pub address: String,
}

impl AddressRecord {
    pub fn new(id: impl Into<RecordId>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

/// A validated WGS84 position.
///
/// Latitude is always within `[-90, 90]` and longitude within `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        // Range checks also reject NaN.
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::Latitude(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinateError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Returns `(lat, lng)`.
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

/// A record that geocoded successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPoint {
    pub record_id: RecordId,
    pub coordinate: Coordinate,
}

/// Why a record was left out of routing.
#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedReason {
    /// Nothing left to look up once the address was cleaned.
    EmptyAddress,
    Geocode(GeocodeError),
    /// Geocoded, but too far from the depot to be plausible.
    OutOfRange { distance_m: f64, limit_m: f64 },
    /// Resolution was cancelled before this record was looked up.
    Cancelled,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::EmptyAddress => f.write_str("address is empty"),
            UnresolvedReason::Geocode(err) => write!(f, "{err}"),
            UnresolvedReason::OutOfRange {
                distance_m,
                limit_m,
            } => write!(
                f,
                "{distance_m:.0}m from the depot exceeds the {limit_m:.0}m limit"
            ),
            UnresolvedReason::Cancelled => f.write_str("resolution was cancelled"),
        }
    }
}

impl Serialize for UnresolvedReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A record the resolver could not place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedRecord {
    pub record_id: RecordId,
    pub reason: UnresolvedReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_accepts_bounds() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_nan() {
        assert_eq!(
            Coordinate::new(91.0, 0.0),
            Err(CoordinateError::Latitude(91.0))
        );
        assert_eq!(
            Coordinate::new(0.0, -180.5),
            Err(CoordinateError::Longitude(-180.5))
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn coordinate_deserialization_is_validated() {
        let ok: Coordinate = serde_json::from_str(r#"{"lat": 48.42, "lng": -123.36}"#).unwrap();
        assert_eq!(ok.as_tuple(), (48.42, -123.36));

        let bad = serde_json::from_str::<Coordinate>(r#"{"lat": 120.0, "lng": 0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn unresolved_reason_serializes_as_message() {
        let record = UnresolvedRecord {
            record_id: RecordId::new("7"),
            reason: UnresolvedReason::Geocode(GeocodeError::NoResult),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["record_id"], "7");
        assert_eq!(json["reason"], "no result for address");
    }
}

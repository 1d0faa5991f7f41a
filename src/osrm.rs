//! OSRM HTTP adapter for directional travel-time costs.
//!
//! Durations come from OSRM's `table` service and are not assumed to be
//! symmetric.

use serde::Deserialize;
use tracing::debug;

use crate::error::{DistanceError, MatrixError};
use crate::matrix::CostMatrix;
use crate::model::Coordinate;
use crate::traits::CostProvider;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn table(&self, locations: &[Coordinate]) -> Result<OsrmTableResponse, DistanceError> {
        let coords = locations
            .iter()
            .map(|location| format!("{:.6},{:.6}", location.lng(), location.lat()))
            .collect::<Vec<_>>()
            .join(";");

        let url = format!(
            "{}/table/v1/{}/{}?annotations=duration",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coords
        );
        debug!(locations = locations.len(), "requesting OSRM table");

        // OSRM reports failures as JSON bodies with a code, so decode before
        // looking at the status.
        self.client
            .get(url)
            .send()
            .and_then(|resp| resp.json::<OsrmTableResponse>())
            .map_err(DistanceError::from_reqwest)
    }
}

impl CostProvider for OsrmClient {
    fn cost(&self, from: Coordinate, to: Coordinate) -> Result<f64, DistanceError> {
        let durations = self.table(&[from, to])?.into_durations(2).map_err(|err| match err {
            MatrixError::Unreachable { .. } => DistanceError::Unreachable,
            MatrixError::Table(source) => source,
            other => DistanceError::InvalidResponse(other.to_string()),
        })?;
        Ok(durations[0][1])
    }

    fn matrix_for(&self, locations: &[Coordinate]) -> Result<CostMatrix, MatrixError> {
        if locations.is_empty() {
            return CostMatrix::from_rows(Vec::new());
        }
        let durations = self
            .table(locations)
            .map_err(MatrixError::Table)?
            .into_durations(locations.len())?;
        CostMatrix::from_rows(durations)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    durations: Option<Vec<Vec<Option<f64>>>>,
}

impl OsrmTableResponse {
    /// Validates the table shape and replaces `null` (no route) with an error.
    fn into_durations(self, expected: usize) -> Result<Vec<Vec<f64>>, MatrixError> {
        if self.code != "Ok" {
            let message = self.message.unwrap_or_default();
            return Err(MatrixError::Table(DistanceError::InvalidResponse(format!(
                "{}: {}",
                self.code, message
            ))));
        }
        let rows = self.durations.ok_or_else(|| {
            MatrixError::Table(DistanceError::InvalidResponse("missing durations".to_string()))
        })?;
        if rows.len() != expected {
            return Err(MatrixError::SizeMismatch {
                expected,
                actual: rows.len(),
            });
        }

        rows.into_iter()
            .enumerate()
            .map(|(from, row)| {
                if row.len() != expected {
                    return Err(MatrixError::NotSquare {
                        row: from,
                        len: row.len(),
                        expected,
                    });
                }
                row.into_iter()
                    .enumerate()
                    .map(|(to, value)| match value {
                        _ if from == to => Ok(0.0),
                        Some(seconds) => Ok(seconds),
                        None => Err(MatrixError::Unreachable { from, to }),
                    })
                    .collect::<Result<Vec<f64>, MatrixError>>()
            })
            .collect()
    }
}

//! Dense cost matrix and the matrix-building stage.
//!
//! Index 0 is always the depot; index `k + 1` is the k-th resolved point.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::MatrixError;
use crate::model::{Coordinate, ResolvedPoint};
use crate::traits::CostProvider;

/// Index of the depot in every matrix and route.
pub const DEPOT: usize = 0;

/// A complete square matrix of non-negative, finite travel costs.
///
/// Stored row-major. Every constructor validates the invariants, so holders
/// never see gaps, negative costs or a non-zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    data: Vec<f64>,
    size: usize,
}

impl CostMatrix {
    /// Builds a matrix from explicit rows.
    ///
    /// ```
    /// use route_planner::CostMatrix;
    ///
    /// let matrix = CostMatrix::from_rows(vec![
    ///     vec![0.0, 1.0, 2.0],
    ///     vec![1.0, 0.0, 1.0],
    ///     vec![2.0, 1.0, 0.0],
    /// ])?;
    /// assert_eq!(matrix.get(0, 2), 2.0);
    /// # Ok::<(), route_planner::MatrixError>(())
    /// ```
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for (from, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(MatrixError::NotSquare {
                    row: from,
                    len: row.len(),
                    expected: size,
                });
            }
            for (to, value) in row.into_iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(MatrixError::InvalidCost { from, to, value });
                }
                if from == to && value != 0.0 {
                    return Err(MatrixError::NonZeroDiagonal { index: from, value });
                }
                data.push(value);
            }
        }
        Ok(Self { data, size })
    }

    /// Number of locations, depot included.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Cost of travelling from `from` to `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    pub fn row(&self, from: usize) -> &[f64] {
        &self.data[from * self.size..(from + 1) * self.size]
    }

    /// Exact symmetry check. Optimizer shortcuts rely on this.
    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| (i + 1..self.size).all(|j| self.get(i, j) == self.get(j, i)))
    }

    /// Makes every return leg into `index` free.
    fn clear_column(&mut self, index: usize) {
        for from in 0..self.size {
            self.data[from * self.size + index] = 0.0;
        }
    }
}

/// Options for [`build_matrix`].
#[derive(Debug, Clone)]
pub struct MatrixOptions {
    /// When false, the leg back to the depot costs nothing and routes
    /// effectively end at their last delivery.
    pub return_to_depot: bool,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            return_to_depot: true,
        }
    }
}

/// Builds the cost matrix for the depot followed by `points` in order.
pub fn build_matrix<P>(
    depot: Coordinate,
    points: &[ResolvedPoint],
    provider: &P,
    options: &MatrixOptions,
) -> Result<CostMatrix, MatrixError>
where
    P: CostProvider + ?Sized,
{
    let locations: Vec<Coordinate> = std::iter::once(depot)
        .chain(points.iter().map(|point| point.coordinate))
        .collect();

    let mut matrix = provider.matrix_for(&locations)?;
    if matrix.size() != locations.len() {
        return Err(MatrixError::SizeMismatch {
            expected: locations.len(),
            actual: matrix.size(),
        });
    }
    if !options.return_to_depot {
        matrix.clear_column(DEPOT);
    }

    info!(
        locations = locations.len(),
        symmetric = provider.is_symmetric() && options.return_to_depot,
        "cost matrix built"
    );
    Ok(matrix)
}

/// Prices every ordered pair through [`CostProvider::cost`].
///
/// Rows are computed in parallel; results do not depend on scheduling.
/// Symmetric providers are only asked for the upper triangle, which is then
/// mirrored.
pub fn pairwise_matrix<P>(provider: &P, locations: &[Coordinate]) -> Result<CostMatrix, MatrixError>
where
    P: CostProvider + ?Sized,
{
    let n = locations.len();
    let symmetric = provider.is_symmetric();

    let rows: Vec<Result<Vec<f64>, MatrixError>> = (0..n)
        .into_par_iter()
        .map(|from| {
            let mut row = vec![0.0; n];
            let first = if symmetric { from + 1 } else { 0 };
            for to in first..n {
                if to == from {
                    continue;
                }
                row[to] = provider
                    .cost(locations[from], locations[to])
                    .map_err(|source| MatrixError::from_distance(from, to, source))?;
            }
            Ok(row)
        })
        .collect();

    // Walk in row order so the reported failure is the same on every run.
    let mut rows = rows.into_iter().collect::<Result<Vec<_>, _>>()?;
    if symmetric {
        for from in 1..n {
            for to in 0..from {
                rows[from][to] = rows[to][from];
            }
        }
    }

    debug!(locations = n, symmetric, "pairwise costs computed");
    CostMatrix::from_rows(rows)
}

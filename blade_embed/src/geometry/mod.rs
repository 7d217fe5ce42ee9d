//! Pure vectorized geometry primitives (component C2).
//!
//! Positions are stored row-major as an `n x d` [`nalgebra::DMatrix<f64>`]:
//! one row per atom, one column per coordinate axis. Distance and
//! interaction matrices are `n x n`, symmetric, zero-diagonal.

use nalgebra::{DMatrix, DVector};

/// Divisions below this magnitude are treated as coincidences and guarded
/// against rather than propagating `inf`/`NaN`.
pub const EPSILON: f64 = 1e-12;

/// `R_ij = ||P_i - P_j||`, symmetric, zero diagonal.
pub fn distance_matrix(positions: &DMatrix<f64>) -> DMatrix<f64> {
    let n = positions.nrows();
    let mut r = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let row_i = positions.row(i);
            let row_j = positions.row(j);
            let dist = (row_i - row_j).norm();
            r[(i, j)] = dist;
            r[(j, i)] = dist;
        }
    }
    r
}

/// Unit vectors from atom `i` towards atom `j`, one `n x n` matrix per
/// coordinate axis: `unitary[k][(i, j)] = (P_j[k] - P_i[k]) / R_ij`.
///
/// `unitary[k][(i, i)] == 0` and any pair with `R_ij < EPSILON` is also
/// zeroed — the caller (the force assembler) relies on the min-distance
/// force to resolve coincidences on a subsequent step rather than dividing
/// by a near-zero distance here.
pub fn unitary_vectors(positions: &DMatrix<f64>, distances: &DMatrix<f64>) -> Vec<DMatrix<f64>> {
    let n = positions.nrows();
    let d = positions.ncols();
    let mut axes = vec![DMatrix::<f64>::zeros(n, n); d];
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let r = distances[(i, j)];
            if r < EPSILON {
                continue;
            }
            for k in 0..d {
                axes[k][(i, j)] = (positions[(j, k)] - positions[(i, k)]) / r;
            }
        }
    }
    axes
}

/// `I_ij = R_ij^-6` for `i != j`, zero on the diagonal. Full symmetric
/// matrix, per the data model in [`crate`] — callers that only need the
/// strict upper triangle (e.g. the scale controller's sums) iterate `i < j`
/// directly rather than relying on a zeroed-out lower triangle here.
pub fn interaction_matrix(distances: &DMatrix<f64>) -> DMatrix<f64> {
    let n = distances.nrows();
    let mut interactions = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let r = distances[(i, j)];
            interactions[(i, j)] = if r < EPSILON {
                f64::INFINITY
            } else {
                r.powi(-6)
            };
        }
    }
    interactions
}

/// The mean position across all atoms.
pub fn centroid(positions: &DMatrix<f64>) -> DVector<f64> {
    let n = positions.nrows() as f64;
    let mut sum = DVector::<f64>::zeros(positions.ncols());
    for row in positions.row_iter() {
        sum += row.transpose();
    }
    sum / n
}

/// The smallest pairwise distance in the configuration.
///
/// Returns `f64::INFINITY` for fewer than two atoms.
pub fn min_pair_distance(positions: &DMatrix<f64>) -> f64 {
    let distances = distance_matrix(positions);
    let n = distances.nrows();
    let mut min = f64::INFINITY;
    for i in 0..n {
        for j in (i + 1)..n {
            min = min.min(distances[(i, j)]);
        }
    }
    min
}

/// The largest distance from any atom to the centroid of `positions`.
pub fn max_radial_distance(positions: &DMatrix<f64>) -> f64 {
    let center = centroid(positions);
    positions
        .row_iter()
        .map(|row| (row.transpose() - &center).norm())
        .fold(0.0_f64, f64::max)
}

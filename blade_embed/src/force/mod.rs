//! The force assembler (component C3): the central per-step routine.
//!
//! Each step superposes three force fields — interaction matching,
//! min-distance repulsion and max-radial confinement — into a single
//! position update, following `qoolqit`'s
//! `embedding/algorithms/blade/_interactions_forces.py` generalized to the
//! three-part superposition §4.3 of the specification calls for.

use nalgebra::DMatrix;
use tracing::debug;

use crate::geometry::{self, EPSILON};

/// Per-kind (or uniform) cap on how far a single step may move a pair of
/// atoms towards their target distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxDistanceToWalk {
    Uniform(f64),
    PerKind {
        interaction: f64,
        min_distance: f64,
        max_radial: f64,
    },
}

impl Default for MaxDistanceToWalk {
    fn default() -> Self {
        MaxDistanceToWalk::Uniform(f64::INFINITY)
    }
}

impl MaxDistanceToWalk {
    pub fn interaction(&self) -> f64 {
        match self {
            MaxDistanceToWalk::Uniform(v) => *v,
            MaxDistanceToWalk::PerKind { interaction, .. } => *interaction,
        }
    }

    pub fn min_distance(&self) -> f64 {
        match self {
            MaxDistanceToWalk::Uniform(v) => *v,
            MaxDistanceToWalk::PerKind { min_distance, .. } => *min_distance,
        }
    }

    pub fn max_radial(&self) -> f64 {
        match self {
            MaxDistanceToWalk::Uniform(v) => *v,
            MaxDistanceToWalk::PerKind { max_radial, .. } => *max_radial,
        }
    }
}

/// The current admissible minimum pair distance / maximum radial distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub s_min: f64,
    pub s_max: f64,
}

/// Configuration for a single force-assembler step; stable across the
/// steps of one round (the band and thresholds are advanced by the scale
/// controller between steps, not inside this module).
#[derive(Debug, Clone)]
pub struct StepConfig {
    pub weight_relative_threshold: f64,
    pub max_distance_to_walk: MaxDistanceToWalk,
    pub band: Option<Band>,
}

/// The three additive force fields for one step, each `n x d`.
#[derive(Debug, Clone)]
pub struct Force {
    pub interaction: DMatrix<f64>,
    pub min_distance: DMatrix<f64>,
    pub max_radial: DMatrix<f64>,
}

impl Force {
    pub fn total(&self) -> DMatrix<f64> {
        &self.interaction + &self.min_distance + &self.max_radial
    }
}

fn normalized_best_dist(weight: f64) -> f64 {
    if weight > 0.0 {
        (1.0 / weight).powf(1.0 / 6.0)
    } else {
        f64::INFINITY
    }
}

/// Step 2b: the distance-walk limiter. Caps how far the target distance
/// for each pair may shift in a single step, then rectifies the clipped
/// target distance back into weight space.
fn target_weights_by_dist_limit(
    distances: &DMatrix<f64>,
    target_weights: &DMatrix<f64>,
    max_distance_to_walk: f64,
) -> DMatrix<f64> {
    let n = distances.nrows();
    let mut modulated = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let r = distances[(i, j)];
            let target_distance = normalized_best_dist(target_weights[(i, j)]);
            let to_walk = (r - target_distance) / 2.0;
            let clipped = to_walk.clamp(-max_distance_to_walk, max_distance_to_walk);
            let modulated_distance = r - 2.0 * clipped;

            // Rectify numerical sign inversions near the clip boundary.
            let rectified = if clipped == 0.0 {
                r
            } else if clipped > 0.0 {
                modulated_distance.max(target_distance)
            } else {
                modulated_distance.min(target_distance)
            };

            modulated[(i, j)] = if rectified < EPSILON {
                f64::INFINITY
            } else {
                rectified.powi(-6)
            };
        }
    }
    modulated
}

/// `(1 - sin((1 - |x/tau|) * pi/2)) * sign(x) * tau`, the smooth reduction
/// applied to weight differences below the significance threshold so that
/// they do not starve larger differences of step budget, while remaining
/// continuous at `|x| == tau`.
fn smooth_reduce(x: f64, tau: f64) -> f64 {
    if tau == 0.0 {
        return 0.0;
    }
    let ratio = (x / tau).abs();
    (1.0 - ((1.0 - ratio) * std::f64::consts::FRAC_PI_2).sin()) * x.signum() * tau
}

/// Step 2c-2e: the weight-difference limiter plus per-pair force vectors.
/// Returns one `n x n` matrix of signed weight differences per coordinate
/// axis worth of contribution (`weighted_vectors[k][(i,j)]`) and the
/// per-pair absolute walk magnitude.
fn target_weights_distances_by_weight_diff_limit(
    distances: &DMatrix<f64>,
    unitary_vectors: &[DMatrix<f64>],
    current_weights: &DMatrix<f64>,
    target_weights: &DMatrix<f64>,
    weight_relative_threshold: f64,
) -> (Vec<DMatrix<f64>>, DMatrix<f64>) {
    let n = distances.nrows();
    let mut weight_differences = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            // An exactly coincident pair has an infinite current weight and
            // an undefined (zeroed) unit vector; `inf - inf` (or `inf * 0`
            // further down) would otherwise turn this into a NaN instead of
            // leaving the pair's resolution to the min-distance force on a
            // later step, matching how `geometry::unitary_vectors` already
            // zeroes the undefined direction for this case.
            if distances[(i, j)] < EPSILON {
                continue;
            }
            weight_differences[(i, j)] = target_weights[(i, j)] - current_weights[(i, j)];
        }
    }

    let threshold = weight_differences
        .iter()
        .fold(0.0_f64, |acc, &v| acc.max(v.abs()))
        * weight_relative_threshold;
    debug!(threshold, "weight difference threshold for this step");

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let wd = weight_differences[(i, j)];
            if wd.abs() < threshold {
                weight_differences[(i, j)] = smooth_reduce(wd, threshold);
            }
        }
    }

    let mut step_target_weights = DMatrix::<f64>::zeros(n, n);
    let mut step_target_distances = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            step_target_weights[(i, j)] = current_weights[(i, j)]
                + weight_differences[(i, j)] * (1.0 - weight_relative_threshold);
            step_target_distances[(i, j)] = normalized_best_dist(step_target_weights[(i, j)]);
        }
    }

    let d = unitary_vectors.len();
    let mut weighted_vectors = vec![DMatrix::<f64>::zeros(n, n); d];
    let mut walk_magnitude = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            for (k, axis) in unitary_vectors.iter().enumerate() {
                weighted_vectors[k][(i, j)] = weight_differences[(i, j)] * axis[(i, j)];
            }
            walk_magnitude[(i, j)] =
                ((distances[(i, j)] - step_target_distances[(i, j)]) / 2.0).abs();
        }
    }

    for axis in &weighted_vectors {
        assert!(
            axis.iter().all(|v| v.is_finite()),
            "interaction force contains a non-finite component"
        );
    }

    (weighted_vectors, walk_magnitude)
}

/// Accumulates a field of signed per-pair contributions (one matrix per
/// axis, `field[k][(i,j)]` is the contribution to atom `i` from atom `j`)
/// into an `n x d` force matrix.
fn accumulate(field: &[DMatrix<f64>], n: usize) -> DMatrix<f64> {
    let d = field.len();
    let mut out = DMatrix::<f64>::zeros(n, d);
    for (k, axis) in field.iter().enumerate() {
        for i in 0..n {
            let mut total = 0.0;
            for j in 0..n {
                total += axis[(i, j)];
            }
            out[(i, k)] = total;
        }
    }
    out
}

fn interaction_force(
    distances: &DMatrix<f64>,
    unitary_vectors: &[DMatrix<f64>],
    current_weights: &DMatrix<f64>,
    target_weights: &DMatrix<f64>,
    weight_relative_threshold: f64,
    max_distance_to_walk: f64,
) -> DMatrix<f64> {
    let modulated_target_weights =
        target_weights_by_dist_limit(distances, target_weights, max_distance_to_walk);
    let (weighted_vectors, _walk_magnitude) = target_weights_distances_by_weight_diff_limit(
        distances,
        unitary_vectors,
        current_weights,
        &modulated_target_weights,
        weight_relative_threshold,
    );
    accumulate(&weighted_vectors, distances.nrows())
}

fn min_distance_force(
    distances: &DMatrix<f64>,
    unitary_vectors: &[DMatrix<f64>],
    s_min: f64,
    cap: f64,
) -> DMatrix<f64> {
    let n = distances.nrows();
    let d = unitary_vectors.len();
    let mut field = vec![DMatrix::<f64>::zeros(n, n); d];
    for i in 0..n {
        for j in (i + 1)..n {
            let r = distances[(i, j)];
            if r >= s_min {
                continue;
            }
            let magnitude = (s_min - r).min(cap);
            for (k, axis) in unitary_vectors.iter().enumerate() {
                // push i away from j (opposite of the i->j unit vector)
                field[k][(i, j)] -= axis[(i, j)] * magnitude;
                field[k][(j, i)] += axis[(i, j)] * magnitude;
            }
        }
    }
    accumulate(&field, n)
}

fn max_radial_force(positions: &DMatrix<f64>, s_max: f64, cap: f64) -> DMatrix<f64> {
    let n = positions.nrows();
    let d = positions.ncols();
    let center = geometry::centroid(positions);
    let half = s_max / 2.0;
    let mut out = DMatrix::<f64>::zeros(n, d);
    for i in 0..n {
        let offset = center.clone() - positions.row(i).transpose();
        let radius = (positions.row(i).transpose() - &center).norm();
        if radius <= half || radius < EPSILON {
            continue;
        }
        let magnitude = (radius - half).min(cap);
        let direction = offset / radius;
        for k in 0..d {
            out[(i, k)] = direction[k] * magnitude;
        }
    }
    out
}

/// Computes the three superposed force fields for one step.
pub fn compute_force(
    positions: &DMatrix<f64>,
    target_weights: &DMatrix<f64>,
    config: &StepConfig,
) -> Force {
    let distances = geometry::distance_matrix(positions);
    let unitary = geometry::unitary_vectors(positions, &distances);
    let current_weights = geometry::interaction_matrix(&distances);

    let interaction = interaction_force(
        &distances,
        &unitary,
        &current_weights,
        target_weights,
        config.weight_relative_threshold,
        config.max_distance_to_walk.interaction(),
    );

    let (min_distance, max_radial) = match config.band {
        Some(band) => (
            min_distance_force(
                &distances,
                &unitary,
                band.s_min,
                config.max_distance_to_walk.min_distance(),
            ),
            max_radial_force(
                positions,
                band.s_max,
                config.max_distance_to_walk.max_radial(),
            ),
        ),
        None => (
            DMatrix::zeros(positions.nrows(), positions.ncols()),
            DMatrix::zeros(positions.nrows(), positions.ncols()),
        ),
    };

    Force {
        interaction,
        min_distance,
        max_radial,
    }
}

/// Performs one full step: computes the force field and applies it,
/// scaled by `temperature` (the round's step-size schedule).
pub fn step(
    positions: &DMatrix<f64>,
    target_weights: &DMatrix<f64>,
    config: &StepConfig,
    temperature: f64,
) -> (DMatrix<f64>, Force) {
    let force = compute_force(positions, target_weights, config);
    let total = force.total();
    assert!(
        total.iter().all(|v| v.is_finite()),
        "force assembler produced a non-finite step"
    );
    let new_positions = positions + total * temperature;
    (new_positions, force)
}

//! The round scheduler (component C5): the outer loop driving the force
//! assembler and scale controller across a descending dimension schedule.
//!
//! Grounded in `qoolqit`'s `embedding/algorithms/blade/embedder.py` round
//! loop; the sampling step and temperature decay are not present in the
//! retrieved source slice, so both are derived closed forms documented
//! inline rather than guesses at the original's exact constants.

use std::collections::{HashMap, HashSet};

use nalgebra::DMatrix;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::cancel::CancellationToken;
use crate::config::EmbedderConfig;
use crate::error::{BladeResult, ConvergenceWarning};
use crate::force::{self, Band};
use crate::geometry;
use crate::observer::{Observer, StepEvent};
use crate::scale::{self, BandSchedule};

/// Temperature at the end of a round never drops below this fraction of
/// its starting value, so the last steps still make forward progress
/// instead of stalling entirely.
const MIN_TEMPERATURE: f64 = 0.1;

/// `sigma_0`, the starting minimum pair distance the band schedule is
/// seeded with. Not exposed in the configuration table (§6 only exposes
/// `starting_ratio_factor`); chosen to match the expected ~1 nearest-
/// neighbor spacing the starting-ball radius in [`expected_radius`] also
/// targets, so the band starts roughly where the seed positions already
/// sit.
const STARTING_MIN_DISTANCE: f64 = 1.0;

/// Consecutive steps a pair may stay below the current `s_min` before the
/// min-distance force's failure to resolve it is reported as a
/// [`ConvergenceWarning::StuckCoincidence`] (§4.3's "Failure" clause).
const STUCK_COINCIDENCE_STEPS: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct CancelledAt {
    pub steps_completed: usize,
    pub steps_total: usize,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub positions: DMatrix<f64>,
    pub warnings: Vec<ConvergenceWarning>,
    pub cancelled: Option<CancelledAt>,
}

/// Closed-form radius for a `d`-ball containing `n` points such that, were
/// they packed on a regular lattice of unit spacing, they would occupy
/// that volume: `r0 = 0.5 * n^(1/d)`. Self-consistent at `d = 1` (n points
/// spaced 1 apart span length `n`, i.e. `2 r0`); a reasonable order-of-
/// magnitude seed radius in higher dimensions too.
fn expected_radius(n: usize, d: usize) -> f64 {
    if n <= 1 {
        1.0
    } else {
        0.5 * (n as f64).powf(1.0 / d as f64)
    }
}

/// Samples one point uniformly from the `d`-ball of the given radius: a
/// random direction (normalized Gaussian vector) scaled by `radius *
/// u^(1/d)` for `u` uniform in `[0, 1)`, which corrects for the growth of
/// shell volume with radius.
fn sample_in_ball<R: Rng + ?Sized>(rng: &mut R, d: usize, radius: f64) -> Vec<f64> {
    let mut direction: Vec<f64> = (0..d).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
    let norm = direction.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > geometry::EPSILON {
        for v in direction.iter_mut() {
            *v /= norm;
        }
    }
    let u: f64 = rng.random();
    let scale = radius * u.powf(1.0 / d as f64);
    for v in direction.iter_mut() {
        *v *= scale;
    }
    direction
}

/// Step 1 of §4.5: the starting positions, either the caller's or a fresh
/// seeded ball sample, right-padded or truncated to `dim` columns with a
/// [`ConvergenceWarning::DimensionMismatch`] when they disagree.
fn starting_positions(
    n: usize,
    config: &EmbedderConfig,
    dim: usize,
) -> (DMatrix<f64>, Option<ConvergenceWarning>) {
    if let Some(provided) = &config.starting_positions {
        let provided_dim = provided.ncols();
        if provided_dim == dim {
            return (provided.clone(), None);
        }
        let warning = ConvergenceWarning::DimensionMismatch {
            provided: provided_dim,
            expected: dim,
        };
        if provided_dim < dim {
            let mut padded = DMatrix::<f64>::zeros(n, dim);
            for i in 0..n {
                for k in 0..provided_dim {
                    padded[(i, k)] = provided[(i, k)];
                }
            }
            (padded, Some(warning))
        } else {
            (provided.columns(0, dim).into_owned(), Some(warning))
        }
    } else {
        let radius = expected_radius(n, dim);
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let mut positions = DMatrix::<f64>::zeros(n, dim);
        for i in 0..n {
            let point = sample_in_ball(&mut rng, dim, radius);
            for (k, value) in point.into_iter().enumerate() {
                positions[(i, k)] = value;
            }
        }
        (positions, None)
    }
}

/// Drops trailing coordinate columns, the default projection between
/// rounds.
fn drop_last_coordinates(positions: &DMatrix<f64>, target_dim: usize) -> DMatrix<f64> {
    positions.columns(0, target_dim).into_owned()
}

/// Projects centered positions onto their top-2 principal axes, used only
/// on the final drop to 2-D when `config.pca` is set.
fn pca_project_to_2(positions: &DMatrix<f64>) -> DMatrix<f64> {
    let n = positions.nrows();
    let center = geometry::centroid(positions);
    let mut centered = positions.clone();
    for i in 0..n {
        for k in 0..centered.ncols() {
            centered[(i, k)] -= center[k];
        }
    }

    let covariance = (centered.transpose() * &centered) / (n as f64);
    let eigen = nalgebra::SymmetricEigen::new(covariance);

    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut projected = DMatrix::<f64>::zeros(n, 2);
    for (col, &axis) in order.iter().take(2).enumerate() {
        let axis_vector = eigen.eigenvectors.column(axis);
        let projection = &centered * axis_vector;
        projected.set_column(col, &projection);
    }
    projected
}

/// Advances each pair's consecutive-steps-below-`s_min` counter for one
/// step and appends a [`ConvergenceWarning::StuckCoincidence`] the first
/// time a pair reaches [`STUCK_COINCIDENCE_STEPS`] in a row. A pair that
/// rises back above `s_min` has its counter cleared, so a later stretch of
/// coincidence starts counting from zero again (but is not re-reported,
/// since `reported` persists for the whole run).
fn track_stuck_pairs(
    distances: &DMatrix<f64>,
    s_min: f64,
    counts: &mut HashMap<(usize, usize), usize>,
    reported: &mut HashSet<(usize, usize)>,
    warnings: &mut Vec<ConvergenceWarning>,
) {
    let n = distances.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let pair = (i, j);
            if distances[(i, j)] < s_min {
                let count = counts.entry(pair).or_insert(0);
                *count += 1;
                if *count >= STUCK_COINCIDENCE_STEPS && reported.insert(pair) {
                    warnings.push(ConvergenceWarning::StuckCoincidence {
                        pair,
                        consecutive_steps: *count,
                    });
                }
            } else {
                counts.remove(&pair);
            }
        }
    }
}

/// Drives the scheduler end to end (§4.5): runs `steps_per_round` steps of
/// the force assembler and scale controller at each dimension in
/// `config.dimensions`, projecting down between rounds, and returns the
/// final positions centered at the origin plus any non-fatal diagnostics.
pub fn run(
    target_weights: &DMatrix<f64>,
    config: &EmbedderConfig,
    cancellation: &CancellationToken,
    observer: &mut dyn Observer,
) -> BladeResult<RunOutcome> {
    let n = target_weights.nrows();
    let dims = &config.dimensions;
    let steps_total = config.steps_per_round * dims.len();

    let (mut positions, dimension_warning) = starting_positions(n, config, dims[0]);
    let mut warnings: Vec<ConvergenceWarning> = dimension_warning.into_iter().collect();

    let mut band_schedule: Option<BandSchedule> = config
        .max_min_dist_ratio
        .map(|ratio_f| BandSchedule::new(STARTING_MIN_DISTANCE, config.starting_ratio_factor * ratio_f, ratio_f));
    let mut band: Option<Band> = config.max_min_dist_ratio.map(|ratio_f| Band {
        s_min: STARTING_MIN_DISTANCE,
        s_max: STARTING_MIN_DISTANCE * config.starting_ratio_factor * ratio_f,
    });

    let mut steps_completed = 0usize;

    // Consecutive steps each pair has stayed below the current band's
    // `s_min`, and the set of pairs already reported so a run does not
    // emit the same warning every remaining step once the window is hit.
    let mut stuck_counts: HashMap<(usize, usize), usize> = HashMap::new();
    let mut stuck_reported: HashSet<(usize, usize)> = HashSet::new();

    for (round, &dim) in dims.iter().enumerate() {
        for step in 0..config.steps_per_round {
            if cancellation.is_cancelled() {
                return Ok(RunOutcome {
                    positions,
                    warnings,
                    cancelled: Some(CancelledAt {
                        steps_completed,
                        steps_total,
                    }),
                });
            }

            let cursor = if config.steps_per_round > 1 {
                step as f64 / (config.steps_per_round - 1) as f64
            } else {
                0.0
            };

            let weight_relative_threshold = config.weight_relative_threshold.value(cursor);
            let max_distance_to_walk = config
                .max_distance_to_walk
                .value(cursor, band.map(|b| b.s_max));
            let temperature = 1.0 - cursor * (1.0 - MIN_TEMPERATURE);

            let step_config = force::StepConfig {
                weight_relative_threshold,
                max_distance_to_walk,
                band,
            };
            let (mut stepped, _force) = force::step(&positions, target_weights, &step_config, temperature);

            let alpha = scale::best_scaling_factor(target_weights, &stepped)?;
            scale::apply_scaling(&mut stepped, alpha);
            positions = stepped;

            if let Some(schedule) = band_schedule.as_mut() {
                band = Some(schedule.advance(alpha, cursor));
            }

            if let Some(current_band) = band {
                let distances = geometry::distance_matrix(&positions);
                track_stuck_pairs(
                    &distances,
                    current_band.s_min,
                    &mut stuck_counts,
                    &mut stuck_reported,
                    &mut warnings,
                );
            }

            steps_completed += 1;
            observer.on_step(StepEvent {
                round,
                dimension: dim,
                step,
                steps_in_round: config.steps_per_round,
                temperature,
                scaling_factor: alpha,
                min_pair_distance: geometry::min_pair_distance(&positions),
                max_radial_distance: geometry::max_radial_distance(&positions),
            });
        }

        if let Some(&next_dim) = dims.get(round + 1) {
            if next_dim < dim {
                positions = if next_dim == 2 && config.pca {
                    pca_project_to_2(&positions)
                } else {
                    drop_last_coordinates(&positions, next_dim)
                };
            }
        }
    }

    if let Some(band) = band {
        let min_distance = geometry::min_pair_distance(&positions);
        let max_radial = geometry::max_radial_distance(&positions);
        let min_violation = (band.s_min * (1.0 - 1e-3) - min_distance).max(0.0);
        let max_violation = (max_radial - band.s_max / 2.0 * (1.0 + 1e-3)).max(0.0);
        let worst_violation = min_violation.max(max_violation);
        if worst_violation > 0.0 {
            warnings.push(ConvergenceWarning::BandNotSatisfied { worst_violation });
        }
    }

    let center = geometry::centroid(&positions);
    for i in 0..n {
        for k in 0..positions.ncols() {
            positions[(i, k)] -= center[k];
        }
    }

    Ok(RunOutcome {
        positions,
        warnings,
        cancelled: None,
    })
}

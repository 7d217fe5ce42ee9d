//! The scale controller (component C4).
//!
//! After every force-assembler step, positions are rescaled by the
//! closed-form factor `alpha*` that minimizes the residual stress
//! `||alpha*W - I(alpha*P)||`, exploiting `I(alpha*P) = alpha^-6 I(P)`.
//! Grounded in `qoolqit`'s
//! `embedding/algorithms/blade/_distances_constraints_calculator.py`.

use nalgebra::DMatrix;

use crate::error::{BladeError, BladeResult};
use crate::force::Band;
use crate::geometry;

/// Linear-interpolation percentile over an unsorted slice (numpy's
/// default `'linear'` method).
fn percentile(data: &[f64], percent: f64) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    match n {
        0 => 0.0,
        1 => sorted[0],
        _ => {
            let rank = (percent / 100.0) * ((n - 1) as f64);
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                sorted[lower]
            } else {
                let frac = rank - lower as f64;
                sorted[lower] + (sorted[upper] - sorted[lower]) * frac
            }
        }
    }
}

/// The closed-form scaling factor `alpha*` that best aligns the current
/// embedded interactions with the target matrix, with outlier filtering
/// on the strict upper triangle: the `(100 - 20/(n-1))`-th percentile of
/// `I - W` differences ceilings how far an ill-fitting pair can skew the
/// fit.
pub fn best_scaling_factor(target_weights: &DMatrix<f64>, positions: &DMatrix<f64>) -> BladeResult<f64> {
    let distances = geometry::distance_matrix(positions);
    let interactions = geometry::interaction_matrix(&distances);
    best_scaling_factor_from_interactions(target_weights, &interactions)
}

fn best_scaling_factor_from_interactions(
    target_weights: &DMatrix<f64>,
    interactions: &DMatrix<f64>,
) -> BladeResult<f64> {
    let n = target_weights.nrows();
    let mut embedded = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    let mut target = Vec::with_capacity(embedded.capacity());
    for i in 0..n {
        for j in (i + 1)..n {
            embedded.push(interactions[(i, j)]);
            target.push(target_weights[(i, j)]);
        }
    }

    let differences: Vec<f64> = embedded.iter().zip(&target).map(|(i, w)| i - w).collect();
    let percent = 100.0 - 20.0 / ((n as f64) - 1.0);
    let ceiling = percentile(&differences, percent).max(0.0);

    let filtered: Vec<f64> = embedded
        .iter()
        .zip(&target)
        .zip(&differences)
        .map(|((&i_val, &w_val), &diff)| {
            let limited = diff.min(ceiling);
            if diff == limited {
                i_val
            } else {
                w_val + limited
            }
        })
        .collect();

    let numerator: f64 = filtered.iter().map(|v| v * v).sum();
    let denominator: f64 = filtered.iter().zip(&target).map(|(v, w)| v * w).sum();
    let alpha = (numerator / denominator).powf(1.0 / 6.0);

    if !alpha.is_finite() || alpha <= 0.0 {
        return Err(BladeError::DegenerateConfiguration { alpha });
    }
    Ok(alpha)
}

/// Rescales `positions` in place by `alpha`.
pub fn apply_scaling(positions: &mut DMatrix<f64>, alpha: f64) {
    *positions *= alpha;
}

/// Tracks the admissible min/max-distance band across a run, advancing it
/// by the scaling factor found each step and the cursor-interpolated
/// ratio `rho(u) = rho_f + (1-u)(rho_0 - rho_f)`.
#[derive(Debug, Clone, Copy)]
pub struct BandSchedule {
    starting_ratio: f64,
    final_ratio: f64,
    current_min: f64,
}

impl BandSchedule {
    pub fn new(starting_min: f64, starting_ratio: f64, final_ratio: f64) -> Self {
        BandSchedule {
            starting_ratio,
            final_ratio,
            current_min: starting_min,
        }
    }

    /// Rescales the current minimum by `alpha` and derives the band for
    /// the given step cursor in `[0, 1]`.
    pub fn advance(&mut self, alpha: f64, step_cursor: f64) -> Band {
        debug_assert!((0.0..=1.0).contains(&step_cursor));
        let ratio = self.final_ratio + (1.0 - step_cursor) * (self.starting_ratio - self.final_ratio);
        self.current_min *= alpha;
        Band {
            s_min: self.current_min,
            s_max: self.current_min * ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn idempotent_on_already_optimal_positions() {
        let positions = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.8909, 0.0]);
        let target = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 2.0, 0.0]);
        let alpha = best_scaling_factor(&target, &positions).unwrap();
        assert_relative_eq!(alpha, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn two_node_scaling_matches_closed_form() {
        // Scenario 1: W_01 = 2 should embed to ||P0-P1|| = 2^(-1/6).
        let positions = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 0.0]);
        let target = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 2.0, 0.0]);
        let alpha = best_scaling_factor(&target, &positions).unwrap();
        let mut scaled = positions.clone();
        apply_scaling(&mut scaled, alpha);
        let distance = (scaled.row(0) - scaled.row(1)).norm();
        assert_relative_eq!(distance, 2.0_f64.powf(-1.0 / 6.0), epsilon = 1e-4);
    }

    #[test]
    fn degenerate_when_positions_collapsed() {
        let positions = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.0, 0.0]);
        let target = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 2.0, 0.0]);
        assert!(matches!(
            best_scaling_factor(&target, &positions),
            Err(BladeError::DegenerateConfiguration { .. })
        ));
    }

    #[test]
    fn band_schedule_interpolates_ratio_across_cursor() {
        let mut schedule = BandSchedule::new(1.0, 2.0, 1.0);
        let band_start = schedule.advance(1.0, 0.0);
        assert_relative_eq!(band_start.s_max / band_start.s_min, 2.0, epsilon = 1e-12);

        let mut schedule = BandSchedule::new(1.0, 2.0, 1.0);
        let band_end = schedule.advance(1.0, 1.0);
        assert_relative_eq!(band_end.s_max / band_end.s_min, 1.0, epsilon = 1e-12);
    }
}

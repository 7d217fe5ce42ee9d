//! Embedder configuration (§6 of the specification).
//!
//! Replaces the source's reflection-bound dataclass (`BladeEmbeddingConfig`,
//! whose fields are bound to algorithm parameters by name lookup through
//! `inspect`/`dataclasses.asdict`) with a plain record whose fields map
//! 1:1 onto the table in §6, and whose schedule-shaped fields are the
//! small sum types `Schedule`/`DistanceWalkSchedule` rather than arbitrary
//! closures — the redesign §9 calls for.

use nalgebra::DMatrix;

use crate::error::{BladeError, BladeResult};
use crate::force::MaxDistanceToWalk;

/// A scalar schedule over the step cursor `u in [0, 1]`.
#[derive(Debug, Clone, Copy)]
pub enum Schedule {
    Constant(f64),
    Linear { start: f64, end: f64 },
    Custom(fn(f64) -> f64),
}

impl Schedule {
    pub fn value(&self, cursor: f64) -> f64 {
        match self {
            Schedule::Constant(v) => *v,
            Schedule::Linear { start, end } => start + (end - start) * cursor,
            Schedule::Custom(f) => f(cursor),
        }
    }
}

impl Default for Schedule {
    /// The default constant `weight_relative_threshold` of 0.1.
    fn default() -> Self {
        Schedule::Constant(0.1)
    }
}

/// A schedule producing the (possibly per-kind) walk-distance cap, given
/// the step cursor and the current `s_max` (when a band is configured).
#[derive(Debug, Clone, Copy)]
pub enum DistanceWalkSchedule {
    Constant(MaxDistanceToWalk),
    Custom(fn(f64, Option<f64>) -> MaxDistanceToWalk),
}

impl DistanceWalkSchedule {
    pub fn value(&self, cursor: f64, max_radial: Option<f64>) -> MaxDistanceToWalk {
        match self {
            DistanceWalkSchedule::Constant(v) => *v,
            DistanceWalkSchedule::Custom(f) => f(cursor, max_radial),
        }
    }
}

impl Default for DistanceWalkSchedule {
    /// The default: unbounded walk distance for every force kind.
    fn default() -> Self {
        DistanceWalkSchedule::Constant(MaxDistanceToWalk::Uniform(f64::INFINITY))
    }
}

/// Configuration for [`crate::embedder::embed_matrix`] /
/// [`crate::embedder::embed_graph`].
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    /// `rho_f`. `None` disables the min/max-distance band entirely — only
    /// the interaction force acts (see `SPEC_FULL.md`'s resolution of the
    /// `starting_ratio_factor`-when-`None` ambiguity).
    pub max_min_dist_ratio: Option<f64>,
    /// Descending dimension schedule; must end at 2.
    pub dimensions: Vec<usize>,
    /// Optional starting positions; sampled from a unit ball when absent.
    pub starting_positions: Option<DMatrix<f64>>,
    /// Project onto the top-2 principal axes at the final drop to 2-D
    /// instead of simply dropping the last coordinate.
    pub pca: bool,
    pub steps_per_round: usize,
    pub weight_relative_threshold: Schedule,
    pub max_distance_to_walk: DistanceWalkSchedule,
    /// `rho_0 = factor * rho_f`.
    pub starting_ratio_factor: f64,
    pub seed: Option<u64>,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        EmbedderConfig {
            max_min_dist_ratio: None,
            dimensions: vec![5, 4, 3, 2, 2, 2],
            starting_positions: None,
            pca: false,
            steps_per_round: 200,
            weight_relative_threshold: Schedule::default(),
            max_distance_to_walk: DistanceWalkSchedule::default(),
            starting_ratio_factor: 2.0,
            seed: None,
        }
    }
}

impl EmbedderConfig {
    /// Validates the parts of the configuration that don't depend on the
    /// target matrix (the dimension schedule's shape).
    pub fn validate(&self) -> BladeResult<()> {
        let Some((&last, rest)) = self.dimensions.split_last() else {
            return Err(BladeError::InvalidInput(
                "dimension schedule must not be empty".to_string(),
            ));
        };
        if last != 2 {
            return Err(BladeError::InvalidInput(format!(
                "dimension schedule must end at 2, ends at {last}"
            )));
        }
        let mut previous = self.dimensions[0];
        for &d in rest.iter().chain(std::iter::once(&last)).skip(1) {
            if d > previous {
                return Err(BladeError::InvalidInput(format!(
                    "dimension schedule must be non-increasing, got {previous} before {d}"
                )));
            }
            previous = d;
        }
        if self.dimensions[0] < 2 {
            return Err(BladeError::InvalidInput(
                "dimension schedule must start at 2 or above".to_string(),
            ));
        }
        if self.steps_per_round == 0 {
            return Err(BladeError::InvalidInput(
                "steps_per_round must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

use thiserror::Error;

/// Fatal failure modes of the embedder, the round scheduler and the unit
/// converter.
///
/// Non-fatal diagnostics (a band that never closed, a starting-position
/// dimension mismatch) are not represented here — they travel alongside a
/// successful [`crate::embedder::EmbedOutcome`] instead, see
/// [`ConvergenceWarning`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BladeError {
    #[error("target interaction matrix is invalid: {0}")]
    InvalidInput(String),

    #[error("unit converter invariant violated: {0}")]
    InvariantViolation(String),

    #[error("converter input must be positive, got {value}")]
    Domain { value: f64 },

    #[error("scaling factor is degenerate (non-finite or non-positive): {alpha}")]
    DegenerateConfiguration { alpha: f64 },

    /// Listed as an error kind by the specification, but never constructed
    /// on the cooperative-cancellation path: cancellation must still hand
    /// back the last consistent positions, which a bare `Err` cannot
    /// carry, so the facade reports it through
    /// `EmbedOutcome::Cancelled { coords, .. }` instead. Kept here so the
    /// error enum remains a complete enumeration of §7's failure modes.
    #[error("embedding was cancelled after {steps_completed} of {steps_total} steps")]
    Cancelled {
        steps_completed: usize,
        steps_total: usize,
    },
}

/// Non-fatal diagnostics attached to a successful embedding.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvergenceWarning {
    /// `steps_per_round * dimensions.len()` steps were exhausted before the
    /// min/max-distance band constraints were satisfied to within tolerance.
    BandNotSatisfied { worst_violation: f64 },
    /// `starting_positions` had a different dimensionality than
    /// `dimensions.0`; it was padded or truncated to match.
    DimensionMismatch { provided: usize, expected: usize },
    /// A pair stayed below the current minimum pair distance for
    /// `consecutive_steps` steps in a row — the min-distance force (§4.3)
    /// never resolved the coincidence within that window.
    StuckCoincidence {
        pair: (usize, usize),
        consecutive_steps: usize,
    },
}

pub type BladeResult<T> = Result<T, BladeError>;

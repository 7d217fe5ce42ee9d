//! The embedder facade (component C6): the crate's public entry point.
//!
//! Collapses the source's polymorphic embedder hierarchy (graph-to-graph,
//! matrix-to-graph, shared base, generic config) into the two concrete
//! entry points §9 calls for — [`embed_matrix`] and [`embed_graph`] — both
//! delegating to [`crate::schedule::run`].

use nalgebra::DMatrix;
use petgraph::graph::UnGraph;

use crate::cancel::CancellationToken;
use crate::config::EmbedderConfig;
use crate::error::{BladeError, BladeResult, ConvergenceWarning};
use crate::observer::{NoopObserver, Observer};
use crate::schedule;

/// Requires `W` to be square, symmetric within `1e-7`, non-negative and
/// zero-diagonal, per §4.6 / §7.
pub fn validate(target_weights: &DMatrix<f64>) -> BladeResult<()> {
    let n = target_weights.nrows();
    if target_weights.ncols() != n {
        return Err(BladeError::InvalidInput(format!(
            "target interaction matrix must be square, got {n}x{}",
            target_weights.ncols()
        )));
    }
    for i in 0..n {
        let diagonal = target_weights[(i, i)];
        if diagonal != 0.0 {
            return Err(BladeError::InvalidInput(format!(
                "target interaction matrix must have a zero diagonal, entry ({i},{i}) = {diagonal}"
            )));
        }
        for j in (i + 1)..n {
            let upper = target_weights[(i, j)];
            let lower = target_weights[(j, i)];
            if (upper - lower).abs() > 1e-7 {
                return Err(BladeError::InvalidInput(format!(
                    "target interaction matrix must be symmetric: ({i},{j}) = {upper}, ({j},{i}) = {lower}"
                )));
            }
            if upper < 0.0 {
                return Err(BladeError::InvalidInput(format!(
                    "target interaction matrix must be non-negative, ({i},{j}) = {upper}"
                )));
            }
        }
    }
    Ok(())
}

/// The result of a completed or cancelled embedding.
#[derive(Debug, Clone)]
pub enum EmbedOutcome {
    Completed {
        coords: DMatrix<f64>,
        warnings: Vec<ConvergenceWarning>,
    },
    Cancelled {
        coords: DMatrix<f64>,
        steps_completed: usize,
        steps_total: usize,
    },
}

impl EmbedOutcome {
    /// The positions reached, whether or not the run completed.
    pub fn coords(&self) -> &DMatrix<f64> {
        match self {
            EmbedOutcome::Completed { coords, .. } => coords,
            EmbedOutcome::Cancelled { coords, .. } => coords,
        }
    }
}

/// Embeds a target interaction matrix into 2-D coordinates, with no
/// cancellation support and a silent observer. See [`embed_matrix_with`]
/// for the full-control entry point.
pub fn embed_matrix(target_weights: &DMatrix<f64>, config: &EmbedderConfig) -> BladeResult<EmbedOutcome> {
    embed_matrix_with(target_weights, config, &CancellationToken::new(), &mut NoopObserver)
}

/// As [`embed_matrix`], but accepts a cancellation token and a step
/// observer.
pub fn embed_matrix_with(
    target_weights: &DMatrix<f64>,
    config: &EmbedderConfig,
    cancellation: &CancellationToken,
    observer: &mut dyn Observer,
) -> BladeResult<EmbedOutcome> {
    validate(target_weights)?;
    config.validate()?;
    let outcome = schedule::run(target_weights, config, cancellation, observer)?;
    Ok(match outcome.cancelled {
        Some(cancelled) => EmbedOutcome::Cancelled {
            coords: outcome.positions,
            steps_completed: cancelled.steps_completed,
            steps_total: cancelled.steps_total,
        },
        None => EmbedOutcome::Completed {
            coords: outcome.positions,
            warnings: outcome.warnings,
        },
    })
}

/// The adapter seam an external graph container plugs into: anything able
/// to report a pairwise target-interaction matrix can be embedded without
/// this crate depending on a graph container of its own (out of scope).
pub trait InteractionGraph {
    fn weight_matrix(&self) -> DMatrix<f64>;
}

impl<N> InteractionGraph for UnGraph<N, f64> {
    fn weight_matrix(&self) -> DMatrix<f64> {
        let n = self.node_count();
        let mut weights = DMatrix::<f64>::zeros(n, n);
        for edge in self.edge_indices() {
            let (a, b) = self
                .edge_endpoints(edge)
                .expect("edge index came from this graph's own edge_indices");
            let weight = *self
                .edge_weight(edge)
                .expect("edge index came from this graph's own edge_indices");
            weights[(a.index(), b.index())] = weight;
            weights[(b.index(), a.index())] = weight;
        }
        weights
    }
}

/// Embeds any [`InteractionGraph`] (e.g. a `petgraph::graph::UnGraph<N,
/// f64>` whose edge weights are target interactions) by way of its weight
/// matrix.
pub fn embed_graph<G: InteractionGraph>(graph: &G, config: &EmbedderConfig) -> BladeResult<EmbedOutcome> {
    embed_matrix(&graph.weight_matrix(), config)
}

//! Integration tests mirroring the end-to-end scenarios of the embedder's
//! testable-properties section: closed-form two-node distances, rigid-
//! motion recovery of a known shape, a banded line graph, and the facade's
//! input-validation failure modes.

use blade_embed::{embed_matrix, geometry, BladeError, EmbedOutcome, EmbedderConfig};
use nalgebra::DMatrix;

fn square_corners() -> DMatrix<f64> {
    DMatrix::from_row_slice(4, 2, &[-1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0])
}

fn interactions_from_positions(positions: &DMatrix<f64>) -> DMatrix<f64> {
    let n = positions.nrows();
    let mut w = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let r = (positions.row(i) - positions.row(j)).norm();
            w[(i, j)] = r.powi(-6);
        }
    }
    w
}

/// Recovers positions up to rigid motion by checking the recovered
/// pairwise distance matrix against the original's rather than comparing
/// raw coordinates (the PCA/rotation orientation is arbitrary, §9).
fn assert_matches_up_to_rigid_motion(recovered: &DMatrix<f64>, original: &DMatrix<f64>, tolerance: f64) {
    let n = recovered.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let recovered_distance = (recovered.row(i) - recovered.row(j)).norm();
            let original_distance = (original.row(i) - original.row(j)).norm();
            assert!(
                (recovered_distance - original_distance).abs() < tolerance,
                "pair ({i},{j}): recovered {recovered_distance}, expected {original_distance}"
            );
        }
    }
}

#[test]
fn two_node_target_distance() {
    // Scenario 1: W_01 = 2 => ||P0 - P1|| = 2^(-1/6) ~= 0.8909.
    let target = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 2.0, 0.0]);
    let config = EmbedderConfig {
        dimensions: vec![2, 2],
        steps_per_round: 300,
        seed: Some(0),
        ..EmbedderConfig::default()
    };
    let outcome = embed_matrix(&target, &config).unwrap();
    let coords = outcome.coords();
    let distance = (coords.row(0) - coords.row(1)).norm();
    assert!((distance - 2.0_f64.powf(-1.0 / 6.0)).abs() < 1e-4);
}

#[test]
fn four_corner_square_recovers_shape_up_to_rigid_motion() {
    // Scenario 2: interactions computed from a known square, recover it.
    let original = square_corners();
    let target = interactions_from_positions(&original);
    let config = EmbedderConfig {
        dimensions: vec![4, 3, 2, 2],
        steps_per_round: 400,
        seed: Some(5),
        ..EmbedderConfig::default()
    };
    let outcome = embed_matrix(&target, &config).unwrap();
    assert_matches_up_to_rigid_motion(outcome.coords(), &original, 1e-3);
}

#[test]
fn line_graph_of_six_nodes_respects_band() {
    // Scenario 3: a line graph of 6 nodes with unit spacing, banded so the
    // min pair distance stays near 1 and the max radial distance near 2.5.
    let n = 6;
    let mut positions = DMatrix::<f64>::zeros(n, 1);
    for i in 0..n {
        positions[(i, 0)] = i as f64;
    }
    let target = interactions_from_positions(&positions);

    let config = EmbedderConfig {
        dimensions: vec![3, 2, 2],
        steps_per_round: 400,
        max_min_dist_ratio: Some(7.6),
        seed: Some(1),
        ..EmbedderConfig::default()
    };
    let outcome = embed_matrix(&target, &config).unwrap();
    let coords = outcome.coords();

    let min_distance = geometry::min_pair_distance(coords);
    assert!(min_distance > 0.5, "min pair distance collapsed: {min_distance}");

    let max_radial = geometry::max_radial_distance(coords);
    assert!(max_radial < 5.0, "max radial distance diverged: {max_radial}");
}

#[test]
fn asymmetric_input_is_rejected() {
    // Scenario 5: W_01 != W_10 by more than the tolerance.
    let target = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 2.0 + 1e-5, 0.0]);
    let config = EmbedderConfig::default();
    let result = embed_matrix(&target, &config);
    assert!(matches!(result, Err(BladeError::InvalidInput(_))));
}

#[test]
fn collapsed_seed_without_band_is_degenerate() {
    // Scenario 6: all starting positions at the origin, no band.
    let target = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 2.0, 0.0]);
    let starting = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.0, 0.0]);
    let config = EmbedderConfig {
        dimensions: vec![2, 2],
        steps_per_round: 1,
        starting_positions: Some(starting),
        ..EmbedderConfig::default()
    };
    let result = embed_matrix(&target, &config);
    assert!(matches!(result, Err(BladeError::DegenerateConfiguration { .. })));
}

#[test]
fn output_is_centered_at_origin() {
    let original = square_corners();
    let target = interactions_from_positions(&original);
    let config = EmbedderConfig {
        dimensions: vec![3, 2, 2],
        steps_per_round: 200,
        seed: Some(9),
        ..EmbedderConfig::default()
    };
    let outcome = embed_matrix(&target, &config).unwrap();
    let center = geometry::centroid(outcome.coords());
    assert!(center.norm() < 1e-9, "centroid drifted: {center:?}");
}

#[test]
fn outcome_completed_exposes_coords_regardless_of_variant() {
    let target = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 2.0, 0.0]);
    let config = EmbedderConfig {
        dimensions: vec![2, 2],
        steps_per_round: 10,
        seed: Some(2),
        ..EmbedderConfig::default()
    };
    let outcome = embed_matrix(&target, &config).unwrap();
    match outcome {
        EmbedOutcome::Completed { ref warnings, .. } => {
            let _ = warnings;
        }
        EmbedOutcome::Cancelled { .. } => panic!("run was never cancelled"),
    }
    assert_eq!(outcome.coords().shape(), (2, 2));
}

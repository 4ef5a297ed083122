#![cfg(feature = "dev")]

use approx::assert_relative_eq;
use lwpr_rs::internals::math::metric::{max_abs, recompute_metric, trace, InitialMetric, MetricTemplate};
use lwpr_rs::internals::primitives::errors::LwprError;
use nalgebra::DMatrix;

// ============================================================================
// Initial Metric Tests
// ============================================================================

#[test]
fn test_spherical_to_matrix() {
    let d = InitialMetric::Spherical(4.0).to_matrix(3).unwrap();
    assert_eq!(d, DMatrix::from_diagonal_element(3, 3, 4.0));
}

#[test]
fn test_diagonal_length_mismatch() {
    let err = InitialMetric::Diagonal(vec![1.0, 2.0]).to_matrix(3).unwrap_err();
    assert!(matches!(
        err,
        LwprError::MismatchedInput {
            expected: 3,
            got: 2,
            ..
        }
    ));
}

#[test]
fn test_default_initial_metric() {
    assert_eq!(InitialMetric::default(), InitialMetric::Spherical(25.0));
}

// ============================================================================
// Template Tests
// ============================================================================

#[test]
fn test_template_diagonal() {
    let initial = InitialMetric::Diagonal(vec![4.0, 9.0]);
    let t = MetricTemplate::build(&initial, 2, true, 50.0).unwrap();

    assert_relative_eq!(t.m[(0, 0)], 2.0, epsilon = 1e-12);
    assert_relative_eq!(t.m[(1, 1)], 3.0, epsilon = 1e-12);
    assert_eq!(t.m[(0, 1)], 0.0);
    assert_eq!(t.m[(1, 0)], 0.0);

    assert_eq!(t.alpha[(0, 0)], 50.0);
    assert_eq!(t.alpha[(1, 1)], 50.0);
    assert_eq!(t.alpha[(0, 1)], 0.0);
}

#[test]
fn test_template_full_factor() {
    let d = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0]);
    let t = MetricTemplate::build(&InitialMetric::Full(d.clone()), 3, false, 10.0).unwrap();

    // Upper triangular factor.
    for i in 0..3 {
        for j in 0..i {
            assert_eq!(t.m[(i, j)], 0.0);
        }
    }
    let reconstructed = t.m.transpose() * &t.m;
    for (a, b) in reconstructed.iter().zip(d.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }

    // Learning rates on the upper triangle only.
    assert_eq!(t.alpha[(0, 2)], 10.0);
    assert_eq!(t.alpha[(2, 0)], 0.0);
}

#[test]
fn test_template_rejects_asymmetric() {
    let d = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 2.0]);
    let err = MetricTemplate::build(&InitialMetric::Full(d), 2, false, 1.0).unwrap_err();
    assert!(matches!(err, LwprError::InvalidMetric(_)));
}

#[test]
fn test_template_rejects_indefinite() {
    let d = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
    let err = MetricTemplate::build(&InitialMetric::Full(d), 2, false, 1.0).unwrap_err();
    assert!(matches!(err, LwprError::InvalidMetric(_)));

    let err = MetricTemplate::build(&InitialMetric::Spherical(-1.0), 2, true, 1.0).unwrap_err();
    assert!(matches!(err, LwprError::InvalidMetric(_)));
}

#[test]
fn test_template_rejects_off_diagonal_in_diag_mode() {
    let d = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 2.0]);
    let err = MetricTemplate::build(&InitialMetric::Full(d), 2, true, 1.0).unwrap_err();
    assert!(matches!(err, LwprError::InvalidMetric(_)));
}

#[test]
fn test_template_rejects_non_finite() {
    let err =
        MetricTemplate::build(&InitialMetric::Spherical(f64::NAN), 2, true, 1.0).unwrap_err();
    assert!(matches!(err, LwprError::InvalidMetric(_)));
}

// ============================================================================
// Maintenance Tests
// ============================================================================

#[test]
fn test_recompute_metric_full() {
    let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 3.0]);
    let mut d = DMatrix::zeros(2, 2);
    recompute_metric(&mut d, &m, false);
    let expected = m.transpose() * &m;
    assert_eq!(d, expected);
    assert_relative_eq!(trace(&d), 14.0);
    assert_relative_eq!(max_abs(&m), 3.0);
}

#[test]
fn test_recompute_metric_diagonal() {
    let m = DMatrix::from_diagonal_element(3, 3, 2.0);
    let mut d = DMatrix::zeros(3, 3);
    recompute_metric(&mut d, &m, true);
    assert_eq!(d, DMatrix::from_diagonal_element(3, 3, 4.0));
}

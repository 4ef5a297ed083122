#![cfg(feature = "dev")]

use approx::assert_relative_eq;
use lwpr_rs::internals::math::kernel::Kernel;

fn finite_difference(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-6;
    (f(x + h) - f(x - h)) / (2.0 * h)
}

fn weight(k: Kernel, dist: f64) -> f64 {
    k.activation(dist).w
}

// ============================================================================
// Gaussian Kernel Tests
// ============================================================================

#[test]
fn test_gaussian_center_and_decay() {
    let k = Kernel::Gaussian;
    assert_relative_eq!(weight(k, 0.0), 1.0);
    assert_relative_eq!(weight(k, 2.0), (-1.0_f64).exp(), epsilon = 1e-15);
    assert!(weight(k, 100.0) > 0.0);
    assert!(weight(k, 1.0) > weight(k, 2.0));
}

#[test]
fn test_gaussian_derivatives() {
    let k = Kernel::Gaussian;
    for &dist in &[0.0_f64, 0.3, 1.7, 5.0] {
        let act = k.activation(dist);
        assert_relative_eq!(act.w, (-0.5 * dist).exp(), epsilon = 1e-15);
        let dw = finite_difference(|d| weight(k, d), dist);
        assert_relative_eq!(act.dw, dw, epsilon = 1e-7);
        let ddw = finite_difference(|d| k.activation(d).dw, dist);
        assert_relative_eq!(act.ddw, ddw, epsilon = 1e-7);
    }
}

// ============================================================================
// BiSquare Kernel Tests
// ============================================================================

#[test]
fn test_bisquare_support() {
    let k = Kernel::BiSquare;
    assert_relative_eq!(weight(k, 0.0), 1.0);
    assert_relative_eq!(weight(k, 2.0), 0.25);
    assert_eq!(weight(k, 4.0), 0.0);
    assert_eq!(weight(k, 9.0), 0.0);

    let outside = k.activation(5.0_f64);
    assert_eq!(outside.w, 0.0);
    assert_eq!(outside.dw, 0.0);
    assert_eq!(outside.ddw, 0.0);
}

#[test]
fn test_bisquare_derivatives() {
    let k = Kernel::BiSquare;
    for &dist in &[0.1, 1.0, 2.5, 3.5] {
        let act = k.activation(dist);
        let dw = finite_difference(|d| weight(k, d), dist);
        assert_relative_eq!(act.dw, dw, epsilon = 1e-7);
        assert_relative_eq!(act.ddw, 0.125);
    }
}

#[test]
fn test_default_kernel_is_gaussian() {
    assert_eq!(Kernel::default(), Kernel::Gaussian);
}

#[test]
fn test_kernel_f32() {
    let act = Kernel::Gaussian.activation(2.0_f32);
    assert_relative_eq!(act.w, (-1.0_f32).exp(), epsilon = 1e-6);
    assert_relative_eq!(act.dw, -0.5 * (-1.0_f32).exp(), epsilon = 1e-6);
}

//! Dense vector kernels used by the PLS and metric hot paths.
//!
//! ## Purpose
//!
//! Small, allocation-free building blocks: dot products, scaled
//! accumulation, and the squared Mahalanobis distance against a symmetric
//! metric. Each field update calls these a few dozen times, so they are
//! written against plain slices and vectorized two lanes at a time.
//!
//! ## Design notes
//!
//! * **SIMD**: Uses `wide::f64x2` for the main loop and a scalar tail.
//! * **Column access**: Metrics are stored column-major; because they are
//!   symmetric, column `i` doubles as row `i`.
//!
//! ## Invariants
//!
//! * All slice arguments of one call have the same length (debug-asserted).

// External dependencies
use nalgebra::DMatrix;
use wide::f64x2;

/// Dot product of two equal-length slices.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "dot: length mismatch");
    let n = a.len();
    let mut acc = f64x2::splat(0.0);
    let mut i = 0;
    while i + 2 <= n {
        let va = f64x2::new([a[i], a[i + 1]]);
        let vb = f64x2::new([b[i], b[i + 1]]);
        acc += va * vb;
        i += 2;
    }
    let mut sum = acc.reduce_add();
    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

/// Squared Euclidean norm.
#[inline]
pub fn norm_squared(a: &[f64]) -> f64 {
    dot(a, a)
}

/// `dst = decay * dst + scale * src`.
#[inline]
pub fn decay_add(dst: &mut [f64], decay: f64, scale: f64, src: &[f64]) {
    debug_assert_eq!(dst.len(), src.len(), "decay_add: length mismatch");
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = decay * *d + scale * s;
    }
}

/// `dst = src * scale`.
#[inline]
pub fn scale_into(dst: &mut [f64], scale: f64, src: &[f64]) {
    debug_assert_eq!(dst.len(), src.len(), "scale_into: length mismatch");
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = s * scale;
    }
}

/// `dst = a - b`.
#[inline]
pub fn difference(dst: &mut [f64], a: &[f64], b: &[f64]) {
    debug_assert_eq!(a.len(), b.len(), "difference: length mismatch");
    for ((d, &ai), &bi) in dst.iter_mut().zip(a).zip(b) {
        *d = ai - bi;
    }
}

/// Whether every element is finite.
#[inline]
pub fn all_finite(a: &[f64]) -> bool {
    a.iter().all(|v| v.is_finite())
}

/// Column `j` of a column-major matrix as a contiguous slice.
#[inline]
pub fn column(m: &DMatrix<f64>, j: usize) -> &[f64] {
    let rows = m.nrows();
    &m.as_slice()[j * rows..(j + 1) * rows]
}

/// Squared Mahalanobis distance `dxᵀ D dx`, leaving `D dx` in `d_dx`.
///
/// `D` must be symmetric; row `i` is read as column `i`.
#[inline]
pub fn mahalanobis(metric: &DMatrix<f64>, dx: &[f64], d_dx: &mut [f64]) -> f64 {
    let n = dx.len();
    debug_assert_eq!(metric.nrows(), n, "mahalanobis: metric size mismatch");
    let mut dist = 0.0;
    for i in 0..n {
        let row = dot(column(metric, i), dx);
        d_dx[i] = row;
        dist += dx[i] * row;
    }
    dist
}

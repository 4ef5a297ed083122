//! Distance-metric construction and maintenance.
//!
//! ## Purpose
//!
//! Every receptive field carries a positive semi-definite distance metric `D`
//! stored through its upper-triangular Cholesky factor `M` (`D = MᵀM`). This
//! module builds the initial template from the user's choice and keeps `D`
//! consistent with `M` after gradient steps.
//!
//! ## Design notes
//!
//! * **Factor first**: Gradient steps are applied to `M` only; `D` is always
//!   recomputed from it, which keeps `D` PSD without projection.
//! * **Backend**: The initial factorization uses nalgebra's Cholesky
//!   decomposition; a template that is not positive definite is rejected.
//!
//! ## Key concepts
//!
//! * **Spherical**: `D = d·I`.
//! * **Diagonal**: `D = diag(d₁, …, dₙ)`.
//! * **Full**: any symmetric positive-definite matrix (requires full metrics).
//!
//! ## Invariants
//!
//! * `M` is upper triangular; in diagonal mode only its diagonal is non-zero.
//! * `D` is exactly symmetric after every recomputation.

// External dependencies
use nalgebra::DMatrix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Internal dependencies
use crate::primitives::errors::LwprError;

// ============================================================================
// Initial Metric
// ============================================================================

/// Distance metric given to newly created fields.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InitialMetric {
    /// Same width in every input direction: `D = d·I`.
    Spherical(f64),

    /// Independent width per input: `D = diag(d)`.
    Diagonal(Vec<f64>),

    /// Arbitrary symmetric positive-definite matrix.
    Full(DMatrix<f64>),
}

impl Default for InitialMetric {
    fn default() -> Self {
        InitialMetric::Spherical(25.0)
    }
}

impl InitialMetric {
    /// Expand to a dense `n_in × n_in` matrix.
    pub fn to_matrix(&self, n_in: usize) -> Result<DMatrix<f64>, LwprError> {
        match self {
            InitialMetric::Spherical(d) => Ok(DMatrix::from_diagonal_element(n_in, n_in, *d)),
            InitialMetric::Diagonal(diag) => {
                if diag.len() != n_in {
                    return Err(LwprError::MismatchedInput {
                        what: "initial metric diagonal",
                        expected: n_in,
                        got: diag.len(),
                    });
                }
                Ok(DMatrix::from_fn(n_in, n_in, |i, j| if i == j { diag[i] } else { 0.0 }))
            }
            InitialMetric::Full(m) => {
                if m.nrows() != n_in || m.ncols() != n_in {
                    return Err(LwprError::InvalidMetric(format!(
                        "expected {n_in}x{n_in} matrix, got {}x{}",
                        m.nrows(),
                        m.ncols()
                    )));
                }
                Ok(m.clone())
            }
        }
    }
}

// ============================================================================
// Metric Template
// ============================================================================

/// Fully derived metric state handed to fields created without a seed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricTemplate {
    /// Distance metric.
    pub d: DMatrix<f64>,
    /// Upper-triangular Cholesky factor of `d`.
    pub m: DMatrix<f64>,
    /// Initial per-entry learning rates (zero outside the adapted entries).
    pub alpha: DMatrix<f64>,
}

impl MetricTemplate {
    /// Factor the initial metric and lay out learning rates for the adapted entries.
    pub fn build(
        initial: &InitialMetric,
        n_in: usize,
        diag_only: bool,
        init_alpha: f64,
    ) -> Result<Self, LwprError> {
        let d = initial.to_matrix(n_in)?;

        for i in 0..n_in {
            for j in 0..i {
                let (a, b) = (d[(i, j)], d[(j, i)]);
                if (a - b).abs() > 1e-12 * (1.0 + a.abs().max(b.abs())) {
                    return Err(LwprError::InvalidMetric(format!(
                        "matrix is not symmetric at ({i}, {j})"
                    )));
                }
                if diag_only && a != 0.0 {
                    return Err(LwprError::InvalidMetric(
                        "off-diagonal entries require full metric adaptation".into(),
                    ));
                }
            }
        }
        if d.iter().any(|v| !v.is_finite()) {
            return Err(LwprError::InvalidMetric("non-finite entry".into()));
        }

        let chol = d.clone().cholesky().ok_or_else(|| {
            LwprError::InvalidMetric("matrix is not positive definite".into())
        })?;
        let mut m = chol.l().transpose();
        if diag_only {
            // Round-off may leave tiny off-diagonal terms even for diagonal input.
            m = DMatrix::from_fn(n_in, n_in, |i, j| if i == j { m[(i, i)] } else { 0.0 });
        }

        let mut d = d;
        recompute_metric(&mut d, &m, diag_only);

        let alpha = DMatrix::from_fn(n_in, n_in, |i, j| {
            let adapted = if diag_only { i == j } else { j >= i };
            if adapted {
                init_alpha
            } else {
                0.0
            }
        });

        Ok(Self { d, m, alpha })
    }
}

// ============================================================================
// Maintenance
// ============================================================================

/// Recompute `D` from its upper-triangular factor `M`.
///
/// Diagonal mode sets `D_ii = M_ii²`; full mode evaluates the lower triangle of
/// `MᵀM` and mirrors it.
pub fn recompute_metric(d: &mut DMatrix<f64>, m: &DMatrix<f64>, diag_only: bool) {
    let n = m.nrows();
    if diag_only {
        for i in 0..n {
            d[(i, i)] = m[(i, i)] * m[(i, i)];
        }
        return;
    }
    for i in 0..n {
        for j in 0..=i {
            // M is upper triangular, so only rows k <= j contribute.
            let mut sum = 0.0;
            for k in 0..=j {
                sum += m[(k, i)] * m[(k, j)];
            }
            d[(i, j)] = sum;
            d[(j, i)] = sum;
        }
    }
}

/// Sum of the diagonal.
#[inline]
pub fn trace(d: &DMatrix<f64>) -> f64 {
    (0..d.nrows()).map(|i| d[(i, i)]).sum()
}

/// Largest absolute entry.
#[inline]
pub fn max_abs(m: &DMatrix<f64>) -> f64 {
    m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

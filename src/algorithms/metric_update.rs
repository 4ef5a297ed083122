//! Gradient adaptation of a field's distance metric.
//!
//! ## Purpose
//!
//! After a regression update, each receptive field nudges the Cholesky factor
//! `M` of its metric along the negative gradient of a leave-one-out cost plus
//! a small ridge penalty on `D`. Optional meta-learning adapts a separate
//! learning rate for every entry of `M`.
//!
//! ## Design notes
//!
//! * **Factor-space steps**: Only `M` is changed; `D = MᵀM` is recomputed
//!   afterwards, so the metric remains PSD.
//! * **Damping**: A transient multiplier scales every step while the
//!   field's post-update error still dominates its CV error, and any single
//!   step larger than 10% of `max|M|` is rejected with its learning rate halved.
//! * **Finite steps**: The update is skipped when the leave-one-out terms are
//!   not finite, and so is any entry whose gradient is not finite.
//! * **Meta-learning**: Delta-Bar-Delta in the log domain (`alpha = exp(b)`)
//!   with a decaying memory `h` of past steps.
//!
//! ## Key concepts
//!
//! * **Cost**: `J = J1 + J2` with `J1` the weighted leave-one-out error and
//!   `J2 = penalty/n_in · Σ D_ij²`.
//! * **Derivative support**: Direction `j` enters the gradient only when
//!   `n_data[j] > 0.1 / (1 - lambda[j])` and the field is trustworthy.
//!
//! ## Invariants
//!
//! * `M` stays upper triangular (diagonal in diagonal mode).
//! * `D = MᵀM` on return.
//!
//! ## Non-goals
//!
//! * This module does not decide whether adaptation is enabled (`update_d`).

// External dependencies
use nalgebra::DMatrix;
use tracing::trace;

// Internal dependencies
use crate::algorithms::field::ReceptiveField;
use crate::math::metric::max_abs;
use crate::math::vector::{all_finite, difference};
use crate::primitives::buffer::Slot;

/// Largest step, relative to `max|M|`, accepted for a single entry.
const MAX_RELATIVE_STEP: f64 = 0.1;

/// Bounds on the log learning rate.
const LOG_RATE_LIMIT: f64 = 10.0;

/// Bound on a single log learning-rate change.
const LOG_RATE_STEP_LIMIT: f64 = 0.1;

// ============================================================================
// Parameters and scratch
// ============================================================================

/// Model-wide knobs consumed by the metric update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricParams {
    /// Ridge penalty on `D` (before division by `n_in`).
    pub penalty: f64,
    /// Enable per-entry learning-rate adaptation.
    pub meta: bool,
    /// Meta learning rate.
    pub meta_rate: f64,
    /// Adapt only the diagonal of `M`.
    pub diag_only: bool,
}

/// Sample-specific quantities produced by activation and regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    /// Activation.
    pub w: f64,
    /// `dw / d(dist)`.
    pub dw: f64,
    /// `d²w / d(dist)²`.
    pub ddw: f64,
    /// Cross-validation error of the trusted prefix.
    pub e_cv: f64,
    /// Post-update residual.
    pub e: f64,
}

/// Per-worker temporaries for the metric update.
#[derive(Debug, Clone)]
pub struct MetricScratch {
    dx: Slot<f64>,
    m_dx: Slot<f64>,
    ok: Slot<bool>,
    md: DMatrix<f64>,
}

impl MetricScratch {
    /// Scratch sized for `n_in` inputs.
    pub fn new(n_in: usize) -> Self {
        Self {
            dx: Slot::new(n_in),
            m_dx: Slot::new(n_in),
            ok: Slot::new(n_in),
            md: DMatrix::zeros(n_in, n_in),
        }
    }
}

impl Default for MetricScratch {
    fn default() -> Self {
        Self::new(0)
    }
}

// ============================================================================
// Update
// ============================================================================

/// Take one gradient step on `M` and refresh `D`, `H` and `r`.
///
/// `s` holds the projections from the regression update that just ran.
/// Returns the transient multiplier that scaled the step (0 when skipped).
/// `M`, `D`, `H` and `r` only ever take finite values.
pub fn update_metric(
    rf: &mut ReceptiveField,
    scratch: &mut MetricScratch,
    params: &MetricParams,
    x: &[f64],
    s: &[f64],
    sample: &MetricSample,
) -> f64 {
    let n = rf.n_in;
    let n_reg = rf.n_reg;
    let last = n_reg - 1;
    let w = sample.w;

    scratch.ok.reset(n_reg);
    for j in 0..n_reg {
        scratch.ok[j] = rf.trustworthy && rf.n_data[j] > 0.1 / (1.0 - rf.lambda[j]);
    }
    if !scratch.ok[0] {
        return 0.0;
    }

    // Leave-one-out bookkeeping.
    let mut h = 0.0;
    let mut loo = sample.e_cv * sample.e_cv;
    for j in 0..n_reg {
        if !scratch.ok[j] {
            continue;
        }
        let ps = s[j] / rf.ss_s2[j];
        h += ps * s[j];
        loo -= 2.0 * ps * sample.e * rf.h_stat[j];
        loo -= 2.0 * ps * ps * rf.r[j];
    }
    h *= w;

    let big_w = rf.sum_w[0].max(f64::EPSILON);
    let big_e = rf.sum_e_cv2[last];
    let tau = (rf.sum_e2 / (big_e + 1e-10)).powi(4).min(1.0);

    let dj1_dw = -big_e / (big_w * big_w) + loo / big_w;
    let d2j1_dw2 = 2.0 * big_e / (big_w * big_w * big_w) - loo / (big_w * big_w);
    if !all_finite(&[loo, tau, dj1_dw, d2j1_dw2]) {
        return 0.0;
    }
    let penalty = params.penalty / n as f64;
    let ridge_scale = w / big_w;

    // Derivative inputs are taken from the metric before any entry moves.
    scratch.dx.reset(n);
    scratch.m_dx.reset(n);
    difference(&mut scratch.dx, x, &rf.c);
    for r in 0..n {
        let mut acc = 0.0;
        for k in r..n {
            acc += rf.m[(r, k)] * scratch.dx[k];
        }
        scratch.m_dx[r] = acc;
    }
    if scratch.md.nrows() != n {
        scratch.md = DMatrix::zeros(n, n);
    }
    rf.m.mul_to(&rf.d, &mut scratch.md);
    let max_m = max_abs(&rf.m);

    for r in 0..n {
        let row_sq: f64 = (r..n).map(|k| rf.m[(r, k)] * rf.m[(r, k)]).sum();
        let cols = if params.diag_only { r..r + 1 } else { r..n };
        for col in cols {
            let ddist = 2.0 * scratch.m_dx[r] * scratch.dx[col];
            let dw_dm = sample.dw * ddist;
            let dj2 = 4.0 * penalty * scratch.md[(r, col)];
            let dj_dm = dw_dm * dj1_dw + ridge_scale * dj2;
            if !dj_dm.is_finite() {
                continue;
            }

            if params.meta {
                let d2dist = 2.0 * scratch.dx[col] * scratch.dx[col];
                let d2w = sample.ddw * ddist * ddist + sample.dw * d2dist;
                let m_rc = rf.m[(r, col)];
                let d2j2 = 4.0 * penalty * (rf.d[(col, col)] + m_rc * m_rc + row_sq);
                let d2j_dm2 = d2j1_dw2 * dw_dm * dw_dm + dj1_dw * d2w + ridge_scale * d2j2;

                let db = (params.meta_rate * tau * dj_dm * rf.h[(r, col)])
                    .clamp(-LOG_RATE_STEP_LIMIT, LOG_RATE_STEP_LIMIT);
                rf.b[(r, col)] = (rf.b[(r, col)] - db).clamp(-LOG_RATE_LIMIT, LOG_RATE_LIMIT);
                rf.alpha[(r, col)] = rf.b[(r, col)].exp();

                let alpha = rf.alpha[(r, col)];
                let decay = (1.0 - alpha * d2j_dm2 * tau).max(0.0);
                rf.h[(r, col)] = rf.h[(r, col)] * decay - alpha * dj_dm * tau;
            }

            let step = rf.alpha[(r, col)] * dj_dm * tau;
            if step.abs() > MAX_RELATIVE_STEP * max_m {
                rf.alpha[(r, col)] *= 0.5;
                rf.b[(r, col)] = (rf.alpha[(r, col)] + 1e-10).ln();
                trace!(row = r, col, step, max_m, "metric step rejected, learning rate halved");
            } else {
                rf.m[(r, col)] -= step;
            }
        }
    }

    rf.refresh_metric(params.diag_only);

    let one_minus_h = 1.0 - h;
    if one_minus_h > 1e-10 {
        let e_cv = sample.e_cv;
        for j in 0..n_reg {
            if !scratch.ok[j] {
                continue;
            }
            let lam = rf.lambda[j];
            let h_stat = lam * rf.h_stat[j] + w / one_minus_h * s[j] * e_cv * tau;
            let r = lam * rf.r[j] + w * w * e_cv * e_cv / one_minus_h * s[j] * s[j] * tau;
            if h_stat.is_finite() && r.is_finite() {
                rf.h_stat[j] = h_stat;
                rf.r[j] = r;
            }
        }
    }

    tau
}

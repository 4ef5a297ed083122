//! Online partial least squares inside one receptive field.
//!
//! ## Purpose
//!
//! Given a weighted sample `(x, y, w)`, this module updates a field's PLS
//! directions and sufficient statistics with exponential forgetting and
//! reports the updated prediction and the leave-one-out error.
//!
//! ## Design notes
//!
//! * **Two passes**: A read-only pass computes residual inputs, cumulative
//!   predictions and cross-validation errors with the current state; the update
//!   pass then reuses those residuals for every direction.
//! * **Staged commit**: The update pass writes the new statistics into
//!   scratch. They replace the field's state only when every one of them is
//!   finite; otherwise the field is left as it was and the sample is reported
//!   as rejected.
//! * **Slow axes**: `SXresYres` forgets ten times more slowly than the other
//!   statistics so the projection axes stay stable.
//! * **Scratch**: All temporaries live in a caller-owned `PlsScratch`.
//!
//! ## Key concepts
//!
//! * **Regression target**: Direction 0 regresses `y - beta0`; direction `j`
//!   regresses the CV residual left by directions `0..j`.
//! * **Trusted prefix**: The prediction and reported CV error only use the
//!   directions returned by `ReceptiveField::n_use`.
//!
//! ## Invariants
//!
//! * `U_j` has unit norm whenever `‖SXresYres_j‖ >= 1e-12`.
//! * Every PLS statistic of a field is finite.
//! * The slope cache is empty after every accepted update.

// Internal dependencies
use crate::algorithms::field::ReceptiveField;
use crate::math::vector::{all_finite, decay_add, difference, dot, norm_squared, scale_into};
use crate::primitives::buffer::Slot;

/// Norm below which a projection axis keeps its previous orientation.
const AXIS_NORM_FLOOR: f64 = 1e-12;

// ============================================================================
// Scratch
// ============================================================================

/// Per-worker temporaries for the regression update.
#[derive(Debug, Clone, Default)]
pub struct PlsScratch {
    /// Centered input `x - mean_x`.
    pub xc: Slot<f64>,
    /// Residual inputs, `n_in` values per direction.
    pub xres: Slot<f64>,
    /// Projections from the update pass.
    pub s: Slot<f64>,
    /// Cumulative pre-update predictions.
    pub yres: Slot<f64>,
    /// Cross-validation errors per direction.
    pub e_cv: Slot<f64>,
    /// Residual of the post-update projection.
    pub tail: Slot<f64>,
    staged: Staged,
}

/// New statistics of one update, `n_in` values per direction for the columns.
#[derive(Debug, Clone, Default)]
struct Staged {
    sxres_yres: Slot<f64>,
    u: Slot<f64>,
    ssxres: Slot<f64>,
    p: Slot<f64>,
    ss_s2: Slot<f64>,
    ss_yres: Slot<f64>,
    beta: Slot<f64>,
    sum_e_cv2: Slot<f64>,
}

impl Staged {
    fn new(n_in: usize) -> Self {
        Self {
            sxres_yres: Slot::new(n_in * n_in),
            u: Slot::new(n_in * n_in),
            ssxres: Slot::new(n_in * n_in),
            p: Slot::new(n_in * n_in),
            ss_s2: Slot::new(n_in),
            ss_yres: Slot::new(n_in),
            beta: Slot::new(n_in),
            sum_e_cv2: Slot::new(n_in),
        }
    }

    fn reset(&mut self, n_in: usize, n_reg: usize) {
        self.sxres_yres.reset(n_in * n_reg);
        self.u.reset(n_in * n_reg);
        self.ssxres.reset(n_in * n_reg);
        self.p.reset(n_in * n_reg);
        self.ss_s2.reset(n_reg);
        self.ss_yres.reset(n_reg);
        self.beta.reset(n_reg);
        self.sum_e_cv2.reset(n_reg);
    }

    fn is_finite(&self) -> bool {
        all_finite(&self.sxres_yres)
            && all_finite(&self.u)
            && all_finite(&self.ssxres)
            && all_finite(&self.p)
            && all_finite(&self.ss_s2)
            && all_finite(&self.ss_yres)
            && all_finite(&self.beta)
            && all_finite(&self.sum_e_cv2)
    }

    fn commit(&self, rf: &mut ReceptiveField) {
        let n = rf.n_in;
        for j in 0..rf.n_reg {
            let cols = j * n..(j + 1) * n;
            rf.sxres_yres.col_mut(j).copy_from_slice(&self.sxres_yres[cols.clone()]);
            rf.u.col_mut(j).copy_from_slice(&self.u[cols.clone()]);
            rf.ssxres.col_mut(j).copy_from_slice(&self.ssxres[cols.clone()]);
            rf.p.col_mut(j).copy_from_slice(&self.p[cols]);
        }
        rf.ss_s2.copy_from_slice(&self.ss_s2);
        rf.ss_yres.copy_from_slice(&self.ss_yres);
        rf.beta.copy_from_slice(&self.beta);
        rf.sum_e_cv2.copy_from_slice(&self.sum_e_cv2);
    }
}

impl PlsScratch {
    /// Scratch sized for `n_in` inputs.
    pub fn new(n_in: usize) -> Self {
        Self {
            xc: Slot::new(n_in),
            xres: Slot::new(n_in * n_in),
            s: Slot::new(n_in),
            yres: Slot::new(n_in),
            e_cv: Slot::new(n_in),
            tail: Slot::new(n_in),
            staged: Staged::new(n_in),
        }
    }
}

/// Result of one regression update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionOutcome {
    /// Post-update prediction over the trusted prefix.
    pub yp: f64,
    /// Pre-update cross-validation error of the trusted prefix.
    pub e_cv: f64,
    /// Post-update residual `y - yp`.
    pub e: f64,
}

// ============================================================================
// Update
// ============================================================================

/// Fold `(x, y)` with activation `w` into the field's PLS model.
///
/// `update_means` must already have been applied for this sample. On return
/// `scratch.s` holds the projections used for the update. Returns `None`, with
/// the field's PLS state untouched, when the sample would drive any statistic
/// to a non-finite value.
pub fn update_regression(
    rf: &mut ReceptiveField,
    scratch: &mut PlsScratch,
    x: &[f64],
    y: f64,
    w: f64,
) -> Option<RegressionOutcome> {
    let n = rf.n_in;
    let n_reg = rf.n_reg;

    scratch.xc.reset(n);
    difference(&mut scratch.xc, x, &rf.mean_x);
    scratch.xres.reset(n * n_reg);
    scratch.s.reset(n_reg);
    scratch.yres.reset(n_reg);
    scratch.e_cv.reset(n_reg);
    scratch.staged.reset(n, n_reg);

    // Pre-update pass: residual inputs and CV errors with the current state.
    let t0 = y - rf.beta0;
    scratch.xres[..n].copy_from_slice(&scratch.xc);
    let mut acc = 0.0;
    for j in 0..n_reg {
        let (done, rest) = scratch.xres.split_at_mut((j + 1) * n);
        let xres_j = &done[j * n..];
        let sj = dot(rf.u.col(j), xres_j);
        acc += rf.beta[j] * sj;
        scratch.yres[j] = acc;
        scratch.e_cv[j] = t0 - acc;
        if j + 1 < n_reg {
            let next = &mut rest[..n];
            for ((o, &r), &pj) in next.iter_mut().zip(xres_j).zip(rf.p.col(j)) {
                *o = r - sj * pj;
            }
        }
    }

    // Update pass into the staging area.
    let staged = &mut scratch.staged;
    for j in 0..n_reg {
        let lam = rf.lambda[j];
        let lam_slow = 1.0 - (1.0 - lam) / 10.0;
        let target = if j == 0 { t0 } else { scratch.e_cv[j - 1] };
        let cols = j * n..(j + 1) * n;
        let xres_j = &scratch.xres[cols.clone()];

        let sxy = &mut staged.sxres_yres[cols.clone()];
        sxy.copy_from_slice(rf.sxres_yres.col(j));
        decay_add(sxy, lam_slow, w * target, xres_j);
        let u = &mut staged.u[cols.clone()];
        let norm = norm_squared(sxy).sqrt();
        if norm >= AXIS_NORM_FLOOR {
            scale_into(u, 1.0 / norm, sxy);
        } else {
            u.copy_from_slice(rf.u.col(j));
        }

        let sj = dot(u, xres_j);
        scratch.s[j] = sj;
        let ss_s2 = lam * rf.ss_s2[j] + w * sj * sj;
        let ss_yres = lam * rf.ss_yres[j] + w * sj * target;
        let ssx = &mut staged.ssxres[cols.clone()];
        ssx.copy_from_slice(rf.ssxres.col(j));
        decay_add(ssx, lam, w * sj, xres_j);
        scale_into(&mut staged.p[cols], 1.0 / ss_s2, ssx);

        staged.ss_s2[j] = ss_s2;
        staged.ss_yres[j] = ss_yres;
        staged.beta[j] = ss_yres / ss_s2;
        let e = scratch.e_cv[j];
        staged.sum_e_cv2[j] = lam * rf.sum_e_cv2[j] + w * e * e;
    }

    // Post-update projection over the trusted prefix.
    let n_use = rf.n_use();
    scratch.tail.reset(n);
    scratch.tail.copy_from_slice(&scratch.xc);
    let mut yp = rf.beta0;
    for j in 0..n_use {
        let cols = j * n..(j + 1) * n;
        let sj = dot(&staged.u[cols.clone()], &scratch.tail);
        yp += staged.beta[j] * sj;
        for (r, &pj) in scratch.tail.iter_mut().zip(&staged.p[cols]) {
            *r -= sj * pj;
        }
    }
    let e = y - yp;
    let e_cv = if n_use == 0 {
        t0
    } else {
        scratch.e_cv[n_use - 1]
    };

    let last = n_reg - 1;
    let lam_last = rf.lambda[last];
    let sum_e2 = lam_last * rf.sum_e2 + w * e * e;
    let leverage: f64 = (0..n_reg)
        .map(|j| scratch.s[j] * scratch.s[j] / staged.ss_s2[j])
        .sum();
    let ssp = lam_last * rf.ssp + w * w * leverage;

    if !(all_finite(&[yp, e, e_cv, sum_e2, ssp]) && staged.is_finite()) {
        return None;
    }

    staged.commit(rf);
    rf.sum_e2 = sum_e2;
    rf.ssp = ssp;
    rf.invalidate_slope();

    Some(RegressionOutcome { yp, e_cv, e })
}

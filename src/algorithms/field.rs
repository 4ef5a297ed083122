//! Receptive fields: one local linear model each.
//!
//! ## Purpose
//!
//! A receptive field owns everything needed to predict and learn in one region
//! of input space: its center and distance metric, the online PLS regression
//! state, and the running statistics that drive forgetting, trust and
//! lifecycle decisions.
//!
//! ## Design notes
//!
//! * **Direction storage**: `U`, `P`, `SXresYres` and `SSXres` live in
//!   `ColumnStore`s; scalar per-direction statistics live in parallel `Vec`s.
//!   All of them grow together through `try_add_direction`.
//! * **Slope cache**: The linear slope is derived from `U`, `P` and `beta` on
//!   first use and cached in a `OnceLock`, so concurrent readers of an
//!   immutable model can populate it. Any regression update clears it.
//!
//! ## Key concepts
//!
//! * **Trusted prefix**: The newest direction joins predictions only after
//!   `n_data[last] > 2·n_in`.
//! * **Trustworthy**: A field contributes to predictions only after
//!   `n_data[0] > 2·n_in`.
//!
//! ## Invariants
//!
//! * `1 <= n_reg <= n_in` and `capacity() >= n_reg`.
//! * Every per-direction vector has exactly `n_reg` entries.
//! * `D = MᵀM` after every metric update.

// External dependencies
use nalgebra::DMatrix;
use std::sync::OnceLock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Internal dependencies
use crate::math::kernel::{Activation, Kernel};
use crate::math::metric;
use crate::math::vector::{difference, dot, mahalanobis};
use crate::primitives::buffer::Slot;
use crate::primitives::columns::ColumnStore;
use crate::primitives::errors::LwprError;

/// Number of directions reserved each time direction storage runs out.
pub const DIRECTION_GROW_STEP: usize = 2;

// ============================================================================
// Receptive Field
// ============================================================================

/// A single local linear model with its own distance metric.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReceptiveField {
    pub(crate) n_in: usize,
    pub(crate) n_reg: usize,

    // Metric
    pub(crate) c: Vec<f64>,
    pub(crate) d: DMatrix<f64>,
    pub(crate) m: DMatrix<f64>,
    pub(crate) alpha: DMatrix<f64>,
    pub(crate) b: DMatrix<f64>,
    pub(crate) h: DMatrix<f64>,

    // Local input statistics
    pub(crate) mean_x: Vec<f64>,
    pub(crate) var_x: Vec<f64>,
    pub(crate) beta0: f64,

    // PLS directions
    pub(crate) u: ColumnStore<f64>,
    pub(crate) p: ColumnStore<f64>,
    pub(crate) sxres_yres: ColumnStore<f64>,
    pub(crate) ssxres: ColumnStore<f64>,
    pub(crate) beta: Vec<f64>,
    pub(crate) ss_s2: Vec<f64>,
    pub(crate) ss_yres: Vec<f64>,
    pub(crate) h_stat: Vec<f64>,
    pub(crate) r: Vec<f64>,

    // Per-direction counters
    pub(crate) lambda: Vec<f64>,
    pub(crate) n_data: Vec<f64>,
    pub(crate) sum_w: Vec<f64>,
    pub(crate) sum_e_cv2: Vec<f64>,

    pub(crate) sum_e2: f64,
    pub(crate) ssp: f64,
    pub(crate) w: f64,
    pub(crate) trustworthy: bool,

    #[cfg_attr(feature = "serde", serde(skip))]
    slope: OnceLock<Vec<f64>>,
}

impl PartialEq for ReceptiveField {
    // The slope cache is derived state and does not take part in equality.
    fn eq(&self, other: &Self) -> bool {
        self.n_in == other.n_in
            && self.n_reg == other.n_reg
            && self.c == other.c
            && self.d == other.d
            && self.m == other.m
            && self.alpha == other.alpha
            && self.b == other.b
            && self.h == other.h
            && self.mean_x == other.mean_x
            && self.var_x == other.var_x
            && self.beta0 == other.beta0
            && self.u == other.u
            && self.p == other.p
            && self.sxres_yres == other.sxres_yres
            && self.ssxres == other.ssxres
            && self.beta == other.beta
            && self.ss_s2 == other.ss_s2
            && self.ss_yres == other.ss_yres
            && self.h_stat == other.h_stat
            && self.r == other.r
            && self.lambda == other.lambda
            && self.n_data == other.n_data
            && self.sum_w == other.sum_w
            && self.sum_e_cv2 == other.sum_e_cv2
            && self.sum_e2 == other.sum_e2
            && self.ssp == other.ssp
            && self.w == other.w
            && self.trustworthy == other.trustworthy
    }
}

/// Bias and local input statistics saved before a tentative update.
#[derive(Debug, Clone, Default)]
pub struct MeanSnapshot {
    mean_x: Slot<f64>,
    var_x: Slot<f64>,
    beta0: f64,
}

/// Initial per-direction values shared by every field of a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldInit {
    /// Forgetting factor of fresh directions.
    pub init_lambda: f64,
    /// Initial `SSs2` of fresh directions.
    pub init_s2: f64,
}

impl ReceptiveField {
    /// Create a field centered at `center` with the given metric and bias.
    ///
    /// Starts with two PLS directions (one when `n_in == 1`) aligned with the
    /// leading input axes.
    pub fn new(
        center: &[f64],
        beta0: f64,
        d: DMatrix<f64>,
        m: DMatrix<f64>,
        alpha: DMatrix<f64>,
        init: FieldInit,
    ) -> Self {
        let n_in = center.len();
        let n_reg = if n_in > 1 { 2 } else { 1 };
        let b = alpha.map(|a| (a + 1e-10).ln());
        let h = DMatrix::zeros(n_in, n_in);

        let mut u = ColumnStore::zeros(n_in, n_reg, n_reg);
        let mut p = ColumnStore::zeros(n_in, n_reg, n_reg);
        for j in 0..n_reg {
            u.col_mut(j)[j] = 1.0;
            p.col_mut(j)[j] = 1.0;
        }

        Self {
            n_in,
            n_reg,
            c: center.to_vec(),
            d,
            m,
            alpha,
            b,
            h,
            mean_x: center.to_vec(),
            var_x: vec![0.0; n_in],
            beta0,
            u,
            p,
            sxres_yres: ColumnStore::zeros(n_in, n_reg, n_reg),
            ssxres: ColumnStore::zeros(n_in, n_reg, n_reg),
            beta: vec![0.0; n_reg],
            ss_s2: vec![init.init_s2; n_reg],
            ss_yres: vec![0.0; n_reg],
            h_stat: vec![0.0; n_reg],
            r: vec![0.0; n_reg],
            lambda: vec![init.init_lambda; n_reg],
            n_data: vec![0.0; n_reg],
            sum_w: vec![0.0; n_reg],
            sum_e_cv2: vec![0.0; n_reg],
            sum_e2: 0.0,
            ssp: 0.0,
            w: 0.0,
            trustworthy: false,
            slope: OnceLock::new(),
        }
    }

    /// Discard all learned statistics and start again from bias `y`.
    ///
    /// The center and the current metric are kept.
    pub fn restart(&mut self, y: f64, init: FieldInit) {
        *self = Self::new(
            &self.c,
            y,
            self.d.clone(),
            self.m.clone(),
            self.alpha.clone(),
            init,
        );
    }

    // ------------------------------------------------------------------------
    // Activation and statistics
    // ------------------------------------------------------------------------

    /// Activation of this field for `x`.
    ///
    /// Leaves `x - c` in `dx` and `D (x - c)` in `d_dx`.
    #[inline]
    pub fn activate(
        &self,
        kernel: Kernel,
        x: &[f64],
        dx: &mut [f64],
        d_dx: &mut [f64],
    ) -> Activation<f64> {
        difference(dx, x, &self.c);
        let dist = mahalanobis(&self.d, dx, d_dx);
        kernel.activation(dist)
    }

    /// Fold `(x, y)` with weight `w` into the running mean, variance and bias.
    pub fn update_means(&mut self, x: &[f64], y: f64, w: f64) {
        let lam_w = self.lambda[0] * self.sum_w[0];
        let denom = lam_w + w;
        for i in 0..self.n_in {
            self.mean_x[i] = (lam_w * self.mean_x[i] + w * x[i]) / denom;
            let dev = x[i] - self.mean_x[i];
            self.var_x[i] = (lam_w * self.var_x[i] + w * dev * dev) / denom;
        }
        self.beta0 = (lam_w * self.beta0 + w * y) / denom;
    }

    /// Copy the bias and local input statistics into `snapshot`.
    pub fn save_means(&self, snapshot: &mut MeanSnapshot) {
        snapshot.mean_x.reset(self.n_in);
        snapshot.mean_x.copy_from_slice(&self.mean_x);
        snapshot.var_x.reset(self.n_in);
        snapshot.var_x.copy_from_slice(&self.var_x);
        snapshot.beta0 = self.beta0;
    }

    /// Undo `update_means` from a snapshot taken just before it.
    pub fn restore_means(&mut self, snapshot: &MeanSnapshot) {
        self.mean_x.copy_from_slice(&snapshot.mean_x);
        self.var_x.copy_from_slice(&snapshot.var_x);
        self.beta0 = snapshot.beta0;
    }

    /// Advance per-direction counts and anneal every forgetting factor.
    pub fn advance_counts(&mut self, w: f64, tau_lambda: f64, final_lambda: f64) {
        for j in 0..self.n_reg {
            let lam = self.lambda[j];
            self.n_data[j] = lam * self.n_data[j] + 1.0;
            self.sum_w[j] = lam * self.sum_w[j] + w;
            self.lambda[j] = tau_lambda * lam + (1.0 - tau_lambda) * final_lambda;
        }
        if self.n_data[0] > 2.0 * self.n_in as f64 {
            self.trustworthy = true;
        }
    }

    /// Number of directions that take part in predictions.
    #[inline]
    pub fn n_use(&self) -> usize {
        let last = self.n_reg - 1;
        if self.n_data[last] > 2.0 * self.n_in as f64 {
            self.n_reg
        } else {
            last
        }
    }

    // ------------------------------------------------------------------------
    // Prediction
    // ------------------------------------------------------------------------

    /// Linear slope over the trusted prefix, computed on first use.
    pub fn slope(&self) -> &[f64] {
        self.slope.get_or_init(|| self.compute_slope())
    }

    /// Whether the slope cache is currently populated.
    #[inline]
    pub fn slope_ready(&self) -> bool {
        self.slope.get().is_some()
    }

    pub(crate) fn invalidate_slope(&mut self) {
        self.slope.take();
    }

    fn compute_slope(&self) -> Vec<f64> {
        let n = self.n_in;
        let n_use = self.n_use();
        // z_j maps the centered input straight to s_j.
        let mut z: Vec<Vec<f64>> = Vec::with_capacity(n_use);
        let mut slope = vec![0.0; n];
        for j in 0..n_use {
            let u_j = self.u.col(j);
            let mut z_j = u_j.to_vec();
            for (k, z_k) in z.iter().enumerate() {
                let coupling = dot(self.p.col(k), u_j);
                for (zi, &zk) in z_j.iter_mut().zip(z_k) {
                    *zi -= coupling * zk;
                }
            }
            for (si, &zi) in slope.iter_mut().zip(&z_j) {
                *si += self.beta[j] * zi;
            }
            z.push(z_j);
        }
        slope
    }

    /// Local linear prediction `beta0 + slope · (x - mean_x)`.
    #[inline]
    pub fn predict(&self, x: &[f64]) -> f64 {
        let slope = self.slope();
        let mut y = self.beta0;
        for i in 0..self.n_in {
            y += slope[i] * (x[i] - self.mean_x[i]);
        }
        y
    }

    /// Projections `s_j = U_j · xres_j` of a centered input over all directions.
    ///
    /// `xres` is scratch of length `n_in`; `s` receives `n_reg` values.
    pub fn project(&self, xc: &[f64], xres: &mut [f64], s: &mut [f64]) {
        xres.copy_from_slice(xc);
        for j in 0..self.n_reg {
            let sj = dot(self.u.col(j), xres);
            s[j] = sj;
            if j + 1 < self.n_reg {
                for (r, &pj) in xres.iter_mut().zip(self.p.col(j)) {
                    *r -= sj * pj;
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Growth
    // ------------------------------------------------------------------------

    /// Append a fresh PLS direction, reserving storage in fixed steps.
    ///
    /// Every buffer is reserved before any of them is extended, so on error
    /// the field is left unchanged.
    pub fn try_add_direction(&mut self, init: FieldInit) -> Result<(), LwprError> {
        let step = DIRECTION_GROW_STEP;
        for store in [
            &mut self.u,
            &mut self.p,
            &mut self.sxres_yres,
            &mut self.ssxres,
        ] {
            let extra = if store.cols() == store.capacity_cols() { step } else { 1 };
            store.try_reserve_cols(extra)?;
        }
        for v in [
            &mut self.beta,
            &mut self.ss_s2,
            &mut self.ss_yres,
            &mut self.h_stat,
            &mut self.r,
            &mut self.lambda,
            &mut self.n_data,
            &mut self.sum_w,
            &mut self.sum_e_cv2,
        ] {
            if v.len() == v.capacity() {
                v.try_reserve_exact(step)
                    .map_err(|_| LwprError::AllocationFailed("projection statistics"))?;
            }
        }

        let j = self.n_reg;
        for store in [
            &mut self.u,
            &mut self.p,
            &mut self.sxres_yres,
            &mut self.ssxres,
        ] {
            store.push_zero_column(DIRECTION_GROW_STEP)?;
        }
        self.u.col_mut(j)[j] = 1.0;
        self.p.col_mut(j)[j] = 1.0;

        self.beta.push(0.0);
        self.ss_s2.push(init.init_s2);
        self.ss_yres.push(0.0);
        self.h_stat.push(0.0);
        self.r.push(0.0);
        self.lambda.push(init.init_lambda);
        self.n_data.push(0.0);
        self.sum_w.push(0.0);
        self.sum_e_cv2.push(0.0);

        self.n_reg += 1;
        self.ssp = 0.0;
        self.invalidate_slope();
        Ok(())
    }

    /// Recompute `D` from `M` after a factor update.
    pub(crate) fn refresh_metric(&mut self, diag_only: bool) {
        metric::recompute_metric(&mut self.d, &self.m, diag_only);
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Input dimensionality.
    #[inline]
    pub fn n_in(&self) -> usize {
        self.n_in
    }

    /// Number of PLS directions in use.
    #[inline]
    pub fn n_reg(&self) -> usize {
        self.n_reg
    }

    /// Number of directions that fit without growing storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.u.capacity_cols()
    }

    /// Field center.
    pub fn center(&self) -> &[f64] {
        &self.c
    }

    /// Distance metric `D`.
    pub fn metric(&self) -> &DMatrix<f64> {
        &self.d
    }

    /// Upper-triangular factor `M` with `D = MᵀM`.
    pub fn cholesky_factor(&self) -> &DMatrix<f64> {
        &self.m
    }

    /// Per-entry learning rates.
    pub fn learning_rates(&self) -> &DMatrix<f64> {
        &self.alpha
    }

    /// Weighted input mean.
    pub fn mean_x(&self) -> &[f64] {
        &self.mean_x
    }

    /// Weighted input variance.
    pub fn var_x(&self) -> &[f64] {
        &self.var_x
    }

    /// Regression offset.
    pub fn beta0(&self) -> f64 {
        self.beta0
    }

    /// Regression coefficients per direction.
    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    /// Projection axis `j`.
    pub fn u(&self, j: usize) -> &[f64] {
        self.u.col(j)
    }

    /// Regression loading `j`.
    pub fn p(&self, j: usize) -> &[f64] {
        self.p.col(j)
    }

    /// Forgetting factors per direction.
    pub fn lambda(&self) -> &[f64] {
        &self.lambda
    }

    /// Effective sample counts per direction.
    pub fn n_data(&self) -> &[f64] {
        &self.n_data
    }

    /// Accumulated activations per direction.
    pub fn sum_w(&self) -> &[f64] {
        &self.sum_w
    }

    /// Activation produced by the most recent update.
    pub fn last_activation(&self) -> f64 {
        self.w
    }

    /// Whether the field contributes to predictions.
    pub fn is_trustworthy(&self) -> bool {
        self.trustworthy
    }

    /// Trace of the distance metric.
    pub fn trace(&self) -> f64 {
        metric::trace(&self.d)
    }
}

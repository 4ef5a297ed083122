//! Per-worker scratch buffers.
//!
//! This module provides a pre-allocated workspace to avoid dynamic memory
//! allocations while activating, updating and blending receptive fields.
//! Each worker owns exactly one workspace for the duration of a call.

// External dependencies
use nalgebra::DMatrix;

// Internal dependencies
use crate::algorithms::field::MeanSnapshot;
use crate::algorithms::metric_update::MetricScratch;
use crate::algorithms::pls::PlsScratch;
use crate::primitives::buffer::Slot;

/// Scratch buffers used by one worker.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    /// `x - c` of the field being activated.
    pub dx: Slot<f64>,
    /// `D (x - c)` of the field being activated.
    pub d_dx: Slot<f64>,
    /// Bias and means of the field being trained, for rollback.
    pub means: MeanSnapshot,
    /// Regression temporaries.
    pub pls: PlsScratch,
    /// Metric-update temporaries.
    pub metric: MetricScratch,
    /// Activation gradient of one field.
    pub grad_w: Slot<f64>,
    /// Blended `Σ y_k ∇w_k + w_k slope_k`.
    pub grad_num: Slot<f64>,
    /// Blended `Σ ∇w_k`.
    pub grad_den: Slot<f64>,
    /// Activation Hessian of one field.
    pub hess_w: DMatrix<f64>,
    /// Blended Hessian numerator.
    pub hess_num: DMatrix<f64>,
    /// Blended `Σ ∇²w_k`.
    pub hess_den: DMatrix<f64>,
    /// Projections of one field for the confidence estimate.
    pub s: Slot<f64>,
    /// Residual input scratch for the confidence estimate.
    pub xres: Slot<f64>,
}

impl Workspace {
    /// Create a workspace for `n_in` inputs.
    pub fn new(n_in: usize) -> Self {
        Self {
            dx: Slot::new(n_in),
            d_dx: Slot::new(n_in),
            means: MeanSnapshot::default(),
            pls: PlsScratch::new(n_in),
            metric: MetricScratch::new(n_in),
            grad_w: Slot::new(n_in),
            grad_num: Slot::new(n_in),
            grad_den: Slot::new(n_in),
            hess_w: DMatrix::zeros(n_in, n_in),
            hess_num: DMatrix::zeros(n_in, n_in),
            hess_den: DMatrix::zeros(n_in, n_in),
            s: Slot::new(n_in),
            xres: Slot::new(n_in),
        }
    }

    /// Size the activation buffers for `n_in` inputs.
    pub fn prepare(&mut self, n_in: usize) {
        self.dx.reset(n_in);
        self.d_dx.reset(n_in);
    }
}

//! Blended prediction with optional confidence and derivatives.
//!
//! ## Purpose
//!
//! This module evaluates one output dimension at a query point: every
//! trustworthy field whose activation exceeds the cutoff contributes its
//! local linear prediction, weighted by activation. On request it also
//! returns a confidence bound and the exact gradient and Hessian of the
//! blended prediction with respect to the input.
//!
//! ## Design notes
//!
//! * **Read-only**: Prediction never changes the model; the only side effect
//!   is populating each field's slope cache.
//! * **Quotient rule**: The prediction is `N / S` with `N = Σ w_k y_k` and
//!   `S = Σ w_k`; derivatives are accumulated as the numerator and
//!   denominator terms and combined once at the end.
//!
//! ## Key concepts
//!
//! * **Activation derivatives**: `∇w = w'·2D(x - c)` and
//!   `∇²w = w''·4D(x - c)(x - c)ᵀD + w'·2D`.
//! * **Confidence**: Standard deviation of the activation-weighted mixture of
//!   the fields' predictive distributions.
//!
//! ## Non-goals
//!
//! * This module does not normalize or de-normalize (handled by the API).

// External dependencies
use nalgebra::DMatrix;

// Internal dependencies
use crate::algorithms::lifecycle::SubModel;
use crate::engine::workspace::Workspace;
use crate::math::kernel::Kernel;
use crate::math::vector::difference;

/// Which optional quantities to compute alongside the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredictOptions {
    /// Compute the confidence bound.
    pub confidence: bool,
    /// Compute the gradient with respect to the input.
    pub gradient: bool,
    /// Compute the Hessian with respect to the input (implies `gradient`).
    pub hessian: bool,
}

/// Prediction of one output dimension in normalized units.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionPrediction {
    /// Blended prediction.
    pub y: f64,
    /// Confidence bound (infinite without contributing fields).
    pub confidence: f64,
    /// Gradient, empty unless requested.
    pub gradient: Vec<f64>,
    /// Hessian, empty unless requested.
    pub hessian: DMatrix<f64>,
}

fn resize_square(m: &mut DMatrix<f64>, n: usize) {
    if m.nrows() != n || m.ncols() != n {
        *m = DMatrix::zeros(n, n);
    } else {
        m.fill(0.0);
    }
}

/// Evaluate one sub-model at the normalized input `x`.
pub fn predict_dimension(
    sub: &SubModel,
    kernel: Kernel,
    x: &[f64],
    cutoff: f64,
    opts: PredictOptions,
    ws: &mut Workspace,
) -> DimensionPrediction {
    let n = x.len();
    let gradient = opts.gradient || opts.hessian;

    ws.prepare(n);
    ws.grad_w.reset(n);
    ws.grad_num.reset(n);
    ws.grad_den.reset(n);
    if opts.hessian {
        resize_square(&mut ws.hess_w, n);
        resize_square(&mut ws.hess_num, n);
        resize_square(&mut ws.hess_den, n);
    }

    let mut sum_w = 0.0;
    let mut sum_wy = 0.0;
    let mut sum_conf = 0.0;

    for rf in sub.fields.iter().filter(|rf| rf.trustworthy) {
        let act = rf.activate(kernel, x, &mut ws.dx, &mut ws.d_dx);
        if act.w <= cutoff {
            continue;
        }
        let w = act.w;
        let yk = rf.predict(x);
        sum_w += w;
        sum_wy += w * yk;

        if opts.confidence {
            let n_reg = rf.n_reg;
            let last = n_reg - 1;
            ws.pls.xc.reset(n);
            difference(&mut ws.pls.xc, x, &rf.mean_x);
            ws.xres.reset(n);
            ws.s.reset(n_reg);
            rf.project(&ws.pls.xc, &mut ws.xres, &mut ws.s);
            let leverage: f64 = (0..n_reg).map(|j| ws.s[j] * ws.s[j] / rf.ss_s2[j]).sum();
            let dof = (rf.sum_w[last] - rf.ssp).max(f64::EPSILON);
            let sigma2 = rf.sum_e_cv2[last] / dof * (1.0 + w * leverage);
            sum_conf += w * (sigma2 + yk * yk);
        }

        if gradient {
            let slope = rf.slope();
            for i in 0..n {
                let gw = 2.0 * act.dw * ws.d_dx[i];
                ws.grad_w[i] = gw;
                ws.grad_num[i] += yk * gw + w * slope[i];
                ws.grad_den[i] += gw;
            }

            if opts.hessian {
                for col in 0..n {
                    for row in 0..n {
                        let hw = 4.0 * act.ddw * ws.d_dx[row] * ws.d_dx[col]
                            + 2.0 * act.dw * rf.d[(row, col)];
                        ws.hess_w[(row, col)] = hw;
                        ws.hess_num[(row, col)] += yk * hw
                            + ws.grad_w[row] * slope[col]
                            + slope[row] * ws.grad_w[col];
                        ws.hess_den[(row, col)] += hw;
                    }
                }
            }
        }
    }

    if sum_w <= 0.0 {
        return DimensionPrediction {
            y: 0.0,
            confidence: f64::INFINITY,
            gradient: if gradient { vec![0.0; n] } else { Vec::new() },
            hessian: if opts.hessian {
                DMatrix::zeros(n, n)
            } else {
                DMatrix::zeros(0, 0)
            },
        };
    }

    let y = sum_wy / sum_w;
    let confidence = if opts.confidence {
        (sum_conf / sum_w - y * y).max(0.0).sqrt()
    } else {
        f64::NAN
    };

    let mut grad = Vec::new();
    if gradient {
        grad = (0..n)
            .map(|i| (ws.grad_num[i] - y * ws.grad_den[i]) / sum_w)
            .collect();
    }

    let mut hessian = DMatrix::zeros(0, 0);
    if opts.hessian {
        hessian = DMatrix::from_fn(n, n, |row, col| {
            (ws.hess_num[(row, col)]
                - y * ws.hess_den[(row, col)]
                - grad[row] * ws.grad_den[col]
                - ws.grad_den[row] * grad[col])
                / sum_w
        });
    }

    DimensionPrediction {
        y,
        confidence,
        gradient: grad,
        hessian,
    }
}

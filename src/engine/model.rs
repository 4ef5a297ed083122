//! The LWPR model.
//!
//! ## Purpose
//!
//! `Lwpr` ties every layer together: it owns the configuration, the global
//! input statistics, one sub-model per output dimension and the dispatcher.
//! `update` trains on one sample and `predict_with` evaluates the model,
//! both normalizing on the way in and de-normalizing on the way out.
//!
//! ## Design notes
//!
//! * **Coordinator-only state**: Global statistics, normalization and the
//!   configuration are touched only by the calling thread, outside of any
//!   parallel region.
//! * **Update lanes**: Within one output dimension, fields are striped across
//!   workers (see `engine::update`). Dimensions are processed one after the
//!   other.
//! * **Predict lanes**: Output dimensions are split into contiguous chunks,
//!   one per worker.
//! * **Atomic reconfiguration**: `reconfigure` edits a copy of the
//!   configuration and commits it only if it validates and the worker pool
//!   could be built.
//!
//! ## Invariants
//!
//! * `sub_models.len() == n_out`.
//! * `config` always passes `Validator::validate_config`.

// External dependencies
use nalgebra::DMatrix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Internal dependencies
use crate::algorithms::lifecycle::SubModel;
use crate::engine::config::LwprConfig;
use crate::engine::dispatcher::Dispatcher;
use crate::engine::predict::{predict_dimension, DimensionPrediction, PredictOptions};
use crate::engine::update::update_dimension;
use crate::engine::validator::Validator;
use crate::math::metric::MetricTemplate;
use crate::primitives::errors::LwprError;

// ============================================================================
// Outputs
// ============================================================================

/// Result of training on one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutput {
    /// Blended prediction per output (0 where no trustworthy field was active).
    pub prediction: Vec<f64>,
    /// Highest field activation per output.
    pub max_activation: Vec<f64>,
    /// `false` when a field or projection direction could not be allocated.
    pub ok: bool,
}

/// Prediction with the optional quantities requested through `PredictOptions`.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted output per dimension.
    pub y: Vec<f64>,
    /// Confidence bound per output.
    pub confidence: Option<Vec<f64>>,
    /// Jacobian `∂y/∂x`, `n_out × n_in`.
    pub jacobian: Option<DMatrix<f64>>,
    /// Hessian `∂²y_k/∂x²` per output, each `n_in × n_in`.
    pub hessian: Option<Vec<DMatrix<f64>>>,
}

// ============================================================================
// Model
// ============================================================================

/// Locally weighted projection regression model.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Lwpr {
    n_in: usize,
    n_out: usize,
    n_data: u64,
    mean_x: Vec<f64>,
    var_x: Vec<f64>,
    config: LwprConfig,
    template: MetricTemplate,
    sub_models: Vec<SubModel>,
    #[cfg_attr(feature = "serde", serde(skip))]
    dispatcher: Dispatcher,
}

impl Lwpr {
    /// Create an empty model from a configuration.
    pub fn from_config(n_in: usize, n_out: usize, config: LwprConfig) -> Result<Self, LwprError> {
        let template = Validator::validate_config(&config, n_in, n_out)?;
        let dispatcher = Dispatcher::new(config.workers, n_in)?;
        Ok(Self {
            n_in,
            n_out,
            n_data: 0,
            mean_x: vec![0.0; n_in],
            var_x: vec![0.0; n_in],
            config,
            template,
            sub_models: (0..n_out).map(|_| SubModel::new()).collect(),
            dispatcher,
        })
    }

    // ========================================================================
    // Training
    // ========================================================================

    /// Train on one sample.
    pub fn update(&mut self, x: &[f64], y: &[f64]) -> Result<UpdateOutput, LwprError> {
        Validator::validate_vector(x, self.n_in, "x")?;
        Validator::validate_vector(y, self.n_out, "y")?;
        self.dispatcher.ensure(self.config.workers, self.n_in)?;

        self.update_statistics(x);
        let xn: Vec<f64> = x
            .iter()
            .zip(&self.config.norm_in)
            .map(|(v, s)| v / s)
            .collect();

        let mut out = UpdateOutput {
            prediction: vec![0.0; self.n_out],
            max_activation: vec![0.0; self.n_out],
            ok: true,
        };
        for dim in 0..self.n_out {
            let norm = self.config.norm_out[dim];
            let res = update_dimension(
                &mut self.sub_models[dim],
                &self.dispatcher,
                &self.config,
                &self.template,
                &xn,
                y[dim] / norm,
                dim,
            );
            out.prediction[dim] = res.prediction * norm;
            out.max_activation[dim] = res.max_activation;
            out.ok &= res.ok;
        }
        Ok(out)
    }

    fn update_statistics(&mut self, x: &[f64]) {
        self.n_data += 1;
        let n = self.n_data as f64;
        for (i, &xi) in x.iter().enumerate() {
            let old = self.mean_x[i];
            let mean = old + (xi - old) / n;
            self.var_x[i] = ((n - 1.0) * self.var_x[i] + (xi - old) * (xi - mean)) / n;
            self.mean_x[i] = mean;
        }
    }

    // ========================================================================
    // Prediction
    // ========================================================================

    /// Predict every output at `x`, using fields whose activation exceeds `cutoff`.
    pub fn predict(&self, x: &[f64], cutoff: f64) -> Result<Vec<f64>, LwprError> {
        Ok(self.predict_with(x, cutoff, PredictOptions::default())?.y)
    }

    /// Predict with a confidence bound per output.
    pub fn predict_with_confidence(
        &self,
        x: &[f64],
        cutoff: f64,
    ) -> Result<(Vec<f64>, Vec<f64>), LwprError> {
        let opts = PredictOptions {
            confidence: true,
            ..PredictOptions::default()
        };
        let p = self.predict_with(x, cutoff, opts)?;
        Ok((p.y, p.confidence.unwrap_or_default()))
    }

    /// Predict with the Jacobian `∂y/∂x` (`n_out × n_in`).
    pub fn predict_with_gradient(
        &self,
        x: &[f64],
        cutoff: f64,
    ) -> Result<(Vec<f64>, DMatrix<f64>), LwprError> {
        let opts = PredictOptions {
            gradient: true,
            ..PredictOptions::default()
        };
        let p = self.predict_with(x, cutoff, opts)?;
        let jacobian = p
            .jacobian
            .unwrap_or_else(|| DMatrix::zeros(self.n_out, self.n_in));
        Ok((p.y, jacobian))
    }

    /// Predict with the Jacobian and one Hessian per output.
    pub fn predict_with_gradient_and_hessian(
        &self,
        x: &[f64],
        cutoff: f64,
    ) -> Result<(Vec<f64>, DMatrix<f64>, Vec<DMatrix<f64>>), LwprError> {
        let opts = PredictOptions {
            gradient: true,
            hessian: true,
            ..PredictOptions::default()
        };
        let p = self.predict_with(x, cutoff, opts)?;
        let jacobian = p
            .jacobian
            .unwrap_or_else(|| DMatrix::zeros(self.n_out, self.n_in));
        Ok((p.y, jacobian, p.hessian.unwrap_or_default()))
    }

    /// Predict with any combination of confidence, gradient and Hessian.
    pub fn predict_with(
        &self,
        x: &[f64],
        cutoff: f64,
        opts: PredictOptions,
    ) -> Result<Prediction, LwprError> {
        Validator::validate_vector(x, self.n_in, "x")?;
        Validator::validate_cutoff(cutoff)?;

        let norm_in = &self.config.norm_in;
        let xn: Vec<f64> = x.iter().zip(norm_in).map(|(v, s)| v / s).collect();

        let workers = self.dispatcher.workers().min(self.n_out);
        let chunk = self.n_out.div_ceil(workers);
        let lanes: Vec<_> = (0..self.n_out)
            .step_by(chunk)
            .map(|start| start..(start + chunk).min(self.n_out))
            .collect();

        let kernel = self.config.kernel;
        let dims: Vec<DimensionPrediction> = self
            .dispatcher
            .run(lanes, |range, ws| {
                range
                    .map(|d| predict_dimension(&self.sub_models[d], kernel, &xn, cutoff, opts, ws))
                    .collect::<Vec<_>>()
            })
            .into_iter()
            .flatten()
            .collect();

        let norm_out = &self.config.norm_out;
        let y: Vec<f64> = dims.iter().zip(norm_out).map(|(p, s)| p.y * s).collect();
        let confidence: Option<Vec<f64>> = opts
            .confidence
            .then(|| dims.iter().zip(norm_out).map(|(p, s)| p.confidence * s).collect());
        let jacobian = (opts.gradient || opts.hessian).then(|| {
            DMatrix::from_fn(self.n_out, self.n_in, |k, i| {
                dims[k].gradient[i] * norm_out[k] / norm_in[i]
            })
        });
        let hessian: Option<Vec<DMatrix<f64>>> = opts.hessian.then(|| {
            dims.iter()
                .zip(norm_out)
                .map(|(p, s)| {
                    DMatrix::from_fn(self.n_in, self.n_in, |i, j| {
                        p.hessian[(i, j)] * s / (norm_in[i] * norm_in[j])
                    })
                })
                .collect()
        });

        Ok(Prediction {
            y,
            confidence,
            jacobian,
            hessian,
        })
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Apply a configuration change atomically.
    ///
    /// The closure edits a copy; the copy is validated and committed only on
    /// success, bumping the configuration version. Existing fields keep their
    /// metrics; a new initial metric applies to fields created afterwards.
    pub fn reconfigure<F>(&mut self, edit: F) -> Result<(), LwprError>
    where
        F: FnOnce(&mut LwprConfig),
    {
        let mut next = self.config.clone();
        edit(&mut next);
        next.version = self.config.version;
        let template = Validator::validate_config(&next, self.n_in, self.n_out)?;
        self.dispatcher.ensure(next.workers, self.n_in)?;
        next.version += 1;
        self.config = next;
        self.template = template;
        Ok(())
    }

    /// Change the number of workers, rebuilding the pool.
    pub fn set_workers(&mut self, workers: usize) -> Result<(), LwprError> {
        self.reconfigure(|cfg| cfg.workers = workers)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Input dimensionality.
    pub fn n_in(&self) -> usize {
        self.n_in
    }

    /// Output dimensionality.
    pub fn n_out(&self) -> usize {
        self.n_out
    }

    /// Number of training samples seen.
    pub fn n_data(&self) -> u64 {
        self.n_data
    }

    /// Running mean of the raw inputs.
    pub fn mean_x(&self) -> &[f64] {
        &self.mean_x
    }

    /// Running (population) variance of the raw inputs.
    pub fn var_x(&self) -> &[f64] {
        &self.var_x
    }

    /// Current configuration.
    pub fn config(&self) -> &LwprConfig {
        &self.config
    }

    /// Metric template used for unseeded fields.
    pub fn metric_template(&self) -> &MetricTemplate {
        &self.template
    }

    /// Sub-model of output dimension `dim`.
    pub fn sub_model(&self, dim: usize) -> Option<&SubModel> {
        self.sub_models.get(dim)
    }

    /// All sub-models, one per output.
    pub fn sub_models(&self) -> &[SubModel] {
        &self.sub_models
    }

    /// Number of receptive fields per output.
    pub fn num_fields(&self) -> Vec<usize> {
        self.sub_models.iter().map(SubModel::num_fields).collect()
    }
}

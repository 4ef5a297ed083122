//! Model configuration.
//!
//! ## Purpose
//!
//! `LwprConfig` gathers every tunable knob of a model: kernel and metric
//! options, thresholds of the lifecycle, forgetting schedule, normalization
//! and the number of workers. It is owned by the model, validated as a whole
//! and only changed between calls.
//!
//! ## Design notes
//!
//! * **Versioned**: `version` counts the reconfigurations accepted since the
//!   model was created.
//! * **Plain data**: All knobs are public fields; consistency is enforced by
//!   `Validator::validate_config` rather than by setters.
//!
//! ## Key concepts
//!
//! * **Forgetting schedule**: Each direction's `lambda` starts at
//!   `init_lambda` and moves towards `final_lambda` by
//!   `lambda ← tau_lambda·lambda + (1 - tau_lambda)·final_lambda` per sample.
//! * **Normalization**: Inputs are divided by `norm_in` and outputs by
//!   `norm_out` before learning; predictions and derivatives are scaled back.

// External dependencies
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Internal dependencies
use crate::algorithms::field::FieldInit;
use crate::algorithms::metric_update::MetricParams;
use crate::math::kernel::Kernel;
use crate::math::metric::{InitialMetric, MetricTemplate};
use crate::primitives::errors::LwprError;

/// Every tunable parameter of an LWPR model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LwprConfig {
    /// Activation kernel.
    pub kernel: Kernel,
    /// Adapt only the diagonal of the distance metric.
    pub diag_only: bool,
    /// Adapt distance metrics at all.
    pub update_d: bool,
    /// Adapt per-entry learning rates.
    pub meta: bool,
    /// Meta learning rate.
    pub meta_rate: f64,
    /// Ridge penalty on distance metrics.
    pub penalty: f64,
    /// Initial learning rate of every adapted metric entry.
    pub init_alpha: f64,
    /// Metric given to fields created without a seed.
    pub initial_metric: InitialMetric,
    /// Activation below which a sample creates a new field.
    pub w_gen: f64,
    /// Second-highest activation above which a field is pruned.
    pub w_prune: f64,
    /// Initial forgetting factor.
    pub init_lambda: f64,
    /// Asymptotic forgetting factor.
    pub final_lambda: f64,
    /// Annealing rate of the forgetting factor.
    pub tau_lambda: f64,
    /// Initial `SSs2` of fresh PLS directions.
    pub init_s2: f64,
    /// Relative error reduction required to add a PLS direction.
    pub add_threshold: f64,
    /// Per-input normalization.
    pub norm_in: Vec<f64>,
    /// Per-output normalization.
    pub norm_out: Vec<f64>,
    /// Optional cap on fields per output dimension.
    pub max_fields: Option<usize>,
    /// Worker threads used for update and predict.
    pub workers: usize,
    pub(crate) version: u64,
}

impl LwprConfig {
    /// Default configuration for a model with `n_in` inputs and `n_out` outputs.
    pub fn new(n_in: usize, n_out: usize) -> Self {
        Self {
            kernel: Kernel::Gaussian,
            diag_only: true,
            update_d: true,
            meta: false,
            meta_rate: 250.0,
            penalty: 1e-6,
            init_alpha: 50.0,
            initial_metric: InitialMetric::default(),
            w_gen: 0.1,
            w_prune: 1.0,
            init_lambda: 0.999,
            final_lambda: 0.99999,
            tau_lambda: 0.9999,
            init_s2: 1e-10,
            add_threshold: 0.5,
            norm_in: vec![1.0; n_in],
            norm_out: vec![1.0; n_out],
            max_fields: None,
            workers: 1,
            version: 0,
        }
    }

    /// Number of accepted configuration changes since creation.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Factor the initial metric into a template for `n_in` inputs.
    pub fn metric_template(&self, n_in: usize) -> Result<MetricTemplate, LwprError> {
        MetricTemplate::build(&self.initial_metric, n_in, self.diag_only, self.init_alpha)
    }

    pub(crate) fn field_init(&self) -> FieldInit {
        FieldInit {
            init_lambda: self.init_lambda,
            init_s2: self.init_s2,
        }
    }

    pub(crate) fn metric_params(&self) -> MetricParams {
        MetricParams {
            penalty: self.penalty,
            meta: self.meta,
            meta_rate: self.meta_rate,
            diag_only: self.diag_only,
        }
    }
}

//! High-level API for LWPR.
//!
//! ## Purpose
//!
//! This module provides the primary user-facing entry point: a fluent builder
//! that collects model parameters, validates them once in `build`, and
//! returns a ready-to-train [`Lwpr`] model.
//!
//! ## Design notes
//!
//! * **Ergonomic**: Fluent builder with sensible defaults for all parameters.
//! * **Validated**: All parameters are validated together when `.build()` is
//!   called; setting a parameter twice is reported as an error.
//!
//! ## Key concepts
//!
//! ### Configuration Flow
//!
//! 1. Create a [`LwprBuilder`] via `Lwpr::builder(n_in, n_out)`.
//! 2. Chain configuration methods (`.initial_metric()`, `.w_gen()`, etc.).
//! 3. Call `.build()` to obtain the model.
//! 4. Later changes go through [`Lwpr::reconfigure`].

// Internal dependencies
use crate::engine::config::LwprConfig;
use crate::engine::validator::Validator;

// Publicly re-exported types
pub use crate::algorithms::field::ReceptiveField;
pub use crate::algorithms::lifecycle::SubModel;
pub use crate::engine::model::{Lwpr, Prediction, UpdateOutput};
pub use crate::engine::predict::PredictOptions;
pub use crate::math::kernel::Kernel;
pub use crate::math::metric::{InitialMetric, MetricTemplate};
pub use crate::primitives::errors::LwprError;

/// Fluent builder for configuring an LWPR model.
#[derive(Debug, Clone)]
pub struct LwprBuilder {
    /// Input dimensionality.
    pub n_in: usize,

    /// Output dimensionality.
    pub n_out: usize,

    /// Activation kernel (default: Gaussian).
    pub kernel: Option<Kernel>,

    /// Adapt only the metric diagonal (default: true).
    pub diag_only: Option<bool>,

    /// Adapt distance metrics (default: true).
    pub update_d: Option<bool>,

    /// Adapt per-entry learning rates (default: false).
    pub meta: Option<bool>,

    /// Meta learning rate (default: 250).
    pub meta_rate: Option<f64>,

    /// Ridge penalty on distance metrics (default: 1e-6).
    pub penalty: Option<f64>,

    /// Initial metric learning rate (default: 50).
    pub init_alpha: Option<f64>,

    /// Initial distance metric (default: spherical 25).
    pub initial_metric: Option<InitialMetric>,

    /// Field-creation threshold (default: 0.1).
    pub w_gen: Option<f64>,

    /// Pruning threshold (default: 1.0).
    pub w_prune: Option<f64>,

    /// Initial forgetting factor (default: 0.999).
    pub init_lambda: Option<f64>,

    /// Final forgetting factor (default: 0.99999).
    pub final_lambda: Option<f64>,

    /// Forgetting annealing rate (default: 0.9999).
    pub tau_lambda: Option<f64>,

    /// Initial `SSs2` (default: 1e-10).
    pub init_s2: Option<f64>,

    /// Direction-growth threshold (default: 0.5).
    pub add_threshold: Option<f64>,

    /// Input normalization (default: ones).
    pub norm_in: Option<Vec<f64>>,

    /// Output normalization (default: ones).
    pub norm_out: Option<Vec<f64>>,

    /// Cap on fields per output (default: unlimited).
    pub max_fields: Option<usize>,

    /// Worker threads (default: 1).
    pub workers: Option<usize>,

    /// Tracks if any parameter was set multiple times (for validation).
    #[doc(hidden)]
    pub duplicate_param: Option<&'static str>,
}

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident: $ty:ty) => {
        $(#[$doc])*
        pub fn $name(mut self, value: $ty) -> Self {
            if self.$name.is_some() {
                self.duplicate_param = Some(stringify!($name));
            }
            self.$name = Some(value);
            self
        }
    };
}

impl LwprBuilder {
    /// Create a new builder for `n_in` inputs and `n_out` outputs.
    pub fn new(n_in: usize, n_out: usize) -> Self {
        Self {
            n_in,
            n_out,
            kernel: None,
            diag_only: None,
            update_d: None,
            meta: None,
            meta_rate: None,
            penalty: None,
            init_alpha: None,
            initial_metric: None,
            w_gen: None,
            w_prune: None,
            init_lambda: None,
            final_lambda: None,
            tau_lambda: None,
            init_s2: None,
            add_threshold: None,
            norm_in: None,
            norm_out: None,
            max_fields: None,
            workers: None,
            duplicate_param: None,
        }
    }

    setter!(
        /// Set the activation kernel.
        kernel: Kernel
    );
    setter!(
        /// Restrict metric adaptation to the diagonal (`false` adapts the full factor).
        diag_only: bool
    );
    setter!(
        /// Enable or disable distance-metric adaptation.
        update_d: bool
    );
    setter!(
        /// Enable per-entry learning-rate adaptation.
        meta: bool
    );
    setter!(
        /// Set the meta learning rate.
        meta_rate: f64
    );
    setter!(
        /// Set the ridge penalty on distance metrics.
        penalty: f64
    );
    setter!(
        /// Set the initial metric learning rate.
        init_alpha: f64
    );
    setter!(
        /// Set the metric of fields created without a seed.
        initial_metric: InitialMetric
    );
    setter!(
        /// Set the activation below which a new field is created.
        w_gen: f64
    );
    setter!(
        /// Set the second-highest activation above which a field is pruned.
        w_prune: f64
    );
    setter!(
        /// Set the initial forgetting factor.
        init_lambda: f64
    );
    setter!(
        /// Set the asymptotic forgetting factor.
        final_lambda: f64
    );
    setter!(
        /// Set the forgetting annealing rate.
        tau_lambda: f64
    );
    setter!(
        /// Set the initial `SSs2` of new directions.
        init_s2: f64
    );
    setter!(
        /// Set the relative error reduction required for a new direction.
        add_threshold: f64
    );
    setter!(
        /// Set per-input normalization factors.
        norm_in: Vec<f64>
    );
    setter!(
        /// Set per-output normalization factors.
        norm_out: Vec<f64>
    );
    setter!(
        /// Cap the number of fields per output dimension.
        max_fields: usize
    );
    setter!(
        /// Set the number of worker threads.
        workers: usize
    );

    /// Resolve defaults into a configuration without validating it.
    pub fn to_config(&self) -> LwprConfig {
        let mut cfg = LwprConfig::new(self.n_in, self.n_out);
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field.clone() { cfg.$field = v; })*
            };
        }
        apply!(
            kernel,
            diag_only,
            update_d,
            meta,
            meta_rate,
            penalty,
            init_alpha,
            initial_metric,
            w_gen,
            w_prune,
            init_lambda,
            final_lambda,
            tau_lambda,
            init_s2,
            add_threshold,
            norm_in,
            norm_out,
            workers
        );
        cfg.max_fields = self.max_fields;
        cfg
    }

    /// Validate the parameters and create the model.
    pub fn build(self) -> Result<Lwpr, LwprError> {
        Validator::validate_no_duplicates(self.duplicate_param)?;
        Validator::validate_dimensions(self.n_in, self.n_out)?;
        Lwpr::from_config(self.n_in, self.n_out, self.to_config())
    }
}

impl Lwpr {
    /// Start configuring a model with `n_in` inputs and `n_out` outputs.
    pub fn builder(n_in: usize, n_out: usize) -> LwprBuilder {
        LwprBuilder::new(n_in, n_out)
    }
}

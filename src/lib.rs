//! # LWPR — Locally Weighted Projection Regression for Rust
//!
//! Incremental, nonlinear function approximation with a growing set of local
//! linear models.
//!
//! ## What is LWPR?
//!
//! LWPR learns a mapping `f: Rⁿ → Rᵐ` one sample at a time. The input space is
//! covered by *receptive fields*, each a local linear model with its own
//! Gaussian-shaped region of validity. A prediction is the activation-weighted
//! blend of the fields' local predictions.
//!
//! Every field:
//! - regresses inside its region with online partial least squares (PLS),
//!   adding projection directions only while they reduce the
//!   cross-validation error;
//! - adapts the shape of its region (the distance metric `D = MᵀM`) by
//!   stochastic gradient descent on a leave-one-out cost;
//! - forgets old data with a forgetting factor that anneals towards 1.
//!
//! New fields are created where no existing field is active enough, and
//! strongly overlapping fields are pruned.
//!
//! ## Quick Start
//!
//! ```
//! use lwpr_rs::prelude::*;
//!
//! let mut model = Lwpr::builder(1, 1)
//!     .initial_metric(InitialMetric::Spherical(20.0))
//!     .build()?;
//!
//! for i in 0..500 {
//!     let x = (i % 100) as f64 / 100.0;
//!     model.update(&[x], &[2.0 * x + 1.0])?;
//! }
//!
//! let y = model.predict(&[0.5], 0.001)?;
//! assert!((y[0] - 2.0).abs() < 0.1);
//! # Result::<(), LwprError>::Ok(())
//! ```
//!
//! ### Confidence and derivatives
//!
//! ```
//! use lwpr_rs::prelude::*;
//!
//! let mut model = Lwpr::builder(2, 1).build()?;
//! for i in 0..200 {
//!     let t = i as f64 / 200.0;
//!     model.update(&[t, 1.0 - t], &[t.sin()])?;
//! }
//!
//! let (y, conf) = model.predict_with_confidence(&[0.5, 0.5], 0.001)?;
//! assert_eq!(y.len(), 1);
//! assert_eq!(conf.len(), 1);
//!
//! let (_, jacobian, hessians) = model.predict_with_gradient_and_hessian(&[0.5, 0.5], 0.0)?;
//! assert_eq!(jacobian.shape(), (1, 2));
//! assert_eq!(hessians[0].shape(), (2, 2));
//! # Result::<(), LwprError>::Ok(())
//! ```
//!
//! ## Parameters
//!
//! | Parameter        | Default          | Meaning                                         |
//! |------------------|------------------|-------------------------------------------------|
//! | `kernel`         | `Gaussian`       | Activation kernel (`Gaussian`, `BiSquare`)      |
//! | `initial_metric` | `Spherical(25)`  | Metric of fields created without a seed         |
//! | `diag_only`      | `true`           | Adapt only the diagonal of `M`                  |
//! | `update_d`       | `true`           | Adapt distance metrics                          |
//! | `meta`           | `false`          | Adapt per-entry learning rates                  |
//! | `meta_rate`      | `250`            | Meta learning rate                              |
//! | `penalty`        | `1e-6`           | Ridge penalty on `D`                            |
//! | `init_alpha`     | `50`             | Initial metric learning rate                    |
//! | `w_gen`          | `0.1`            | Create a field when no activation reaches this  |
//! | `w_prune`        | `1.0`            | Prune when two fields both exceed this          |
//! | `init_lambda`    | `0.999`          | Initial forgetting factor                       |
//! | `final_lambda`   | `0.99999`        | Final forgetting factor                         |
//! | `tau_lambda`     | `0.9999`         | Forgetting annealing rate                       |
//! | `init_s2`        | `1e-10`          | Initial PLS denominator                         |
//! | `add_threshold`  | `0.5`            | Error ratio required for a new PLS direction    |
//! | `norm_in/out`    | ones             | Per-dimension normalization                     |
//! | `max_fields`     | unlimited        | Field budget per output dimension               |
//! | `workers`        | `1`              | Worker threads                                  |
//!
//! ## Parallelism
//!
//! With `workers > 1` a persistent rayon pool is created with the model.
//! During `update` the fields of each output dimension are striped across
//! workers; during prediction the output dimensions are split between them.
//! Results are reduced in a fixed order, so the learned model is the same for
//! any worker count up to floating-point summation order.
//!
//! ## Persistence
//!
//! With the `serde` feature, [`Lwpr`](crate::prelude::Lwpr) implements
//! `Serialize` and `Deserialize`. The worker pool and slope caches are
//! rebuilt on demand after loading.
//!
//! ## Logging
//!
//! The crate emits `tracing` events: field creation and pruning at `debug`,
//! rejected metric steps at `trace`, and allocation failures and samples
//! rejected for non-finite statistics at `warn`. Install any subscriber to see
//! them.
//!
//! ## References
//!
//! - Vijayakumar, S., D'Souza, A. & Schaal, S. (2005). "Incremental Online Learning in High Dimensions"
//! - Schaal, S. & Atkeson, C. G. (1998). "Constructive Incremental Learning from Only Local Information"

#![deny(missing_docs)]

// ============================================================================
// Internal Modules
// ============================================================================

// Layer 1: Primitives - data structures and basic utilities.
//
// Contains the error type, reusable scratch vectors and strided column
// storage for PLS directions.
mod primitives;

// Layer 2: Math - pure mathematical functions.
//
// Contains activation kernels, slice-level vector kernels and distance-metric
// construction.
mod math;

// Layer 3: Algorithms - receptive-field learning rules.
//
// Contains the field state, online PLS, metric adaptation and the add/prune
// lifecycle.
mod algorithms;

// Layer 4: Engine - orchestration and execution control.
//
// Contains configuration, validation, the worker pool, the update and
// predict engines and the model itself.
mod engine;

// High-level fluent API for LWPR.
//
// Provides the `LwprBuilder` for configuring and creating models.
mod api;

// ============================================================================
// Prelude
// ============================================================================

/// Standard LWPR prelude.
///
/// This module is intended to be wildcard-imported for convenient access
/// to the most commonly used types:
///
/// ```
/// use lwpr_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{
        InitialMetric, Kernel, Lwpr, LwprBuilder, LwprError, MetricTemplate, Prediction,
        PredictOptions, ReceptiveField, SubModel, UpdateOutput,
    };
    pub use crate::engine::config::LwprConfig;
}

// ============================================================================
// Testing re-exports
// ============================================================================

/// Internal modules for development and testing.
///
/// This module re-exports internal modules for development and testing purposes.
/// It is only available with the `dev` feature enabled.
///
/// **Warning**: These are internal implementation details and may change without notice.
/// Do not use in production code.
#[cfg(feature = "dev")]
pub mod internals {
    /// Internal primitive types and utilities.
    pub mod primitives {
        pub use crate::primitives::*;
    }
    /// Internal math functions.
    pub mod math {
        pub use crate::math::*;
    }
    /// Internal learning rules.
    pub mod algorithms {
        pub use crate::algorithms::*;
    }
    /// Internal execution engine.
    pub mod engine {
        pub use crate::engine::*;
    }
    /// Internal API.
    pub mod api {
        pub use crate::api::*;
    }
}

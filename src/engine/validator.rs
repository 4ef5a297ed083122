//! Input validation for LWPR configuration and data.
//!
//! ## Purpose
//!
//! This module checks every caller-supplied value at the API boundary:
//! dimensionalities, sample vectors, prediction cutoffs and the full model
//! configuration. The numeric core assumes these checks have passed.
//!
//! ## Design notes
//!
//! * **Fail-Fast**: Validation stops at the first error encountered.
//! * **Efficiency**: Checks are ordered from cheap to expensive; the metric
//!   factorization runs last.
//!
//! ## Invariants
//!
//! * All validated inputs satisfy their respective mathematical constraints.
//! * Validation logic is deterministic and side-effect free.
//!
//! ## Non-goals
//!
//! * This module does not clamp or otherwise correct invalid inputs.

// Internal dependencies
use crate::engine::config::LwprConfig;
use crate::math::metric::MetricTemplate;
use crate::primitives::errors::LwprError;

// ============================================================================
// Validator
// ============================================================================

/// Validation utility for LWPR configuration and input data.
///
/// All methods are static, return `Result<(), LwprError>` and fail fast upon
/// identifying the first violation.
pub struct Validator;

impl Validator {
    // ========================================================================
    // Core Input Validation
    // ========================================================================

    /// Validate model dimensionality.
    pub fn validate_dimensions(n_in: usize, n_out: usize) -> Result<(), LwprError> {
        if n_in == 0 || n_out == 0 {
            return Err(LwprError::InvalidDimensions { n_in, n_out });
        }
        Ok(())
    }

    /// Validate the length and finiteness of a sample vector.
    pub fn validate_vector(
        values: &[f64],
        expected: usize,
        what: &'static str,
    ) -> Result<(), LwprError> {
        if values.len() != expected {
            return Err(LwprError::MismatchedInput {
                what,
                expected,
                got: values.len(),
            });
        }
        for (i, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(LwprError::InvalidNumericValue(format!("{what}[{i}]={v}")));
            }
        }
        Ok(())
    }

    /// Validate a prediction activation cutoff.
    pub fn validate_cutoff(cutoff: f64) -> Result<(), LwprError> {
        if !cutoff.is_finite() || cutoff < 0.0 {
            return Err(LwprError::InvalidParameter {
                name: "cutoff",
                value: cutoff,
                reason: "must be finite and non-negative",
            });
        }
        Ok(())
    }

    // ========================================================================
    // Parameter Validation
    // ========================================================================

    fn check(
        name: &'static str,
        value: f64,
        ok: bool,
        reason: &'static str,
    ) -> Result<(), LwprError> {
        if !value.is_finite() || !ok {
            return Err(LwprError::InvalidParameter {
                name,
                value,
                reason,
            });
        }
        Ok(())
    }

    /// Validate a forgetting factor in `(0, 1)`.
    pub fn validate_lambda(name: &'static str, lambda: f64) -> Result<(), LwprError> {
        Self::check(name, lambda, lambda > 0.0 && lambda < 1.0, "must be in (0, 1)")
    }

    /// Validate the activation thresholds of the lifecycle.
    pub fn validate_thresholds(w_gen: f64, w_prune: f64) -> Result<(), LwprError> {
        Self::check("w_gen", w_gen, w_gen > 0.0 && w_gen < 1.0, "must be in (0, 1)")?;
        Self::check("w_prune", w_prune, w_prune > w_gen, "must exceed w_gen")
    }

    /// Validate per-dimension normalization factors.
    pub fn validate_norms(
        norms: &[f64],
        expected: usize,
        what: &'static str,
    ) -> Result<(), LwprError> {
        if norms.len() != expected {
            return Err(LwprError::MismatchedInput {
                what,
                expected,
                got: norms.len(),
            });
        }
        for &v in norms {
            Self::check(what, v, v > 0.0, "normalization factors must be positive")?;
        }
        Ok(())
    }

    /// Validate the worker count.
    pub fn validate_workers(workers: usize) -> Result<(), LwprError> {
        if workers == 0 {
            return Err(LwprError::InvalidParameter {
                name: "workers",
                value: 0.0,
                reason: "at least one worker is required",
            });
        }
        Ok(())
    }

    /// Validate a complete configuration for the given dimensionality.
    ///
    /// Returns the factored metric template on success.
    pub fn validate_config(
        config: &LwprConfig,
        n_in: usize,
        n_out: usize,
    ) -> Result<MetricTemplate, LwprError> {
        Self::validate_dimensions(n_in, n_out)?;
        Self::validate_workers(config.workers)?;
        if config.max_fields == Some(0) {
            return Err(LwprError::InvalidParameter {
                name: "max_fields",
                value: 0.0,
                reason: "must allow at least one field",
            });
        }

        Self::validate_thresholds(config.w_gen, config.w_prune)?;
        Self::validate_lambda("init_lambda", config.init_lambda)?;
        Self::validate_lambda("final_lambda", config.final_lambda)?;
        Self::check(
            "tau_lambda",
            config.tau_lambda,
            (0.0..1.0).contains(&config.tau_lambda),
            "must be in [0, 1)",
        )?;
        Self::check(
            "penalty",
            config.penalty,
            config.penalty >= 0.0,
            "must be non-negative",
        )?;
        Self::check(
            "meta_rate",
            config.meta_rate,
            config.meta_rate > 0.0,
            "must be positive",
        )?;
        Self::check(
            "init_alpha",
            config.init_alpha,
            config.init_alpha > 0.0,
            "must be positive",
        )?;
        Self::check("init_s2", config.init_s2, config.init_s2 > 0.0, "must be positive")?;
        Self::check(
            "add_threshold",
            config.add_threshold,
            config.add_threshold > 0.0,
            "must be positive",
        )?;

        Self::validate_norms(&config.norm_in, n_in, "norm_in")?;
        Self::validate_norms(&config.norm_out, n_out, "norm_out")?;

        config.metric_template(n_in)
    }

    /// Validate that no parameters were set multiple times in the builder.
    pub fn validate_no_duplicates(duplicate_param: Option<&'static str>) -> Result<(), LwprError> {
        if let Some(param) = duplicate_param {
            return Err(LwprError::DuplicateParameter { parameter: param });
        }
        Ok(())
    }
}

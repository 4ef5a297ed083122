//! Error types for LWPR operations.
//!
//! ## Purpose
//!
//! This module defines the single error type returned by every fallible
//! operation at the API boundary: configuration, input validation, and
//! worker-pool construction.
//!
//! ## Design notes
//!
//! * **Boundary-only**: The numeric core never returns errors. Degenerate
//!   numerics are damped internally and allocation failure during growth is
//!   reported through `UpdateOutput::ok`, so `LwprError` only describes caller
//!   mistakes and environment failures.
//! * **Descriptive**: Variants carry the offending values so messages can be
//!   shown directly to users.
//!
//! ## Non-goals
//!
//! * This module does not perform validation itself (handled by `validator`).

// External dependencies
use thiserror::Error;

/// Errors reported by LWPR configuration and API calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LwprError {
    /// Input or output dimensionality is zero.
    #[error("Invalid dimensions: n_in={n_in}, n_out={n_out} (both must be at least 1)")]
    InvalidDimensions {
        /// Requested input dimensionality.
        n_in: usize,
        /// Requested output dimensionality.
        n_out: usize,
    },

    /// A vector argument does not match the model's dimensionality.
    #[error("Length mismatch for {what}: expected {expected}, got {got}")]
    MismatchedInput {
        /// Which argument was mismatched.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// A non-finite value was passed where a finite one is required.
    #[error("Invalid numeric value: {0}")]
    InvalidNumericValue(String),

    /// A configuration parameter is outside its valid range.
    #[error("Invalid parameter {name}: {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Human-readable constraint.
        reason: &'static str,
    },

    /// The initial distance metric is malformed or not positive definite.
    #[error("Invalid initial metric: {0}")]
    InvalidMetric(String),

    /// Storage for a field or projection direction could not be grown.
    #[error("Allocation failed while growing {0}")]
    AllocationFailed(&'static str),

    /// A builder parameter was set more than once.
    #[error("Parameter '{parameter}' was set multiple times")]
    DuplicateParameter {
        /// Name of the duplicated parameter.
        parameter: &'static str,
    },

    /// The worker pool could not be created.
    #[error("Worker pool error: {0}")]
    ThreadPool(String),
}

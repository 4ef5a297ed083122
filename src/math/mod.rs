//! Layer 2: Math
//!
//! # Purpose
//!
//! Pure mathematical building blocks used by the receptive-field algorithms:
//! - Kernel functions mapping a squared distance to an activation
//! - Dense vector kernels (dot products, Mahalanobis distance)
//! - Distance-metric construction and maintenance
//!
//! Nothing in this layer knows about fields, sub-models or workers.
//!
//! # Architecture
//!
//! ```text
//! Layer 5: API
//!   ↓
//! Layer 4: Engine
//!   ↓
//! Layer 3: Algorithms
//!   ↓
//! Layer 2: Math ← You are here
//!   ↓
//! Layer 1: Primitives
//! ```

/// Kernel (activation) functions.
pub mod kernel;

/// Distance-metric templates and `D = MᵀM` maintenance.
pub mod metric;

/// Slice-level vector kernels.
pub mod vector;

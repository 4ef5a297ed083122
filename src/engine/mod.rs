//! Layer 4: Engine
//!
//! # Purpose
//!
//! Orchestration of the receptive-field algorithms across output dimensions
//! and worker threads:
//! - Configuration and its validation
//! - Per-worker scratch space and the persistent worker pool
//! - Update and predict engines
//! - The `Lwpr` model tying them together
//!
//! # Architecture
//!
//! ```text
//! Layer 5: API
//!   ↓
//! Layer 4: Engine ← You are here
//!   ↓
//! Layer 3: Algorithms
//!   ↓
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives
//! ```

/// Model configuration.
pub mod config;

/// Worker pool and lane dispatch.
pub mod dispatcher;

/// The model.
pub mod model;

/// Blended prediction and derivatives.
pub mod predict;

/// Single-sample training.
pub mod update;

/// Validation of configuration and inputs.
pub mod validator;

/// Per-worker scratch buffers.
pub mod workspace;

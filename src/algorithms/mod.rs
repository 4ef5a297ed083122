//! Layer 3: Algorithms
//!
//! # Purpose
//!
//! The learning rules of a single receptive field and of one sub-model:
//! - Receptive-field state and its read-only projections
//! - Online PLS regression
//! - Distance-metric adaptation
//! - Direction growth, field creation and pruning
//!
//! Orchestration across fields, dimensions and workers lives in the engine.
//!
//! # Architecture
//!
//! ```text
//! Layer 5: API
//!   ↓
//! Layer 4: Engine
//!   ↓
//! Layer 3: Algorithms ← You are here
//!   ↓
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives
//! ```

/// Receptive-field state.
pub mod field;

/// Add/prune lifecycle and sub-models.
pub mod lifecycle;

/// Distance-metric gradient updates.
pub mod metric_update;

/// Online partial least squares.
pub mod pls;

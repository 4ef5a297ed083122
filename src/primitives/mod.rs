//! Layer 1: Primitives
//!
//! # Purpose
//!
//! Fundamental data structures shared by every other layer: the error type,
//! reusable scratch vectors, and strided column storage for PLS directions.
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
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives ← You are here
//! ```

/// Reusable scratch vectors.
pub mod buffer;

/// Strided column storage with fallible growth.
pub mod columns;

/// Error types.
pub mod errors;

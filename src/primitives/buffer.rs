//! Reusable scratch vectors for the update and predict hot paths.
//!
//! ## Purpose
//!
//! This module provides `Slot`, a thin wrapper over `Vec` used for every
//! per-worker scratch buffer. Buffers are sized once for the model's input
//! dimensionality and then only logically resized, so steady-state training
//! performs no heap allocation.
//!
//! ## Design notes
//!
//! * **Lazy Expansion**: `reset` grows on demand but never shrinks.
//! * **Zero-fill resize**: `reset` sets the logical length and zeroes the
//!   contents in one pass, which is what every caller wants before
//!   accumulating into a buffer.
//!
//! ## Invariants
//!
//! * Capacity is monotonically increasing.
//!
//! ## Non-goals
//!
//! * Thread-local caching (buffers are passed explicitly, one set per worker).

// External dependencies
use core::ops::{Deref, DerefMut};

// ============================================================================
// Slot - Unified Vector Abstraction
// ============================================================================

/// A reusable vector slot with automatic capacity management.
#[derive(Debug, Clone)]
pub struct Slot<T>(Vec<T>);

impl<T> Slot<T> {
    /// Create a new slot with the given initial capacity.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }
}

impl<T: Copy + Default> Slot<T> {
    /// Set the logical length to `len` and fill every element with the default value.
    #[inline]
    pub fn reset(&mut self, len: usize) {
        self.0.clear();
        self.0.resize(len, T::default());
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Deref for Slot<T> {
    type Target = Vec<T>;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Slot<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

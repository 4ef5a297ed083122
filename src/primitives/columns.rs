//! Strided column storage for per-direction PLS vectors.
//!
//! ## Purpose
//!
//! A receptive field keeps four families of `n_in`-long vectors that are
//! indexed by PLS direction (`U`, `P`, `SXresYres`, `SSXres`). `ColumnStore`
//! packs one family into a single contiguous buffer with an explicit row
//! stride, exposes bounds-checked column views, and grows by whole columns.
//!
//! ## Design notes
//!
//! * **Column-major**: Column `j` occupies `data[j * rows .. (j + 1) * rows]`.
//! * **Fallible growth**: `push_zero_column` reserves space with `try_reserve_exact`
//!   in fixed increments; on failure the store is left exactly as it was.
//!
//! ## Invariants
//!
//! * `data.len() == rows * cols`.
//! * `capacity_cols() >= cols`.

// External dependencies
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Internal dependencies
use crate::primitives::errors::LwprError;

/// Contiguous column-major storage with a fixed number of rows.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColumnStore<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Float> ColumnStore<T> {
    /// Create a zero-filled store with `cols` columns and room for `capacity_cols`.
    pub fn zeros(rows: usize, cols: usize, capacity_cols: usize) -> Self {
        let mut data = Vec::with_capacity(rows * capacity_cols.max(cols));
        data.resize(rows * cols, T::zero());
        Self { rows, cols, data }
    }

    /// Number of live columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of columns that fit without reallocating.
    #[inline]
    pub fn capacity_cols(&self) -> usize {
        if self.rows == 0 {
            self.cols
        } else {
            self.data.capacity() / self.rows
        }
    }

    /// Shared view of column `j`.
    #[inline]
    pub fn col(&self, j: usize) -> &[T] {
        assert!(j < self.cols, "column {j} out of range ({} columns)", self.cols);
        &self.data[j * self.rows..(j + 1) * self.rows]
    }

    /// Mutable view of column `j`.
    #[inline]
    pub fn col_mut(&mut self, j: usize) -> &mut [T] {
        assert!(j < self.cols, "column {j} out of range ({} columns)", self.cols);
        &mut self.data[j * self.rows..(j + 1) * self.rows]
    }

    /// Reserve room for `additional` more columns, failing without side effects.
    pub fn try_reserve_cols(&mut self, additional: usize) -> Result<(), LwprError> {
        let needed = (self.cols + additional) * self.rows;
        if needed <= self.data.capacity() {
            return Ok(());
        }
        self.data
            .try_reserve_exact(needed - self.data.len())
            .map_err(|_| LwprError::AllocationFailed("projection storage"))
    }

    /// Append a zero column, growing storage by `grow_step` columns when full.
    ///
    /// On error the store is unchanged.
    pub fn push_zero_column(&mut self, grow_step: usize) -> Result<(), LwprError> {
        if self.cols == self.capacity_cols() {
            self.try_reserve_cols(grow_step.max(1))?;
        }
        self.data.resize((self.cols + 1) * self.rows, T::zero());
        self.cols += 1;
        Ok(())
    }
}

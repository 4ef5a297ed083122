//! Kernel functions for receptive-field activation.
//!
//! ## Purpose
//!
//! This module maps a squared Mahalanobis distance `dist = (x - c)ᵀ D (x - c)`
//! to an activation weight in `[0, 1]`, together with the first and second
//! derivatives of the weight with respect to `dist`. The derivatives feed the
//! distance-metric gradient and the gradient/Hessian of predictions.
//!
//! ## Design notes
//!
//! * **Closed set**: Two kernels, selected once per model and matched on
//!   without any per-sample table lookup.
//! * **Generics**: Generic over `Float` types.
//!
//! ## Key concepts
//!
//! * **Gaussian**: `w = exp(-dist / 2)`; infinite support.
//! * **BiSquare**: `w = (1 - dist / 4)²` inside `dist < 4`, zero outside.
//!
//! ## Invariants
//!
//! * Weights are in `[0, 1]` for `dist >= 0`.
//! * Activation is exactly 1 at the center.
//!
//! ## Non-goals
//!
//! * This module does not compute distances (see `math::vector`).

// External dependencies
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kernel used to turn a squared distance into an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Kernel {
    /// Gaussian kernel `exp(-0.5 * dist)`.
    #[default]
    Gaussian,

    /// Bisquare kernel `(1 - 0.25 * dist)²`, compact support.
    BiSquare,
}

/// Activation together with its derivatives with respect to the squared distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Activation<T> {
    /// Kernel weight.
    pub w: T,
    /// First derivative `dw / d(dist)`.
    pub dw: T,
    /// Second derivative `d²w / d(dist)²`.
    pub ddw: T,
}

impl Kernel {
    /// Kernel weight with first and second derivatives.
    #[inline]
    pub fn activation<T: Float>(&self, dist: T) -> Activation<T> {
        match self {
            Kernel::Gaussian => {
                let w = (-Self::c::<T>(0.5) * dist).exp();
                Activation {
                    w,
                    dw: -Self::c::<T>(0.5) * w,
                    ddw: Self::c::<T>(0.25) * w,
                }
            }
            Kernel::BiSquare => {
                let q = T::one() - Self::c::<T>(0.25) * dist;
                if q < T::zero() {
                    Activation {
                        w: T::zero(),
                        dw: T::zero(),
                        ddw: T::zero(),
                    }
                } else {
                    Activation {
                        w: q * q,
                        dw: -Self::c::<T>(0.5) * q,
                        ddw: Self::c::<T>(0.125),
                    }
                }
            }
        }
    }

    #[inline(always)]
    fn c<T: Float>(v: f64) -> T {
        T::from(v).unwrap_or_else(T::zero)
    }
}

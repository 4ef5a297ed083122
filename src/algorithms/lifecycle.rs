//! Receptive-field lifecycle: growing directions, adding and pruning fields.
//!
//! ## Purpose
//!
//! This module owns the structural changes of a sub-model. It decides when a
//! field gains a PLS direction, when a sample is novel enough to spawn a new
//! field, and when two fields overlap so much that one of them is removed.
//!
//! ## Design notes
//!
//! * **Fallible growth**: Fields and directions are reserved with
//!   `try_reserve` before anything is pushed; failures leave the sub-model as
//!   it was and are reported to the caller.
//! * **Deterministic ranking**: Activations are ranked by weight and, on ties,
//!   by the lower field index, so merging per-worker rankings in any grouping
//!   yields the same result as a sequential scan.
//!
//! ## Key concepts
//!
//! * **Add**: No field reaches `w_gen`; the new field copies the metric of the
//!   most active field when that field is trustworthy and reasonably close.
//! * **Prune**: The second-highest activation exceeds `w_prune`; of the top
//!   two, the field with the smaller `trace(D)` (the wider one) is removed.
//!
//! ## Non-goals
//!
//! * This module does not compute activations (see `engine::update`).

// External dependencies
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Internal dependencies
use crate::algorithms::field::{FieldInit, ReceptiveField};
use crate::math::metric::MetricTemplate;
use crate::primitives::errors::LwprError;

// ============================================================================
// Sub-model
// ============================================================================

/// The receptive fields that model one output dimension.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubModel {
    pub(crate) fields: Vec<ReceptiveField>,
    pub(crate) n_pruned: usize,
}

impl SubModel {
    /// Empty sub-model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receptive fields in storage order.
    pub fn fields(&self) -> &[ReceptiveField] {
        &self.fields
    }

    /// Number of receptive fields.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Number of fields removed by pruning so far.
    pub fn n_pruned(&self) -> usize {
        self.n_pruned
    }
}

// ============================================================================
// Activation ranking
// ============================================================================

/// Highest and second-highest activation seen, with their field indices.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TopTwo {
    /// Highest activation and its field.
    pub first: Option<(f64, usize)>,
    /// Second-highest activation and its field.
    pub second: Option<(f64, usize)>,
}

impl TopTwo {
    #[inline]
    fn outranks(w: f64, idx: usize, other: Option<(f64, usize)>) -> bool {
        match other {
            None => true,
            Some((ow, oi)) => w > ow || (w == ow && idx < oi),
        }
    }

    /// Offer the activation `w` of field `idx`.
    #[inline]
    pub fn offer(&mut self, w: f64, idx: usize) {
        if Self::outranks(w, idx, self.first) {
            self.second = self.first;
            self.first = Some((w, idx));
        } else if Self::outranks(w, idx, self.second) {
            self.second = Some((w, idx));
        }
    }

    /// Merge another ranking into this one.
    pub fn merge(&mut self, other: &TopTwo) {
        if let Some((w, i)) = other.first {
            self.offer(w, i);
        }
        if let Some((w, i)) = other.second {
            self.offer(w, i);
        }
    }

    /// Highest activation, or 0 when no field was offered.
    #[inline]
    pub fn max_weight(&self) -> f64 {
        self.first.map_or(0.0, |(w, _)| w)
    }

    /// Second-highest activation, or 0.
    #[inline]
    pub fn second_weight(&self) -> f64 {
        self.second.map_or(0.0, |(w, _)| w)
    }
}

// ============================================================================
// Direction growth
// ============================================================================

/// Outcome of checking a field for an additional PLS direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionCheck {
    /// No direction was added.
    Unchanged,
    /// A direction was appended.
    Added,
    /// A direction was warranted but storage could not be grown.
    AllocationFailed,
}

/// Append a PLS direction if the newest one still explains enough error.
pub fn check_add_projection(
    rf: &mut ReceptiveField,
    add_threshold: f64,
    init: FieldInit,
) -> ProjectionCheck {
    if rf.n_reg >= rf.n_in || rf.n_reg < 2 {
        return ProjectionCheck::Unchanged;
    }
    let last = rf.n_reg - 1;
    let n_last = rf.n_data[last];
    if n_last <= 0.99 * rf.n_data[0] || n_last * (1.0 - rf.lambda[last]) <= 0.5 {
        return ProjectionCheck::Unchanged;
    }

    let mse = |j: usize| rf.sum_e_cv2[j] / rf.sum_w[j].max(f64::EPSILON) + 1e-10;
    if mse(last) >= add_threshold * mse(last - 1) {
        return ProjectionCheck::Unchanged;
    }

    match rf.try_add_direction(init) {
        Ok(()) => ProjectionCheck::Added,
        Err(err) => {
            warn!(n_reg = rf.n_reg, %err, "could not grow projection storage");
            ProjectionCheck::AllocationFailed
        }
    }
}

// ============================================================================
// Field creation and pruning
// ============================================================================

/// Knobs governing structural changes of a sub-model.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleParams<'a> {
    /// Activation below which a new field is created.
    pub w_gen: f64,
    /// Second-highest activation above which a field is pruned.
    pub w_prune: f64,
    /// Maximum number of fields per sub-model.
    pub max_fields: Option<usize>,
    /// Metric for fields created without a seed.
    pub template: &'a MetricTemplate,
    /// Per-direction initial values.
    pub init: FieldInit,
}

/// Structural change applied by `maybe_add_or_prune`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Nothing changed.
    None,
    /// A field was created at the given index.
    Added(usize),
    /// The field at the given index was swap-removed.
    Pruned(usize),
}

/// Create a field centered at `x`.
///
/// With a seed, the new field inherits the seed's metric, learning rates and
/// bias; otherwise it uses the template and bias `y`.
pub fn add_field(
    sub: &mut SubModel,
    seed: Option<usize>,
    x: &[f64],
    y: f64,
    params: &LifecycleParams<'_>,
) -> Result<usize, LwprError> {
    if params.max_fields.is_some_and(|cap| sub.fields.len() >= cap) {
        return Err(LwprError::AllocationFailed("receptive field budget"));
    }
    sub.fields
        .try_reserve(1)
        .map_err(|_| LwprError::AllocationFailed("receptive fields"))?;

    let rf = match seed.and_then(|i| sub.fields.get(i)) {
        Some(src) => ReceptiveField::new(
            x,
            src.beta0,
            src.d.clone(),
            src.m.clone(),
            src.alpha.clone(),
            params.init,
        ),
        None => ReceptiveField::new(
            x,
            y,
            params.template.d.clone(),
            params.template.m.clone(),
            params.template.alpha.clone(),
            params.init,
        ),
    };
    sub.fields.push(rf);
    Ok(sub.fields.len() - 1)
}

/// Add a field for a novel sample or prune one of two overlapping fields.
pub fn maybe_add_or_prune(
    sub: &mut SubModel,
    top: &TopTwo,
    x: &[f64],
    y: f64,
    params: &LifecycleParams<'_>,
) -> Result<LifecycleEvent, LwprError> {
    let w_max = top.max_weight();
    if w_max <= params.w_gen {
        let seed = top
            .first
            .filter(|&(w, i)| w > 0.1 * params.w_gen && sub.fields[i].trustworthy)
            .map(|(_, i)| i);
        let idx = add_field(sub, seed, x, y, params)?;
        debug!(field = idx, seeded = seed.is_some(), w_max, "receptive field added");
        return Ok(LifecycleEvent::Added(idx));
    }

    if top.second_weight() > params.w_prune {
        if let (Some((_, i)), Some((_, j))) = (top.first, top.second) {
            let victim = if sub.fields[i].trace() < sub.fields[j].trace() {
                i
            } else {
                j
            };
            sub.fields.swap_remove(victim);
            sub.n_pruned += 1;
            debug!(
                field = victim,
                remaining = sub.fields.len(),
                n_pruned = sub.n_pruned,
                "receptive field pruned"
            );
            return Ok(LifecycleEvent::Pruned(victim));
        }
    }

    Ok(LifecycleEvent::None)
}

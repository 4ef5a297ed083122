//! Training on a single sample.
//!
//! ## Purpose
//!
//! This module runs one update of one output dimension: it activates every
//! receptive field, trains the active ones, blends the predictions of the
//! trustworthy ones and finally lets the lifecycle add or prune a field.
//!
//! ## Design notes
//!
//! * **Striped lanes**: Field `i` is handled by lane `i % workers`, which
//!   spreads fields created at different times evenly across workers.
//! * **Ordered reduction**: Lane results are merged in lane order; activation
//!   rankings break ties by field index, so the lifecycle decision does not
//!   depend on the number of workers.
//! * **Per-field order**: activation, means, regression, blended
//!   contribution, counts and forgetting, metric, direction growth.
//!
//! ## Invariants
//!
//! * A field is mutated by at most one lane per call.
//! * Fields below the activation floor are left untouched except for their
//!   recorded activation, which is set to zero.
//! * A field whose regression rejects the sample (non-finite statistics) is
//!   restored to its state before the sample and treated like one below the
//!   floor. A field that is not yet trustworthy restarts from the sample's
//!   target instead, so an extreme early sample cannot strand it.

// External dependencies
use tracing::{debug, warn};

// Internal dependencies
use crate::algorithms::field::ReceptiveField;
use crate::algorithms::lifecycle::{
    check_add_projection, maybe_add_or_prune, LifecycleParams, ProjectionCheck, SubModel, TopTwo,
};
use crate::algorithms::metric_update::{update_metric, MetricSample};
use crate::algorithms::pls::update_regression;
use crate::engine::config::LwprConfig;
use crate::engine::dispatcher::Dispatcher;
use crate::engine::workspace::Workspace;
use crate::math::metric::MetricTemplate;

/// Activation below which a field is not trained on a sample.
pub const ACTIVATION_FLOOR: f64 = 0.001;

/// Result of updating one output dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionUpdate {
    /// Blended prediction in normalized units (0 without trustworthy fields).
    pub prediction: f64,
    /// Highest activation of any field before the lifecycle step.
    pub max_activation: f64,
    /// `false` when a field or direction could not be allocated.
    pub ok: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct LaneResult {
    sum_wy: f64,
    sum_w: f64,
    top: TopTwo,
    alloc_failed: bool,
    rejected: usize,
}

/// Train every field of `sub` on the normalized sample `(x, y)`.
pub fn update_dimension(
    sub: &mut SubModel,
    dispatcher: &Dispatcher,
    config: &LwprConfig,
    template: &MetricTemplate,
    x: &[f64],
    y: f64,
    dim: usize,
) -> DimensionUpdate {
    let workers = dispatcher.workers().min(sub.fields.len()).max(1);
    let mut lanes: Vec<Vec<(usize, &mut ReceptiveField)>> =
        (0..workers).map(|_| Vec::new()).collect();
    for (i, rf) in sub.fields.iter_mut().enumerate() {
        lanes[i % workers].push((i, rf));
    }

    let results = dispatcher.run(lanes, |lane, ws| {
        let mut out = LaneResult::default();
        for (i, rf) in lane {
            train_field(rf, i, ws, config, x, y, dim, &mut out);
        }
        out
    });

    let mut total = LaneResult::default();
    for lane in &results {
        total.sum_wy += lane.sum_wy;
        total.sum_w += lane.sum_w;
        total.top.merge(&lane.top);
        total.alloc_failed |= lane.alloc_failed;
        total.rejected += lane.rejected;
    }
    if total.rejected > 0 {
        warn!(dim, fields = total.rejected, "sample rejected by fields with non-finite statistics");
    }

    let params = LifecycleParams {
        w_gen: config.w_gen,
        w_prune: config.w_prune,
        max_fields: config.max_fields,
        template,
        init: config.field_init(),
    };
    let mut ok = !total.alloc_failed;
    if let Err(err) = maybe_add_or_prune(sub, &total.top, x, y, &params) {
        warn!(dim, fields = sub.fields.len(), %err, "could not add receptive field");
        ok = false;
    }

    let prediction = if total.sum_w > 0.0 {
        total.sum_wy / total.sum_w
    } else {
        0.0
    };

    DimensionUpdate {
        prediction,
        max_activation: total.top.max_weight(),
        ok,
    }
}

#[allow(clippy::too_many_arguments)]
fn train_field(
    rf: &mut ReceptiveField,
    index: usize,
    ws: &mut Workspace,
    config: &LwprConfig,
    x: &[f64],
    y: f64,
    dim: usize,
    out: &mut LaneResult,
) {
    ws.prepare(x.len());
    let act = rf.activate(config.kernel, x, &mut ws.dx, &mut ws.d_dx);
    out.top.offer(act.w, index);

    if act.w <= ACTIVATION_FLOOR {
        rf.w = 0.0;
        return;
    }
    let w = act.w;
    rf.w = w;

    rf.save_means(&mut ws.means);
    rf.update_means(x, y, w);
    let Some(reg) = update_regression(rf, &mut ws.pls, x, y, w) else {
        rf.restore_means(&ws.means);
        if !rf.trustworthy {
            rf.restart(y, config.field_init());
        }
        rf.w = 0.0;
        out.rejected += 1;
        return;
    };
    if rf.trustworthy {
        out.sum_wy += w * reg.yp;
        out.sum_w += w;
    }
    rf.advance_counts(w, config.tau_lambda, config.final_lambda);

    if config.update_d {
        let sample = MetricSample {
            w,
            dw: act.dw,
            ddw: act.ddw,
            e_cv: reg.e_cv,
            e: reg.e,
        };
        update_metric(
            rf,
            &mut ws.metric,
            &config.metric_params(),
            x,
            &ws.pls.s,
            &sample,
        );
    }

    match check_add_projection(rf, config.add_threshold, config.field_init()) {
        ProjectionCheck::Added => {
            debug!(dim, field = index, n_reg = rf.n_reg, "projection direction added");
        }
        ProjectionCheck::AllocationFailed => out.alloc_failed = true,
        ProjectionCheck::Unchanged => {}
    }
}

#![cfg(feature = "dev")]

use approx::assert_relative_eq;
use lwpr_rs::internals::algorithms::field::{FieldInit, ReceptiveField};
use lwpr_rs::internals::algorithms::lifecycle::{
    add_field, check_add_projection, maybe_add_or_prune, LifecycleEvent, LifecycleParams,
    ProjectionCheck, SubModel, TopTwo,
};
use lwpr_rs::internals::math::metric::{InitialMetric, MetricTemplate};
use lwpr_rs::internals::primitives::errors::LwprError;

const INIT: FieldInit = FieldInit {
    init_lambda: 0.999,
    init_s2: 1e-10,
};

fn template(d: f64, n_in: usize) -> MetricTemplate {
    MetricTemplate::build(&InitialMetric::Spherical(d), n_in, true, 50.0).unwrap()
}

fn params(template: &MetricTemplate) -> LifecycleParams<'_> {
    LifecycleParams {
        w_gen: 0.1,
        w_prune: 0.5,
        max_fields: None,
        template,
        init: INIT,
    }
}

// ============================================================================
// Ranking Tests
// ============================================================================

#[test]
fn test_top_two_ordering() {
    let mut top = TopTwo::default();
    assert_eq!(top.max_weight(), 0.0);
    assert_eq!(top.second_weight(), 0.0);

    top.offer(0.3, 0);
    top.offer(0.7, 1);
    top.offer(0.5, 2);
    top.offer(0.1, 3);
    assert_eq!(top.first, Some((0.7, 1)));
    assert_eq!(top.second, Some((0.5, 2)));
}

#[test]
fn test_top_two_ties_prefer_lower_index() {
    let mut top = TopTwo::default();
    top.offer(0.5, 3);
    top.offer(0.5, 1);
    top.offer(0.5, 2);
    assert_eq!(top.first, Some((0.5, 1)));
    assert_eq!(top.second, Some((0.5, 2)));
}

#[test]
fn test_top_two_merge_matches_sequential_scan() {
    let weights = [0.2, 0.9, 0.4, 0.9, 0.05, 0.6, 0.4];

    let mut sequential = TopTwo::default();
    for (i, &w) in weights.iter().enumerate() {
        sequential.offer(w, i);
    }

    for lanes in 1..=4 {
        let mut parts = vec![TopTwo::default(); lanes];
        for (i, &w) in weights.iter().enumerate() {
            parts[i % lanes].offer(w, i);
        }
        let mut merged = TopTwo::default();
        for part in &parts {
            merged.merge(part);
        }
        assert_eq!(merged, sequential, "lanes = {lanes}");
    }
    assert_eq!(sequential.first, Some((0.9, 1)));
    assert_eq!(sequential.second, Some((0.9, 3)));
}

// ============================================================================
// Field Creation Tests
// ============================================================================

#[test]
fn test_add_field_from_template() {
    let t = template(9.0, 1);
    let mut sub = SubModel::new();
    let idx = add_field(&mut sub, None, &[0.5], 2.0, &params(&t)).unwrap();
    assert_eq!(idx, 0);
    assert_eq!(sub.num_fields(), 1);

    let rf = &sub.fields()[0];
    assert_eq!(rf.center(), &[0.5]);
    assert_eq!(rf.beta0(), 2.0);
    assert_eq!(rf.metric(), &t.d);
    assert_eq!(rf.learning_rates(), &t.alpha);
}

#[test]
fn test_add_field_from_seed_copies_metric() {
    let seed_template = template(4.0, 1);
    let other = template(16.0, 1);
    let mut sub = SubModel::new();
    add_field(&mut sub, None, &[0.0], 1.0, &params(&seed_template)).unwrap();

    let idx = add_field(&mut sub, Some(0), &[0.3], 7.0, &params(&other)).unwrap();
    assert_eq!(idx, 1);
    let rf = &sub.fields()[1];
    assert_eq!(rf.center(), &[0.3]);
    assert_eq!(rf.metric(), &seed_template.d);
    assert_eq!(rf.cholesky_factor(), &seed_template.m);
    // The bias is inherited from the seed.
    assert_eq!(rf.beta0(), 1.0);
}

#[test]
fn test_add_field_respects_budget() {
    let t = template(4.0, 2);
    let mut p = params(&t);
    p.max_fields = Some(2);

    let mut sub = SubModel::new();
    add_field(&mut sub, None, &[0.0, 0.0], 0.0, &p).unwrap();
    add_field(&mut sub, None, &[1.0, 0.0], 0.0, &p).unwrap();
    let err = add_field(&mut sub, None, &[2.0, 0.0], 0.0, &p).unwrap_err();
    assert!(matches!(err, LwprError::AllocationFailed(_)));
    assert_eq!(sub.num_fields(), 2);
}

// ============================================================================
// Add / Prune Decision Tests
// ============================================================================

#[test]
fn test_novel_sample_adds_field() {
    let t = template(4.0, 1);
    let mut sub = SubModel::new();
    let event = maybe_add_or_prune(&mut sub, &TopTwo::default(), &[0.0], 3.0, &params(&t)).unwrap();
    assert_eq!(event, LifecycleEvent::Added(0));
    assert_eq!(sub.fields()[0].beta0(), 3.0);
}

#[test]
fn test_untrusted_neighbor_is_not_a_seed() {
    let seed_template = template(4.0, 1);
    let other = template(16.0, 1);
    let mut sub = SubModel::new();
    add_field(&mut sub, None, &[0.0], 1.0, &params(&seed_template)).unwrap();

    let mut top = TopTwo::default();
    top.offer(0.05, 0);
    let event = maybe_add_or_prune(&mut sub, &top, &[2.0], 5.0, &params(&other)).unwrap();
    assert_eq!(event, LifecycleEvent::Added(1));
    assert_eq!(sub.fields()[1].metric(), &other.d);
    assert_eq!(sub.fields()[1].beta0(), 5.0);
}

#[test]
fn test_active_sample_changes_nothing() {
    let t = template(4.0, 1);
    let mut sub = SubModel::new();
    add_field(&mut sub, None, &[0.0], 0.0, &params(&t)).unwrap();
    add_field(&mut sub, None, &[1.0], 0.0, &params(&t)).unwrap();

    let mut top = TopTwo::default();
    top.offer(0.8, 0);
    top.offer(0.3, 1);
    let event = maybe_add_or_prune(&mut sub, &top, &[0.1], 0.0, &params(&t)).unwrap();
    assert_eq!(event, LifecycleEvent::None);
    assert_eq!(sub.num_fields(), 2);
    assert_eq!(sub.n_pruned(), 0);
}

#[test]
fn test_prune_removes_wider_field() {
    let narrow = template(9.0, 1);
    let wide = template(4.0, 1);
    let mut sub = SubModel::new();
    add_field(&mut sub, None, &[0.0], 0.0, &params(&wide)).unwrap();
    add_field(&mut sub, None, &[0.1], 0.0, &params(&narrow)).unwrap();
    add_field(&mut sub, None, &[3.0], 0.0, &params(&narrow)).unwrap();

    let mut top = TopTwo::default();
    top.offer(0.9, 1);
    top.offer(0.8, 0);
    let event = maybe_add_or_prune(&mut sub, &top, &[0.05], 0.0, &params(&narrow)).unwrap();

    assert_eq!(event, LifecycleEvent::Pruned(0));
    assert_eq!(sub.num_fields(), 2);
    assert_eq!(sub.n_pruned(), 1);
    // The last field was swapped into the freed slot.
    assert_eq!(sub.fields()[0].center(), &[3.0]);
    for rf in sub.fields() {
        assert_relative_eq!(rf.trace(), 9.0, epsilon = 1e-12);
    }
}

#[test]
fn test_prune_tie_removes_second() {
    let t = template(4.0, 1);
    let mut sub = SubModel::new();
    add_field(&mut sub, None, &[0.0], 0.0, &params(&t)).unwrap();
    add_field(&mut sub, None, &[0.1], 0.0, &params(&t)).unwrap();

    let mut top = TopTwo::default();
    top.offer(0.9, 0);
    top.offer(0.7, 1);
    let event = maybe_add_or_prune(&mut sub, &top, &[0.05], 0.0, &params(&t)).unwrap();
    assert_eq!(event, LifecycleEvent::Pruned(1));
    assert_eq!(sub.fields()[0].center(), &[0.0]);
}

#[test]
fn test_budget_failure_reported() {
    let t = template(4.0, 1);
    let mut p = params(&t);
    p.max_fields = Some(1);
    let mut sub = SubModel::new();
    add_field(&mut sub, None, &[0.0], 0.0, &p).unwrap();

    let result = maybe_add_or_prune(&mut sub, &TopTwo::default(), &[5.0], 0.0, &p);
    assert!(matches!(result, Err(LwprError::AllocationFailed(_))));
    assert_eq!(sub.num_fields(), 1);
}

// ============================================================================
// Direction Growth Tests
// ============================================================================

#[test]
fn test_projection_check_requires_room_and_data() {
    let t2 = template(4.0, 2);
    let mut full = ReceptiveField::new(&[0.0, 0.0], 0.0, t2.d.clone(), t2.m.clone(), t2.alpha.clone(), INIT);
    assert_eq!(check_add_projection(&mut full, 0.5, INIT), ProjectionCheck::Unchanged);
    assert_eq!(full.n_reg(), 2);

    let t3 = template(4.0, 3);
    let mut fresh = ReceptiveField::new(&[0.0; 3], 0.0, t3.d.clone(), t3.m.clone(), t3.alpha.clone(), INIT);
    assert_eq!(check_add_projection(&mut fresh, 0.5, INIT), ProjectionCheck::Unchanged);
    assert_eq!(fresh.n_reg(), 2);
}

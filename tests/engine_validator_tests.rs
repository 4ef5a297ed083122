#![cfg(feature = "dev")]

use lwpr_rs::internals::engine::validator::Validator;
use lwpr_rs::prelude::*;

fn invalid_parameter(result: Result<impl std::fmt::Debug, LwprError>) -> &'static str {
    match result {
        Err(LwprError::InvalidParameter { name, .. }) => name,
        other => panic!("expected InvalidParameter, got {other:?}"),
    }
}

// ============================================================================
// Input Validation Tests
// ============================================================================

#[test]
fn test_validate_dimensions() {
    assert!(Validator::validate_dimensions(1, 1).is_ok());
    assert_eq!(
        Validator::validate_dimensions(0, 1),
        Err(LwprError::InvalidDimensions { n_in: 0, n_out: 1 })
    );
    assert_eq!(
        Validator::validate_dimensions(2, 0),
        Err(LwprError::InvalidDimensions { n_in: 2, n_out: 0 })
    );
}

#[test]
fn test_validate_vector() {
    assert!(Validator::validate_vector(&[1.0, 2.0], 2, "x").is_ok());
    assert_eq!(
        Validator::validate_vector(&[1.0], 2, "x"),
        Err(LwprError::MismatchedInput {
            what: "x",
            expected: 2,
            got: 1
        })
    );
    assert!(matches!(
        Validator::validate_vector(&[1.0, f64::NAN], 2, "y"),
        Err(LwprError::InvalidNumericValue(_))
    ));
    assert!(matches!(
        Validator::validate_vector(&[f64::INFINITY], 1, "x"),
        Err(LwprError::InvalidNumericValue(_))
    ));
}

#[test]
fn test_validate_cutoff() {
    assert!(Validator::validate_cutoff(0.0).is_ok());
    assert!(Validator::validate_cutoff(0.5).is_ok());
    assert_eq!(invalid_parameter(Validator::validate_cutoff(-0.1)), "cutoff");
    assert_eq!(invalid_parameter(Validator::validate_cutoff(f64::NAN)), "cutoff");
}

#[test]
fn test_validate_lambda_and_thresholds() {
    assert!(Validator::validate_lambda("init_lambda", 0.999).is_ok());
    assert_eq!(invalid_parameter(Validator::validate_lambda("init_lambda", 1.0)), "init_lambda");
    assert_eq!(invalid_parameter(Validator::validate_lambda("final_lambda", 0.0)), "final_lambda");

    assert!(Validator::validate_thresholds(0.1, 1.0).is_ok());
    assert_eq!(invalid_parameter(Validator::validate_thresholds(0.0, 1.0)), "w_gen");
    assert_eq!(invalid_parameter(Validator::validate_thresholds(1.0, 2.0)), "w_gen");
    assert_eq!(invalid_parameter(Validator::validate_thresholds(0.3, 0.2)), "w_prune");
    assert_eq!(invalid_parameter(Validator::validate_thresholds(0.3, 0.3)), "w_prune");
}

#[test]
fn test_validate_norms_and_workers() {
    assert!(Validator::validate_norms(&[1.0, 2.0], 2, "norm_in").is_ok());
    assert!(matches!(
        Validator::validate_norms(&[1.0], 2, "norm_in"),
        Err(LwprError::MismatchedInput { .. })
    ));
    assert_eq!(invalid_parameter(Validator::validate_norms(&[1.0, 0.0], 2, "norm_out")), "norm_out");
    assert_eq!(invalid_parameter(Validator::validate_workers(0)), "workers");
    assert!(Validator::validate_workers(3).is_ok());
}

// ============================================================================
// Configuration Validation Tests
// ============================================================================

#[test]
fn test_default_config_is_valid() {
    let config = LwprConfig::new(3, 2);
    let template = Validator::validate_config(&config, 3, 2).unwrap();
    assert_eq!(template.d.shape(), (3, 3));
    assert_eq!(config.version(), 0);
}

#[test]
fn test_validate_config_rejects_each_range() {
    let cases: Vec<(&str, Box<dyn Fn(&mut LwprConfig)>)> = vec![
        ("tau_lambda", Box::new(|c| c.tau_lambda = 1.0)),
        ("penalty", Box::new(|c| c.penalty = -1.0)),
        ("meta_rate", Box::new(|c| c.meta_rate = 0.0)),
        ("init_alpha", Box::new(|c| c.init_alpha = -5.0)),
        ("init_s2", Box::new(|c| c.init_s2 = 0.0)),
        ("add_threshold", Box::new(|c| c.add_threshold = 0.0)),
        ("max_fields", Box::new(|c| c.max_fields = Some(0))),
        ("workers", Box::new(|c| c.workers = 0)),
        ("init_lambda", Box::new(|c| c.init_lambda = 1.5)),
        ("final_lambda", Box::new(|c| c.final_lambda = f64::NAN)),
    ];
    for (name, edit) in cases {
        let mut config = LwprConfig::new(2, 1);
        edit(&mut config);
        assert_eq!(invalid_parameter(Validator::validate_config(&config, 2, 1)), name);
    }
}

#[test]
fn test_validate_config_checks_metric_and_norms() {
    let mut config = LwprConfig::new(2, 1);
    config.initial_metric = InitialMetric::Diagonal(vec![1.0, 2.0, 3.0]);
    assert!(matches!(
        Validator::validate_config(&config, 2, 1),
        Err(LwprError::MismatchedInput { .. })
    ));

    let mut config = LwprConfig::new(2, 1);
    config.initial_metric = InitialMetric::Spherical(-2.0);
    assert!(matches!(
        Validator::validate_config(&config, 2, 1),
        Err(LwprError::InvalidMetric(_))
    ));

    let mut config = LwprConfig::new(2, 1);
    config.norm_out = vec![1.0, 1.0];
    assert!(matches!(
        Validator::validate_config(&config, 2, 1),
        Err(LwprError::MismatchedInput { what: "norm_out", .. })
    ));
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn test_builder_duplicate_parameter() {
    let err = Lwpr::builder(1, 1).w_gen(0.2).w_gen(0.3).build().unwrap_err();
    assert_eq!(err, LwprError::DuplicateParameter { parameter: "w_gen" });

    let err = Lwpr::builder(1, 1)
        .initial_metric(InitialMetric::Spherical(4.0))
        .meta(true)
        .initial_metric(InitialMetric::Spherical(9.0))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        LwprError::DuplicateParameter {
            parameter: "initial_metric"
        }
    );
}

#[test]
fn test_builder_rejects_zero_dimensions() {
    let err = Lwpr::builder(0, 1).build().unwrap_err();
    assert_eq!(err, LwprError::InvalidDimensions { n_in: 0, n_out: 1 });
}

#[test]
fn test_builder_applies_settings() {
    let model = Lwpr::builder(2, 1)
        .kernel(Kernel::BiSquare)
        .diag_only(false)
        .w_gen(0.2)
        .w_prune(0.8)
        .norm_in(vec![2.0, 4.0])
        .max_fields(7)
        .workers(2)
        .build()
        .unwrap();

    let cfg = model.config();
    assert_eq!(cfg.kernel, Kernel::BiSquare);
    assert!(!cfg.diag_only);
    assert_eq!(cfg.w_gen, 0.2);
    assert_eq!(cfg.w_prune, 0.8);
    assert_eq!(cfg.norm_in, vec![2.0, 4.0]);
    assert_eq!(cfg.norm_out, vec![1.0]);
    assert_eq!(cfg.max_fields, Some(7));
    assert_eq!(cfg.workers, 2);
    assert_eq!(cfg.init_lambda, 0.999);
    assert_eq!(model.num_fields(), vec![0]);
}

#[test]
fn test_builder_to_config_defaults() {
    let cfg = Lwpr::builder(3, 2).to_config();
    assert_eq!(cfg, LwprConfig::new(3, 2));
}

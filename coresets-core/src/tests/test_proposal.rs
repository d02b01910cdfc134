// coresets-core/src/tests/test_proposal.rs

use crate::error::CoreError;
use crate::proposal::*;
use approx::assert_relative_eq;

#[test]
fn test_proposal_sums_to_one_and_is_positive() {
    crate::init();
    let mut q = vec![0.0, 1.0, 4.0, 9.0, 16.0, 0.25];
    let stats = mix_with_uniform(&mut q, DegeneratePolicy::Fail).unwrap();

    assert_relative_eq!(stats.total_sensitivity, 30.25, epsilon = 1e-12);
    assert!(!stats.uniform_fallback);
    assert_relative_eq!(q.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert!(q.iter().all(|&p| p > 0.0));
}

#[test]
fn test_point_on_mean_keeps_uniform_floor() {
    crate::init();
    let mut q = vec![0.0, 2.0, 2.0];
    mix_with_uniform(&mut q, DegeneratePolicy::Fail).unwrap();

    // s = 0 leaves only the uniform half: 0.5 * 1/3
    assert_relative_eq!(q[0], 0.5 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(q[1], 0.5 * (0.5 + 1.0 / 3.0), epsilon = 1e-12);
}

#[test]
fn test_degenerate_fails_by_default() {
    crate::init();
    let mut q = vec![0.0; 4];
    let err = mix_with_uniform(&mut q, DegeneratePolicy::default()).unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
}

#[test]
fn test_degenerate_uniform_fallback() {
    crate::init();
    let mut q = vec![0.0; 4];
    let stats = mix_with_uniform(&mut q, DegeneratePolicy::Uniform).unwrap();
    assert!(stats.uniform_fallback);
    assert_eq!(q, vec![0.25, 0.25, 0.25, 0.25]);
}

#[test]
fn test_non_finite_total_fails() {
    crate::init();
    let mut q = vec![1.0, f64::NAN, 2.0];
    assert!(matches!(
        mix_with_uniform(&mut q, DegeneratePolicy::Uniform),
        Err(CoreError::InvalidState(_))
    ));

    let mut q = vec![1.0, f64::INFINITY];
    assert!(mix_with_uniform(&mut q, DegeneratePolicy::Uniform).is_err());
}

#[test]
fn test_empty_proposal_fails() {
    crate::init();
    let mut q: Vec<f64> = vec![];
    assert!(matches!(
        mix_with_uniform(&mut q, DegeneratePolicy::Fail),
        Err(CoreError::InvalidArgument(_))
    ));
}

#[test]
fn test_importance_weight() {
    crate::init();
    assert_relative_eq!(importance_weight(0.25, 4), 1.0);
    assert_relative_eq!(importance_weight(0.1, 50), 0.2, epsilon = 1e-12);
}

#[test]
fn test_policy_names_round_trip() {
    crate::init();
    for policy in [DegeneratePolicy::Fail, DegeneratePolicy::Uniform] {
        let parsed: DegeneratePolicy = policy.to_string().parse().unwrap();
        assert_eq!(parsed, policy);
    }
    assert!("sometimes".parse::<DegeneratePolicy>().is_err());
}

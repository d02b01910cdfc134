// coresets-core/src/tests/test_stats.rs

use crate::error::CoreError;
use crate::stats::*;
use approx::assert_relative_eq;

#[test]
fn test_mean_of_rows() {
    crate::init();
    let mut acc = MeanAccumulator::new(2);
    acc.add_row(&[1.0, 2.0]).unwrap();
    acc.add_row(&[3.0, 6.0]).unwrap();
    acc.add_row(&[5.0, 10.0]).unwrap();

    assert_eq!(acc.count(), 3);
    let mean = acc.finish().unwrap();
    assert_relative_eq!(mean[0], 3.0, epsilon = 1e-12);
    assert_relative_eq!(mean[1], 6.0, epsilon = 1e-12);
}

#[test]
fn test_mean_from_iterator_rows() {
    crate::init();
    let rows = vec![vec![0.5, -1.0, 2.0], vec![1.5, 1.0, 0.0]];
    let mut acc = MeanAccumulator::new(3);
    for row in &rows {
        acc.add_row_iter(row.iter().copied()).unwrap();
    }
    let mean = acc.finish().unwrap();
    assert_eq!(mean, vec![1.0, 0.0, 1.0]);
}

#[test]
fn test_mean_rejects_wrong_width_and_keeps_sum() {
    crate::init();
    let mut acc = MeanAccumulator::new(2);
    acc.add_row(&[2.0, 4.0]).unwrap();

    let err = acc.add_row(&[1.0, 1.0, 1.0]).unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));

    // the rejected row must not leak into the running sum
    assert_eq!(acc.count(), 1);
    assert_eq!(acc.finish().unwrap(), vec![2.0, 4.0]);
}

#[test]
fn test_mean_of_zero_rows_fails() {
    crate::init();
    let acc = MeanAccumulator::new(4);
    assert!(matches!(acc.finish(), Err(CoreError::InvalidArgument(_))));
}

#[test]
fn test_mean_of_zero_width_rows_fails() {
    crate::init();
    let mut acc = MeanAccumulator::new(0);
    acc.add_row(&[]).unwrap();
    assert!(matches!(acc.finish(), Err(CoreError::InvalidArgument(_))));
}

#[test]
fn test_iterator_rows_reuse_buffer_after_rejection() {
    crate::init();
    let mut acc = MeanAccumulator::new(3);
    acc.add_row_iter([1.0, 2.0, 3.0]).unwrap();

    // too long, then too short: neither may touch the sum
    assert!(matches!(
        acc.add_row_iter([9.0, 9.0, 9.0, 9.0]),
        Err(CoreError::InvalidArgument(_))
    ));
    assert!(matches!(
        acc.add_row_iter([9.0]),
        Err(CoreError::InvalidArgument(_))
    ));

    acc.add_row_iter((0..3).map(|j| j as f64)).unwrap();
    assert_eq!(acc.count(), 2);
    assert_eq!(acc.finish().unwrap(), vec![0.5, 1.5, 2.5]);
}

#[test]
fn test_squared_distance() {
    crate::init();
    assert_relative_eq!(squared_distance_iter([1.0, 2.0], &[4.0, 6.0]), 25.0);
    assert_relative_eq!(squared_distance_iter([1.0, 2.0], &[1.0, 2.0]), 0.0);
    assert_relative_eq!(
        squared_distance_iter([1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]),
        14.0
    );
}

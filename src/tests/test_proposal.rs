use approx::assert_relative_eq;
use coresets_core::DegeneratePolicy;
use log::debug;

use crate::dataset::Dataset;
use crate::error::CoresetError;
use crate::mean::compute_mean;
use crate::proposal::{build_proposal, compute_sensitivities};
use crate::storage::MemoryChunkReader;
use crate::tests::init;
use crate::tests::test_data::{make_gaussian_matrix, memory_chunks};

fn proposal_for(dataset: &Dataset, reader: &MemoryChunkReader) -> Vec<f64> {
    let mean = compute_mean(dataset, reader).unwrap();
    build_proposal(dataset, &mean, reader, DegeneratePolicy::Fail)
        .unwrap()
        .0
}

#[test]
fn test_proposal_known_values() {
    init();
    // mean (1, 4/3); s = [25/9, 25/9, 100/9]
    let dataset =
        Dataset::from_rows(&[vec![0.0, 0.0], vec![0.0, 0.0], vec![3.0, 4.0]]).unwrap();
    let reader = MemoryChunkReader::new();
    let mean = compute_mean(&dataset, &reader).unwrap();

    let s = compute_sensitivities(&dataset, &mean, &reader).unwrap();
    assert_relative_eq!(s[0], 25.0 / 9.0, epsilon = 1e-12);
    assert_relative_eq!(s[2], 100.0 / 9.0, epsilon = 1e-12);

    let (q, stats) = build_proposal(&dataset, &mean, &reader, DegeneratePolicy::Fail).unwrap();
    assert_relative_eq!(q[0], 0.25, epsilon = 1e-12);
    assert_relative_eq!(q[1], 0.25, epsilon = 1e-12);
    assert_relative_eq!(q[2], 0.5, epsilon = 1e-12);
    assert_relative_eq!(stats.total_sensitivity, 150.0 / 9.0, epsilon = 1e-12);
    assert!(!stats.uniform_fallback);
}

#[test]
fn test_proposal_is_a_distribution() {
    init();
    let n = 500;
    let dataset = Dataset::from_matrix(make_gaussian_matrix(n, 6, 3)).unwrap();
    let q = proposal_for(&dataset, &MemoryChunkReader::new());

    assert_eq!(q.len(), n);
    assert_relative_eq!(q.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    let floor = 0.5 / n as f64;
    assert!(q.iter().all(|&p| p >= floor * (1.0 - 1e-12)));
    debug!("max q = {:?}", q.iter().cloned().fold(f64::MIN, f64::max));
}

#[test]
fn test_proposal_streaming_matches_resident() {
    init();
    let matrix = make_gaussian_matrix(120, 4, 21);
    let (reader, files) = memory_chunks(&matrix, &[7, 50, 63]);

    let resident = Dataset::from_matrix(matrix).unwrap();
    let chunked = Dataset::open_chunks(files, &reader).unwrap();

    assert_eq!(proposal_for(&resident, &reader), proposal_for(&chunked, &reader));
}

#[test]
fn test_proposal_independent_of_thread_count() {
    init();
    let dataset = Dataset::from_matrix(make_gaussian_matrix(1000, 8, 9)).unwrap();
    let reader = MemoryChunkReader::new();

    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| proposal_for(&dataset, &reader));
    let eight = rayon::ThreadPoolBuilder::new()
        .num_threads(8)
        .build()
        .unwrap()
        .install(|| proposal_for(&dataset, &reader));

    assert_eq!(single, eight);
}

#[test]
fn test_proposal_degenerate_dataset() {
    init();
    let rows = vec![vec![2.0, -1.0, 0.5]; 4];
    let dataset = Dataset::from_rows(&rows).unwrap();
    let reader = MemoryChunkReader::new();
    let mean = compute_mean(&dataset, &reader).unwrap();

    match build_proposal(&dataset, &mean, &reader, DegeneratePolicy::Fail) {
        Err(CoresetError::InvalidState(msg)) => debug!("degenerate input rejected: {}", msg),
        other => panic!("expected InvalidState, got {:?}", other),
    }

    let (q, stats) =
        build_proposal(&dataset, &mean, &reader, DegeneratePolicy::Uniform).unwrap();
    assert!(stats.uniform_fallback);
    assert_eq!(stats.total_sensitivity, 0.0);
    for p in q {
        assert_relative_eq!(p, 0.25);
    }
}

#[test]
fn test_sensitivities_reject_wrong_mean_length() {
    init();
    let dataset = Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    assert!(matches!(
        compute_sensitivities(&dataset, &[0.0], &MemoryChunkReader::new()),
        Err(CoresetError::InvalidArgument(_))
    ));
}

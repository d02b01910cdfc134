use approx::assert_relative_eq;
use coresets_core::ChunkOffsets;
use std::path::PathBuf;

use crate::dataset::Dataset;
use crate::error::CoresetError;
use crate::mean::compute_mean;
use crate::storage::MemoryChunkReader;
use crate::tests::init;
use crate::tests::test_data::{make_gaussian_matrix, matrix_from_rows, memory_chunks};

#[test]
fn test_mean_resident_small() {
    init();
    let dataset =
        Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
    let mean = compute_mean(&dataset, &MemoryChunkReader::new()).unwrap();
    assert_relative_eq!(mean[0], 3.0);
    assert_relative_eq!(mean[1], 4.0);
}

#[test]
fn test_mean_streaming_matches_resident() {
    init();
    let matrix = make_gaussian_matrix(100, 5, 11);
    let (reader, files) = memory_chunks(&matrix, &[30, 50, 20]);

    let resident = Dataset::from_matrix(matrix).unwrap();
    let chunked = Dataset::open_chunks(files, &reader).unwrap();
    assert_eq!(chunked.shape(), (100, 5));

    let expected = compute_mean(&resident, &reader).unwrap();
    let streamed = compute_mean(&chunked, &reader).unwrap();
    // same summation order, so the results are bit-identical
    assert_eq!(expected, streamed);
}

#[test]
fn test_mean_streaming_reads_each_chunk_once() {
    init();
    let matrix = make_gaussian_matrix(40, 3, 5);
    let (reader, files) = memory_chunks(&matrix, &[10, 10, 10, 10]);
    let chunked = Dataset::open_chunks(files, &reader).unwrap();

    compute_mean(&chunked, &reader).unwrap();
    assert_eq!(reader.reads(), 4);
}

#[test]
fn test_mean_missing_chunk_is_io_error() {
    init();
    let reader = MemoryChunkReader::new()
        .with_chunk("a", matrix_from_rows(&[vec![1.0, 1.0], vec![2.0, 2.0]]));
    let offsets = ChunkOffsets::from_chunk_sizes(&[2, 2]).unwrap();
    let dataset =
        Dataset::from_chunks(vec![PathBuf::from("a"), PathBuf::from("b")], offsets, 2).unwrap();

    match compute_mean(&dataset, &reader) {
        Err(CoresetError::Io(_)) => {}
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn test_mean_rejects_chunk_with_wrong_columns() {
    init();
    let reader = MemoryChunkReader::new()
        .with_chunk("a", matrix_from_rows(&[vec![1.0, 1.0], vec![2.0, 2.0]]))
        .with_chunk("b", matrix_from_rows(&[vec![1.0, 1.0, 1.0]]));
    let offsets = ChunkOffsets::from_chunk_sizes(&[2, 1]).unwrap();
    let dataset =
        Dataset::from_chunks(vec![PathBuf::from("a"), PathBuf::from("b")], offsets, 2).unwrap();

    assert!(matches!(
        compute_mean(&dataset, &reader),
        Err(CoresetError::InvalidArgument(_))
    ));
}

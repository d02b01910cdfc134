// coresets-core/src/tests/test_offsets.rs

use crate::error::CoreError;
use crate::offsets::ChunkOffsets;

fn three_chunks() -> ChunkOffsets {
    ChunkOffsets::from_chunk_sizes(&[3, 5, 2]).unwrap()
}

#[test]
fn test_offsets_from_sizes() {
    crate::init();
    let offsets = three_chunks();
    assert_eq!(offsets.as_slice(), &[0, 3, 8, 10]);
    assert_eq!(offsets.total(), 10);
    assert_eq!(offsets.n_chunks(), 3);
    assert_eq!(offsets.chunk_len(1), 5);
    assert_eq!(offsets.chunk_start(2), 8);
}

#[test]
fn test_locate_inside_chunk() {
    crate::init();
    let offsets = three_chunks();
    assert_eq!(offsets.locate(7).unwrap(), (1, 4));
    assert_eq!(offsets.locate(1).unwrap(), (0, 1));
    assert_eq!(offsets.locate(9).unwrap(), (2, 1));
}

#[test]
fn test_locate_on_chunk_edges() {
    crate::init();
    let offsets = three_chunks();
    assert_eq!(offsets.locate(0).unwrap(), (0, 0));
    assert_eq!(offsets.locate(2).unwrap(), (0, 2));
    assert_eq!(offsets.locate(3).unwrap(), (1, 0));
    assert_eq!(offsets.locate(8).unwrap(), (2, 0));
}

#[test]
fn test_locate_every_row_round_trips() {
    crate::init();
    let offsets = ChunkOffsets::from_chunk_sizes(&[1, 4, 1, 7, 2]).unwrap();
    for n in 0..offsets.total() {
        let (chunk, local) = offsets.locate(n).unwrap();
        assert!(local < offsets.chunk_len(chunk));
        assert_eq!(offsets.chunk_start(chunk) + local, n);
    }
}

#[test]
fn test_locate_out_of_range() {
    crate::init();
    let offsets = three_chunks();
    assert!(matches!(
        offsets.locate(10),
        Err(CoreError::InvalidArgument(_))
    ));
}

#[test]
fn test_single_chunk() {
    crate::init();
    let offsets = ChunkOffsets::from_offsets(vec![0, 4]).unwrap();
    assert_eq!(offsets.n_chunks(), 1);
    assert_eq!(offsets.locate(3).unwrap(), (0, 3));
}

#[test]
fn test_invalid_offsets_rejected() {
    crate::init();
    assert!(ChunkOffsets::from_offsets(vec![]).is_err());
    assert!(ChunkOffsets::from_offsets(vec![0]).is_err());
    assert!(ChunkOffsets::from_offsets(vec![1, 4]).is_err());
    assert!(ChunkOffsets::from_offsets(vec![0, 3, 3, 5]).is_err());
    assert!(ChunkOffsets::from_offsets(vec![0, 5, 2]).is_err());
    assert!(ChunkOffsets::from_chunk_sizes(&[]).is_err());
    assert!(ChunkOffsets::from_chunk_sizes(&[2, 0, 1]).is_err());
}

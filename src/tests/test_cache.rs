use std::path::Path;

use crate::storage::{ChunkCache, ChunkReader, MemoryChunkReader, StorageError};
use crate::tests::init;
use crate::tests::test_data::matrix_from_rows;

fn three_chunk_reader() -> MemoryChunkReader {
    MemoryChunkReader::new()
        .with_chunk("a", matrix_from_rows(&[vec![1.0]]))
        .with_chunk("b", matrix_from_rows(&[vec![2.0]]))
        .with_chunk("c", matrix_from_rows(&[vec![3.0]]))
}

#[test]
fn test_cache_evicts_least_recently_used() {
    init();
    let cache = ChunkCache::new(three_chunk_reader(), 2);

    for path in ["a", "b", "a", "c"] {
        cache.read_chunk(Path::new(path)).unwrap();
    }
    // "b" was the least recently used when "c" came in
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.stats(), (1, 3));

    cache.read_chunk(Path::new("a")).unwrap();
    assert_eq!(cache.stats(), (2, 3));
    cache.read_chunk(Path::new("b")).unwrap();
    assert_eq!(cache.stats(), (2, 4));

    assert_eq!(cache.into_inner().reads(), 4);
}

#[test]
fn test_cache_disabled_passes_through() {
    init();
    let cache = ChunkCache::new(three_chunk_reader(), 0);
    for _ in 0..3 {
        cache.read_chunk(Path::new("a")).unwrap();
    }
    assert!(cache.is_empty());
    assert_eq!(cache.stats(), (0, 0));
    assert_eq!(cache.into_inner().reads(), 3);
}

#[test]
fn test_cache_does_not_store_failures() {
    init();
    let cache = ChunkCache::new(three_chunk_reader(), 2);
    assert!(matches!(
        cache.read_chunk(Path::new("missing")),
        Err(StorageError::Io(_))
    ));
    assert!(cache.is_empty());
    assert_eq!(cache.chunk_shape(Path::new("b")).unwrap(), (1, 1));
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::storage::{ChunkReader, StorageError, StorageResult};

/// Chunks held in memory and addressed by path.
///
/// Behaves like a file-backed reader (unknown paths are I/O failures) and
/// counts how many times chunks were read, which makes it handy for checking
/// the access pattern of the streaming stages.
#[derive(Debug, Default)]
pub struct MemoryChunkReader {
    chunks: HashMap<PathBuf, Arc<DenseMatrix<f64>>>,
    reads: AtomicUsize,
}

impl MemoryChunkReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk(mut self, path: impl Into<PathBuf>, chunk: DenseMatrix<f64>) -> Self {
        self.insert(path, chunk);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, chunk: DenseMatrix<f64>) {
        self.chunks.insert(path.into(), Arc::new(chunk));
    }

    /// Total `read_chunk` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl ChunkReader for MemoryChunkReader {
    fn read_chunk(&self, path: &Path) -> StorageResult<Arc<DenseMatrix<f64>>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.chunks
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::Io(format!("no such chunk: {}", path.display())))
    }

    fn chunk_shape(&self, path: &Path) -> StorageResult<(usize, usize)> {
        self.chunks
            .get(path)
            .map(|m| m.shape())
            .ok_or_else(|| StorageError::Io(format!("no such chunk: {}", path.display())))
    }
}

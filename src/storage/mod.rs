//! Chunk storage for out-of-core datasets.
//!
//! A chunked dataset is an ordered list of files, each holding a contiguous
//! block of rows with the same column count. The pipeline only ever asks for
//! "the matrix stored at this path" through [`ChunkReader`]; every call opens,
//! reads and closes its own handle, so concurrent reads from worker threads
//! need no coordination.

pub mod cache;
pub mod memory;
#[cfg(feature = "storage")]
pub mod parquet;

use std::path::Path;
use std::sync::Arc;

use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

pub use cache::ChunkCache;
pub use memory::MemoryChunkReader;
#[cfg(feature = "storage")]
pub use parquet::ParquetChunkReader;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum StorageError {
    Io(String),
    Arrow(String),
    Serde(String),
    Invalid(String),
    Parquet(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "IO error: {}", e),
            StorageError::Arrow(e) => write!(f, "Arrow error: {}", e),
            StorageError::Serde(e) => write!(f, "Serde error: {}", e),
            StorageError::Parquet(e) => write!(f, "Parquet error: {}", e),
            StorageError::Invalid(e) => write!(f, "Invalid: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================================
// Chunk access
// ============================================================================

/// Loads one chunk file into a dense `rows x cols` matrix.
pub trait ChunkReader: Send + Sync {
    fn read_chunk(&self, path: &Path) -> StorageResult<Arc<DenseMatrix<f64>>>;

    /// `(rows, cols)` of the chunk at `path`.
    ///
    /// The default loads the whole chunk; formats that carry their shape in a
    /// header should override this.
    fn chunk_shape(&self, path: &Path) -> StorageResult<(usize, usize)> {
        Ok(self.read_chunk(path)?.shape())
    }
}

impl<R: ChunkReader + ?Sized> ChunkReader for &R {
    fn read_chunk(&self, path: &Path) -> StorageResult<Arc<DenseMatrix<f64>>> {
        (**self).read_chunk(path)
    }

    fn chunk_shape(&self, path: &Path) -> StorageResult<(usize, usize)> {
        (**self).chunk_shape(path)
    }
}

//! Bounded LRU cache in front of a [`ChunkReader`].
//!
//! Streaming assembly resolves every draw to a chunk file and reads it. With a
//! cache of `capacity` chunks, repeated draws from a recently used chunk are
//! served from memory. Results are identical with or without the cache; only
//! the number of file reads changes. Peak memory grows by at most `capacity`
//! chunks.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, trace};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::storage::{ChunkReader, StorageError, StorageResult};

pub struct ChunkCache<R: ChunkReader> {
    inner: R,
    capacity: usize,
    // most recently used at the back
    entries: Mutex<VecDeque<(PathBuf, Arc<DenseMatrix<f64>>)>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<R: ChunkReader> ChunkCache<R> {
    /// `capacity == 0` disables caching: every read goes to `inner`.
    pub fn new(inner: R, capacity: usize) -> Self {
        debug!("Chunk cache with capacity {}", capacity);
        Self {
            inner,
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn lookup(&self, path: &Path) -> StorageResult<Option<Arc<DenseMatrix<f64>>>> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        let Some(pos) = entries.iter().position(|(p, _)| p == path) else {
            return Ok(None);
        };
        // move to the back as most recently used
        let entry = entries.remove(pos);
        let chunk = entry.as_ref().map(|(_, c)| c.clone());
        if let Some(entry) = entry {
            entries.push_back(entry);
        }
        Ok(chunk)
    }

    fn store(&self, path: &Path, chunk: Arc<DenseMatrix<f64>>) -> StorageResult<()> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        // another worker may have loaded the same chunk meanwhile
        if entries.iter().any(|(p, _)| p == path) {
            return Ok(());
        }
        if entries.len() == self.capacity {
            if let Some((evicted, _)) = entries.pop_front() {
                trace!("Evicting chunk {}", evicted.display());
            }
        }
        entries.push_back((path.to_path_buf(), chunk));
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Invalid("chunk cache lock poisoned".to_string())
}

impl<R: ChunkReader> ChunkReader for ChunkCache<R> {
    fn read_chunk(&self, path: &Path) -> StorageResult<Arc<DenseMatrix<f64>>> {
        if self.capacity == 0 {
            return self.inner.read_chunk(path);
        }

        if let Some(chunk) = self.lookup(path)? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(chunk);
        }

        // load outside the lock so other workers keep making progress
        self.misses.fetch_add(1, Ordering::Relaxed);
        let chunk = self.inner.read_chunk(path)?;
        self.store(path, chunk.clone())?;
        Ok(chunk)
    }

    fn chunk_shape(&self, path: &Path) -> StorageResult<(usize, usize)> {
        self.inner.chunk_shape(path)
    }
}

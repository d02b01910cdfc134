// coresets-core/src/offsets.rs
//! Prefix offsets over an ordered list of chunk files.
//!
//! For chunks of sizes `[3, 5, 2]` the offsets are `[0, 3, 8, 10]`: chunk `i`
//! holds global rows `offsets[i]..offsets[i + 1]`. A global row `n` belongs to
//! the chunk with the greatest offset `<= n`.

use log::trace;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOffsets {
    offsets: Vec<usize>,
}

impl ChunkOffsets {
    /// Build from raw prefix offsets `[0, c0, c0 + c1, ..., N]`.
    ///
    /// Offsets must start at zero, be strictly increasing and describe at
    /// least one chunk.
    pub fn from_offsets(offsets: Vec<usize>) -> CoreResult<Self> {
        if offsets.len() < 2 {
            return Err(CoreError::InvalidArgument(format!(
                "offsets must describe at least one chunk, got {:?}",
                offsets
            )));
        }
        if offsets[0] != 0 {
            return Err(CoreError::InvalidArgument(format!(
                "offsets must start at 0, got {}",
                offsets[0]
            )));
        }
        if let Some(pos) = offsets.windows(2).position(|w| w[1] <= w[0]) {
            return Err(CoreError::InvalidArgument(format!(
                "offsets must be strictly increasing: offsets[{}]={} >= offsets[{}]={}",
                pos,
                offsets[pos],
                pos + 1,
                offsets[pos + 1]
            )));
        }
        Ok(Self { offsets })
    }

    /// Build from the row count of each chunk, in file order.
    pub fn from_chunk_sizes(sizes: &[usize]) -> CoreResult<Self> {
        if let Some(empty) = sizes.iter().position(|&s| s == 0) {
            return Err(CoreError::InvalidArgument(format!(
                "chunk {} has zero rows",
                empty
            )));
        }

        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0);
        let mut running = 0usize;
        for &size in sizes {
            running += size;
            offsets.push(running);
        }
        Self::from_offsets(offsets)
    }

    /// Total number of rows across all chunks.
    pub fn total(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn n_chunks(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn chunk_start(&self, chunk: usize) -> usize {
        self.offsets[chunk]
    }

    pub fn chunk_len(&self, chunk: usize) -> usize {
        self.offsets[chunk + 1] - self.offsets[chunk]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.offsets
    }

    /// Map a global row index to `(chunk, local_row)`.
    ///
    /// `chunk` satisfies `offsets[chunk] <= n < offsets[chunk + 1]`, so an index
    /// sitting exactly on a chunk edge resolves to local row 0 of the later chunk.
    pub fn locate(&self, n: usize) -> CoreResult<(usize, usize)> {
        if n >= self.total() {
            return Err(CoreError::InvalidArgument(format!(
                "row {} out of range for {} rows",
                n,
                self.total()
            )));
        }

        // number of offsets <= n, minus one
        let chunk = self.offsets.partition_point(|&o| o <= n) - 1;
        let local = n - self.offsets[chunk];
        trace!("row {} -> chunk {} local {}", n, chunk, local);
        Ok((chunk, local))
    }
}

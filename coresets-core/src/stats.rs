// coresets-core/src/stats.rs
//! Column statistics and distances used by the mean and sensitivity stages.
//!
//! The accumulator is fed one row at a time so callers can stream rows out of
//! a chunk and drop the chunk before the next one is loaded. Summation order is
//! the order rows are added, so a single accumulator fed in a fixed order gives
//! a deterministic mean.

use log::trace;

use crate::error::{CoreError, CoreResult};

/// Running column-wise sum over rows of a fixed width.
#[derive(Debug, Clone)]
pub struct MeanAccumulator {
    sum: Vec<f64>,
    count: usize,
    // reused by `add_row_iter`, holds the row until its width is known
    scratch: Vec<f64>,
}

impl MeanAccumulator {
    pub fn new(n_cols: usize) -> Self {
        Self {
            sum: vec![0.0; n_cols],
            count: 0,
            scratch: Vec::with_capacity(n_cols),
        }
    }

    pub fn n_cols(&self) -> usize {
        self.sum.len()
    }

    /// Number of rows added so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Add one row given as a slice.
    ///
    /// A row of the wrong width is rejected and the running sum is left as it was.
    pub fn add_row(&mut self, row: &[f64]) -> CoreResult<()> {
        if row.len() != self.sum.len() {
            return Err(CoreError::InvalidArgument(format!(
                "row has {} columns, expected {}",
                row.len(),
                self.sum.len()
            )));
        }
        for (acc, value) in self.sum.iter_mut().zip(row) {
            *acc += value;
        }
        self.count += 1;
        Ok(())
    }

    /// Add one row given as an iterator of values, e.g. a matrix row.
    ///
    /// Values are collected into a buffer owned by the accumulator, so no
    /// allocation happens per row once the first row has been seen.
    pub fn add_row_iter<I>(&mut self, row: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut staged = std::mem::take(&mut self.scratch);
        staged.clear();
        staged.extend(row);
        let added = self.add_row(&staged);
        self.scratch = staged;
        added
    }

    /// Divide the sums by the number of rows seen.
    pub fn finish(self) -> CoreResult<Vec<f64>> {
        if self.count == 0 {
            return Err(CoreError::InvalidArgument(
                "cannot compute the mean of zero rows".to_string(),
            ));
        }
        if self.sum.is_empty() {
            return Err(CoreError::InvalidArgument(
                "cannot compute the mean of zero-width rows".to_string(),
            ));
        }

        trace!("Finishing mean over {} rows x {} cols", self.count, self.sum.len());
        let scale = 1.0 / self.count as f64;
        Ok(self.sum.into_iter().map(|s| s * scale).collect())
    }
}

/// Squared Euclidean distance between a row given as an iterator and a centre.
///
/// Values past the end of `centre` are ignored, matching `zip`.
pub fn squared_distance_iter<I>(row: I, centre: &[f64]) -> f64
where
    I: IntoIterator<Item = f64>,
{
    row.into_iter()
        .zip(centre)
        .map(|(x, c)| (x - c) * (x - c))
        .sum()
}

//! Coreset assembler: copy the drawn rows and compute their weights.
//!
//! Draw `m` with sampled index `n` becomes row `m` of the coreset with weight
//! `1 / (q[n] * Nprime)`. In streaming mode `n` is resolved to
//! `(chunk, local_row)` through the dataset's prefix offsets and the chunk is
//! read through the [`ChunkReader`] for that draw alone; wrap the reader in a
//! [`ChunkCache`](crate::storage::ChunkCache) to avoid re-reading hot chunks.
//!
//! Output is built in scratch buffers; the caller's dataset is not touched.

use coresets_core::importance_weight;
use log::{debug, info};
use rayon::prelude::*;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::dataset::{DataSource, Dataset};
use crate::error::{CoresetError, CoresetResult};
use crate::storage::ChunkReader;

/// An assembled coreset, not yet swapped into a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Coreset {
    /// `Nprime x D`
    pub data: DenseMatrix<f64>,
    /// One importance weight per row of `data`.
    pub weights: Vec<f64>,
    /// Global source row behind each coreset row.
    pub indices: Vec<usize>,
}

impl Coreset {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

fn copy_row(matrix: &DenseMatrix<f64>, src: usize, dst: &mut [f64]) {
    for (j, slot) in dst.iter_mut().enumerate() {
        *slot = *matrix.get((src, j));
    }
}

fn check_index(n: usize, n_rows: usize) -> CoresetResult<()> {
    if n >= n_rows {
        return Err(CoresetError::InvalidArgument(format!(
            "drawn index {} out of range for {} rows",
            n, n_rows
        )));
    }
    Ok(())
}

/// Assemble the coreset for `draws` from `dataset` under proposal `q`.
pub fn assemble<R: ChunkReader + ?Sized>(
    dataset: &Dataset,
    q: &[f64],
    draws: &[usize],
    reader: &R,
) -> CoresetResult<Coreset> {
    let (n_rows, n_cols) = dataset.shape();
    let nprime = draws.len();
    if nprime == 0 {
        return Err(CoresetError::InvalidArgument(
            "nprime must be positive".to_string(),
        ));
    }
    if n_cols == 0 {
        return Err(CoresetError::InvalidArgument(
            "dataset has zero columns".to_string(),
        ));
    }
    if q.len() != n_rows {
        return Err(CoresetError::InvalidArgument(format!(
            "proposal has {} entries, dataset has {} rows",
            q.len(),
            n_rows
        )));
    }

    info!(
        "Assembling {} x {} coreset from {} dataset",
        nprime,
        n_cols,
        if dataset.is_resident() { "resident" } else { "chunked" }
    );

    let mut flat = vec![0.0; nprime * n_cols];
    let mut weights = vec![0.0; nprime];
    let slots = flat
        .par_chunks_mut(n_cols)
        .zip(weights.par_iter_mut())
        .zip(draws.par_iter());

    match dataset.source() {
        DataSource::Resident(data) => {
            slots.try_for_each(|((row, weight), &n)| -> CoresetResult<()> {
                check_index(n, n_rows)?;
                copy_row(data, n, row);
                *weight = importance_weight(q[n], nprime);
                Ok(())
            })?;
        }
        DataSource::Chunked(chunked) => {
            let offsets = chunked.offsets();
            slots.try_for_each(|((row, weight), &n)| -> CoresetResult<()> {
                check_index(n, n_rows)?;
                let (chunk, local) = offsets.locate(n)?;
                let matrix = chunked.load_chunk(chunk, n_cols, reader)?;
                copy_row(&matrix, local, row);
                *weight = importance_weight(q[n], nprime);
                Ok(())
            })?;
        }
    }

    if let Some(m) = weights.iter().position(|w| !w.is_finite() || *w <= 0.0) {
        return Err(CoresetError::InvalidState(format!(
            "weight {} for draw {} (row {}) is not positive and finite",
            weights[m], m, draws[m]
        )));
    }
    debug!(
        "Assembled coreset, weight sum {:.6}",
        weights.iter().sum::<f64>()
    );

    Ok(Coreset {
        data: DenseMatrix::from_iterator(flat.into_iter(), nprime, n_cols, 0),
        weights,
        indices: draws.to_vec(),
    })
}

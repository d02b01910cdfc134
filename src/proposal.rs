//! Proposal builder: per-point sensitivities and the mixed sampling distribution.
//!
//! `s[n] = ||row_n - u||^2` is computed in parallel, one independent slot per
//! row, then mixed as `q[n] = 0.5 * (s[n] / Σs + 1 / N)`. Streaming mode walks
//! the chunks in file order and writes chunk `i` into `s[offsets[i]..offsets[i+1]]`.
//! Runs on the current rayon pool; the builder installs one of `nthreads`.

use coresets_core::{DegeneratePolicy, ProposalStats, mix_with_uniform, squared_distance_iter};
use log::{debug, info, trace};
use rayon::prelude::*;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::dataset::{DataSource, Dataset};
use crate::error::{CoresetError, CoresetResult};
use crate::storage::ChunkReader;

fn fill_distances(slots: &mut [f64], matrix: &DenseMatrix<f64>, mean: &[f64]) {
    let n_cols = mean.len();
    slots.par_iter_mut().enumerate().for_each(|(i, slot)| {
        *slot = squared_distance_iter((0..n_cols).map(|j| *matrix.get((i, j))), mean);
    });
}

/// Squared distance of every row to `mean`, in global row order.
pub fn compute_sensitivities<R: ChunkReader + ?Sized>(
    dataset: &Dataset,
    mean: &[f64],
    reader: &R,
) -> CoresetResult<Vec<f64>> {
    let (n_rows, n_cols) = dataset.shape();
    if mean.len() != n_cols {
        return Err(CoresetError::InvalidArgument(format!(
            "mean has {} columns, dataset has {}",
            mean.len(),
            n_cols
        )));
    }

    let mut sensitivities = vec![0.0; n_rows];
    match dataset.source() {
        DataSource::Resident(data) => fill_distances(&mut sensitivities, data, mean),
        DataSource::Chunked(chunked) => {
            let offsets = chunked.offsets();
            for chunk in 0..offsets.n_chunks() {
                let matrix = chunked.load_chunk(chunk, n_cols, reader)?;
                let start = offsets.chunk_start(chunk);
                let end = start + offsets.chunk_len(chunk);
                fill_distances(&mut sensitivities[start..end], &matrix, mean);
                trace!("Sensitivities for rows {}..{} done", start, end);
            }
        }
    }
    Ok(sensitivities)
}

/// Build the proposal distribution `q` over all rows.
///
/// Returns `q` together with the total sensitivity and whether the
/// degenerate fallback was taken.
pub fn build_proposal<R: ChunkReader + ?Sized>(
    dataset: &Dataset,
    mean: &[f64],
    reader: &R,
    policy: DegeneratePolicy,
) -> CoresetResult<(Vec<f64>, ProposalStats)> {
    info!(
        "Building proposal over {} points (degenerate policy: {})",
        dataset.n_rows(),
        policy
    );
    let mut q = compute_sensitivities(dataset, mean, reader)?;
    let stats = mix_with_uniform(&mut q, policy)?;
    debug!(
        "Proposal ready: total sensitivity {:.6e}, uniform fallback {}",
        stats.total_sensitivity, stats.uniform_fallback
    );
    Ok((q, stats))
}

//! Mean reducer: the column-wise mean `u` of all `N` rows.
//!
//! Rows are summed sequentially in row order, chunk by chunk in file order,
//! so the mean is deterministic for a given dataset layout. In streaming mode
//! only one chunk is held at a time.

use coresets_core::MeanAccumulator;
use log::{debug, info, trace};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::dataset::{DataSource, Dataset};
use crate::error::{CoresetError, CoresetResult};
use crate::storage::ChunkReader;

fn accumulate_rows(acc: &mut MeanAccumulator, matrix: &DenseMatrix<f64>) -> CoresetResult<()> {
    let (rows, cols) = matrix.shape();
    for i in 0..rows {
        acc.add_row_iter((0..cols).map(|j| *matrix.get((i, j))))?;
    }
    Ok(())
}

/// Compute the length-`D` mean of the dataset.
pub fn compute_mean<R: ChunkReader + ?Sized>(
    dataset: &Dataset,
    reader: &R,
) -> CoresetResult<Vec<f64>> {
    let (n_rows, n_cols) = dataset.shape();
    if n_rows == 0 {
        return Err(CoresetError::InvalidArgument(
            "cannot compute the mean of zero rows".to_string(),
        ));
    }
    info!("Computing mean over {} x {}", n_rows, n_cols);

    let mut acc = MeanAccumulator::new(n_cols);
    match dataset.source() {
        DataSource::Resident(data) => accumulate_rows(&mut acc, data)?,
        DataSource::Chunked(chunked) => {
            for chunk in 0..chunked.offsets().n_chunks() {
                let matrix = chunked.load_chunk(chunk, n_cols, reader)?;
                accumulate_rows(&mut acc, &matrix)?;
                trace!(
                    "Accumulated chunk {} ({} rows), {} rows so far",
                    chunk,
                    matrix.shape().0,
                    acc.count()
                );
                // chunk dropped here, before the next one is read
            }
        }
    }

    if acc.count() != n_rows {
        return Err(CoresetError::InvalidState(format!(
            "read {} rows, dataset declares {}",
            acc.count(),
            n_rows
        )));
    }

    let mean = acc.finish()?;
    debug!("Mean computed, |u|^2 = {:.6e}", mean.iter().map(|v| v * v).sum::<f64>());
    Ok(mean)
}

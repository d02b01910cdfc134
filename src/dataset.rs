//! Dataset container: a resident matrix or an ordered list of chunk files.
//!
//! The coreset pipeline takes a `&mut Dataset` and, on success, leaves it
//! resident with `N = Nprime` rows and a weight per row. On failure the
//! dataset is untouched: the coreset is assembled in scratch buffers and only
//! swapped in by [`Dataset::replace_with_coreset`] at the very end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use coresets_core::ChunkOffsets;
use log::{debug, info};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::assembler::Coreset;
use crate::error::{CoresetError, CoresetResult};
use crate::storage::ChunkReader;

/// Ordered chunk files plus the prefix offsets mapping global rows into them.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedFiles {
    pub(crate) files: Vec<PathBuf>,
    pub(crate) offsets: ChunkOffsets,
}

impl ChunkedFiles {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn offsets(&self) -> &ChunkOffsets {
        &self.offsets
    }

    pub(crate) fn chunk_path(&self, chunk: usize) -> &Path {
        &self.files[chunk]
    }

    /// Read chunk `chunk` and check it has the rows the offsets promise and
    /// `n_cols` columns.
    pub(crate) fn load_chunk<R: ChunkReader + ?Sized>(
        &self,
        chunk: usize,
        n_cols: usize,
        reader: &R,
    ) -> CoresetResult<Arc<DenseMatrix<f64>>> {
        let path = self.chunk_path(chunk);
        let matrix = reader.read_chunk(path)?;
        let expected = (self.offsets.chunk_len(chunk), n_cols);
        if matrix.shape() != expected {
            return Err(CoresetError::InvalidArgument(format!(
                "chunk {} is {:?}, expected {:?}",
                path.display(),
                matrix.shape(),
                expected
            )));
        }
        Ok(matrix)
    }
}

/// Where the rows of a dataset live.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Resident(DenseMatrix<f64>),
    Chunked(ChunkedFiles),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// (N, D)
    pub(crate) shape: (usize, usize),
    pub(crate) source: DataSource,
    /// One importance weight per row, set by coreset construction.
    pub(crate) weight: Option<Vec<f64>>,
}

fn check_shape(n_rows: usize, n_cols: usize) -> CoresetResult<()> {
    if n_rows == 0 {
        return Err(CoresetError::InvalidArgument(
            "dataset has zero rows".to_string(),
        ));
    }
    if n_cols == 0 {
        return Err(CoresetError::InvalidArgument(
            "dataset has zero columns".to_string(),
        ));
    }
    Ok(())
}

impl Dataset {
    /// Wrap a resident `N x D` matrix.
    pub fn from_matrix(data: DenseMatrix<f64>) -> CoresetResult<Self> {
        let (n_rows, n_cols) = data.shape();
        check_shape(n_rows, n_cols)?;
        debug!("Resident dataset: {} x {}", n_rows, n_cols);
        Ok(Self {
            shape: (n_rows, n_cols),
            source: DataSource::Resident(data),
            weight: None,
        })
    }

    /// Build a resident dataset from row vectors of equal length.
    pub fn from_rows(rows: &[Vec<f64>]) -> CoresetResult<Self> {
        if rows.is_empty() {
            return Err(CoresetError::InvalidArgument(
                "dataset has zero rows".to_string(),
            ));
        }
        let n_cols = rows[0].len();
        if let Some(bad) = rows.iter().position(|r| r.len() != n_cols) {
            return Err(CoresetError::InvalidArgument(format!(
                "row {} has {} columns, expected {}",
                bad,
                rows[bad].len(),
                n_cols
            )));
        }
        check_shape(rows.len(), n_cols)?;

        let flat = rows.iter().flat_map(|r| r.iter().copied());
        Self::from_matrix(DenseMatrix::from_iterator(flat, rows.len(), n_cols, 0))
    }

    /// Resident dataset that already carries weights, e.g. a reloaded coreset.
    pub fn from_weighted(data: DenseMatrix<f64>, weights: Vec<f64>) -> CoresetResult<Self> {
        let mut dataset = Self::from_matrix(data)?;
        if weights.len() != dataset.shape.0 {
            return Err(CoresetError::InvalidArgument(format!(
                "{} weights for {} rows",
                weights.len(),
                dataset.shape.0
            )));
        }
        dataset.weight = Some(weights);
        Ok(dataset)
    }

    /// Describe a chunked dataset whose layout is already known.
    ///
    /// `offsets` must describe exactly one chunk per file; `n_cols` is the
    /// column count every chunk is expected to have.
    pub fn from_chunks(
        files: Vec<PathBuf>,
        offsets: ChunkOffsets,
        n_cols: usize,
    ) -> CoresetResult<Self> {
        if files.len() != offsets.n_chunks() {
            return Err(CoresetError::InvalidArgument(format!(
                "{} files but offsets describe {} chunks",
                files.len(),
                offsets.n_chunks()
            )));
        }
        check_shape(offsets.total(), n_cols)?;

        debug!(
            "Chunked dataset: {} x {} over {} files",
            offsets.total(),
            n_cols,
            files.len()
        );
        Ok(Self {
            shape: (offsets.total(), n_cols),
            source: DataSource::Chunked(ChunkedFiles { files, offsets }),
            weight: None,
        })
    }

    /// Open a chunked dataset, asking `reader` for the shape of every file.
    ///
    /// Fails on an empty file list, empty chunks and chunks whose column
    /// count differs from the first one.
    pub fn open_chunks<R: ChunkReader + ?Sized>(
        files: Vec<PathBuf>,
        reader: &R,
    ) -> CoresetResult<Self> {
        if files.is_empty() {
            return Err(CoresetError::InvalidArgument(
                "chunked dataset needs at least one file".to_string(),
            ));
        }

        let mut sizes = Vec::with_capacity(files.len());
        let mut n_cols: Option<usize> = None;
        for file in &files {
            let (rows, cols) = reader.chunk_shape(file)?;
            match n_cols {
                None => n_cols = Some(cols),
                Some(expected) if expected != cols => {
                    return Err(CoresetError::InvalidArgument(format!(
                        "chunk {} has {} columns, expected {}",
                        file.display(),
                        cols,
                        expected
                    )));
                }
                Some(_) => {}
            }
            sizes.push(rows);
        }

        let offsets = ChunkOffsets::from_chunk_sizes(&sizes)?;
        info!(
            "Opened {} chunks, {} rows in total",
            files.len(),
            offsets.total()
        );
        Self::from_chunks(files, offsets, n_cols.unwrap_or(0))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn n_rows(&self) -> usize {
        self.shape.0
    }

    pub fn n_cols(&self) -> usize {
        self.shape.1
    }

    pub fn is_resident(&self) -> bool {
        matches!(self.source, DataSource::Resident(_))
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// The resident matrix, `None` in streaming mode.
    pub fn data(&self) -> Option<&DenseMatrix<f64>> {
        match &self.source {
            DataSource::Resident(m) => Some(m),
            DataSource::Chunked(_) => None,
        }
    }

    /// Chunk files, empty for a resident dataset.
    pub fn files(&self) -> &[PathBuf] {
        match &self.source {
            DataSource::Resident(_) => &[],
            DataSource::Chunked(c) => &c.files,
        }
    }

    pub fn file_offsets(&self) -> Option<&ChunkOffsets> {
        match &self.source {
            DataSource::Resident(_) => None,
            DataSource::Chunked(c) => Some(&c.offsets),
        }
    }

    pub fn weight(&self) -> Option<&[f64]> {
        self.weight.as_deref()
    }

    /// Swap in an assembled coreset. Afterwards the dataset is resident with
    /// one row and one weight per draw.
    pub fn replace_with_coreset(&mut self, coreset: Coreset) {
        let (rows, cols) = coreset.data.shape();
        debug_assert_eq!(rows, coreset.weights.len());
        self.shape = (rows, cols);
        self.source = DataSource::Resident(coreset.data);
        self.weight = Some(coreset.weights);
    }
}

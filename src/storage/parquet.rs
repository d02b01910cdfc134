use arrow::{
    array::{Float64Array, RecordBatch, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
};
use log::{debug, info, trace};
use parquet::{
    arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder},
    basic::Compression,
    file::properties::WriterProperties,
};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::{
    arrays::{Array, Array2},
    matrix::DenseMatrix,
};
use std::{
    collections::HashMap,
    fs::File,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    builder::{ConfigValue, CoresetBuilder},
    dataset::Dataset,
    storage::{ChunkReader, StorageError, StorageResult},
};

// ============================================================================
// Metadata Storage using ConfigValue
// ============================================================================

/// Metadata written next to a persisted coreset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoresetMetadata {
    pub name_id: String,
    pub timestamp: String,

    /// Coreset dimensions (Nprime x D)
    pub n_rows: usize,
    pub n_cols: usize,

    /// CoresetBuilder configuration (typed values)
    pub builder_config: HashMap<String, ConfigValue>,

    pub files: HashMap<String, FileInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub file_type: String, // "dense" or "weights"
    pub rows: usize,
    pub cols: usize,
    pub size_bytes: Option<u64>,
}

impl CoresetMetadata {
    pub fn new(name_id: &str) -> Self {
        Self {
            name_id: name_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            n_rows: 0,
            n_cols: 0,
            builder_config: HashMap::new(),
            files: HashMap::new(),
        }
    }

    pub fn with_builder_config(mut self, config: HashMap<String, ConfigValue>) -> Self {
        self.builder_config = config;
        self
    }

    pub fn with_dimensions(mut self, rows: usize, cols: usize) -> Self {
        self.n_rows = rows;
        self.n_cols = cols;
        self
    }

    pub fn add_file(mut self, key: &str, info: FileInfo) -> Self {
        self.files.insert(key.to_string(), info);
        self
    }

    pub fn get_config<'a>(&'a self, key: &str) -> Option<&'a ConfigValue> {
        self.builder_config.get(key)
    }

    /// Requested coreset size, if the builder config was stored.
    pub fn nprime(&self) -> Option<usize> {
        self.get_config("nprime").and_then(|v| v.as_usize())
    }

    /// Fixed sampling seed, `None` when entropy seeding was used.
    pub fn seed(&self) -> Option<u64> {
        self.get_config("seed").and_then(|v| v.as_u64())
    }

    /// Row count of the dataset the coreset was drawn from.
    pub fn source_rows(&self) -> Option<usize> {
        self.get_config("source_rows").and_then(|v| v.as_usize())
    }

    pub fn config_summary(&self) -> String {
        let mut lines: Vec<String> = self
            .builder_config
            .iter()
            .map(|(key, value)| format!("  {} = {}", key, value))
            .collect();
        lines.sort();
        lines.join("\n")
    }
}

/// Save metadata to `{name_id}_metadata.json` under `path`.
pub fn save_metadata(
    metadata: &CoresetMetadata,
    path: impl AsRef<Path>,
    name_id: &str,
) -> StorageResult<()> {
    let metadata_path = path.as_ref().join(format!("{}_metadata.json", name_id));

    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| StorageError::Serde(format!("Failed to serialize metadata: {}", e)))?;

    std::fs::write(&metadata_path, json)
        .map_err(|e| StorageError::Io(format!("Failed to write metadata: {}", e)))?;

    Ok(())
}

/// Load metadata from `{name_id}_metadata.json` under `path`.
pub fn load_metadata(path: impl AsRef<Path>, name_id: &str) -> StorageResult<CoresetMetadata> {
    let metadata_path = path.as_ref().join(format!("{}_metadata.json", name_id));

    info!("loading metadata from {:?}", metadata_path);
    let json = std::fs::read_to_string(&metadata_path)
        .map_err(|e| StorageError::Io(format!("Failed to read metadata: {}", e)))?;

    serde_json::from_str(&json)
        .map_err(|e| StorageError::Serde(format!("Failed to parse metadata: {}", e)))
}

// ============================================================================
// Dense Matrix Storage
// ============================================================================

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Write `rows` of `matrix` as one Parquet file at `file_path`.
///
/// Schema: `name_id, n_rows, n_cols, col_0 .. col_{D-1}`.
fn write_dense_rows(
    matrix: &DenseMatrix<f64>,
    rows: Range<usize>,
    file_path: &Path,
    name_id: &str,
) -> StorageResult<()> {
    let (_, n_cols) = matrix.shape();
    let n_rows = rows.len();

    let mut fields = vec![
        Field::new("name_id", DataType::Utf8, false),
        Field::new("n_rows", DataType::UInt64, false),
        Field::new("n_cols", DataType::UInt64, false),
    ];
    for i in 0..n_cols {
        fields.push(Field::new(format!("col_{}", i), DataType::Float64, false));
    }
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(StringArray::from(vec![name_id; n_rows])),
        Arc::new(UInt64Array::from(vec![n_rows as u64; n_rows])),
        Arc::new(UInt64Array::from(vec![n_cols as u64; n_rows])),
    ];
    for col_idx in 0..n_cols {
        let col_data: Vec<f64> = rows
            .clone()
            .map(|row_idx| *matrix.get((row_idx, col_idx)))
            .collect();
        columns.push(Arc::new(Float64Array::from(col_data)));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| StorageError::Arrow(e.to_string()))?;

    let file = File::create(file_path).map_err(|e| StorageError::Io(e.to_string()))?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(writer_properties()))
        .map_err(|e| StorageError::Parquet(e.to_string()))?;
    writer
        .write(&batch)
        .map_err(|e| StorageError::Parquet(e.to_string()))?;
    writer
        .close()
        .map_err(|e| StorageError::Parquet(e.to_string()))?;

    trace!("Wrote {} rows x {} cols to {:?}", n_rows, n_cols, file_path);
    Ok(())
}

/// Save a DenseMatrix to `{name_id}.parquet` under `path`, returning the file path.
pub fn save_dense_matrix(
    matrix: &DenseMatrix<f64>,
    path: impl AsRef<Path>,
    name_id: &str,
) -> StorageResult<PathBuf> {
    let (n_rows, _) = matrix.shape();
    let file_path = path.as_ref().join(format!("{}.parquet", name_id));
    write_dense_rows(matrix, 0..n_rows, &file_path, name_id)?;
    Ok(file_path)
}

/// Split `matrix` into consecutive chunk files of at most `rows_per_chunk` rows.
///
/// Files are named `{name_id}-chunk-00000.parquet`, `...-00001.parquet`, and
/// returned in row order, ready for `Dataset::open_chunks`.
pub fn save_chunked(
    matrix: &DenseMatrix<f64>,
    path: impl AsRef<Path>,
    name_id: &str,
    rows_per_chunk: usize,
) -> StorageResult<Vec<PathBuf>> {
    if rows_per_chunk == 0 {
        return Err(StorageError::Invalid(
            "rows_per_chunk must be positive".to_string(),
        ));
    }
    let (n_rows, _) = matrix.shape();
    if n_rows == 0 {
        return Err(StorageError::Invalid(
            "Cannot chunk an empty matrix".to_string(),
        ));
    }

    std::fs::create_dir_all(path.as_ref())
        .map_err(|e| StorageError::Io(format!("Failed to create directory: {}", e)))?;

    let mut files = Vec::with_capacity(n_rows.div_ceil(rows_per_chunk));
    let mut start = 0;
    while start < n_rows {
        let end = (start + rows_per_chunk).min(n_rows);
        let chunk_name = format!("{}-chunk-{:05}", name_id, files.len());
        let file_path = path.as_ref().join(format!("{}.parquet", chunk_name));
        write_dense_rows(matrix, start..end, &file_path, &chunk_name)?;
        files.push(file_path);
        start = end;
    }

    debug!(
        "Split {} rows into {} chunks of <= {} rows",
        n_rows,
        files.len(),
        rows_per_chunk
    );
    Ok(files)
}

fn dimension(batch: &RecordBatch, name: &str) -> StorageResult<usize> {
    let col = batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
        .ok_or_else(|| StorageError::Invalid(format!("{} column missing", name)))?;
    if col.is_empty() {
        return Err(StorageError::Invalid(format!("{} column is empty", name)));
    }
    Ok(col.value(0) as usize)
}

fn dense_col_count(schema: &Schema) -> usize {
    schema
        .fields()
        .iter()
        .filter(|f| f.name().starts_with("col_"))
        .count()
}

/// Load a DenseMatrix from a Parquet file written by [`save_dense_matrix`].
///
/// The `n_rows` / `n_cols` columns must agree with the Parquet footer row
/// count and the `col_*` fields of the schema; anything else is reported as
/// [`StorageError::Invalid`] before any buffer is sized from them.
/// Reconstructs the matrix in column-major layout.
pub fn load_dense_matrix(path: impl AsRef<Path>) -> StorageResult<DenseMatrix<f64>> {
    let file = File::open(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| StorageError::Parquet(e.to_string()))?;
    let footer_rows = usize::try_from(builder.metadata().file_metadata().num_rows())
        .map_err(|_| StorageError::Invalid("negative row count in footer".to_string()))?;
    let schema_cols = dense_col_count(builder.schema());
    let reader = builder
        .build()
        .map_err(|e| StorageError::Parquet(e.to_string()))?;

    // (rows, cols) taken from the first batch
    let mut dims: Option<(usize, usize)> = None;
    let mut flat_data: Vec<f64> = Vec::new();
    let mut current_row_offset = 0;

    for batch_result in reader {
        let batch = batch_result.map_err(|e| StorageError::Parquet(e.to_string()))?;

        let (total_rows, cols) = match dims {
            Some(d) => d,
            None => {
                let d = (dimension(&batch, "n_rows")?, dimension(&batch, "n_cols")?);
                if d != (footer_rows, schema_cols) {
                    return Err(StorageError::Invalid(format!(
                        "header declares {} x {}, file holds {} rows and {} value columns",
                        d.0, d.1, footer_rows, schema_cols
                    )));
                }
                let len = d.0.checked_mul(d.1).ok_or_else(|| {
                    StorageError::Invalid(format!("{} x {} overflows usize", d.0, d.1))
                })?;
                flat_data = vec![0.0; len];
                dims = Some(d);
                d
            }
        };
        let batch_rows = batch.num_rows();
        if current_row_offset + batch_rows > total_rows {
            return Err(StorageError::Invalid(format!(
                "Parquet file holds more rows than the {} it declares",
                total_rows
            )));
        }

        for col_idx in 0..cols {
            let col_name = format!("col_{}", col_idx);
            let col = batch
                .column_by_name(&col_name)
                .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
                .ok_or_else(|| StorageError::Invalid(format!("Column {} missing", col_name)))?;

            // Column-major: column K starts at K * total_rows
            let start_idx = (col_idx * total_rows) + current_row_offset;
            flat_data[start_idx..start_idx + batch_rows].copy_from_slice(col.values());
        }

        current_row_offset += batch_rows;
    }

    let Some((n_rows, n_cols)) = dims else {
        return Err(StorageError::Invalid("No data in parquet file".to_string()));
    };

    if current_row_offset != n_rows {
        return Err(StorageError::Invalid(format!(
            "Parquet file contained {} rows, but metadata claimed {}",
            current_row_offset, n_rows
        )));
    }

    Ok(DenseMatrix::from_iterator(
        flat_data.into_iter(),
        n_rows,
        n_cols,
        1,
    ))
}

/// `(rows, cols)` of a dense Parquet file, read from the footer only.
pub fn dense_shape(path: impl AsRef<Path>) -> StorageResult<(usize, usize)> {
    let file = File::open(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| StorageError::Parquet(e.to_string()))?;

    let rows = builder.metadata().file_metadata().num_rows();
    Ok((rows.max(0) as usize, dense_col_count(builder.schema())))
}

// ============================================================================
// Weight Vector Storage
// ============================================================================

/// Save coreset weights to `{name_id}.parquet` as a single `weight` column.
pub fn save_weights(
    weights: &[f64],
    path: impl AsRef<Path>,
    name_id: &str,
) -> StorageResult<PathBuf> {
    let n_values = weights.len();
    if n_values == 0 {
        return Err(StorageError::Invalid(
            "Cannot save empty weight vector".to_string(),
        ));
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("name_id", DataType::Utf8, false),
        Field::new("n_values", DataType::UInt64, false),
        Field::new("row_index", DataType::UInt64, false),
        Field::new("weight", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec![name_id; n_values])),
            Arc::new(UInt64Array::from(vec![n_values as u64; n_values])),
            Arc::new(UInt64Array::from((0..n_values as u64).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(weights.to_vec())),
        ],
    )
    .map_err(|e| StorageError::Arrow(e.to_string()))?;

    let file_path = path.as_ref().join(format!("{}.parquet", name_id));
    let file = File::create(&file_path).map_err(|e| StorageError::Io(e.to_string()))?;

    let mut writer = ArrowWriter::try_new(file, schema, Some(writer_properties()))
        .map_err(|e| StorageError::Parquet(e.to_string()))?;
    writer
        .write(&batch)
        .map_err(|e| StorageError::Parquet(e.to_string()))?;
    writer
        .close()
        .map_err(|e| StorageError::Parquet(e.to_string()))?;

    Ok(file_path)
}

/// Load a weight vector written by [`save_weights`], in row order.
pub fn load_weights(path: impl AsRef<Path>) -> StorageResult<Vec<f64>> {
    let file = File::open(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| StorageError::Parquet(e.to_string()))?
        .build()
        .map_err(|e| StorageError::Parquet(e.to_string()))?;

    let mut weights = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| StorageError::Parquet(e.to_string()))?;

        if weights.is_empty() {
            if let Ok(n_values) = dimension(&batch, "n_values") {
                weights.reserve(n_values);
            }
        }

        let weight_col = batch
            .column_by_name("weight")
            .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
            .ok_or_else(|| StorageError::Invalid("weight column missing".to_string()))?;

        weights.extend_from_slice(weight_col.values());
    }

    Ok(weights)
}

// ============================================================================
// Coreset persistence
// ============================================================================

/// Save a built coreset: `{name}-coreset.parquet`, `{name}-weights.parquet`
/// and `{name}_metadata.json` under `path`.
///
/// Fails if the dataset has no weights, i.e. it was never reduced.
pub fn save_coreset(
    dataset: &Dataset,
    path: impl AsRef<Path>,
    name_id: &str,
    builder: Option<&CoresetBuilder>,
) -> StorageResult<()> {
    let (Some(data), Some(weights)) = (dataset.data(), dataset.weight()) else {
        return Err(StorageError::Invalid(
            "Only a resident dataset with weights can be saved as a coreset".to_string(),
        ));
    };
    let config = builder.map(|b| b.builder_config_typed()).unwrap_or_default();
    save_weighted(data, weights, path, name_id, config)
}

/// Write coreset rows and weights with the given builder configuration.
pub(crate) fn save_weighted(
    data: &DenseMatrix<f64>,
    weights: &[f64],
    path: impl AsRef<Path>,
    name_id: &str,
    builder_config: HashMap<String, ConfigValue>,
) -> StorageResult<()> {
    let base_path = path.as_ref();
    let (n_rows, n_cols) = data.shape();
    if weights.len() != n_rows {
        return Err(StorageError::Invalid(format!(
            "{} weights for {} coreset rows",
            weights.len(),
            n_rows
        )));
    }

    std::fs::create_dir_all(base_path)
        .map_err(|e| StorageError::Io(format!("Failed to create directory: {}", e)))?;

    let matrix_name = format!("{}-coreset", name_id);
    let weights_name = format!("{}-weights", name_id);
    let matrix_path = save_dense_matrix(data, base_path, &matrix_name)?;
    let weights_path = save_weights(weights, base_path, &weights_name)?;

    let mut metadata = CoresetMetadata::new(name_id)
        .with_builder_config(builder_config)
        .with_dimensions(n_rows, n_cols);

    for (key, file_type, file_name, file_path, cols) in [
        ("coreset", "dense", &matrix_name, &matrix_path, n_cols),
        ("weights", "weights", &weights_name, &weights_path, 1),
    ] {
        metadata = metadata.add_file(
            key,
            FileInfo {
                filename: format!("{}.parquet", file_name),
                file_type: file_type.to_string(),
                rows: n_rows,
                cols,
                size_bytes: std::fs::metadata(file_path).map(|m| m.len()).ok(),
            },
        );
    }

    save_metadata(&metadata, base_path, name_id)?;
    info!(
        "Saved coreset '{}' ({} x {}) to {}",
        name_id,
        n_rows,
        n_cols,
        base_path.display()
    );
    Ok(())
}

/// Load a coreset written by [`save_coreset`] back into a resident dataset.
pub fn load_coreset(
    path: impl AsRef<Path>,
    name_id: &str,
) -> StorageResult<(Dataset, CoresetMetadata)> {
    let base_path = path.as_ref();
    let metadata = load_metadata(base_path, name_id)?;

    let data = load_dense_matrix(base_path.join(format!("{}-coreset.parquet", name_id)))?;
    let weights = load_weights(base_path.join(format!("{}-weights.parquet", name_id)))?;

    let dataset = Dataset::from_weighted(data, weights)
        .map_err(|e| StorageError::Invalid(e.to_string()))?;
    Ok((dataset, metadata))
}

// ============================================================================
// Chunk reader
// ============================================================================

/// Reads chunk files written by [`save_dense_matrix`] / [`save_chunked`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetChunkReader;

impl ChunkReader for ParquetChunkReader {
    fn read_chunk(&self, path: &Path) -> StorageResult<Arc<DenseMatrix<f64>>> {
        trace!("Reading chunk {}", path.display());
        load_dense_matrix(path).map(Arc::new)
    }

    fn chunk_shape(&self, path: &Path) -> StorageResult<(usize, usize)> {
        dense_shape(path)
    }
}

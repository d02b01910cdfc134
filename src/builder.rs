//! Coreset builder: configuration and the end-to-end pipeline.
//!
//! `build` runs, on a dedicated rayon pool of `nthreads` workers:
//! mean -> proposal -> parallel sampling -> assembly, and then swaps the
//! coreset into the caller's dataset. Nothing is written to the dataset until
//! every stage (and persistence, when enabled) has succeeded.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use coresets_core::DegeneratePolicy;

use crate::assembler::{Coreset, assemble};
use crate::dataset::Dataset;
use crate::error::{CoresetError, CoresetResult};
use crate::mean::compute_mean;
use crate::proposal::build_proposal;
use crate::sampler::{ParallelSampler, SeedPolicy};
use crate::storage::{ChunkCache, ChunkReader};

/// What to do when more draws than rows are requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OversamplingPolicy {
    /// Sample with replacement as usual, logging a warning.
    #[default]
    Allow,
    /// Refuse with [`CoresetError::Unsupported`].
    Reject,
}

impl OversamplingPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            OversamplingPolicy::Allow => "allow",
            OversamplingPolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for OversamplingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OversamplingPolicy {
    type Err = CoresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(OversamplingPolicy::Allow),
            "reject" => Ok(OversamplingPolicy::Reject),
            other => Err(CoresetError::InvalidArgument(format!(
                "unknown oversampling policy '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoresetBuilder {
    pub(crate) nprime: usize,
    /// `None`: use rayon's default thread count.
    pub(crate) nthreads: Option<usize>,
    pub(crate) seed: SeedPolicy,
    pub(crate) degenerate: DegeneratePolicy,
    pub(crate) oversampling: OversamplingPolicy,
    /// Max chunks kept by the LRU cache in streaming mode, 0 disables it.
    pub(crate) chunk_cache: usize,
    // persistence directory
    pub(crate) persistence: Option<(String, std::path::PathBuf)>,
}

impl Default for CoresetBuilder {
    fn default() -> Self {
        debug!("Creating CoresetBuilder with default parameters");
        Self {
            nprime: 0,
            nthreads: None,
            seed: SeedPolicy::Entropy,
            degenerate: DegeneratePolicy::Fail,
            oversampling: OversamplingPolicy::Allow,
            chunk_cache: 0,
            persistence: None,
        }
    }
}

/// Summary of one coreset construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CoresetReport {
    pub source_rows: usize,
    pub coreset_rows: usize,
    pub n_cols: usize,
    pub nthreads: usize,
    pub streamed: bool,
    pub total_sensitivity: f64,
    pub uniform_fallback: bool,
    pub elapsed: Duration,
}

impl CoresetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of draws, i.e. rows of the coreset. Must be positive.
    pub fn with_nprime(mut self, nprime: usize) -> Self {
        info!("Setting coreset size: {}", nprime);
        self.nprime = nprime;
        self
    }

    pub fn with_threads(mut self, nthreads: usize) -> Self {
        info!("Setting worker threads: {}", nthreads);
        self.nthreads = Some(nthreads);
        self
    }

    /// Fix the sampling seed. Results are then reproducible for a given
    /// seed and thread count.
    pub fn with_seed(mut self, seed: u64) -> Self {
        info!("Setting fixed sampling seed: {}", seed);
        self.seed = SeedPolicy::Fixed(seed);
        self
    }

    pub fn with_seed_policy(mut self, seed: SeedPolicy) -> Self {
        info!("Setting seed policy: {}", seed);
        self.seed = seed;
        self
    }

    pub fn with_degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        info!("Setting degenerate policy: {}", policy);
        self.degenerate = policy;
        self
    }

    pub fn with_oversampling(mut self, policy: OversamplingPolicy) -> Self {
        info!("Setting oversampling policy: {}", policy);
        self.oversampling = policy;
        self
    }

    /// Keep up to `capacity` decoded chunks in memory while assembling a
    /// streamed coreset.
    pub fn with_chunk_cache(mut self, capacity: usize) -> Self {
        info!("Setting chunk cache capacity: {}", capacity);
        self.chunk_cache = capacity;
        self
    }

    /// Enable persistence of the built coreset.
    ///
    /// Writes `{name}-coreset.parquet`, `{name}-weights.parquet` and
    /// `{name}_metadata.json` into `path` before the dataset is replaced.
    ///
    /// # Note
    /// This method is only available when the `storage` feature is enabled.
    #[cfg(feature = "storage")]
    pub fn with_persistence(mut self, path: impl AsRef<std::path::Path>, name: String) -> Self {
        let path_buf: std::path::PathBuf = path.as_ref().to_path_buf();
        info!("Enabling persistence at: {}", path_buf.display());
        self.persistence = Some((name, path_buf));
        self
    }

    pub fn nprime(&self) -> usize {
        self.nprime
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        self.seed
    }

    /// Thread count used by `build`: the configured value or rayon's default.
    pub fn effective_threads(&self) -> usize {
        self.nthreads.unwrap_or_else(rayon::current_num_threads)
    }

    fn validate(&self, dataset: &Dataset) -> CoresetResult<usize> {
        if self.nprime == 0 {
            return Err(CoresetError::InvalidArgument(
                "nprime must be positive".to_string(),
            ));
        }
        let nthreads = self.effective_threads();
        if nthreads == 0 {
            return Err(CoresetError::InvalidArgument(
                "nthreads must be at least 1".to_string(),
            ));
        }
        let (n_rows, n_cols) = dataset.shape();
        if n_rows == 0 || n_cols == 0 {
            return Err(CoresetError::InvalidArgument(format!(
                "dataset shape {} x {} is empty",
                n_rows, n_cols
            )));
        }
        if self.nprime > n_rows {
            match self.oversampling {
                OversamplingPolicy::Allow => warn!(
                    "nprime={} exceeds the {} source rows, rows will repeat",
                    self.nprime, n_rows
                ),
                OversamplingPolicy::Reject => {
                    return Err(CoresetError::Unsupported(format!(
                        "nprime={} exceeds the {} source rows",
                        self.nprime, n_rows
                    )));
                }
            }
        }
        if dataset.weight().is_some() {
            debug!("Dataset already carries weights, they are ignored by the proposal");
        }
        Ok(nthreads)
    }

    /// Replace `dataset` by a weighted coreset of `nprime` rows, reading
    /// chunk files with the Parquet reader.
    #[cfg(feature = "storage")]
    pub fn build(&self, dataset: &mut Dataset) -> CoresetResult<CoresetReport> {
        self.build_with_reader(dataset, &crate::storage::ParquetChunkReader)
    }

    /// Replace `dataset` by a weighted coreset of `nprime` rows.
    ///
    /// Without the `storage` feature only resident datasets can be built
    /// here; use [`CoresetBuilder::build_with_reader`] for chunked ones.
    #[cfg(not(feature = "storage"))]
    pub fn build(&self, dataset: &mut Dataset) -> CoresetResult<CoresetReport> {
        if !dataset.is_resident() {
            return Err(CoresetError::Unsupported(
                "chunked datasets need the `storage` feature or build_with_reader".to_string(),
            ));
        }
        self.build_with_reader(dataset, &crate::storage::MemoryChunkReader::new())
    }

    /// Replace `dataset` by a weighted coreset, reading chunks through `reader`.
    pub fn build_with_reader<R: ChunkReader + ?Sized>(
        &self,
        dataset: &mut Dataset,
        reader: &R,
    ) -> CoresetResult<CoresetReport> {
        let start = Instant::now();
        let nthreads = self.validate(dataset)?;
        let (source_rows, n_cols) = dataset.shape();
        let streamed = !dataset.is_resident();
        info!(
            "Building coreset: {} -> {} rows, {} columns, {} threads, {}",
            source_rows,
            self.nprime,
            n_cols,
            nthreads,
            if streamed { "streaming" } else { "resident" }
        );

        let reader = ChunkCache::new(reader, self.chunk_cache);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(nthreads)
            .build()?;

        let source: &Dataset = dataset;
        let (coreset, stats) = pool.install(|| -> CoresetResult<_> {
            let mean = compute_mean(source, &reader)?;
            let (q, stats) = build_proposal(source, &mean, &reader, self.degenerate)?;
            let draws = ParallelSampler::new(nthreads, self.seed)?.draw(&q, self.nprime)?;
            let coreset = assemble(source, &q, &draws, &reader)?;
            Ok((coreset, stats))
        })?;

        if streamed && self.chunk_cache > 0 {
            let (hits, misses) = reader.stats();
            debug!("Chunk cache: {} hits, {} misses", hits, misses);
        }

        self.persist(&coreset, source_rows)?;

        dataset.replace_with_coreset(coreset);
        let report = CoresetReport {
            source_rows,
            coreset_rows: dataset.n_rows(),
            n_cols,
            nthreads,
            streamed,
            total_sensitivity: stats.total_sensitivity,
            uniform_fallback: stats.uniform_fallback,
            elapsed: start.elapsed(),
        };
        info!(
            "Coreset built in {:?}: {} x {}",
            report.elapsed, report.coreset_rows, report.n_cols
        );
        Ok(report)
    }

    #[cfg(feature = "storage")]
    fn persist(&self, coreset: &Coreset, source_rows: usize) -> CoresetResult<()> {
        if let Some((ref name, ref path)) = self.persistence {
            let mut config = self.builder_config_typed();
            config.insert("source_rows".to_string(), ConfigValue::Usize(source_rows));
            crate::storage::parquet::save_weighted(
                &coreset.data,
                &coreset.weights,
                path,
                name,
                config,
            )?;
        }
        Ok(())
    }

    #[cfg(not(feature = "storage"))]
    fn persist(&self, _coreset: &Coreset, _source_rows: usize) -> CoresetResult<()> {
        Ok(())
    }

    /// Builder configuration as typed values, as stored in coreset metadata.
    pub fn builder_config_typed(&self) -> HashMap<String, ConfigValue> {
        let mut config = HashMap::new();

        config.insert("nprime".to_string(), ConfigValue::Usize(self.nprime));
        config.insert(
            "nthreads".to_string(),
            ConfigValue::OptionUsize(self.nthreads),
        );
        config.insert(
            "seed".to_string(),
            ConfigValue::OptionU64(self.seed.fixed_seed()),
        );
        config.insert(
            "degenerate".to_string(),
            ConfigValue::String(self.degenerate.name().to_string()),
        );
        config.insert(
            "oversampling".to_string(),
            ConfigValue::String(self.oversampling.name().to_string()),
        );
        config.insert(
            "chunk_cache".to_string(),
            ConfigValue::Usize(self.chunk_cache),
        );

        config
    }
}

impl fmt::Display for CoresetBuilder {
    /// Format as comma-separated key=value pairs (cookie-style).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nprime={}, \
             nthreads={}, \
             seed={}, \
             degenerate={}, \
             oversampling={}, \
             chunk_cache={}, \
             persistence={}",
            self.nprime,
            self.nthreads.map_or("None".to_string(), |n| n.to_string()),
            self.seed,
            self.degenerate,
            self.oversampling,
            self.chunk_cache,
            self.persistence
                .as_ref()
                .map_or("None".to_string(), |s| s.1.display().to_string())
        )
    }
}

/// Configuration value that can hold different types while preserving type information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigValue {
    Bool(bool),
    Usize(usize),
    F64(f64),
    U64(u64),
    String(String),
    OptionUsize(Option<usize>),
    OptionU64(Option<u64>),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ConfigValue::Usize(v) => Some(*v),
            ConfigValue::OptionUsize(v) => *v,
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConfigValue::U64(v) => Some(*v),
            ConfigValue::OptionU64(v) => *v,
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "{}", v),
            ConfigValue::Usize(v) => write!(f, "{}", v),
            ConfigValue::F64(v) => write!(f, "{}", v),
            ConfigValue::U64(v) => write!(f, "{}", v),
            ConfigValue::String(v) => write!(f, "{}", v),
            ConfigValue::OptionUsize(opt) => match opt {
                Some(v) => write!(f, "{}", v),
                None => write!(f, "None"),
            },
            ConfigValue::OptionU64(opt) => match opt {
                Some(v) => write!(f, "{}", v),
                None => write!(f, "None"),
            },
        }
    }
}

/// Reduce `dataset` in place to `nprime` weighted rows using `nthreads` workers.
pub fn build_coreset(
    dataset: &mut Dataset,
    nprime: usize,
    nthreads: usize,
) -> CoresetResult<CoresetReport> {
    CoresetBuilder::new()
        .with_nprime(nprime)
        .with_threads(nthreads)
        .build(dataset)
}

/// Coreset of a resident matrix: returns the `nprime x D` rows and their weights.
pub fn generate(
    data: &DenseMatrix<f64>,
    nprime: usize,
) -> CoresetResult<(DenseMatrix<f64>, Vec<f64>)> {
    let mut dataset = Dataset::from_matrix(data.clone())?;
    CoresetBuilder::new().with_nprime(nprime).build(&mut dataset)?;
    let weights = dataset.weight().map(<[f64]>::to_vec).unwrap_or_default();
    match dataset.source {
        crate::dataset::DataSource::Resident(m) => Ok((m, weights)),
        crate::dataset::DataSource::Chunked(_) => Err(CoresetError::InvalidState(
            "coreset construction left a chunked dataset".to_string(),
        )),
    }
}

//! # coresets
//!
//! Importance-sampled weighted coresets. A dataset of `N` rows (resident in
//! memory or spread over chunk files) is reduced in place to `Nprime` rows
//! drawn with probability
//!
//! ```text
//! q[n] = 0.5 * ( ||x_n - u||^2 / Σ_m ||x_m - u||^2  +  1 / N )
//! ```
//!
//! where `u` is the column mean, each carrying the weight `1 / (q[n] * Nprime)`.
//!
//! ```ignore
//! use coresets::{CoresetBuilder, Dataset};
//!
//! let mut dataset = Dataset::from_rows(&rows)?;
//! let report = CoresetBuilder::new()
//!     .with_nprime(1_000)
//!     .with_threads(8)
//!     .with_seed(42)
//!     .build(&mut dataset)?;
//! assert_eq!(dataset.n_rows(), 1_000);
//! ```
//!
//! Stages, each usable on its own:
//! - [`mean`]: column mean, resident or streamed chunk by chunk
//! - [`proposal`]: sensitivities and the mixed proposal `q`
//! - [`sampler`]: parallel draws with one seeded generator per worker
//! - [`assembler`]: gathering drawn rows and their weights
//! - [`builder`]: configuration and the end-to-end pipeline
//! - [`storage`]: chunk readers, LRU chunk cache, Parquet persistence

pub mod assembler;
pub mod builder;
pub mod dataset;
pub mod error;
pub mod mean;
pub mod proposal;
pub mod sampler;
pub mod storage;

pub use assembler::{Coreset, assemble};
pub use builder::{
    ConfigValue, CoresetBuilder, CoresetReport, OversamplingPolicy, build_coreset, generate,
};
pub use coresets_core::{ChunkOffsets, DegeneratePolicy, ProposalStats};
pub use dataset::{ChunkedFiles, DataSource, Dataset};
pub use error::{CoresetError, CoresetResult};
pub use mean::compute_mean;
pub use proposal::{build_proposal, compute_sensitivities};
pub use sampler::{ParallelSampler, SeedPolicy, WorkerRngs, draw_with_rngs};

#[cfg(test)]
mod tests;

//! # coresets-core
//!
//! Numeric kernels behind coreset construction. Nothing in here touches the
//! filesystem or spawns threads: the root `coresets` crate decides how rows
//! are fetched and partitioned, these functions only do the arithmetic.
//!
//! - [`stats`]: running column sums and squared distances to the mean
//! - [`proposal`]: mixing sensitivities with the uniform floor, importance weights
//! - [`offsets`]: prefix offsets over chunk files and global-to-local row lookup

pub mod error;
pub mod offsets;
pub mod proposal;
pub mod stats;

pub use error::{CoreError, CoreResult};
pub use offsets::ChunkOffsets;
pub use proposal::{DegeneratePolicy, ProposalStats, importance_weight, mix_with_uniform};
pub use stats::{MeanAccumulator, squared_distance_iter};

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) fn init() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("debug");
        let _ = env_logger::Builder::from_env(env).is_test(true).try_init();
    });
}

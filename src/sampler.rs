//! Parallel sampler: `Nprime` i.i.d. draws from the proposal `q`.
//!
//! Every worker owns one `ChaCha8Rng`. The output is split statically into
//! contiguous ranges of `ceil(Nprime / T)` slots and worker `t` fills range
//! `t` with its own generator, so no generator state is ever shared.
//!
//! With [`SeedPolicy::Entropy`] (the default) each run draws fresh seeds and
//! results differ between runs. With [`SeedPolicy::Fixed`] all workers start
//! from the same seed on distinct ChaCha streams, and the draws are
//! reproducible for a given seed and thread count.

use std::fmt;
use std::str::FromStr;

use log::{debug, info, trace};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::error::{CoresetError, CoresetResult};

/// Outputs discarded from each generator before its first draw.
pub const WARMUP_DRAWS: usize = 1000;

/// 32-bit entropy words per generator seed.
const ENTROPY_WORDS: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Fresh OS-backed entropy for every generator on every call.
    #[default]
    Entropy,
    /// Reproducible: worker `t` uses stream `t` of the generator seeded with this value.
    Fixed(u64),
}

impl SeedPolicy {
    pub fn fixed_seed(&self) -> Option<u64> {
        match self {
            SeedPolicy::Entropy => None,
            SeedPolicy::Fixed(seed) => Some(*seed),
        }
    }
}

impl fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedPolicy::Entropy => write!(f, "entropy"),
            SeedPolicy::Fixed(seed) => write!(f, "{}", seed),
        }
    }
}

impl FromStr for SeedPolicy {
    type Err = CoresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entropy" => Ok(SeedPolicy::Entropy),
            other => other.parse::<u64>().map(SeedPolicy::Fixed).map_err(|_| {
                CoresetError::InvalidArgument(format!("seed must be 'entropy' or a u64, got '{other}'"))
            }),
        }
    }
}

fn warm_up(rng: &mut ChaCha8Rng) {
    for _ in 0..WARMUP_DRAWS {
        rng.next_u32();
    }
}

/// One generator per worker, owned by the caller and lent to the sampler.
#[derive(Debug, Clone)]
pub struct WorkerRngs {
    rngs: Vec<ChaCha8Rng>,
}

impl WorkerRngs {
    pub fn from_policy(policy: SeedPolicy, n_workers: usize) -> CoresetResult<Self> {
        if n_workers == 0 {
            return Err(CoresetError::InvalidArgument(
                "need at least one worker generator".to_string(),
            ));
        }
        let rngs = match policy {
            SeedPolicy::Entropy => Self::entropy(n_workers),
            SeedPolicy::Fixed(seed) => Self::fixed(seed, n_workers),
        };
        debug!("Seeded {} worker generators ({})", n_workers, policy);
        Ok(Self { rngs })
    }

    fn entropy(n_workers: usize) -> Vec<ChaCha8Rng> {
        let mut entropy = rand::rng();
        (0..n_workers)
            .map(|_| {
                let mut seed = [0u8; 32];
                for word in seed.chunks_exact_mut(32 / ENTROPY_WORDS) {
                    word.copy_from_slice(&entropy.next_u32().to_le_bytes());
                }
                let mut rng = ChaCha8Rng::from_seed(seed);
                warm_up(&mut rng);
                rng
            })
            .collect()
    }

    fn fixed(seed: u64, n_workers: usize) -> Vec<ChaCha8Rng> {
        (0..n_workers)
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(t as u64);
                warm_up(&mut rng);
                rng
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rngs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rngs.is_empty()
    }

    pub fn as_mut_slice(&mut self) -> &mut [ChaCha8Rng] {
        &mut self.rngs
    }

    pub fn into_inner(self) -> Vec<ChaCha8Rng> {
        self.rngs
    }
}

/// Draws indices from a proposal distribution across `nthreads` workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelSampler {
    nthreads: usize,
    seed: SeedPolicy,
}

impl ParallelSampler {
    pub fn new(nthreads: usize, seed: SeedPolicy) -> CoresetResult<Self> {
        if nthreads == 0 {
            return Err(CoresetError::InvalidArgument(
                "nthreads must be at least 1".to_string(),
            ));
        }
        Ok(Self { nthreads, seed })
    }

    pub fn nthreads(&self) -> usize {
        self.nthreads
    }

    /// Draw `nprime` indices in `[0, q.len())` with replacement.
    pub fn draw(&self, q: &[f64], nprime: usize) -> CoresetResult<Vec<usize>> {
        check_draw_args(q, nprime)?;
        let mut rngs = WorkerRngs::from_policy(self.seed, self.nthreads)?;
        draw_with_rngs(q, nprime, rngs.as_mut_slice())
    }
}

fn check_draw_args(q: &[f64], nprime: usize) -> CoresetResult<()> {
    if q.is_empty() {
        return Err(CoresetError::InvalidArgument(
            "cannot sample from an empty distribution".to_string(),
        ));
    }
    if nprime == 0 {
        return Err(CoresetError::InvalidArgument(
            "nprime must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Draw `nprime` indices using caller-owned generators, one per worker.
///
/// Range `t` of the output is filled by `rngs[t]`; the result only depends on
/// the generators' states and `rngs.len()`, never on thread scheduling.
pub fn draw_with_rngs(
    q: &[f64],
    nprime: usize,
    rngs: &mut [ChaCha8Rng],
) -> CoresetResult<Vec<usize>> {
    check_draw_args(q, nprime)?;
    if rngs.is_empty() {
        return Err(CoresetError::InvalidArgument(
            "need at least one worker generator".to_string(),
        ));
    }

    let dist = WeightedIndex::new(q).map_err(|e| {
        CoresetError::InvalidArgument(format!("invalid proposal distribution: {e}"))
    })?;

    let per_worker = nprime.div_ceil(rngs.len());
    info!(
        "Drawing {} samples over {} points, {} per worker",
        nprime,
        q.len(),
        per_worker
    );

    let mut draws = vec![0usize; nprime];
    draws
        .par_chunks_mut(per_worker)
        .zip(rngs.par_iter_mut())
        .enumerate()
        .for_each(|(t, (slots, rng))| {
            for slot in slots.iter_mut() {
                *slot = dist.sample(rng);
            }
            trace!("Worker {} drew {} samples", t, slots.len());
        });

    Ok(draws)
}

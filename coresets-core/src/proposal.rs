// coresets-core/src/proposal.rs
//! Proposal distribution for sensitivity sampling.
//!
//! Each point gets `q[n] = 0.5 * (s[n] / Σs + 1 / N)`: half the mass follows
//! the squared distance to the mean, half is spread uniformly. The uniform
//! half keeps every `q[n] > 0`, so the importance weight `1 / (q[n] * N')`
//! is always finite.

use log::{debug, warn};

use crate::error::{CoreError, CoreResult};

/// What to do when every point coincides with the mean (`Σs == 0`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DegeneratePolicy {
    /// Return [`CoreError::InvalidState`].
    #[default]
    Fail,
    /// Fall back to the pure uniform distribution `q[n] = 1 / N`.
    Uniform,
}

impl DegeneratePolicy {
    /// Stable lowercase name used in logs and persisted configuration.
    pub fn name(&self) -> &'static str {
        match self {
            DegeneratePolicy::Fail => "fail",
            DegeneratePolicy::Uniform => "uniform",
        }
    }
}

impl std::fmt::Display for DegeneratePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for DegeneratePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(DegeneratePolicy::Fail),
            "uniform" => Ok(DegeneratePolicy::Uniform),
            other => Err(CoreError::InvalidArgument(format!(
                "unknown degenerate policy '{other}'"
            ))),
        }
    }
}

/// Summary of a proposal build, reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposalStats {
    /// Σs over all points.
    pub total_sensitivity: f64,
    /// True when the degenerate fallback produced a uniform `q`.
    pub uniform_fallback: bool,
}

/// Turn raw sensitivities into the mixed proposal distribution, in place.
///
/// The total is summed sequentially in index order so the result does not
/// depend on how the sensitivities were computed.
pub fn mix_with_uniform(
    sensitivities: &mut [f64],
    policy: DegeneratePolicy,
) -> CoreResult<ProposalStats> {
    let n = sensitivities.len();
    if n == 0 {
        return Err(CoreError::InvalidArgument(
            "cannot build a proposal over zero points".to_string(),
        ));
    }

    let total: f64 = sensitivities.iter().sum();
    let uniform = 1.0 / n as f64;
    debug!("Proposal over {} points, total sensitivity {:.6e}", n, total);

    if !total.is_finite() || total < 0.0 {
        return Err(CoreError::InvalidState(format!(
            "total sensitivity is {total}, input contains non-finite values"
        )));
    }

    if total == 0.0 {
        return match policy {
            DegeneratePolicy::Fail => Err(CoreError::InvalidState(
                "total sensitivity is zero: every point equals the mean".to_string(),
            )),
            DegeneratePolicy::Uniform => {
                warn!("All {} points equal the mean, using a uniform proposal", n);
                sensitivities.iter_mut().for_each(|q| *q = uniform);
                Ok(ProposalStats {
                    total_sensitivity: 0.0,
                    uniform_fallback: true,
                })
            }
        };
    }

    for q in sensitivities.iter_mut() {
        *q = 0.5 * (*q / total + uniform);
    }

    Ok(ProposalStats {
        total_sensitivity: total,
        uniform_fallback: false,
    })
}

/// Importance weight of a point drawn with probability `q_n` in a sample of
/// `nprime` draws.
#[inline]
pub fn importance_weight(q_n: f64, nprime: usize) -> f64 {
    1.0 / (q_n * nprime as f64)
}

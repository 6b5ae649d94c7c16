//! Density-peak representativeness.
//!
//! For a bandwidth `dc`, every instance gets
//!
//! ```text
//! density[i]         = sum_j exp(-distance(i, j)^2 / dc^2)
//! master[i]          = nearest j with density[j] > density[i]
//! master_distance[i] = distance(i, master[i])
//! score[i]           = density[i] * master_distance[i]
//! ```
//!
//! High scores mark instances that sit in a dense region yet far from any
//! denser one, i.e. good cluster representatives for a cold start.
//!
//! An instance with no strictly denser neighbor is a density peak and has no
//! master. What it scores is decided by [`PeakPolicy`].

use tracing::debug;

use crate::rank::descending_rank;
use crate::{Error, PartialLabelDataset, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PeakPolicy {
    /// Peaks get a master distance of 0, hence a score of 0.
    #[default]
    Zero,
    /// Peaks get the largest master distance observed among non-peaks.
    MaxMasterDistance,
}

#[derive(Debug, Clone)]
pub struct Representativeness {
    density: Vec<f64>,
    masters: Vec<Option<usize>>,
    master_distance: Vec<f64>,
    scores: Vec<f64>,
    ranking: Vec<usize>,
}

impl Representativeness {
    pub fn compute(data: &PartialLabelDataset, dc: f64, policy: PeakPolicy) -> Result<Self> {
        if !(dc.is_finite() && dc > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "dc must be finite and > 0, got {dc}"
            )));
        }

        let n = data.num_instances();
        let dc2 = dc * dc;
        let density: Vec<f64> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let d = data.distance(i, j);
                        (-d * d / dc2).exp()
                    })
                    .sum()
            })
            .collect();

        let mut masters = vec![None; n];
        let mut master_distance = vec![0.0; n];
        for i in 0..n {
            let mut nearest = f64::INFINITY;
            for j in 0..n {
                if density[j] <= density[i] {
                    continue;
                }
                let d = data.distance(i, j);
                // Strict comparison: the earliest index wins ties.
                if d < nearest {
                    nearest = d;
                    masters[i] = Some(j);
                    master_distance[i] = d;
                }
            }
        }

        if policy == PeakPolicy::MaxMasterDistance {
            let max = master_distance.iter().copied().fold(0.0, f64::max);
            for (d, m) in master_distance.iter_mut().zip(&masters) {
                if m.is_none() {
                    *d = max;
                }
            }
        }

        let scores: Vec<f64> = density
            .iter()
            .zip(&master_distance)
            .map(|(rho, delta)| rho * delta)
            .collect();
        let ranking = descending_rank(&scores);

        debug!(
            instances = n,
            dc,
            peaks = masters.iter().filter(|m| m.is_none()).count(),
            "computed representativeness"
        );

        Ok(Self {
            density,
            masters,
            master_distance,
            scores,
            ranking,
        })
    }

    #[inline]
    pub fn density(&self) -> &[f64] {
        &self.density
    }

    /// Nearest strictly denser instance; `None` for density peaks.
    #[inline]
    pub fn masters(&self) -> &[Option<usize>] {
        &self.masters
    }

    #[inline]
    pub fn master_distance(&self) -> &[f64] {
        &self.master_distance
    }

    #[inline]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Instance indices, most representative first.
    #[inline]
    pub fn ranking(&self) -> &[usize] {
        &self.ranking
    }
}

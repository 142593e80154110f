use log::debug;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distance::DescriptorDistance;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchConfig {
    /// Keep only mutual nearest neighbors.
    pub cross_check: bool,
    /// Lowe ratio test: best/second-best must fall below this. 1.0 disables.
    pub max_ratio: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { cross_check: true, max_ratio: 1.0 }
    }
}

/// Nearest-neighbor descriptor matching between two sets of the same
/// family. Returns index pairs `(i, j)` sorted by `i`; each `i` appears at
/// most once, and under cross-check each `j` does too. Ties break toward
/// the lowest index.
pub fn match_descriptors<D: DescriptorDistance>(
    a: &[D],
    b: &[D],
    cfg: &MatchConfig,
) -> Vec<(usize, usize)> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let forward: Vec<Option<usize>> = a
        .par_iter()
        .map(|desc| nearest(desc, b, cfg.max_ratio))
        .collect();

    let matches: Vec<(usize, usize)> = if cfg.cross_check {
        let backward: Vec<Option<usize>> = b
            .par_iter()
            .map(|desc| nearest(desc, a, cfg.max_ratio))
            .collect();
        forward
            .iter()
            .enumerate()
            .filter_map(|(i, &fwd)| {
                let j = fwd?;
                (backward[j] == Some(i)).then_some((i, j))
            })
            .collect()
    } else {
        forward
            .iter()
            .enumerate()
            .filter_map(|(i, &fwd)| fwd.map(|j| (i, j)))
            .collect()
    };

    debug!("matcher: {} pairs from {}x{} descriptors", matches.len(), a.len(), b.len());
    matches
}

/// Index of the nearest neighbor of `query` in `candidates`, or `None`
/// when the ratio test rejects an ambiguous best.
fn nearest<D: DescriptorDistance>(query: &D, candidates: &[D], max_ratio: f32) -> Option<usize> {
    let mut best = f32::INFINITY;
    let mut second = f32::INFINITY;
    let mut best_idx = None;

    for (j, cand) in candidates.iter().enumerate() {
        let d = query.distance(cand);
        if d < best {
            second = best;
            best = d;
            best_idx = Some(j);
        } else if d < second {
            second = d;
        }
    }

    if max_ratio < 1.0 && second.is_finite() && best > max_ratio * second {
        return None;
    }
    best_idx
}

use coreg_core::Point2;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MIN_SAMPLES};
use crate::similarity::SimilarityTransform;

/// Two sample points closer than this are treated as one and the sample
/// is skipped as degenerate.
const DEGENERACY_EPS: f32 = 1e-3;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RansacConfig {
    /// Inlier residual bound in image-pixel units.
    pub residual_threshold: f32,
    /// Consensus sampling trial budget.
    pub max_trials: usize,
    /// Fixed RNG seed for reproducible runs; `None` draws entropy.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub seed: Option<u64>,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            residual_threshold: 2.0,
            max_trials: 100,
            seed: None,
        }
    }
}

/// Consensus filtering outcome: the inlier subset in original relative
/// order, plus the refit transform (`None` when no model won any support).
#[derive(Debug, Clone)]
pub struct RansacResult {
    pub src: Vec<Point2>,
    pub dst: Vec<Point2>,
    pub model: Option<SimilarityTransform>,
}

impl RansacResult {
    fn empty() -> Self {
        Self { src: Vec::new(), dst: Vec::new(), model: None }
    }
}

/// Random-sample-consensus outlier rejection against a single shared
/// similarity transform.
///
/// Repeatedly fits candidate transforms to minimal 3-pair samples, scores
/// them by inlier count under `residual_threshold`, refits over the best
/// consensus set, and recomputes membership against the refit. Degenerate
/// samples (coincident points) are skipped within a trial; collinear
/// samples are fine for a 4-DOF fit and are not rejected.
pub fn filter_outliers(
    src: &[Point2],
    dst: &[Point2],
    cfg: &RansacConfig,
) -> Result<RansacResult, MatchError> {
    if src.len() != dst.len() {
        return Err(MatchError::LengthMismatch { src: src.len(), dst: dst.len() });
    }
    if src.len() < MIN_SAMPLES {
        return Err(MatchError::DegenerateInput { found: src.len(), required: MIN_SAMPLES });
    }

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut best: Option<(SimilarityTransform, usize)> = None;

    for _ in 0..cfg.max_trials {
        let picks = rand::seq::index::sample(&mut rng, src.len(), MIN_SAMPLES);
        let sample_src: Vec<Point2> = picks.iter().map(|i| src[i]).collect();
        let sample_dst: Vec<Point2> = picks.iter().map(|i| dst[i]).collect();

        if is_degenerate_sample(&sample_src) || is_degenerate_sample(&sample_dst) {
            continue;
        }
        let Some(candidate) = SimilarityTransform::fit(&sample_src, &sample_dst) else {
            continue;
        };

        let support = count_inliers(&candidate, src, dst, cfg.residual_threshold);
        // Strict comparison keeps the first candidate found on ties.
        if best.as_ref().map_or(true, |&(_, best_support)| support > best_support) {
            best = Some((candidate, support));
        }
    }

    let Some((best_model, best_support)) = best else {
        debug!("ransac: no usable sample in {} trials", cfg.max_trials);
        return Ok(RansacResult::empty());
    };
    if best_support == 0 {
        return Ok(RansacResult::empty());
    }

    // Standard refinement: refit over the winning consensus set, then
    // recompute membership against the refit.
    let consensus = inlier_mask(&best_model, src, dst, cfg.residual_threshold);
    let (consensus_src, consensus_dst) = select(src, dst, &consensus);
    let model = SimilarityTransform::fit(&consensus_src, &consensus_dst).unwrap_or(best_model);

    let final_mask = inlier_mask(&model, src, dst, cfg.residual_threshold);
    let (clean_src, clean_dst) = select(src, dst, &final_mask);

    debug!(
        "ransac: kept {} of {} pairs (best consensus {})",
        clean_src.len(),
        src.len(),
        best_support
    );

    if clean_src.is_empty() {
        return Ok(RansacResult::empty());
    }
    Ok(RansacResult { src: clean_src, dst: clean_dst, model: Some(model) })
}

fn is_degenerate_sample(points: &[Point2]) -> bool {
    for i in 0..points.len() {
        for j in i + 1..points.len() {
            let dx = points[i].x - points[j].x;
            let dy = points[i].y - points[j].y;
            if dx * dx + dy * dy < DEGENERACY_EPS {
                return true;
            }
        }
    }
    false
}

fn count_inliers(
    model: &SimilarityTransform,
    src: &[Point2],
    dst: &[Point2],
    threshold: f32,
) -> usize {
    src.iter()
        .zip(dst.iter())
        .filter(|(s, d)| model.residual(**s, **d) <= threshold)
        .count()
}

fn inlier_mask(
    model: &SimilarityTransform,
    src: &[Point2],
    dst: &[Point2],
    threshold: f32,
) -> Vec<bool> {
    src.iter()
        .zip(dst.iter())
        .map(|(s, d)| model.residual(*s, *d) <= threshold)
        .collect()
}

fn select(src: &[Point2], dst: &[Point2], mask: &[bool]) -> (Vec<Point2>, Vec<Point2>) {
    let mut clean_src = Vec::new();
    let mut clean_dst = Vec::new();
    for (i, &keep) in mask.iter().enumerate() {
        if keep {
            clean_src.push(src[i]);
            clean_dst.push(dst[i]);
        }
    }
    (clean_src, clean_dst)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_points(max_len: usize) -> impl Strategy<Value = Vec<(f32, f32)>> {
        prop::collection::vec((0.0f32..500.0, 0.0f32..500.0), MIN_SAMPLES..max_len)
    }

    proptest! {
        #[test]
        fn prop_output_is_an_ordered_subset(pairs in arb_points(40), seed in 0u64..1000) {
            let src: Vec<Point2> = pairs.iter().map(|&(x, y)| Point2::new(x, y)).collect();
            let dst: Vec<Point2> = pairs.iter().map(|&(x, y)| Point2::new(y, x)).collect();
            let cfg = RansacConfig { seed: Some(seed), ..RansacConfig::default() };

            let result = filter_outliers(&src, &dst, &cfg).unwrap();
            prop_assert_eq!(result.src.len(), result.dst.len());
            prop_assert!(result.src.len() <= src.len());

            // Every kept pair appears in the input, in order.
            let mut cursor = 0;
            for (s, d) in result.src.iter().zip(result.dst.iter()) {
                let found = src[cursor..]
                    .iter()
                    .zip(dst[cursor..].iter())
                    .position(|(ps, pd)| ps == s && pd == d);
                prop_assert!(found.is_some());
                cursor += found.unwrap() + 1;
            }
        }

        #[test]
        fn prop_kept_pairs_satisfy_the_model(pairs in arb_points(30), seed in 0u64..1000) {
            let src: Vec<Point2> = pairs.iter().map(|&(x, y)| Point2::new(x, y)).collect();
            let dst: Vec<Point2> = pairs.iter().map(|&(x, y)| Point2::new(x + 3.0, y - 2.0)).collect();
            let cfg = RansacConfig { seed: Some(seed), ..RansacConfig::default() };

            let result = filter_outliers(&src, &dst, &cfg).unwrap();
            if let Some(model) = result.model {
                for (s, d) in result.src.iter().zip(result.dst.iter()) {
                    prop_assert!(model.residual(*s, *d) <= cfg.residual_threshold + 1e-3);
                }
            } else {
                prop_assert!(result.src.is_empty());
            }
        }
    }
}

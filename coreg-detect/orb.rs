use coreg_core::{BinaryDescriptor, GrayImage, Keypoint};
use log::debug;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};
use crate::pyramid::{build_pyramid, generate_scale_levels, ScaleLevel};
use crate::{brief, fast};

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrbConfig {
    /// Segment-test contrast threshold.
    pub threshold: u8,
    /// Odd patch size for the intensity-centroid orientation.
    pub patch_size: usize,
    /// Minimum distance between keypoints within one scale level.
    pub nms_distance: f32,
    /// Response-ranked keypoint budget across all levels.
    pub max_keypoints: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 31,
            nms_distance: 3.0,
            max_keypoints: 500,
        }
    }
}

/// Corner/binary detector strategy: segment-test corners over an image
/// pyramid with steered binary descriptors.
pub struct OrbDetector {
    cfg: OrbConfig,
}

impl OrbDetector {
    pub fn new(cfg: OrbConfig) -> DetectResult<Self> {
        if cfg.threshold == 0 || cfg.threshold > 127 {
            return Err(DetectError::InvalidThreshold(cfg.threshold));
        }
        if cfg.patch_size % 2 == 0 || cfg.patch_size < 7 {
            return Err(DetectError::InvalidPatchSize { patch_size: cfg.patch_size });
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &OrbConfig {
        &self.cfg
    }

    /// Detect keypoints and produce one descriptor per keypoint. Keypoint
    /// coordinates are reported in base-image (row, col) units; images too
    /// small or too flat to contain corners yield empty sequences.
    pub fn detect_and_describe(
        &self,
        img: &GrayImage,
    ) -> DetectResult<(Vec<Keypoint>, Vec<BinaryDescriptor>)> {
        let scale_levels = generate_scale_levels(img.width(), img.height());
        if scale_levels.is_empty() {
            // Below the pyramid floor: scan the original image as one level.
            let single = ScaleLevel {
                level: 0,
                scale: 1.0,
                width: img.width(),
                height: img.height(),
            };
            let features = self.features_at_level(img, &single);
            return Ok(self.select_best(features));
        }

        let pyramid = build_pyramid(img, &scale_levels);

        let features: Vec<(Keypoint, BinaryDescriptor)> = scale_levels
            .par_iter()
            .zip(pyramid.par_iter())
            .flat_map(|(sl, level_img)| self.features_at_level(level_img, sl))
            .collect();

        debug!(
            "orb: {} keypoints across {} levels ({}x{})",
            features.len(),
            scale_levels.len(),
            img.width(),
            img.height()
        );

        Ok(self.select_best(features))
    }

    fn features_at_level(
        &self,
        level_img: &GrayImage,
        sl: &ScaleLevel,
    ) -> Vec<(Keypoint, BinaryDescriptor)> {
        let corners = fast::detect_corners(level_img, self.cfg.threshold);
        let kept = fast::non_maximum_suppression(&corners, self.cfg.nms_distance);
        debug!("orb: level {} kept {}/{} corners", sl.level, kept.len(), corners.len());

        kept.into_iter()
            .map(|c| {
                let angle =
                    fast::compute_orientation(level_img, c.row, c.col, self.cfg.patch_size);
                let descriptor = brief::describe(level_img, c.row as f32, c.col as f32, angle);
                let keypoint = Keypoint {
                    row: c.row as f32 * sl.scale,
                    col: c.col as f32 * sl.scale,
                    angle,
                    response: c.response,
                    scale: sl.scale,
                };
                (keypoint, descriptor)
            })
            .collect()
    }

    fn select_best(
        &self,
        mut features: Vec<(Keypoint, BinaryDescriptor)>,
    ) -> (Vec<Keypoint>, Vec<BinaryDescriptor>) {
        features.sort_by(|a, b| {
            b.0.response
                .partial_cmp(&a.0.response)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        features.truncate(self.cfg.max_keypoints);
        features.into_iter().unzip()
    }
}

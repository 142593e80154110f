//! Composed feature-correspondence pipeline: detector + matcher + robust
//! filter behind one interface, plus the name-keyed matcher registry the
//! UI layer drives.

mod config;
mod registry;

pub use config::PipelineConfig;
pub use registry::{create_matcher, create_matcher_with, matcher_names};

use coreg_core::{GrayImage, Point2};
use coreg_detect::{DetectError, Detector, OrbConfig, OrbDetector, SiftConfig, SiftDetector};
use coreg_match::{
    filter_outliers, match_descriptors, DescriptorDistance, MatchConfig, MatchError, RansacConfig,
};
use log::debug;

#[derive(Debug)]
pub enum CoregError {
    Detect(DetectError),
    Match(MatchError),
    UnknownMatcher(String),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for CoregError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoregError::Detect(e) => write!(f, "Detection error: {}", e),
            CoregError::Match(e) => write!(f, "Matching error: {}", e),
            CoregError::UnknownMatcher(name) => {
                write!(f, "No feature matcher is registered under the name: {}", name)
            }
            CoregError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
        }
    }
}

impl std::error::Error for CoregError {}

impl From<DetectError> for CoregError {
    fn from(err: DetectError) -> Self {
        CoregError::Detect(err)
    }
}

impl From<MatchError> for CoregError {
    fn from(err: MatchError) -> Self {
        CoregError::Match(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for CoregError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        CoregError::ThreadPool(err)
    }
}

pub type CoregResult<T> = Result<T, CoregError>;

/// An object that takes two images and identifies matching points on them.
///
/// The returned sequences have equal length; `points_a[i]` and
/// `points_b[i]` are believed to depict the same physical feature, as
/// (x, y) pairs in image-pixel units.
pub trait FeatureMatcher {
    fn name(&self) -> &'static str;

    fn match_images(
        &self,
        fixed: &GrayImage,
        moving: &GrayImage,
    ) -> CoregResult<(Vec<Point2>, Vec<Point2>)>;
}

/// Detect on both images, match descriptors, and keep the consensus
/// inliers. The detectors report (row, col); matched keypoints are swapped
/// into (x, y) `Point2`s before filtering.
fn run_pipeline<D>(
    detector: &D,
    matching: &MatchConfig,
    ransac: &RansacConfig,
    fixed: &GrayImage,
    moving: &GrayImage,
) -> CoregResult<(Vec<Point2>, Vec<Point2>)>
where
    D: Detector,
    D::Descriptor: DescriptorDistance,
{
    let (keypoints_a, descriptors_a) = detector.detect_and_describe(fixed)?;
    let (keypoints_b, descriptors_b) = detector.detect_and_describe(moving)?;
    debug!(
        "pipeline: {} fixed / {} moving keypoints",
        keypoints_a.len(),
        keypoints_b.len()
    );

    let pairs = match_descriptors(&descriptors_a, &descriptors_b, matching);
    if pairs.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let (src, dst): (Vec<Point2>, Vec<Point2>) = pairs
        .iter()
        .map(|&(i, j)| (Point2::from(keypoints_a[i]), Point2::from(keypoints_b[j])))
        .unzip();

    let filtered = filter_outliers(&src, &dst, ransac)?;
    debug!("pipeline: {} of {} pairs kept", filtered.src.len(), src.len());
    Ok((filtered.src, filtered.dst))
}

/// Feature matcher built on the corner/binary detector strategy.
pub struct OrbMatcher {
    detector: OrbDetector,
    matching: MatchConfig,
    ransac: RansacConfig,
}

impl OrbMatcher {
    pub fn new() -> CoregResult<Self> {
        Self::with_configs(OrbConfig::default(), MatchConfig::default(), RansacConfig::default())
    }

    pub fn with_configs(
        detector: OrbConfig,
        matching: MatchConfig,
        ransac: RansacConfig,
    ) -> CoregResult<Self> {
        Ok(Self {
            detector: OrbDetector::new(detector)?,
            matching,
            ransac,
        })
    }
}

impl FeatureMatcher for OrbMatcher {
    fn name(&self) -> &'static str {
        "orb"
    }

    fn match_images(
        &self,
        fixed: &GrayImage,
        moving: &GrayImage,
    ) -> CoregResult<(Vec<Point2>, Vec<Point2>)> {
        run_pipeline(&self.detector, &self.matching, &self.ransac, fixed, moving)
    }
}

/// Feature matcher built on the gradient-histogram detector strategy.
pub struct SiftMatcher {
    detector: SiftDetector,
    matching: MatchConfig,
    ransac: RansacConfig,
}

impl SiftMatcher {
    pub fn new() -> CoregResult<Self> {
        Self::with_configs(SiftConfig::default(), MatchConfig::default(), RansacConfig::default())
    }

    pub fn with_configs(
        detector: SiftConfig,
        matching: MatchConfig,
        ransac: RansacConfig,
    ) -> CoregResult<Self> {
        Ok(Self {
            detector: SiftDetector::new(detector)?,
            matching,
            ransac,
        })
    }
}

impl FeatureMatcher for SiftMatcher {
    fn name(&self) -> &'static str {
        "sift"
    }

    fn match_images(
        &self,
        fixed: &GrayImage,
        moving: &GrayImage,
    ) -> CoregResult<(Vec<Point2>, Vec<Point2>)> {
        run_pipeline(&self.detector, &self.matching, &self.ransac, fixed, moving)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_images_give_empty_result() {
        let matcher = OrbMatcher::new().unwrap();
        let fixed = GrayImage::filled(64, 64, 90);
        let moving = GrayImage::filled(64, 64, 90);
        let (a, b) = matcher.match_images(&fixed, &moving).unwrap();
        assert!(a.is_empty());
        assert!(b.is_empty());
    }

    #[test]
    fn test_matcher_reports_its_name() {
        assert_eq!(OrbMatcher::new().unwrap().name(), "orb");
        assert_eq!(SiftMatcher::new().unwrap().name(), "sift");
    }

    #[test]
    fn test_invalid_detector_config_surfaces_at_construction() {
        let bad = OrbConfig { threshold: 0, ..OrbConfig::default() };
        let result = OrbMatcher::with_configs(bad, MatchConfig::default(), RansacConfig::default());
        assert!(matches!(result, Err(CoregError::Detect(_))));
    }
}

//! Keypoint detection and description strategies for the coregistration
//! feature-correspondence pipeline.

mod brief;
mod error;
mod fast;
mod orb;
mod pyramid;
mod scale_space;
mod sift;

pub use error::{DetectError, DetectResult};
pub use orb::{OrbConfig, OrbDetector};
pub use sift::{SiftConfig, SiftDetector};

use coreg_core::{BinaryDescriptor, GradientDescriptor, GrayImage, Keypoint};

/// A keypoint detector/descriptor strategy. Implementations are pure
/// functions of the input image: nothing is retained between calls.
pub trait Detector {
    type Descriptor;

    /// Returns keypoints in native (row, col) order and one descriptor per
    /// keypoint, index-aligned. Featureless input yields empty sequences.
    fn detect_and_describe(
        &self,
        image: &GrayImage,
    ) -> DetectResult<(Vec<Keypoint>, Vec<Self::Descriptor>)>;
}

impl Detector for OrbDetector {
    type Descriptor = BinaryDescriptor;

    fn detect_and_describe(
        &self,
        image: &GrayImage,
    ) -> DetectResult<(Vec<Keypoint>, Vec<BinaryDescriptor>)> {
        OrbDetector::detect_and_describe(self, image)
    }
}

impl Detector for SiftDetector {
    type Descriptor = GradientDescriptor;

    fn detect_and_describe(
        &self,
        image: &GrayImage,
    ) -> DetectResult<(Vec<Keypoint>, Vec<GradientDescriptor>)> {
        SiftDetector::detect_and_describe(self, image)
    }
}

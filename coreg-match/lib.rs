//! Descriptor matching and robust correspondence filtering for the
//! coregistration feature-correspondence pipeline.

mod distance;
mod error;
mod matcher;
mod ransac;
mod similarity;

pub use distance::DescriptorDistance;
pub use error::{MatchError, MIN_SAMPLES};
pub use matcher::{match_descriptors, MatchConfig};
pub use ransac::{filter_outliers, RansacConfig, RansacResult};
pub use similarity::SimilarityTransform;

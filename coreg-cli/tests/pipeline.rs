use coreg_cli::{matcher_names, create_matcher, FeatureMatcher, OrbMatcher, SiftMatcher};
use coreg_core::{GrayImage, Point2};
use coreg_detect::{OrbConfig, OrbDetector, SiftConfig};
use coreg_match::{MatchConfig, RansacConfig, SimilarityTransform};

const BACKGROUND: u8 = 110;

/// Small deterministic generator so the synthetic scene is stable across
/// runs without pulling an RNG into the test.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn range(&mut self, lo: usize, hi: usize) -> usize {
        lo + (self.next() as usize) % (hi - lo)
    }
}

/// Densely textured scene of overlapping squares and discs at varied
/// intensities: corner food for the segment test, blob food for the
/// scale-space detector.
fn textured_image(width: usize, height: usize, seed: u64) -> GrayImage {
    let mut img = GrayImage::filled(width, height, BACKGROUND);
    let mut rng = Lcg(seed);
    let intensities = [20u8, 45, 70, 90, 150, 180, 215, 245];

    for shape in 0..220 {
        let cr = rng.range(10, height - 10);
        let cc = rng.range(10, width - 10);
        let value = intensities[rng.range(0, intensities.len())];

        if shape % 2 == 0 {
            let half = rng.range(4, 12);
            for row in cr.saturating_sub(half)..(cr + half).min(height) {
                for col in cc.saturating_sub(half)..(cc + half).min(width) {
                    img.set(row, col, value);
                }
            }
        } else {
            let radius = rng.range(3, 9) as i32;
            for dr in -radius..=radius {
                for dc in -radius..=radius {
                    if dr * dr + dc * dc <= radius * radius {
                        let row = cr as i32 + dr;
                        let col = cc as i32 + dc;
                        if row >= 0 && col >= 0 && (row as usize) < height && (col as usize) < width
                        {
                            img.set(row as usize, col as usize, value);
                        }
                    }
                }
            }
        }
    }

    img
}

/// Resample `img` so that a feature at p lands at transform(p), filling
/// uncovered pixels with the scene background.
fn warp_similarity(img: &GrayImage, transform: &SimilarityTransform) -> GrayImage {
    let inverse = transform.inverse().unwrap();
    let (w, h) = (img.width(), img.height());
    let mut out = GrayImage::filled(w, h, BACKGROUND);

    for row in 0..h {
        for col in 0..w {
            let source = inverse.apply(Point2::new(col as f32, row as f32));
            if source.x >= 0.0
                && source.y >= 0.0
                && source.x < (w - 1) as f32
                && source.y < (h - 1) as f32
            {
                out.set(row, col, bilinear(img, source.y, source.x));
            }
        }
    }

    out
}

fn bilinear(img: &GrayImage, row: f32, col: f32) -> u8 {
    let r0 = row.floor() as usize;
    let c0 = col.floor() as usize;
    let fr = row - r0 as f32;
    let fc = col - c0 as f32;

    let p00 = img.get(r0, c0) as f32;
    let p01 = img.get(r0, c0 + 1) as f32;
    let p10 = img.get(r0 + 1, c0) as f32;
    let p11 = img.get(r0 + 1, c0 + 1) as f32;

    let top = p00 * (1.0 - fc) + p01 * fc;
    let bottom = p10 * (1.0 - fc) + p11 * fc;
    (top * (1.0 - fr) + bottom * fr).round() as u8
}

fn seeded_ransac() -> RansacConfig {
    // Generous trial budget, and a residual bound loose enough to absorb
    // the pixel quantization of keypoints found on coarse pyramid levels.
    RansacConfig {
        residual_threshold: 3.0,
        max_trials: 1000,
        seed: Some(13),
    }
}

fn assert_recovers_transform(
    matcher: &dyn FeatureMatcher,
    fixed: &GrayImage,
    expected: &SimilarityTransform,
) {
    let moving = warp_similarity(fixed, expected);
    let (points_a, points_b) = matcher.match_images(fixed, &moving).unwrap();

    assert_eq!(points_a.len(), points_b.len());
    assert!(
        points_a.len() > 10,
        "{}: only {} correspondences",
        matcher.name(),
        points_a.len()
    );
    for p in points_a.iter().chain(points_b.iter()) {
        assert!(p.x >= 0.0 && p.x < fixed.width() as f32);
        assert!(p.y >= 0.0 && p.y < fixed.height() as f32);
    }

    let implied = SimilarityTransform::fit(&points_a, &points_b).unwrap();
    let scale_error = (implied.scale() - expected.scale()).abs() / expected.scale();
    let rotation_error = (implied.rotation() - expected.rotation()).abs();
    let (tx, ty) = implied.translation();
    let (etx, ety) = expected.translation();

    assert!(scale_error < 0.05, "{}: scale {} vs {}", matcher.name(), implied.scale(), expected.scale());
    assert!(rotation_error < 0.05, "{}: rotation {} vs {}", matcher.name(), implied.rotation(), expected.rotation());
    assert!((tx - etx).abs() < 5.0, "{}: tx {} vs {}", matcher.name(), tx, etx);
    assert!((ty - ety).abs() < 5.0, "{}: ty {} vs {}", matcher.name(), ty, ety);
}

#[test]
fn test_orb_matcher_recovers_known_transform() {
    let fixed = textured_image(512, 512, 99);
    let transform = SimilarityTransform::from_parts(0.7, 0.2, (100.0, 100.0));
    let matcher =
        OrbMatcher::with_configs(OrbConfig::default(), MatchConfig::default(), seeded_ransac())
            .unwrap();
    assert_recovers_transform(&matcher, &fixed, &transform);
}

#[test]
fn test_sift_matcher_recovers_known_transform() {
    let fixed = textured_image(512, 512, 99);
    let transform = SimilarityTransform::from_parts(0.7, 0.2, (100.0, 100.0));
    // The usual ratio test for gradient descriptors; repetitive texture
    // makes unfiltered nearest neighbors too ambiguous.
    let matching = MatchConfig { cross_check: true, max_ratio: 0.8 };
    let matcher =
        SiftMatcher::with_configs(SiftConfig::default(), matching, seeded_ransac()).unwrap();
    assert_recovers_transform(&matcher, &fixed, &transform);
}

#[test]
fn test_identical_images_match_on_themselves() {
    let fixed = textured_image(256, 256, 5);
    let matcher =
        OrbMatcher::with_configs(OrbConfig::default(), MatchConfig::default(), seeded_ransac())
            .unwrap();
    let (points_a, points_b) = matcher.match_images(&fixed, &fixed).unwrap();
    assert!(points_a.len() > 10);
    for (a, b) in points_a.iter().zip(points_b.iter()) {
        assert!((a.x - b.x).abs() < 1e-3);
        assert!((a.y - b.y).abs() < 1e-3);
    }
}

#[test]
fn test_output_points_are_axis_swapped_keypoints() {
    let fixed = textured_image(256, 256, 21);
    let detector = OrbDetector::new(OrbConfig::default()).unwrap();
    let (keypoints, _) = detector.detect_and_describe(&fixed).unwrap();

    let matcher =
        OrbMatcher::with_configs(OrbConfig::default(), MatchConfig::default(), seeded_ransac())
            .unwrap();
    let (points_a, _) = matcher.match_images(&fixed, &fixed).unwrap();
    assert!(!points_a.is_empty());

    // Every output point is some detector keypoint with (row, col)
    // swapped into (x, y).
    for p in &points_a {
        let is_swapped_keypoint = keypoints
            .iter()
            .any(|kp| (p.x - kp.col).abs() < 1e-3 && (p.y - kp.row).abs() < 1e-3);
        assert!(is_swapped_keypoint, "point ({}, {}) has no source keypoint", p.x, p.y);
    }
}

#[test]
fn test_registry_round_trip_on_synthetic_scene() {
    let fixed = textured_image(128, 128, 7);
    for name in matcher_names() {
        let matcher = create_matcher(name).unwrap();
        let (points_a, points_b) = matcher.match_images(&fixed, &fixed).unwrap();
        assert_eq!(points_a.len(), points_b.len(), "{} broke pairing", name);
    }
}

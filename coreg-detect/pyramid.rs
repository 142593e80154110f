use coreg_core::GrayImage;

/// Scale information for one pyramid level.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScaleLevel {
    pub level: usize,
    pub scale: f32,
    pub width: usize,
    pub height: usize,
}

const SCALE_FACTOR: f32 = 1.2;
const MIN_DIMENSION: usize = 32;
const MAX_LEVELS: usize = 8;

/// Generate the scale ladder for an image, stopping once a level would drop
/// below the minimum useful dimension.
pub(crate) fn generate_scale_levels(width: usize, height: usize) -> Vec<ScaleLevel> {
    let mut levels = Vec::new();
    let mut current_scale = 1.0f32;

    for level in 0..MAX_LEVELS {
        let scaled_width = (width as f32 / current_scale) as usize;
        let scaled_height = (height as f32 / current_scale) as usize;

        if scaled_width < MIN_DIMENSION || scaled_height < MIN_DIMENSION {
            break;
        }

        levels.push(ScaleLevel {
            level,
            scale: current_scale,
            width: scaled_width,
            height: scaled_height,
        });

        current_scale *= SCALE_FACTOR;
    }

    levels
}

/// Build the image pyramid matching `scale_levels`. Level 0 reuses the
/// original image.
pub(crate) fn build_pyramid(img: &GrayImage, scale_levels: &[ScaleLevel]) -> Vec<GrayImage> {
    scale_levels
        .iter()
        .map(|sl| {
            if sl.level == 0 {
                img.clone()
            } else {
                downsample(img, sl.width, sl.height)
            }
        })
        .collect()
}

fn downsample(img: &GrayImage, target_width: usize, target_height: usize) -> GrayImage {
    let mut out = GrayImage::filled(target_width, target_height, 0);

    let col_ratio = img.width() as f32 / target_width as f32;
    let row_ratio = img.height() as f32 / target_height as f32;

    for row in 0..target_height {
        for col in 0..target_width {
            let src_col = col as f32 * col_ratio;
            let src_row = row as f32 * row_ratio;
            out.set(row, col, bilinear_sample(img, src_row, src_col) as u8);
        }
    }

    out
}

/// Sample the image at fractional (row, col) coordinates.
pub(crate) fn bilinear_sample(img: &GrayImage, row: f32, col: f32) -> f32 {
    let r0 = row.floor().max(0.0) as usize;
    let c0 = col.floor().max(0.0) as usize;
    let r0 = r0.min(img.height() - 1);
    let c0 = c0.min(img.width() - 1);
    let r1 = (r0 + 1).min(img.height() - 1);
    let c1 = (c0 + 1).min(img.width() - 1);

    let fr = (row - r0 as f32).clamp(0.0, 1.0);
    let fc = (col - c0 as f32).clamp(0.0, 1.0);

    let p00 = img.get(r0, c0) as f32;
    let p01 = img.get(r0, c1) as f32;
    let p10 = img.get(r1, c0) as f32;
    let p11 = img.get(r1, c1) as f32;

    let top = p00 * (1.0 - fc) + p01 * fc;
    let bottom = p10 * (1.0 - fc) + p11 * fc;
    top * (1.0 - fr) + bottom * fr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_levels_are_monotonic() {
        let levels = generate_scale_levels(640, 480);
        assert!(!levels.is_empty());
        assert_eq!(levels[0].scale, 1.0);
        for pair in levels.windows(2) {
            assert!(pair[1].scale > pair[0].scale);
            assert!(pair[1].width < pair[0].width);
        }
        for sl in &levels {
            assert!(sl.width >= MIN_DIMENSION && sl.height >= MIN_DIMENSION);
        }
    }

    #[test]
    fn test_small_image_gets_single_level() {
        let levels = generate_scale_levels(36, 36);
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn test_pyramid_dimensions_match_levels() {
        let img = GrayImage::filled(100, 80, 77);
        let levels = generate_scale_levels(img.width(), img.height());
        let pyramid = build_pyramid(&img, &levels);
        assert_eq!(pyramid.len(), levels.len());
        for (img, sl) in pyramid.iter().zip(levels.iter()) {
            assert_eq!(img.width(), sl.width);
            assert_eq!(img.height(), sl.height);
        }
    }

    #[test]
    fn test_downsampled_uniform_image_stays_uniform() {
        let img = GrayImage::filled(64, 64, 200);
        let small = downsample(&img, 32, 32);
        assert!(small.data().iter().all(|&v| v == 200));
    }

    #[test]
    fn test_bilinear_sample_interpolates() {
        let mut img = GrayImage::filled(2, 2, 0);
        img.set(0, 1, 100);
        img.set(1, 0, 100);
        img.set(1, 1, 200);
        let mid = bilinear_sample(&img, 0.5, 0.5);
        assert!((mid - 100.0).abs() < 1e-3);
    }
}

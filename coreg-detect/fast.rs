use coreg_core::GrayImage;
use rayon::prelude::*;

/// Bresenham circle of radius 3 around the candidate pixel, in (d_row, d_col).
pub(crate) const CIRCLE_OFFSETS: [(i32, i32); 16] = [
    (-3, 0), (-3, 1), (-2, 2), (-1, 3),
    (0, 3), (1, 3), (2, 2), (3, 1),
    (3, 0), (3, -1), (2, -2), (1, -3),
    (0, -3), (-1, -3), (-2, -2), (-3, -1),
];

/// Minimum contiguous arc length for the segment test.
const ARC_LENGTH: usize = 9;

const BORDER: usize = 3;

/// Corner candidate in level-local pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Corner {
    pub row: usize,
    pub col: usize,
    pub response: f32,
}

/// Segment-test corner detection: a pixel is a corner when at least
/// `ARC_LENGTH` contiguous circle pixels are all brighter or all darker
/// than the center by the threshold.
pub(crate) fn detect_corners(img: &GrayImage, threshold: u8) -> Vec<Corner> {
    let (w, h) = (img.width(), img.height());
    if w < 2 * BORDER + 1 || h < 2 * BORDER + 1 {
        return Vec::new();
    }

    (BORDER..h - BORDER)
        .into_par_iter()
        .flat_map_iter(|row| {
            let mut v = Vec::new();
            for col in BORDER..w - BORDER {
                let p = img.get(row, col);
                let mut bright = [false; 16];
                let mut dark = [false; 16];
                let mut bright_sum = 0i32;
                let mut dark_sum = 0i32;

                for (i, &(dr, dc)) in CIRCLE_OFFSETS.iter().enumerate() {
                    let rr = (row as i32 + dr) as usize;
                    let cc = (col as i32 + dc) as usize;
                    let q = img.get(rr, cc);

                    if q >= p.saturating_add(threshold) {
                        bright[i] = true;
                        bright_sum += q as i32 - p as i32;
                    } else if q.saturating_add(threshold) <= p {
                        dark[i] = true;
                        dark_sum += p as i32 - q as i32;
                    }
                }

                let is_bright = has_contiguous_arc(&bright, ARC_LENGTH);
                let is_dark = !is_bright && has_contiguous_arc(&dark, ARC_LENGTH);
                if is_bright || is_dark {
                    let (sum, count) = if is_bright {
                        (bright_sum, bright.iter().filter(|&&b| b).count())
                    } else {
                        (dark_sum, dark.iter().filter(|&&b| b).count())
                    };
                    v.push(Corner {
                        row,
                        col,
                        response: sum as f32 / count as f32,
                    });
                }
            }
            v
        })
        .collect()
}

/// Check for at least `min_count` consecutive true values in the circular
/// array using a branch-free bitmask with wrap-around rotation.
fn has_contiguous_arc(pixels: &[bool; 16], min_count: usize) -> bool {
    debug_assert!(min_count >= 1 && min_count <= 16);

    let mut mask: u16 = 0;
    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            mask |= 1 << i;
        }
    }

    // A run of length n survives ANDing the mask with its n-1 rotations.
    let mut test_mask = mask;
    for i in 1..min_count {
        let rotated = (mask << i) | (mask >> (16 - i));
        test_mask &= rotated;
        if test_mask == 0 {
            return false;
        }
    }

    test_mask != 0
}

/// Greedy non-maximum suppression: strongest responses first, dropping any
/// candidate within `min_distance` of an already accepted one.
pub(crate) fn non_maximum_suppression(corners: &[Corner], min_distance: f32) -> Vec<Corner> {
    if corners.is_empty() {
        return Vec::new();
    }

    let mut sorted = corners.to_vec();
    sorted.sort_by(|a, b| b.response.partial_cmp(&a.response).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<Corner> = Vec::new();
    let min_distance_sq = min_distance * min_distance;

    for candidate in sorted {
        let survives = kept.iter().all(|accepted| {
            let dr = candidate.row as f32 - accepted.row as f32;
            let dc = candidate.col as f32 - accepted.col as f32;
            dr * dr + dc * dc >= min_distance_sq
        });
        if survives {
            kept.push(candidate);
        }
    }

    kept
}

/// Orientation by intensity centroid over an odd `patch_size` patch.
/// Falls back to 0.0 when the patch does not fit inside the image.
pub(crate) fn compute_orientation(img: &GrayImage, row: usize, col: usize, patch_size: usize) -> f32 {
    let half = (patch_size / 2) as i32;
    let (cr, cc) = (row as i32, col as i32);

    if cr - half < 0
        || cc - half < 0
        || cr + half >= img.height() as i32
        || cc + half >= img.width() as i32
    {
        return 0.0;
    }

    let mut m10 = 0i64;
    let mut m01 = 0i64;
    for dr in -half..=half {
        let rr = (cr + dr) as usize;
        for dc in -half..=half {
            let cc_idx = (cc + dc) as usize;
            let val = img.get(rr, cc_idx) as i64;
            m10 += dc as i64 * val;
            m01 += dr as i64 * val;
        }
    }

    (m01 as f32).atan2(m10 as f32)
}

//! Run the full correspondence pipeline on a synthetic scene, no input
//! files required:
//!
//! ```bash
//! cargo run --example match_demo
//! ```

use coreg_cli::{create_matcher, matcher_names};
use coreg_core::GrayImage;
use coreg_match::SimilarityTransform;

const SHIFT_COLS: usize = 18;
const SHIFT_ROWS: usize = 27;

fn main() {
    pretty_env_logger::init();

    let fixed = textured_scene(320, 320);
    let moving = shifted_copy(&fixed, SHIFT_ROWS, SHIFT_COLS);

    println!("Scene: 320x320, moving image shifted by ({}, {})", SHIFT_COLS, SHIFT_ROWS);

    for name in matcher_names() {
        let matcher = create_matcher(name).expect("registered matcher must construct");
        match matcher.match_images(&fixed, &moving) {
            Ok((points_a, points_b)) => {
                print!("{}: {} correspondences", name, points_a.len());
                if let Some(t) = SimilarityTransform::fit(&points_a, &points_b) {
                    let (tx, ty) = t.translation();
                    println!(", implied translation ({:.1}, {:.1})", tx, ty);
                } else {
                    println!();
                }
            }
            Err(e) => println!("{}: {}", name, e),
        }
    }
}

fn textured_scene(width: usize, height: usize) -> GrayImage {
    let mut img = GrayImage::filled(width, height, 100);
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    let intensities = [25u8, 55, 160, 205, 245];

    for _ in 0..120 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let cr = 12 + (state >> 33) as usize % (height - 34);
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let cc = 12 + (state >> 33) as usize % (width - 34);
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let value = intensities[(state >> 33) as usize % intensities.len()];
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let half = 3 + (state >> 33) as usize % 8;

        for row in cr - half..cr + half {
            for col in cc - half..cc + half {
                img.set(row, col, value);
            }
        }
    }

    img
}

fn shifted_copy(img: &GrayImage, d_row: usize, d_col: usize) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    let mut out = GrayImage::filled(w, h, 100);
    for row in 0..h - d_row {
        for col in 0..w - d_col {
            out.set(row + d_row, col + d_col, img.get(row, col));
        }
    }
    out
}

use coreg_cli::{create_matcher_with, matcher_names, PipelineConfig};
use coreg_core::{init_thread_pool, GrayImage, Point2};
use coreg_match::SimilarityTransform;
use image::{ImageReader, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use std::time::Instant;

const LINE_COLORS: [[u8; 3]; 6] = [
    [230, 60, 60],
    [60, 200, 60],
    [70, 110, 240],
    [230, 180, 40],
    [200, 70, 220],
    [60, 210, 210],
];

fn main() {
    pretty_env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: coreg <fixed-image> <moving-image> [matcher] [output.png]");
        eprintln!("Registered matchers: {}", matcher_names().join(", "));
        std::process::exit(1);
    }

    let fixed_gray = load_gray(&args[1]);
    let moving_gray = load_gray(&args[2]);

    let mut config = PipelineConfig::default();
    if let Some(name) = args.get(3) {
        config.matcher = name.clone();
    }
    let output_path = args.get(4).map(String::as_str).unwrap_or("correspondences.png");

    init_thread_pool(config.n_threads).ok();

    let fixed = to_core_image(&fixed_gray);
    let moving = to_core_image(&moving_gray);

    let matcher = create_matcher_with(&config).expect("Failed to create matcher");

    let t0 = Instant::now();
    let (points_a, points_b) = matcher
        .match_images(&fixed, &moving)
        .expect("Feature matching failed");
    let elapsed = t0.elapsed();

    println!("Matcher: {}", matcher.name());
    println!("Time taken: {:.2?}", elapsed);
    println!("Found {} correspondences", points_a.len());

    if let Some(transform) = SimilarityTransform::fit(&points_a, &points_b) {
        let (tx, ty) = transform.translation();
        println!(
            "Implied transform: scale={:.4}, rotation={:.4} rad, translation=({:.1}, {:.1})",
            transform.scale(),
            transform.rotation(),
            tx,
            ty
        );
    } else {
        println!("Too few correspondences to imply a transform");
    }

    let canvas = render_correspondences(&fixed_gray, &moving_gray, &points_a, &points_b);
    canvas.save(output_path).expect("Failed to save output image");
    println!("Saved correspondence image as {}", output_path);
}

fn load_gray(path: &str) -> image::GrayImage {
    ImageReader::open(path)
        .expect("Image not found")
        .decode()
        .expect("Decode failed")
        .to_luma8()
}

fn to_core_image(img: &image::GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_raw(w as usize, h as usize, img.as_raw().clone())
        .expect("Decoded image buffer must match its dimensions")
}

/// Render both images side by side with a line per correspondence.
fn render_correspondences(
    fixed: &image::GrayImage,
    moving: &image::GrayImage,
    points_a: &[Point2],
    points_b: &[Point2],
) -> RgbaImage {
    let (wa, ha) = fixed.dimensions();
    let (wb, hb) = moving.dimensions();
    let mut canvas = RgbaImage::from_pixel(wa + wb, ha.max(hb), Rgba([0, 0, 0, 255]));

    blit_gray(&mut canvas, fixed, 0);
    blit_gray(&mut canvas, moving, wa);

    for (i, (pa, pb)) in points_a.iter().zip(points_b.iter()).enumerate() {
        let [r, g, b] = LINE_COLORS[i % LINE_COLORS.len()];
        let color = Rgba([r, g, b, 255]);
        let start = (pa.x, pa.y);
        let end = (pb.x + wa as f32, pb.y);
        draw_line_segment_mut(&mut canvas, start, end, color);
        draw_hollow_circle_mut(&mut canvas, (pa.x as i32, pa.y as i32), 3, color);
        draw_hollow_circle_mut(&mut canvas, (end.0 as i32, pb.y as i32), 3, color);
    }

    canvas
}

fn blit_gray(canvas: &mut RgbaImage, img: &image::GrayImage, x_offset: u32) {
    for (x, y, pixel) in img.enumerate_pixels() {
        let v = pixel[0];
        canvas.put_pixel(x + x_offset, y, Rgba([v, v, v, 255]));
    }
}

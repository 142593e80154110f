use coreg_core::{GradientDescriptor, GrayImage, Keypoint};
use log::debug;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};
use crate::scale_space::{gaussian_blur, FloatImage};

const DESCRIPTOR_GRID: usize = 4;
const ORIENTATION_BINS: usize = 8;
const HISTOGRAM_BINS: usize = 36;
const MIN_DIMENSION: usize = 32;
const MAX_OCTAVES: usize = 8;

/// Assumed blur of the incoming image before scale-space construction.
const NOMINAL_SIGMA: f32 = 0.5;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SiftConfig {
    /// Scale samples per doubling of sigma.
    pub scales_per_octave: usize,
    /// Difference-of-Gaussian contrast floor, spread over the octave scales.
    pub contrast_threshold: f32,
    /// Principal-curvature ratio above which a response counts as an edge.
    pub edge_ratio: f32,
    /// Blur of the first scale-space level.
    pub initial_sigma: f32,
    /// Response-ranked keypoint budget.
    pub max_keypoints: usize,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            scales_per_octave: 3,
            contrast_threshold: 0.04,
            edge_ratio: 10.0,
            initial_sigma: 1.6,
            max_keypoints: 1000,
        }
    }
}

/// Gradient-histogram detector strategy: difference-of-Gaussian extrema in
/// a multi-octave scale space with 128-bin gradient-histogram descriptors.
pub struct SiftDetector {
    cfg: SiftConfig,
}

/// Scale-space extremum before orientation assignment, in octave-local
/// coordinates.
#[derive(Debug, Clone, Copy)]
struct Extremum {
    row: usize,
    col: usize,
    scale_index: usize,
    value: f32,
}

impl SiftDetector {
    pub fn new(cfg: SiftConfig) -> DetectResult<Self> {
        if cfg.scales_per_octave == 0 || cfg.scales_per_octave > 8 {
            return Err(DetectError::InvalidScaleCount(cfg.scales_per_octave));
        }
        if cfg.contrast_threshold <= 0.0 {
            return Err(DetectError::InvalidContrastThreshold(cfg.contrast_threshold));
        }
        if cfg.edge_ratio < 1.0 {
            return Err(DetectError::InvalidEdgeRatio(cfg.edge_ratio));
        }
        if cfg.initial_sigma <= NOMINAL_SIGMA {
            return Err(DetectError::InvalidSigma(cfg.initial_sigma));
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &SiftConfig {
        &self.cfg
    }

    /// Detect scale-space keypoints and produce one descriptor per
    /// keypoint, in base-image (row, col) units. Flat or undersized images
    /// yield empty sequences.
    pub fn detect_and_describe(
        &self,
        img: &GrayImage,
    ) -> DetectResult<(Vec<Keypoint>, Vec<GradientDescriptor>)> {
        let s = self.cfg.scales_per_octave;
        let k = 2f32.powf(1.0 / s as f32);

        let base = FloatImage::from_gray(img);
        let lift = (self.cfg.initial_sigma.powi(2) - NOMINAL_SIGMA.powi(2)).sqrt();
        let mut octave_base = gaussian_blur(&base, lift);

        let mut features: Vec<(Keypoint, GradientDescriptor)> = Vec::new();

        for octave in 0..MAX_OCTAVES {
            if octave_base.width().min(octave_base.height()) < MIN_DIMENSION {
                break;
            }

            let gaussians = self.build_octave(&octave_base, k);
            let dogs: Vec<FloatImage> = gaussians
                .windows(2)
                .map(|pair| pair[1].difference(&pair[0]))
                .collect();

            let extrema = self.find_extrema(&dogs);
            debug!(
                "sift: octave {} ({}x{}): {} extrema",
                octave,
                octave_base.width(),
                octave_base.height(),
                extrema.len()
            );

            let unit = (1u32 << octave) as f32;
            let octave_features: Vec<(Keypoint, GradientDescriptor)> = extrema
                .par_iter()
                .filter_map(|&e| {
                    let gaussian = &gaussians[e.scale_index];
                    let sigma = self.cfg.initial_sigma * k.powi(e.scale_index as i32);
                    let angle = dominant_orientation(gaussian, e.row, e.col, sigma)?;
                    let descriptor = describe(gaussian, e.row, e.col, sigma, angle)?;
                    let keypoint = Keypoint {
                        row: e.row as f32 * unit,
                        col: e.col as f32 * unit,
                        angle,
                        response: e.value.abs(),
                        scale: k.powi(e.scale_index as i32) * unit,
                    };
                    Some((keypoint, descriptor))
                })
                .collect();
            features.extend(octave_features);

            // The level at sigma = 2 * initial_sigma seeds the next octave.
            octave_base = gaussians[s].downsample_half();
        }

        features.sort_by(|a, b| {
            b.0.response
                .partial_cmp(&a.0.response)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        features.truncate(self.cfg.max_keypoints);

        debug!("sift: {} keypoints total", features.len());
        Ok(features.into_iter().unzip())
    }

    /// Gaussian ladder for one octave: `scales_per_octave + 3` images so
    /// the difference stack covers a full doubling with interior neighbors.
    fn build_octave(&self, octave_base: &FloatImage, k: f32) -> Vec<FloatImage> {
        let s = self.cfg.scales_per_octave;
        let mut gaussians = Vec::with_capacity(s + 3);
        gaussians.push(octave_base.clone());
        for i in 1..s + 3 {
            let sigma_prev = self.cfg.initial_sigma * k.powi(i as i32 - 1);
            let increment = sigma_prev * (k * k - 1.0).sqrt();
            let next = gaussian_blur(&gaussians[i - 1], increment);
            gaussians.push(next);
        }
        gaussians
    }

    fn find_extrema(&self, dogs: &[FloatImage]) -> Vec<Extremum> {
        let s = self.cfg.scales_per_octave;
        let threshold = self.cfg.contrast_threshold / s as f32;
        let (w, h) = (dogs[0].width(), dogs[0].height());
        let mut extrema = Vec::new();

        for scale_index in 1..=s {
            let (below, current, above) =
                (&dogs[scale_index - 1], &dogs[scale_index], &dogs[scale_index + 1]);

            let per_scale: Vec<Extremum> = (1..h - 1)
                .into_par_iter()
                .flat_map_iter(|row| {
                    let mut v = Vec::new();
                    for col in 1..w - 1 {
                        let value = current.get(row, col);
                        if value.abs() <= threshold {
                            continue;
                        }
                        if !is_local_extremum(below, current, above, row, col, value) {
                            continue;
                        }
                        if is_edge_response(current, row, col, self.cfg.edge_ratio) {
                            continue;
                        }
                        v.push(Extremum { row, col, scale_index, value });
                    }
                    v
                })
                .collect();
            extrema.extend(per_scale);
        }

        extrema
    }
}

fn is_local_extremum(
    below: &FloatImage,
    current: &FloatImage,
    above: &FloatImage,
    row: usize,
    col: usize,
    value: f32,
) -> bool {
    let mut is_max = true;
    let mut is_min = true;
    for layer in [below, current, above] {
        for dr in -1i32..=1 {
            for dc in -1i32..=1 {
                if std::ptr::eq(layer, current) && dr == 0 && dc == 0 {
                    continue;
                }
                // Non-strict comparisons so exact ties (symmetric
                // structures) still count; flat plateaus die at the
                // zero-determinant edge check instead.
                let n = layer.get((row as i32 + dr) as usize, (col as i32 + dc) as usize);
                if n > value {
                    is_max = false;
                }
                if n < value {
                    is_min = false;
                }
                if !is_max && !is_min {
                    return false;
                }
            }
        }
    }
    is_max || is_min
}

/// Reject responses whose principal-curvature ratio exceeds `edge_ratio`,
/// i.e. ridge-like points that localize poorly along the edge.
fn is_edge_response(dog: &FloatImage, row: usize, col: usize, edge_ratio: f32) -> bool {
    let v = dog.get(row, col);
    let dxx = dog.get(row, col + 1) + dog.get(row, col - 1) - 2.0 * v;
    let dyy = dog.get(row + 1, col) + dog.get(row - 1, col) - 2.0 * v;
    let dxy = (dog.get(row + 1, col + 1) - dog.get(row + 1, col - 1)
        - dog.get(row - 1, col + 1)
        + dog.get(row - 1, col - 1))
        * 0.25;

    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    if det <= 0.0 {
        return true;
    }
    trace * trace * edge_ratio >= (edge_ratio + 1.0).powi(2) * det
}

/// Peak of the Gaussian-weighted 36-bin gradient orientation histogram
/// around the keypoint, refined by parabolic interpolation. `None` when the
/// neighborhood carries no gradient at all.
fn dominant_orientation(img: &FloatImage, row: usize, col: usize, sigma: f32) -> Option<f32> {
    let sigma_w = 1.5 * sigma;
    let radius = (3.0 * sigma_w).round().max(1.0) as i32;
    let denom = 2.0 * sigma_w * sigma_w;
    let (w, h) = (img.width() as i32, img.height() as i32);

    let mut hist = [0f32; HISTOGRAM_BINS];
    for dr in -radius..=radius {
        let rr = row as i32 + dr;
        if rr < 1 || rr >= h - 1 {
            continue;
        }
        for dc in -radius..=radius {
            let cc = col as i32 + dc;
            if cc < 1 || cc >= w - 1 {
                continue;
            }
            let (dx, dy) = img.gradient(rr as usize, cc as usize);
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let weight = (-((dr * dr + dc * dc) as f32) / denom).exp();
            let theta = dy.atan2(dx);
            let bin = (((theta + std::f32::consts::PI) / std::f32::consts::TAU)
                * HISTOGRAM_BINS as f32) as usize
                % HISTOGRAM_BINS;
            hist[bin] += weight * magnitude;
        }
    }

    let (peak, &peak_value) = hist
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    if peak_value <= 0.0 {
        return None;
    }

    let left = hist[(peak + HISTOGRAM_BINS - 1) % HISTOGRAM_BINS];
    let right = hist[(peak + 1) % HISTOGRAM_BINS];
    let curvature = left - 2.0 * peak_value + right;
    let offset = if curvature.abs() > 1e-12 {
        (0.5 * (left - right) / curvature).clamp(-0.5, 0.5)
    } else {
        0.0
    };

    let bin_width = std::f32::consts::TAU / HISTOGRAM_BINS as f32;
    Some((peak as f32 + 0.5 + offset) * bin_width - std::f32::consts::PI)
}

/// 4x4 spatial grid of 8-bin gradient histograms over a rotated,
/// Gaussian-weighted window, trilinearly distributed, normalized, clamped
/// at 0.2 and renormalized. `None` when the window carries no gradient.
fn describe(
    img: &FloatImage,
    row: usize,
    col: usize,
    sigma: f32,
    angle: f32,
) -> Option<GradientDescriptor> {
    let d = DESCRIPTOR_GRID;
    let hist_width = 3.0 * sigma;
    let radius = (hist_width * std::f32::consts::SQRT_2 * (d as f32 + 1.0) * 0.5).round() as i32;
    let (sin_a, cos_a) = angle.sin_cos();
    let (w, h) = (img.width() as i32, img.height() as i32);
    let bin_width = std::f32::consts::TAU / ORIENTATION_BINS as f32;

    // Padded histogram so spatial interpolation can spill one bin outward.
    let mut hist = vec![0f32; (d + 2) * (d + 2) * ORIENTATION_BINS];

    for dr in -radius..=radius {
        let rr = row as i32 + dr;
        if rr < 1 || rr >= h - 1 {
            continue;
        }
        for dc in -radius..=radius {
            let cc = col as i32 + dc;
            if cc < 1 || cc >= w - 1 {
                continue;
            }

            // Window coordinates rotated into the keypoint frame.
            let c_rot = (cos_a * dc as f32 + sin_a * dr as f32) / hist_width;
            let r_rot = (-sin_a * dc as f32 + cos_a * dr as f32) / hist_width;
            let rbin = r_rot + d as f32 / 2.0 - 0.5;
            let cbin = c_rot + d as f32 / 2.0 - 0.5;
            if rbin <= -1.0 || rbin >= d as f32 || cbin <= -1.0 || cbin >= d as f32 {
                continue;
            }

            let (dx, dy) = img.gradient(rr as usize, cc as usize);
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let mut theta = dy.atan2(dx) - angle;
            while theta < 0.0 {
                theta += std::f32::consts::TAU;
            }
            while theta >= std::f32::consts::TAU {
                theta -= std::f32::consts::TAU;
            }
            let obin = theta / bin_width;

            let weight =
                (-(r_rot * r_rot + c_rot * c_rot) / (2.0 * (0.5 * d as f32).powi(2))).exp();
            accumulate_trilinear(&mut hist, d, rbin, cbin, obin, weight * magnitude);
        }
    }

    // Interior 4x4 cells flatten into the 128-vector.
    let mut descriptor = [0f32; 128];
    for r in 0..d {
        for c in 0..d {
            for o in 0..ORIENTATION_BINS {
                let src = ((r + 1) * (d + 2) + (c + 1)) * ORIENTATION_BINS + o;
                descriptor[(r * d + c) * ORIENTATION_BINS + o] = hist[src];
            }
        }
    }

    let norm = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= 1e-12 {
        return None;
    }
    for v in descriptor.iter_mut() {
        *v = (*v / norm).min(0.2);
    }
    let norm = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
    for v in descriptor.iter_mut() {
        *v /= norm;
    }

    Some(descriptor)
}

fn accumulate_trilinear(
    hist: &mut [f32],
    d: usize,
    rbin: f32,
    cbin: f32,
    obin: f32,
    value: f32,
) {
    let r0 = rbin.floor();
    let c0 = cbin.floor();
    let o0 = obin.floor();
    let dr = rbin - r0;
    let dc = cbin - c0;
    let dob = obin - o0;

    for (ri, rw) in [(0i32, 1.0 - dr), (1, dr)] {
        let r_idx = r0 as i32 + 1 + ri;
        if r_idx < 0 || r_idx >= (d + 2) as i32 {
            continue;
        }
        for (ci, cw) in [(0i32, 1.0 - dc), (1, dc)] {
            let c_idx = c0 as i32 + 1 + ci;
            if c_idx < 0 || c_idx >= (d + 2) as i32 {
                continue;
            }
            for (oi, ow) in [(0i32, 1.0 - dob), (1, dob)] {
                let o_idx = (((o0 as i32 + oi) % ORIENTATION_BINS as i32)
                    + ORIENTATION_BINS as i32) as usize
                    % ORIENTATION_BINS;
                let idx = (r_idx as usize * (d + 2) + c_idx as usize) * ORIENTATION_BINS + o_idx;
                hist[idx] += value * rw * cw * ow;
            }
        }
    }
}

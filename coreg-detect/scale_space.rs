use coreg_core::GrayImage;

/// Row-major f32 image used while building the Gaussian scale space.
#[derive(Debug, Clone)]
pub(crate) struct FloatImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl FloatImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self { data: vec![0.0; width * height], width, height }
    }

    /// Convert an 8-bit image to the [0, 1] range.
    pub fn from_gray(img: &GrayImage) -> Self {
        Self {
            data: img.data().iter().map(|&v| v as f32 / 255.0).collect(),
            width: img.width(),
            height: img.height(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.width + col] = value;
    }

    /// Pixel-wise difference `self - other`; both images must share dims.
    pub fn difference(&self, other: &FloatImage) -> FloatImage {
        debug_assert_eq!(self.width, other.width);
        debug_assert_eq!(self.height, other.height);
        FloatImage {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a - b)
                .collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Drop every second row and column.
    pub fn downsample_half(&self) -> FloatImage {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut out = FloatImage::new(width, height);
        for row in 0..height {
            for col in 0..width {
                out.set(row, col, self.get(row * 2, col * 2));
            }
        }
        out
    }

    /// Central-difference gradient as (d_col, d_row); callers must stay one
    /// pixel inside the border.
    #[inline]
    pub fn gradient(&self, row: usize, col: usize) -> (f32, f32) {
        let dx = (self.get(row, col + 1) - self.get(row, col - 1)) * 0.5;
        let dy = (self.get(row + 1, col) - self.get(row - 1, col)) * 0.5;
        (dx, dy)
    }
}

/// Separable Gaussian blur with border clamping.
pub(crate) fn gaussian_blur(img: &FloatImage, sigma: f32) -> FloatImage {
    if sigma <= 0.0 {
        return img.clone();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i32;
    let (w, h) = (img.width(), img.height());

    // Horizontal pass.
    let mut tmp = FloatImage::new(w, h);
    for row in 0..h {
        for col in 0..w {
            let mut acc = 0.0;
            for (k, &weight) in kernel.iter().enumerate() {
                let cc = (col as i32 + k as i32 - radius).clamp(0, w as i32 - 1) as usize;
                acc += img.get(row, cc) * weight;
            }
            tmp.set(row, col, acc);
        }
    }

    // Vertical pass.
    let mut out = FloatImage::new(w, h);
    for row in 0..h {
        for col in 0..w {
            let mut acc = 0.0;
            for (k, &weight) in kernel.iter().enumerate() {
                let rr = (row as i32 + k as i32 - radius).clamp(0, h as i32 - 1) as usize;
                acc += tmp.get(rr, col) * weight;
            }
            out.set(row, col, acc);
        }
    }

    out
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i * i) as f32 / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(1.6);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let n = kernel.len();
        for i in 0..n / 2 {
            assert!((kernel[i] - kernel[n - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_blur_preserves_uniform_image() {
        let img = FloatImage::from_gray(&GrayImage::filled(16, 16, 100));
        let blurred = gaussian_blur(&img, 2.0);
        let expected = 100.0 / 255.0;
        for row in 0..16 {
            for col in 0..16 {
                assert!((blurred.get(row, col) - expected).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_blur_spreads_impulse() {
        let mut img = FloatImage::new(21, 21);
        img.set(10, 10, 1.0);
        let blurred = gaussian_blur(&img, 1.5);
        assert!(blurred.get(10, 10) < 1.0);
        assert!(blurred.get(10, 11) > 0.0);
        // Mass is conserved up to border effects.
        let total: f32 = (0..21).flat_map(|r| (0..21).map(move |c| (r, c)))
            .map(|(r, c)| blurred.get(r, c))
            .sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_downsample_halves_dimensions() {
        let img = FloatImage::new(33, 20);
        let half = img.downsample_half();
        assert_eq!(half.width(), 16);
        assert_eq!(half.height(), 10);
    }
}

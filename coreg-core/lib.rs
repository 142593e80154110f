#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major 8-bit grayscale sample grid.
///
/// The pipeline treats images as read-only; every stage borrows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

#[derive(Debug, Clone)]
pub enum CoreError {
    InvalidImageSize { width: usize, height: usize },
    BufferSizeMismatch { expected_len: usize, actual_len: usize },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            CoreError::BufferSizeMismatch { expected_len, actual_len } => {
                write!(f, "Image buffer length mismatch: expected {}, got {}", expected_len, actual_len)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl GrayImage {
    /// Wraps a row-major buffer, checking it against the stated dimensions.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, CoreError> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidImageSize { width, height });
        }
        let expected_len = width * height;
        if data.len() != expected_len {
            return Err(CoreError::BufferSizeMismatch {
                expected_len,
                actual_len: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Uniform image, mostly useful for tests and demos.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row * self.width + col] = value;
    }
}

/// Detected feature location in the detector's native (row, col) order,
/// with orientation in radians, response strength, and detection scale
/// relative to the base image.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub row: f32,
    pub col: f32,
    pub angle: f32,
    pub response: f32,
    pub scale: f32,
}

/// 2D point in the (x, y) convention handed to external alignment tools.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Keypoint> for Point2 {
    /// Axis swap from the native (row, col) order to (x, y).
    fn from(kp: Keypoint) -> Self {
        Self { x: kp.col, y: kp.row }
    }
}

/// 256-bit binary descriptor = 32 bytes
pub type BinaryDescriptor = [u8; 32];

/// 128-bin gradient-histogram descriptor
pub type GradientDescriptor = [f32; 128];

/// Initialize the Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}

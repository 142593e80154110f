#[derive(Debug, Clone)]
pub enum DetectError {
    InvalidThreshold(u8),
    InvalidPatchSize { patch_size: usize },
    InvalidScaleCount(usize),
    InvalidContrastThreshold(f32),
    InvalidEdgeRatio(f32),
    InvalidSigma(f32),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::InvalidThreshold(t) => {
                write!(f, "Invalid corner threshold: {} (must be 1-127)", t)
            }
            DetectError::InvalidPatchSize { patch_size } => {
                write!(f, "Invalid orientation patch size: {} (must be odd and >= 7)", patch_size)
            }
            DetectError::InvalidScaleCount(s) => {
                write!(f, "Invalid scales per octave: {} (must be >= 1)", s)
            }
            DetectError::InvalidContrastThreshold(t) => {
                write!(f, "Invalid contrast threshold: {} (must be > 0)", t)
            }
            DetectError::InvalidEdgeRatio(r) => {
                write!(f, "Invalid edge ratio: {} (must be >= 1)", r)
            }
            DetectError::InvalidSigma(s) => {
                write!(f, "Invalid base sigma: {} (must be > 0)", s)
            }
        }
    }
}

impl std::error::Error for DetectError {}

pub type DetectResult<T> = Result<T, DetectError>;

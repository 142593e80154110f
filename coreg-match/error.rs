/// Minimum correspondences required to fit a similarity transform robustly.
pub const MIN_SAMPLES: usize = 3;

#[derive(Debug, Clone)]
pub enum MatchError {
    LengthMismatch { src: usize, dst: usize },
    DegenerateInput { found: usize, required: usize },
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::LengthMismatch { src, dst } => {
                write!(f, "Correspondence length mismatch: {} source vs {} destination points", src, dst)
            }
            MatchError::DegenerateInput { found, required } => {
                write!(
                    f,
                    "At least {} correspondences are required for robust fitting, found {}",
                    required, found
                )
            }
        }
    }
}

impl std::error::Error for MatchError {}

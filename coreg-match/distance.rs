use coreg_core::{BinaryDescriptor, GradientDescriptor};

/// Distance metric between descriptors of one family.
pub trait DescriptorDistance: Sync {
    fn distance(&self, other: &Self) -> f32;
}

impl DescriptorDistance for BinaryDescriptor {
    /// Hamming distance via XOR and popcount (max 256).
    fn distance(&self, other: &Self) -> f32 {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum::<u32>() as f32
    }
}

impl DescriptorDistance for GradientDescriptor {
    /// Euclidean distance.
    fn distance(&self, other: &Self) -> f32 {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| {
                let d = a - b;
                d * d
            })
            .sum::<f32>()
            .sqrt()
    }
}

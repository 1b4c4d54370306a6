/// A comparable feature descriptor.
///
/// Implementors define a non-negative dissimilarity. The matcher only relies on the
/// ordering of distances, so the unit is free as long as it is consistent within a type.
pub trait Descriptor: Send + Sync {
    /// Dissimilarity between two descriptors of the same kind.
    fn distance(&self, other: &Self) -> u32;
}

/// Hamming distance between two fixed-size byte descriptors.
#[inline]
pub fn hamming_distance<const N: usize>(a: &[u8; N], b: &[u8; N]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x ^ y).count_ones())
        .sum()
}

/// Packed binary descriptor of `N` bytes (`8 * N` bits), compared with Hamming distance.
///
/// ORB and BRIEF style descriptors are `BinaryDescriptor<32>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BinaryDescriptor<const N: usize>(pub [u8; N]);

impl<const N: usize> BinaryDescriptor<N> {
    /// Wrap packed descriptor bytes.
    pub fn new(bits: [u8; N]) -> Self {
        Self(bits)
    }

    /// Number of bits in the descriptor.
    pub const fn num_bits() -> usize {
        N * 8
    }

    /// Access the packed bytes.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> TryFrom<&[u8]> for BinaryDescriptor<N> {
    type Error = std::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(bytes.try_into()?))
    }
}

impl<const N: usize> Descriptor for BinaryDescriptor<N> {
    #[inline]
    fn distance(&self, other: &Self) -> u32 {
        hamming_distance(&self.0, &other.0)
    }
}

/// Real-valued descriptor of `N` components compared with the L1 norm.
///
/// Components are expected in descriptor units (e.g. 0..=255 for quantized SIFT); the
/// summed absolute difference is rounded to the nearest integer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatDescriptor<const N: usize>(pub [f32; N]);

impl<const N: usize> Descriptor for FloatDescriptor<N> {
    fn distance(&self, other: &Self) -> u32 {
        let l1: f32 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        l1.round().min(u32::MAX as f32) as u32
    }
}

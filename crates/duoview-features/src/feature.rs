use duoview_image::Image;

use crate::Descriptor;

/// A salient image location with its appearance descriptor.
///
/// The location is expressed in the pixel grid of the image it was extracted from,
/// `[x, y]` with the origin at the top-left pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Feature<D> {
    /// Sub-pixel location `[x, y]`.
    pub location: [f64; 2],
    /// Appearance descriptor.
    pub descriptor: D,
}

impl<D> Feature<D> {
    /// Create a feature from a location and a descriptor.
    pub fn new(location: [f64; 2], descriptor: D) -> Self {
        Self {
            location,
            descriptor,
        }
    }
}

/// Capability that turns an image into a list of features.
///
/// Detection and description live outside this workspace; anything that can produce
/// features for a raster (a detector, a cache, a file on disk) plugs in here.
pub trait FeatureExtractor<T, const C: usize> {
    /// Descriptor type produced by the extractor.
    type Descriptor: Descriptor;
    /// Error raised when extraction fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Extract the features of `image`.
    fn extract(&self, image: &Image<T, C>)
        -> Result<Vec<Feature<Self::Descriptor>>, Self::Error>;
}

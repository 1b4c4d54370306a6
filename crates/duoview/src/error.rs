use duoview_geometry::HomographyError;
use duoview_image::ImageError;

/// An error type for the registration and compositing pipeline.
#[derive(thiserror::Error, Debug)]
pub enum StitchError {
    /// Feature extraction failed on one of the images.
    #[error("Failed to extract features. {0}")]
    FeatureExtraction(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No homography could be estimated from the matches.
    #[error("Failed to register the images. {0}")]
    Registration(#[from] HomographyError),

    /// The canvas could not be produced.
    #[error("Failed to composite the images. {0}")]
    Composite(#[from] ImageError),
}

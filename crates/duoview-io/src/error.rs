/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Invalid file extension.
    #[error("File does not have a valid extension: {0}")]
    InvalidFileExtension(std::path::PathBuf),

    /// Error to open the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] duoview_image::ImageError),

    /// Error to decode or encode the image.
    #[error("Failed to decode the image. {0}")]
    ImageDecodeError(#[from] image::ImageError),

    /// The feature file is not valid JSON or does not follow the expected layout.
    #[error("Failed to parse the feature file. {0}")]
    FeatureParseError(#[from] serde_json::Error),

    /// A descriptor in the feature file has the wrong number of bytes.
    #[error("Descriptor of feature {index} has {actual} bytes, expected {expected}")]
    InvalidDescriptorLength {
        /// Position of the offending feature in the file.
        index: usize,
        /// Bytes required by the descriptor type.
        expected: usize,
        /// Bytes found in the file.
        actual: usize,
    },
}

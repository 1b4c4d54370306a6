/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the pixel index is out of bounds.
    #[error("Pixel index ({0}, {1}) is out of bounds ({2}, {3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when an image has zero width or height.
    #[error("Image has an empty extent ({0}x{1})")]
    EmptyImage(usize, usize),

    /// Error when a projective transform cannot be inverted.
    #[error("Transform is singular and cannot be inverted")]
    SingularTransform,
}

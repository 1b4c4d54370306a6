use std::path::{Path, PathBuf};

use duoview_image::{Image, ImageSize};

use crate::error::IoError;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

// verify the file has one of the extensions handled by the enabled codecs
fn check_extension(file_path: &Path) -> Result<(), IoError> {
    let supported = file_path.extension().is_some_and(|ext| {
        let ext = ext.to_ascii_lowercase();
        SUPPORTED_EXTENSIONS.iter().any(|s| ext == *s)
    });
    if !supported {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }
    Ok(())
}

fn decode(file_path: &Path) -> Result<image::DynamicImage, IoError> {
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }
    check_extension(file_path)?;

    let img = image::ImageReader::open(file_path)?
        .with_guessed_format()?
        .decode()?;

    log::debug!(
        "decoded {} ({}x{}, {:?})",
        file_path.display(),
        img.width(),
        img.height(),
        img.color()
    );

    Ok(img)
}

fn image_size(img: &image::DynamicImage) -> ImageSize {
    ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    }
}

/// Reads a PNG or JPEG image as 8-bit RGB.
///
/// Grayscale and alpha inputs are converted to three channels.
///
/// # Arguments
///
/// * `file_path` - The path to a `.png`, `.jpg` or `.jpeg` file.
///
/// # Returns
///
/// An image containing the decoded pixel data.
pub fn read_image_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let img = decode(file_path.as_ref())?;
    let size = image_size(&img);
    Ok(Image::new(size, img.into_rgb8().into_raw())?)
}

/// Reads a PNG or JPEG image as 8-bit grayscale.
///
/// # Arguments
///
/// * `file_path` - The path to a `.png`, `.jpg` or `.jpeg` file.
pub fn read_image_mono8(file_path: impl AsRef<Path>) -> Result<Image<u8, 1>, IoError> {
    let img = decode(file_path.as_ref())?;
    let size = image_size(&img);
    Ok(Image::new(size, img.into_luma8().into_raw())?)
}

/// Writes an 8-bit RGB image, choosing the codec from the file extension.
///
/// # Arguments
///
/// * `file_path` - The destination, ending in `.png`, `.jpg` or `.jpeg`.
/// * `image` - The image to encode.
pub fn write_image_rgb8(file_path: impl AsRef<Path>, image: &Image<u8, 3>) -> Result<(), IoError> {
    let file_path: PathBuf = file_path.as_ref().to_owned();
    check_extension(&file_path)?;

    image::save_buffer(
        &file_path,
        image.as_slice(),
        image.width() as u32,
        image.height() as u32,
        image::ExtendedColorType::Rgb8,
    )?;

    log::debug!("wrote {} ({})", file_path.display(), image.size());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard() -> Image<u8, 3> {
        let mut data = Vec::new();
        for y in 0..6 {
            for x in 0..8 {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, x as u8 * 10, y as u8 * 20]);
            }
        }
        Image::new([8, 6].into(), data).unwrap()
    }

    #[test]
    fn read_write_png() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("board.png");

        let image = checkerboard();
        write_image_rgb8(&file_path, &image)?;

        let image_back = read_image_rgb8(&file_path)?;
        assert_eq!(image_back, image);

        let gray = read_image_mono8(&file_path)?;
        assert_eq!(gray.size(), image.size());
        assert_eq!(gray.num_channels(), 1);
        Ok(())
    }

    #[test]
    fn read_write_jpeg() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("board.JPG");

        write_image_rgb8(&file_path, &checkerboard())?;
        let image_back = read_image_rgb8(&file_path)?;
        assert_eq!(image_back.size(), ImageSize::from([8, 6]));
        Ok(())
    }

    #[test]
    fn read_missing_file() {
        let result = read_image_rgb8("does/not/exist.png");
        assert!(matches!(result, Err(IoError::FileDoesNotExist(_))));
    }

    #[test]
    fn invalid_extension() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("board.bmp");

        let result = write_image_rgb8(&file_path, &checkerboard());
        assert!(matches!(result, Err(IoError::InvalidFileExtension(_))));

        std::fs::write(&file_path, [0u8; 4])?;
        let result = read_image_rgb8(&file_path);
        assert!(matches!(result, Err(IoError::InvalidFileExtension(_))));
        Ok(())
    }
}

use duoview_geometry::Homography;
use duoview_image::{Image, ImageDtype, ImageError};

use crate::{
    interpolation::{interpolate_pixel, InterpolationMode},
    parallel,
};

/// Applies a perspective transformation to an image.
///
/// Every `dst` pixel is mapped back through the inverse homography and sampled from
/// `src`. Pixels whose pre-image falls outside `src` are left untouched, so `dst` can be
/// pre-filled with a background or already hold other content.
///
/// * `src` - The input image with shape (height, width, channels).
/// * `dst` - The output image with shape (new_height, new_width, channels).
/// * `m` - The perspective transformation src -> dst.
/// * `interpolation` - The interpolation mode to use.
///
/// # Errors
///
/// Fails with [`ImageError::EmptyImage`] for an empty `src` and with
/// [`ImageError::SingularTransform`] if `m` cannot be inverted.
///
/// # Example
///
/// ```
/// use duoview_geometry::Homography;
/// use duoview_image::{Image, ImageSize};
/// use duoview_imgproc::interpolation::InterpolationMode;
/// use duoview_imgproc::warp::warp_perspective;
///
/// let src = Image::<f32, 1>::new(
///   ImageSize {
///     width: 4,
///     height: 5,
///   },
///   vec![0.0f32; 4 * 5]
/// ).unwrap();
///
/// let m = Homography::from_array([[1.0, 0.0, -1.0], [0.0, 1.0, 1.0], [0.0, 0.0, 1.0]]).unwrap();
///
/// let mut dst = Image::<f32, 1>::from_size_val(
///   ImageSize {
///     width: 2,
///     height: 3,
///   },
///   0.0
/// ).unwrap();
///
/// warp_perspective(&src, &mut dst, &m, InterpolationMode::Bilinear).unwrap();
///
/// assert_eq!(dst.size().width, 2);
/// assert_eq!(dst.size().height, 3);
/// ```
pub fn warp_perspective<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    m: &Homography,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    if src.is_empty() {
        return Err(ImageError::EmptyImage(src.width(), src.height()));
    }

    let inv_m = m.inverse().map_err(|_| ImageError::SingularTransform)?;
    let (src_cols, src_rows) = (src.cols() as f64, src.rows() as f64);

    parallel::par_iter_rows_indexed_mut(dst, |x, y, dst_pixel| {
        let Some([u, v]) = inv_m.transform_point(&[x as f64, y as f64]) else {
            return;
        };
        if u >= 0.0 && u < src_cols && v >= 0.0 && v < src_rows {
            let pixel = interpolate_pixel(src, u as f32, v as f32, interpolation);
            dst_pixel.copy_from_slice(&pixel);
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use duoview_geometry::Homography;
    use duoview_image::{Image, ImageError, ImageSize};

    use super::InterpolationMode;

    fn homography(m: [[f64; 3]; 3]) -> Homography {
        Homography::from_array(m).unwrap()
    }

    #[test]
    fn warp_perspective_identity() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::new(
            ImageSize {
                width: 4,
                height: 5,
            },
            (0..60).collect(),
        )?;

        let mut image_transformed = Image::from_size_val(image.size(), 0u8)?;

        super::warp_perspective(
            &image,
            &mut image_transformed,
            &Homography::identity(),
            InterpolationMode::Bilinear,
        )?;

        assert_eq!(image_transformed, image);

        Ok(())
    }

    #[test]
    fn warp_perspective_hflip() -> Result<(), ImageError> {
        let image = Image::<_, 1>::new(
            ImageSize {
                width: 2,
                height: 3,
            },
            vec![0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0],
        )?;

        let image_expected = vec![1.0, 0.0, 3.0, 2.0, 5.0, 4.0];

        // flip matrix
        let m = homography([[-1.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

        let mut image_transformed = Image::<_, 1>::from_size_val(image.size(), 0.0)?;

        super::warp_perspective(
            &image,
            &mut image_transformed,
            &m,
            InterpolationMode::Bilinear,
        )?;

        assert_eq!(image_transformed.as_slice(), image_expected);

        Ok(())
    }

    #[test]
    fn warp_perspective_shift_keeps_untouched() -> Result<(), ImageError> {
        let image = Image::<_, 1>::new(
            ImageSize {
                width: 4,
                height: 4,
            },
            vec![
                0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0,
                15.0,
            ],
        )?;

        // shift left by 1 pixel
        let m = homography([[1.0, 0.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

        // the last column has no pre-image and keeps the fill value
        let image_expected = vec![
            1.0f32, 2.0, 3.0, -1.0, 5.0, 6.0, 7.0, -1.0, 9.0, 10.0, 11.0, -1.0, 13.0, 14.0, 15.0,
            -1.0,
        ];

        let mut image_transformed = Image::<_, 1>::from_size_val(image.size(), -1.0)?;

        super::warp_perspective(
            &image,
            &mut image_transformed,
            &m,
            InterpolationMode::Nearest,
        )?;

        assert_eq!(image_transformed.as_slice(), image_expected);

        Ok(())
    }

    #[test]
    fn warp_perspective_scale_bilinear() -> Result<(), ImageError> {
        let image = Image::<_, 1>::new([2, 1].into(), vec![0.0f32, 10.0])?;

        // upscale by two along x: dst x = 2 * src x
        let m = homography([[2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        let mut dst = Image::<_, 1>::from_size_val([4, 1].into(), 0.0f32)?;

        super::warp_perspective(&image, &mut dst, &m, InterpolationMode::Bilinear)?;

        assert_eq!(dst.as_slice(), &[0.0, 5.0, 10.0, 10.0]);
        Ok(())
    }

    #[test]
    fn warp_perspective_projective() -> Result<(), ImageError> {
        // linear ramp, reproduced exactly by bilinear sampling inside the image
        let (width, height) = (8usize, 8usize);
        let data = (0..height)
            .flat_map(|v| (0..width).map(move |u| u as f32 + 10.0 * v as f32))
            .collect();
        let image = Image::<f32, 1>::new([width, height].into(), data)?;

        // the inverse map is (x, y) -> (x, y) / (1 - 0.05 x)
        let m = homography([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.05, 0.0, 1.0]]);
        let mut dst = Image::<f32, 1>::from_size_val(image.size(), -1.0)?;

        super::warp_perspective(&image, &mut dst, &m, InterpolationMode::Bilinear)?;

        let (mut sampled, mut untouched) = (0, 0);
        for y in 0..height {
            for x in 0..width {
                let w = 1.0 - 0.05 * x as f64;
                let (u, v) = (x as f64 / w, y as f64 / w);
                let value = dst.pixel(x, y)?[0];
                if u <= 7.0 && v <= 7.0 {
                    let expected = (u + 10.0 * v) as f32;
                    assert!(
                        (value - expected).abs() < 1e-3,
                        "({x}, {y}): {value} != {expected}"
                    );
                    sampled += 1;
                } else if u > 8.01 || v > 8.01 {
                    assert_eq!(value, -1.0, "({x}, {y}) should be untouched");
                    untouched += 1;
                }
            }
        }
        assert!(sampled > 20 && untouched > 10);

        // (4, 2) comes from (5, 2.5)
        assert!((dst.pixel(4, 2)?[0] - 30.0).abs() < 1e-4);
        // columns 6 and 7 look past the right border
        assert_eq!(dst.pixel(6, 0)?[0], -1.0);
        assert_eq!(dst.pixel(7, 3)?[0], -1.0);

        Ok(())
    }

    #[test]
    fn warp_perspective_empty_source() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([0, 0].into(), 0)?;
        let mut dst = Image::<u8, 1>::from_size_val([2, 2].into(), 0)?;
        assert_eq!(
            super::warp_perspective(
                &image,
                &mut dst,
                &Homography::identity(),
                InterpolationMode::Bilinear
            ),
            Err(ImageError::EmptyImage(0, 0))
        );
        Ok(())
    }
}

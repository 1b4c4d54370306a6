use duoview_geometry::Homography;
use duoview_image::{Image, ImageDtype, ImageError, ImageSize};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{interpolation::InterpolationMode, warp::warp_perspective};

/// How the output canvas extent is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasMode {
    /// `target.width + source.width` wide; tall enough for the target and the projected
    /// source.
    #[default]
    Fixed,
    /// Bounding box of the target and the projected source corners, anchored at the
    /// target origin.
    Bounded,
}

/// Options for [`composite`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Canvas sizing policy.
    pub canvas_mode: CanvasMode,
    /// Resampling kernel for the warped source.
    pub interpolation: InterpolationMode,
    /// Value written to canvas pixels covered by neither image.
    pub background: f32,
    /// Upper bound on each side derived from the projected source.
    pub max_canvas_side: usize,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            canvas_mode: CanvasMode::Fixed,
            interpolation: InterpolationMode::Bilinear,
            background: 0.0,
            max_canvas_side: 16384,
        }
    }
}

/// Compute the canvas extent needed to hold the target and the warped source.
///
/// The result is never smaller than `target` in either axis. The projected source
/// corners only extend the canvas to the right and bottom; content projected to
/// negative coordinates is clipped. Projected extents within `1e-6` of an integer are
/// snapped to it before rounding up. If a corner is sent to infinity the canvas falls
/// back to `target.width + source.width` by `max(target.height, source.height)`.
///
/// # Arguments
///
/// * `source` - Size of the image to be warped.
/// * `target` - Size of the reference image, placed at the origin.
/// * `m` - The source -> target homography.
/// * `config` - Canvas options.
pub fn canvas_size(
    source: ImageSize,
    target: ImageSize,
    m: &Homography,
    config: &CompositeConfig,
) -> ImageSize {
    let Some([max_x, max_y]) = projected_extent(source, m) else {
        let fallback = ImageSize {
            width: target.width + source.width,
            height: target.height.max(source.height),
        };
        log::warn!("source corner projects to infinity, using canvas {fallback}");
        return fallback;
    };

    let limit = config.max_canvas_side;
    let side = |v: f64| (ceil_with_tolerance(v).max(0.0) as usize).min(limit);

    match config.canvas_mode {
        CanvasMode::Fixed => ImageSize {
            width: target.width + source.width,
            height: target.height.max(side(max_y)),
        },
        CanvasMode::Bounded => ImageSize {
            width: target.width.max(side(max_x)),
            height: target.height.max(side(max_y)),
        },
    }
}

// largest x and y reached by the projected source corners, `None` if one is at infinity
fn projected_extent(source: ImageSize, m: &Homography) -> Option<[f64; 2]> {
    let (w, h) = (source.width as f64, source.height as f64);
    let mut extent = [f64::NEG_INFINITY; 2];
    for corner in [[0.0, 0.0], [w, 0.0], [0.0, h], [w, h]] {
        let p = m.transform_point(&corner)?;
        extent[0] = extent[0].max(p[0]);
        extent[1] = extent[1].max(p[1]);
    }
    Some(extent)
}

// round up, treating values within 1e-6 of an integer as that integer
fn ceil_with_tolerance(v: f64) -> f64 {
    (v - 1e-6).ceil()
}

/// Copy `src` into `dst` with its top-left corner at column `x`, row `y`.
///
/// # Errors
///
/// Fails with [`ImageError::PixelIndexOutOfBounds`] if `src` does not fit inside `dst`.
///
/// # Example
///
/// ```
/// use duoview_image::Image;
/// use duoview_imgproc::composite::paste_image;
///
/// let patch = Image::<u8, 1>::new([2, 1].into(), vec![7, 8]).unwrap();
/// let mut canvas = Image::<u8, 1>::from_size_val([3, 2].into(), 0).unwrap();
///
/// paste_image(&patch, &mut canvas, 1, 1).unwrap();
///
/// assert_eq!(canvas.as_slice(), &[0, 0, 0, 0, 7, 8]);
/// ```
pub fn paste_image<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    x: usize,
    y: usize,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    if x + src.cols() > dst.cols() || y + src.rows() > dst.rows() {
        return Err(ImageError::PixelIndexOutOfBounds(
            x + src.cols(),
            y + src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    if src.is_empty() {
        return Ok(());
    }

    let (src_stride, dst_stride) = (src.cols() * C, dst.cols() * C);
    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_stride)
        .skip(y)
        .zip(src.as_slice().par_chunks_exact(src_stride))
        .for_each(|(dst_row, src_row)| {
            dst_row[x * C..x * C + src_stride].copy_from_slice(src_row);
        });

    Ok(())
}

/// Warp `source` into the frame of `target` and merge both into one canvas.
///
/// The canvas is filled with the background, the source is resampled through `m`, and
/// the target is copied verbatim at the origin. The target takes precedence over the
/// warped source wherever they overlap; no blending is performed.
///
/// # Arguments
///
/// * `source` - The image to be warped.
/// * `target` - The reference image.
/// * `m` - The source -> target homography.
/// * `config` - Canvas and resampling options.
///
/// # Returns
///
/// The composited canvas, at least as large as `target`.
///
/// # Errors
///
/// Fails with [`ImageError::EmptyImage`] if either input is empty and with
/// [`ImageError::SingularTransform`] if `m` cannot be inverted.
pub fn composite<T: ImageDtype, const C: usize>(
    source: &Image<T, C>,
    target: &Image<T, C>,
    m: &Homography,
    config: &CompositeConfig,
) -> Result<Image<T, C>, ImageError> {
    for image in [source, target] {
        if image.is_empty() {
            return Err(ImageError::EmptyImage(image.width(), image.height()));
        }
    }

    let size = canvas_size(source.size(), target.size(), m, config);
    log::debug!(
        "compositing {} onto {} in a {} canvas",
        source.size(),
        target.size(),
        size
    );

    let mut canvas = Image::from_size_val(size, T::from_f32(config.background))?;
    warp_perspective(source, &mut canvas, m, config.interpolation)?;
    paste_image(target, &mut canvas, 0, 0)?;

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize, offset: u8) -> Image<u8, 3> {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[
                    (x as u8).wrapping_add(offset),
                    (y as u8).wrapping_add(offset),
                    offset,
                ]);
            }
        }
        Image::new([width, height].into(), data).unwrap()
    }

    fn translation(tx: f64, ty: f64) -> Homography {
        Homography::from_array([[1.0, 0.0, tx], [0.0, 1.0, ty], [0.0, 0.0, 1.0]]).unwrap()
    }

    #[test]
    fn test_canvas_size_fixed() {
        let size = canvas_size(
            [40, 30].into(),
            [50, 20].into(),
            &Homography::identity(),
            &CompositeConfig::default(),
        );
        assert_eq!(size, ImageSize::from([90, 30]));

        // a source shifted downward extends the height
        let config = CompositeConfig::default();
        let size = canvas_size([40, 30].into(), [50, 20].into(), &translation(10.0, 16.0), &config);
        assert_eq!(size, ImageSize::from([90, 46]));

        // shifted upward, the target height wins
        let size = canvas_size([40, 30].into(), [50, 20].into(), &translation(0.0, -20.0), &config);
        assert_eq!(size, ImageSize::from([90, 20]));

        let capped = CompositeConfig {
            max_canvas_side: 40,
            ..config
        };
        let size = canvas_size([40, 30].into(), [50, 20].into(), &translation(0.0, 500.0), &capped);
        assert_eq!(size, ImageSize::from([90, 40]));
    }

    #[test]
    fn test_canvas_size_near_integer_extent() {
        // what a least-squares refit of a pure translation typically returns
        let m = translation(40.000000000000004, 16.000000000000004);
        let size = canvas_size([160, 120].into(), [160, 120].into(), &m, &Default::default());
        assert_eq!(size, ImageSize::from([320, 136]));

        let config = CompositeConfig {
            canvas_mode: CanvasMode::Bounded,
            ..Default::default()
        };
        let size = canvas_size([160, 120].into(), [160, 120].into(), &m, &config);
        assert_eq!(size, ImageSize::from([200, 136]));

        // just below an integer is still rounded up
        let m = translation(39.999999999999996, 15.5);
        let size = canvas_size([160, 120].into(), [160, 120].into(), &m, &config);
        assert_eq!(size, ImageSize::from([200, 136]));
    }

    #[test]
    fn test_canvas_size_bounded() {
        let config = CompositeConfig {
            canvas_mode: CanvasMode::Bounded,
            ..Default::default()
        };
        let size = canvas_size([40, 30].into(), [50, 20].into(), &translation(25.0, 4.5), &config);
        assert_eq!(size, ImageSize::from([65, 35]));

        // content moved to negative coordinates never shrinks the target extent
        let size = canvas_size([40, 30].into(), [50, 20].into(), &translation(-80.0, -80.0), &config);
        assert_eq!(size, ImageSize::from([50, 20]));

        let capped = CompositeConfig {
            max_canvas_side: 100,
            ..config.clone()
        };
        let size = canvas_size([40, 30].into(), [50, 20].into(), &translation(500.0, 0.0), &capped);
        assert_eq!(size, ImageSize::from([100, 30]));
    }

    #[test]
    fn test_canvas_size_bounded_infinite_corner() {
        let config = CompositeConfig {
            canvas_mode: CanvasMode::Bounded,
            ..Default::default()
        };
        // the line x = 10 is sent to infinity
        let m = Homography::from_array([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [-0.1, 0.0, 1.0]])
            .unwrap();
        let size = canvas_size([10, 10].into(), [8, 8].into(), &m, &config);
        assert_eq!(size, ImageSize::from([18, 10]));
    }

    #[test]
    fn test_paste_image_out_of_bounds() -> Result<(), ImageError> {
        let src = Image::<u8, 1>::from_size_val([3, 3].into(), 1)?;
        let mut dst = Image::<u8, 1>::from_size_val([4, 4].into(), 0)?;
        assert_eq!(
            paste_image(&src, &mut dst, 2, 0),
            Err(ImageError::PixelIndexOutOfBounds(5, 3, 4, 4))
        );
        Ok(())
    }

    #[test]
    fn test_composite_target_precedence() -> Result<(), ImageError> {
        let source = gradient(16, 12, 100);
        let target = gradient(20, 10, 0);
        let canvas = composite(&source, &target, &translation(8.0, 2.0), &Default::default())?;

        assert_eq!(canvas.size(), ImageSize::from([36, 14]));
        assert!(canvas.width() >= target.width() && canvas.height() >= target.height());

        // every target pixel is copied verbatim
        for y in 0..target.height() {
            for x in 0..target.width() {
                assert_eq!(canvas.pixel(x, y)?, target.pixel(x, y)?);
            }
        }

        // the warped source shows right of the target
        assert_eq!(canvas.pixel(22, 5)?, source.pixel(14, 3)?);
        // below the target, inside the warped source
        assert_eq!(canvas.pixel(9, 11)?, source.pixel(1, 9)?);
        // the last source row fits in the canvas
        assert_eq!(canvas.pixel(20, 13)?, source.pixel(12, 11)?);
        // covered by neither image
        assert_eq!(canvas.pixel(30, 1)?, &[0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_composite_identity_overlap() -> Result<(), ImageError> {
        let source = gradient(8, 6, 50);
        let target = gradient(8, 6, 0);
        let config = CompositeConfig {
            background: 255.0,
            ..Default::default()
        };
        let canvas = composite(&source, &target, &Homography::identity(), &config)?;
        assert_eq!(canvas.size(), ImageSize::from([16, 6]));
        for y in 0..6 {
            for x in 0..8 {
                assert_eq!(canvas.pixel(x, y)?, target.pixel(x, y)?);
                assert_eq!(canvas.pixel(x + 8, y)?, &[255, 255, 255]);
            }
        }
        Ok(())
    }

    #[test]
    fn test_composite_empty() -> Result<(), ImageError> {
        let empty = Image::<u8, 3>::from_size_val([0, 5].into(), 0)?;
        let target = gradient(4, 4, 0);
        assert_eq!(
            composite(&empty, &target, &Homography::identity(), &Default::default()),
            Err(ImageError::EmptyImage(0, 5))
        );
        Ok(())
    }

    #[test]
    fn test_composite_config_serde() {
        let config: CompositeConfig =
            serde_json::from_str(r#"{"canvas_mode": "bounded", "interpolation": "nearest"}"#)
                .unwrap();
        assert_eq!(config.canvas_mode, CanvasMode::Bounded);
        assert_eq!(config.interpolation, InterpolationMode::Nearest);
        assert_eq!(config.max_canvas_side, 16384);
    }
}

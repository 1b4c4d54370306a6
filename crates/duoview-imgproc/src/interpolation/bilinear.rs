use duoview_image::{Image, ImageDtype};

/// Kernel for bilinear interpolation
///
/// Neighbours past the last row or column are clamped to the border.
///
/// # Arguments
///
/// * `image` - The input image container.
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
///
/// # Returns
///
/// The interpolated pixel values.
pub(crate) fn bilinear_interpolation<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
) -> [T; C] {
    let (rows, cols) = (image.rows(), image.cols());

    let iu0 = (u.trunc() as usize).min(cols - 1);
    let iv0 = (v.trunc() as usize).min(rows - 1);

    let frac_u = u.fract();
    let frac_v = v.fract();

    let w00 = (1.0 - frac_u) * (1.0 - frac_v);
    let w01 = frac_u * (1.0 - frac_v);
    let w10 = (1.0 - frac_u) * frac_v;
    let w11 = frac_u * frac_v;

    let iu1 = if iu0 + 1 < cols { iu0 + 1 } else { iu0 };
    let iv1 = if iv0 + 1 < rows { iv0 + 1 } else { iv0 };

    let data = image.as_slice();
    let at = |iv: usize, iu: usize| {
        let base = (iv * cols + iu) * C;
        &data[base..base + C]
    };
    let (p00, p01, p10, p11) = (at(iv0, iu0), at(iv0, iu1), at(iv1, iu0), at(iv1, iu1));

    let mut pixel = [T::default(); C];
    for (k, out) in pixel.iter_mut().enumerate() {
        let value = Into::<f32>::into(p00[k]) * w00
            + Into::<f32>::into(p01[k]) * w01
            + Into::<f32>::into(p10[k]) * w10
            + Into::<f32>::into(p11[k]) * w11;
        *out = T::from_f32(value);
    }

    pixel
}

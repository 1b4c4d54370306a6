use rayon::prelude::*;

use duoview_image::Image;

/// Apply a function to every pixel of `dst` in parallel, one row per task.
///
/// The closure receives the column, the row and the mutable channel values of the pixel.
/// Rows are independent, so the result does not depend on scheduling.
pub fn par_iter_rows_indexed_mut<T, const C: usize>(
    dst: &mut Image<T, C>,
    f: impl Fn(usize, usize, &mut [T]) + Send + Sync,
) where
    T: Send + Sync,
{
    if dst.is_empty() {
        return;
    }
    let cols = dst.cols();
    dst.as_slice_mut()
        .par_chunks_exact_mut(C * cols)
        .enumerate()
        .for_each(|(y, dst_row)| {
            dst_row
                .chunks_exact_mut(C)
                .enumerate()
                .for_each(|(x, dst_pixel)| f(x, y, dst_pixel));
        });
}

//! Pixel-level operations on single frames: reshaping decoder output,
//! Gaussian smoothing, binarization and the active-pixel ratio.

use ndarray::{Array2, ArrayView1, Axis};

use crate::Frame;
use crate::error::{FireVaeError, FireVaeResult};

/// Kernel radius is `truncate * sigma`, rounded to the nearest integer.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Splits a flat, row-major buffer of `count` images into frames.
///
/// # Errors
///
/// Returns [`FireVaeError::Shape`] unless `pixels.len() == count * height * width`.
pub fn frames_from_flat(pixels: &[f32], count: usize, shape: [usize; 2]) -> FireVaeResult<Vec<Frame>> {
    let [height, width] = shape;
    let frame_len = height * width;
    if pixels.len() != count * frame_len {
        return Err(FireVaeError::shape(
            format!("{count} x {height} x {width} = {} values", count * frame_len),
            format!("{} values", pixels.len()),
        ));
    }
    if frame_len == 0 {
        return Ok(vec![Array2::zeros((height, width)); count]);
    }

    pixels
        .chunks_exact(frame_len)
        .map(|chunk| {
            Array2::from_shape_vec((height, width), chunk.to_vec())
                .map_err(|e| FireVaeError::shape(format!("{height} x {width}"), e.to_string()))
        })
        .collect()
}

/// Normalized 1D Gaussian weights for `sigma`, radius `round(4 * sigma)`.
fn gaussian_kernel_1d(sigma: f64) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-((x * x) as f64) / two_sigma_sq).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= sum);
    weights
}

/// Mirror an out-of-range index back into `0..len` (`d c b a | a b c d | d c b a`).
fn reflect_index(index: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - i - 1;
    }
    i as usize
}

fn correlate_line(line: ArrayView1<'_, f32>, kernel: &[f64], out: &mut [f32]) {
    let len = line.len();
    let radius = (kernel.len() / 2) as isize;
    for (i, slot) in out.iter_mut().enumerate() {
        let mut acc = 0.0f64;
        for (k, w) in kernel.iter().enumerate() {
            let src = reflect_index(i as isize + k as isize - radius, len);
            acc += w * line[src] as f64;
        }
        *slot = acc as f32;
    }
}

/// Isotropic Gaussian smoothing with reflected borders.
///
/// Separable: one pass down the columns (axis 0), then one along the rows,
/// rounding to `f32` in between. Output has the input's shape.
pub fn gaussian_filter(frame: &Frame, sigma: f64) -> Frame {
    if frame.is_empty() || sigma <= 0.0 {
        return frame.clone();
    }
    let kernel = gaussian_kernel_1d(sigma);
    let cols_done = correlate_axis(frame, Axis(0), &kernel);
    correlate_axis(&cols_done, Axis(1), &kernel)
}

/// Correlates every lane running along `axis` with `kernel`.
fn correlate_axis(frame: &Frame, axis: Axis, kernel: &[f64]) -> Frame {
    let mut out = Array2::<f32>::zeros(frame.raw_dim());
    let mut buf = vec![0.0f32; frame.len_of(axis)];
    for (src, mut dst) in frame.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        correlate_line(src, kernel, &mut buf);
        dst.iter_mut().zip(&buf).for_each(|(d, v)| *d = *v);
    }
    out
}

/// `1.0` where `pixel >= threshold`, else `0.0`.
pub fn binarize(frame: &Frame, threshold: f32) -> Frame {
    frame.mapv(|v| if v >= threshold { 1.0 } else { 0.0 })
}

/// Number of pixels exactly equal to `1.0`.
pub fn active_pixels(frame: &Frame) -> usize {
    frame.iter().filter(|&&v| v == 1.0).count()
}

/// Percentage (0–100) of pixels equal to `1.0`.
///
/// An empty frame has ratio `0.0`.
pub fn pixel_ratio(frame: &Frame) -> f64 {
    let total = frame.len();
    if total == 0 {
        return 0.0;
    }
    active_pixels(frame) as f64 / total as f64 * 100.0
}

/// `max - min` over all pixels; `0.0` for an empty frame.
pub fn dynamic_range(frame: &Frame) -> f64 {
    let mut iter = frame.iter().copied();
    let Some(first) = iter.next() else {
        return 0.0;
    };
    let (lo, hi) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (hi - lo) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn kernel_for_unit_sigma_has_radius_four() {
        let k = gaussian_kernel_1d(1.0);
        assert_eq!(k.len(), 9);
        assert_abs_diff_eq!(k.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(k[4] > k[3] && k[3] > k[2]);
        assert_abs_diff_eq!(k[0], k[8], epsilon = 1e-15);
    }

    #[test]
    fn reflect_index_mirrors_edges() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        // Radius larger than the line wraps through the period.
        assert_eq!(reflect_index(-5, 2), 0);
        assert_eq!(reflect_index(9, 3), 2);
    }

    #[test]
    fn smoothing_preserves_constant_frames() {
        let frame = Array2::from_elem((6, 5), 0.3f32);
        let smoothed = gaussian_filter(&frame, 1.0);
        assert_eq!(smoothed.dim(), (6, 5));
        for v in smoothed.iter() {
            assert_abs_diff_eq!(*v, 0.3, epsilon = 1e-6);
        }
    }

    #[test]
    fn smoothing_spreads_a_point_and_keeps_mass() {
        let mut frame = Array2::<f32>::zeros((21, 21));
        frame[[10, 10]] = 1.0;
        let smoothed = gaussian_filter(&frame, 1.0);

        assert_abs_diff_eq!(smoothed.sum(), 1.0, epsilon = 1e-5);
        assert!(smoothed[[10, 10]] < 1.0);
        assert!(smoothed[[10, 11]] > 0.0);
        assert_abs_diff_eq!(smoothed[[10, 11]], smoothed[[11, 10]], epsilon = 1e-7);
        // Peak value is the square of the central 1D weight.
        let center = gaussian_kernel_1d(1.0)[4];
        assert_abs_diff_eq!(smoothed[[10, 10]] as f64, center * center, epsilon = 1e-6);
    }

    #[test]
    fn smoothing_runs_down_columns_before_rows() {
        let frame = Array2::from_shape_fn((7, 11), |(r, c)| ((r * 31 + c * 17) % 13) as f32 / 13.0);
        let kernel = gaussian_kernel_1d(1.0);
        let radius = (kernel.len() / 2) as isize;
        let pass = |src: &Frame, along_rows: bool| {
            Array2::from_shape_fn(src.raw_dim(), |(r, c)| {
                let acc: f64 = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| {
                        let off = k as isize - radius;
                        let v = if along_rows {
                            src[[reflect_index(r as isize + off, src.nrows()), c]]
                        } else {
                            src[[r, reflect_index(c as isize + off, src.ncols())]]
                        };
                        w * v as f64
                    })
                    .sum();
                acc as f32
            })
        };
        let expected = pass(&pass(&frame, true), false);

        assert_eq!(gaussian_filter(&frame, 1.0), expected);
    }

    #[test]
    fn binarize_is_inclusive_at_threshold() {
        let frame = array![[0.1f32, 0.2], [0.25, 0.9]];
        let bin = binarize(&frame, 0.2);
        assert_eq!(bin, array![[0.0f32, 1.0], [1.0, 1.0]]);
    }

    #[test]
    fn out_of_range_thresholds_saturate() {
        let frame = array![[0.1f32, 0.5], [0.7, 0.9]];
        assert_eq!(active_pixels(&binarize(&frame, 5.0)), 0);
        assert_eq!(active_pixels(&binarize(&frame, -5.0)), 4);
    }

    #[test]
    fn pixel_ratio_is_a_percentage() {
        let frame = array![[1.0f32, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]];
        assert_abs_diff_eq!(pixel_ratio(&frame), 25.0);
        assert_eq!(pixel_ratio(&Array2::<f32>::zeros((0, 0))), 0.0);
    }

    #[test]
    fn frames_from_flat_checks_length() {
        let pixels: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let frames = frames_from_flat(&pixels, 3, [2, 2]).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], array![[4.0f32, 5.0], [6.0, 7.0]]);

        let err = frames_from_flat(&pixels, 2, [2, 2]).unwrap_err();
        assert!(matches!(err, FireVaeError::Shape { .. }));
    }

    #[test]
    fn dynamic_range_of_binary_frame() {
        assert_eq!(dynamic_range(&array![[0.0f32, 1.0]]), 1.0);
        assert_eq!(dynamic_range(&Array2::<f32>::zeros((3, 3))), 0.0);
    }
}

//! Image similarity metrics used by the matcher.

use ndarray::{Array2, ArrayView2};

use crate::error::{FireVaeError, FireVaeResult};

/// Side length of the SSIM sliding window.
pub const SSIM_WIN_SIZE: usize = 7;

const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;

fn check_same_shape(a: &ArrayView2<'_, f32>, b: &ArrayView2<'_, f32>) -> FireVaeResult<()> {
    if a.dim() != b.dim() {
        return Err(FireVaeError::shape(
            format!("{:?}", a.dim()),
            format!("{:?}", b.dim()),
        ));
    }
    Ok(())
}

/// Mean squared error over all pixels.
///
/// # Errors
///
/// [`FireVaeError::Shape`] if the frames differ in shape, and
/// [`FireVaeError::EmptyInput`] for zero-sized frames.
pub fn mse(a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>) -> FireVaeResult<f64> {
    check_same_shape(&a, &b)?;
    if a.is_empty() {
        return Err(FireVaeError::EmptyInput("mse of zero-sized frames".into()));
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum / a.len() as f64)
}

/// Summed-area table with a leading zero row and column.
struct Integral {
    table: Array2<f64>,
}

impl Integral {
    fn new(h: usize, w: usize, value: impl Fn(usize, usize) -> f64) -> Self {
        let mut table = Array2::<f64>::zeros((h + 1, w + 1));
        for r in 0..h {
            let mut row_sum = 0.0;
            for c in 0..w {
                row_sum += value(r, c);
                table[[r + 1, c + 1]] = table[[r, c + 1]] + row_sum;
            }
        }
        Self { table }
    }

    /// Sum over rows `r0..r1`, columns `c0..c1`.
    fn window_sum(&self, r0: usize, c0: usize, r1: usize, c1: usize) -> f64 {
        let t = &self.table;
        t[[r1, c1]] - t[[r0, c1]] - t[[r1, c0]] + t[[r0, c0]]
    }
}

/// Mean structural similarity between two frames.
///
/// Uses a 7×7 uniform window with sample covariance and
/// `C1 = (0.01 * data_range)^2`, `C2 = (0.03 * data_range)^2`. The SSIM map is
/// averaged over window centres at least three pixels from every border.
/// A `data_range` of zero on flat windows yields `NaN`; it is returned as is.
///
/// # Errors
///
/// [`FireVaeError::Shape`] if the frames differ in shape or either side is
/// smaller than the window.
pub fn ssim(a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>, data_range: f64) -> FireVaeResult<f64> {
    check_same_shape(&a, &b)?;
    let (h, w) = a.dim();
    if h < SSIM_WIN_SIZE || w < SSIM_WIN_SIZE {
        return Err(FireVaeError::shape(
            format!("at least {SSIM_WIN_SIZE} x {SSIM_WIN_SIZE} pixels"),
            format!("{h} x {w}"),
        ));
    }

    let x = |r: usize, c: usize| a[[r, c]] as f64;
    let y = |r: usize, c: usize| b[[r, c]] as f64;
    let sx = Integral::new(h, w, x);
    let sy = Integral::new(h, w, y);
    let sxx = Integral::new(h, w, |r, c| x(r, c) * x(r, c));
    let syy = Integral::new(h, w, |r, c| y(r, c) * y(r, c));
    let sxy = Integral::new(h, w, |r, c| x(r, c) * y(r, c));

    let np = (SSIM_WIN_SIZE * SSIM_WIN_SIZE) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (SSIM_K1 * data_range).powi(2);
    let c2 = (SSIM_K2 * data_range).powi(2);
    let pad = (SSIM_WIN_SIZE - 1) / 2;

    let mut total = 0.0;
    let mut count = 0usize;
    for r in pad..h - pad {
        for c in pad..w - pad {
            let (top, left, bottom, right) = (r - pad, c - pad, r + pad + 1, c + pad + 1);
            let ux = sx.window_sum(top, left, bottom, right) / np;
            let uy = sy.window_sum(top, left, bottom, right) / np;
            let uxx = sxx.window_sum(top, left, bottom, right) / np;
            let uyy = syy.window_sum(top, left, bottom, right) / np;
            let uxy = sxy.window_sum(top, left, bottom, right) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            total += numerator / denominator;
            count += 1;
        }
    }

    Ok(total / count as f64)
}

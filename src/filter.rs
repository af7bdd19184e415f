//! Post-processing (smooth + binarize) and the active-pixel ratio filter.

use crate::Frame;
use crate::frame::{active_pixels, binarize, gaussian_filter, pixel_ratio};

/// Spread of the smoothing kernel applied before binarization.
pub const SMOOTHING_SIGMA: f64 = 1.0;

/// Inclusive percentage window on the share of active pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRatioRange {
    pub low: f64,
    pub high: f64,
}

impl PixelRatioRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, ratio: f64) -> bool {
        self.low <= ratio && ratio <= self.high
    }
}

impl From<(f64, f64)> for PixelRatioRange {
    fn from((low, high): (f64, f64)) -> Self {
        Self::new(low, high)
    }
}

/// Smooths a raw decoded frame and thresholds it into a 0/1 mask.
pub fn postprocess(frame: &Frame, threshold: f32) -> Frame {
    binarize(&gaussian_filter(frame, SMOOTHING_SIGMA), threshold)
}

/// Post-processes every frame in order.
///
/// With `print_info` set, each frame's pixel counts are logged; the returned
/// masks are identical either way.
pub fn postprocess_all(frames: &[Frame], threshold: f32, print_info: bool) -> Vec<Frame> {
    let total = frames.len();
    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let mask = postprocess(frame, threshold);
            if print_info {
                log::info!("Generated Image {}/{}", i + 1, total);
                log::info!("Threshold: {}", threshold);
                log::info!("Total Pixels: {}", mask.len());
                log::info!("Active Pixels: {}", active_pixels(&mask));
                log::info!("Pixel Ratio: {:.2}%", pixel_ratio(&mask));
            }
            mask
        })
        .collect()
}

/// Keeps the masks whose active-pixel percentage lies in `range`, in order.
pub fn filter_by_pixel_ratio(masks: Vec<Frame>, range: PixelRatioRange) -> Vec<Frame> {
    masks
        .into_iter()
        .filter(|mask| range.contains(pixel_ratio(mask)))
        .collect()
}

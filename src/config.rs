use burn::config::Config;
use std::path::Path;

use crate::error::{FireVaeError, FireVaeResult};
use crate::matcher::DEFAULT_TOP_IMAGES;
use crate::{FRAME_DIM_X, FRAME_DIM_Y};

// --- CONFIG ---

/// Parameters of one `generate_and_filter_images` run.
///
/// Saved and loaded as JSON through burn's [`Config`] machinery, so a run can
/// be reproduced from the file written next to its outputs.
#[derive(Config, Debug)]
pub struct GenerationConfig {
    /// Number of latent vectors drawn and decoded.
    #[config(default = 500)]
    pub num_samples: usize,

    /// Inclusive `(low, high)` percentage of active pixels a binarized
    /// sample must have to be kept.
    #[config(default = "(5.0, 14.0)")]
    pub pixel_ratio_range: (f64, f64),

    /// Binarization threshold applied after smoothing.
    #[config(default = 0.2)]
    pub threshold: f32,

    /// Number of ranked images returned by the matcher.
    #[config(default = "DEFAULT_TOP_IMAGES")]
    pub num_images: usize,

    /// Log per-image pixel counts while filtering.
    #[config(default = false)]
    pub print_info: bool,

    #[config(default = 256)]
    pub frame_height: usize,

    #[config(default = 256)]
    pub frame_width: usize,
}

impl GenerationConfig {
    /// `[height, width]` every decoded sample is reshaped to.
    pub fn frame_shape(&self) -> [usize; 2] {
        [self.frame_height, self.frame_width]
    }

    /// Reads a config file, mapping burn's error into ours.
    pub fn load_json(path: impl AsRef<Path>) -> FireVaeResult<Self> {
        let path = path.as_ref();
        Self::load(path).map_err(|e| FireVaeError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> FireVaeResult<()> {
        let path = path.as_ref();
        self.save(path)
            .map_err(|e| FireVaeError::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Compile-time frame size used by the stock model and tools.
pub const DEFAULT_FRAME_SHAPE: [usize; 2] = [FRAME_DIM_Y, FRAME_DIM_X];

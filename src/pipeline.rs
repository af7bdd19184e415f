use burn::tensor::backend::Backend;

use crate::Frame;
use crate::config::GenerationConfig;
use crate::data::ObservationSet;
use crate::error::FireVaeResult;
use crate::filter::{filter_by_pixel_ratio, postprocess_all};
use crate::matcher::{MatchResult, RankedImage, best_cross_match, rank_by_distance};
use crate::sampler::{LatentDecoder, sample_images};

/// Everything a successful run produces.
#[derive(Clone, Debug)]
pub struct GenerationReport {
    /// Binarized samples that passed the pixel-ratio filter, in draw order.
    pub filtered: Vec<Frame>,
    /// Best (generated, observation) pair.
    pub best: MatchResult,
    /// Filtered samples closest to `best.generated`, ascending by MSE.
    pub top: Vec<RankedImage>,
}

/// Result of [`generate_and_filter_images`].
#[derive(Clone, Debug)]
pub enum GenerationOutcome {
    Matched(Box<GenerationReport>),
    /// No sample fell inside the pixel-ratio range; nothing was matched.
    NoneInRange {
        /// How many samples were generated and rejected.
        generated: usize,
    },
}

impl GenerationOutcome {
    pub fn report(&self) -> Option<&GenerationReport> {
        match self {
            GenerationOutcome::Matched(report) => Some(report),
            GenerationOutcome::NoneInRange { .. } => None,
        }
    }

    pub fn into_report(self) -> Option<GenerationReport> {
        match self {
            GenerationOutcome::Matched(report) => Some(*report),
            GenerationOutcome::NoneInRange { .. } => None,
        }
    }
}

/// Draws samples from the model's latent space, keeps the plausible ones and
/// matches them against the observations.
///
/// Stages, in order:
/// 1. decode `config.num_samples` standard-normal latent vectors;
/// 2. smooth (sigma 1) and binarize each sample at `config.threshold`;
/// 3. keep samples whose active-pixel percentage lies in
///    `config.pixel_ratio_range` (inclusive);
/// 4. find the best (MSE down *and* SSIM up) pair against `observations`,
///    then rank all kept samples by MSE to that best sample.
///
/// An empty filter result is not an error: it is reported as
/// [`GenerationOutcome::NoneInRange`].
///
/// # Errors
///
/// Shape mismatches between decoder output, the configured frame shape and
/// the observations, and [`crate::FireVaeError::NoBestMatch`] when the search
/// never accepts a pair.
pub fn generate_and_filter_images<B, M, O>(
    model: &M,
    observations: &O,
    config: &GenerationConfig,
    device: &B::Device,
) -> FireVaeResult<GenerationOutcome>
where
    B: Backend,
    M: LatentDecoder<B>,
    O: ObservationSet + ?Sized,
{
    log::info!(
        "Sampling {} images from a {}-d latent space",
        config.num_samples,
        model.latent_dim()
    );
    let samples = sample_images::<B, M>(model, config.num_samples, config.frame_shape(), device)?;

    filter_and_match(&samples, observations, config)
}

/// Stages 2–4 of [`generate_and_filter_images`] on already decoded samples.
pub fn filter_and_match<O>(
    samples: &[Frame],
    observations: &O,
    config: &GenerationConfig,
) -> FireVaeResult<GenerationOutcome>
where
    O: ObservationSet + ?Sized,
{
    let masks = postprocess_all(samples, config.threshold, config.print_info);
    let filtered = filter_by_pixel_ratio(masks, config.pixel_ratio_range.into());

    if filtered.is_empty() {
        log::warn!("No images meet the pixel ratio criteria.");
        return Ok(GenerationOutcome::NoneInRange {
            generated: samples.len(),
        });
    }
    log::info!("Total Valid Generated Images: {}", filtered.len());

    let best = best_cross_match(&filtered, observations)?;
    log::info!(
        "Best match: observation {} (mse {:.5}, ssim {:.5})",
        best.observation_index,
        best.mse,
        best.ssim
    );

    let top = rank_by_distance(&filtered, &best.generated, config.num_images)?;

    Ok(GenerationOutcome::Matched(Box::new(GenerationReport {
        filtered,
        best,
        top,
    })))
}

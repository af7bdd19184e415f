//! Best cross-match between generated masks and observations, and ranking of
//! all masks by their distance to that best match.

use crate::Frame;
use crate::data::ObservationSet;
use crate::error::{FireVaeError, FireVaeResult};
use crate::frame::dynamic_range;
use crate::metrics::{mse, ssim};

/// Upper bound on how many ranked images a front end should render.
pub const MAX_DISPLAY_IMAGES: usize = 100;

/// Default number of ranked images.
pub const DEFAULT_TOP_IMAGES: usize = 10;

/// The single best (generated, observation) pair.
#[derive(Clone, Debug)]
pub struct MatchResult {
    /// Position of the best mask in the filtered set.
    pub generated_index: usize,
    pub generated: Frame,
    pub observation_index: usize,
    pub observation: Frame,
    pub mse: f64,
    pub ssim: f64,
}

/// Running state of the cross-match search.
///
/// A pair replaces the current best only if its MSE is strictly lower *and*
/// its SSIM strictly higher. Improving one metric alone is not enough, and a
/// `NaN` in either metric never wins.
#[derive(Clone, Debug)]
pub struct BestMatchTracker {
    lowest_mse: f64,
    highest_ssim: f64,
    best: Option<(usize, usize)>,
}

impl Default for BestMatchTracker {
    fn default() -> Self {
        Self {
            lowest_mse: f64::INFINITY,
            highest_ssim: -1.0,
            best: None,
        }
    }
}

impl BestMatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a candidate pair; returns whether it became the new best.
    pub fn offer(&mut self, generated_index: usize, observation_index: usize, mse: f64, ssim: f64) -> bool {
        if mse < self.lowest_mse && ssim > self.highest_ssim {
            self.lowest_mse = mse;
            self.highest_ssim = ssim;
            self.best = Some((generated_index, observation_index));
            true
        } else {
            false
        }
    }

    pub fn lowest_mse(&self) -> f64 {
        self.lowest_mse
    }

    pub fn highest_ssim(&self) -> f64 {
        self.highest_ssim
    }

    /// `(generated_index, observation_index)` of the current best, if any.
    pub fn best(&self) -> Option<(usize, usize)> {
        self.best
    }
}

/// Compares every filtered mask with every observation.
///
/// SSIM uses the generated mask's own `max - min` as its data range.
///
/// # Errors
///
/// - [`FireVaeError::Shape`] if a mask and an observation differ in shape.
/// - [`FireVaeError::NoBestMatch`] if no pair ever beat the initial sentinel,
///   e.g. with no observations or when every SSIM is `NaN`.
pub fn best_cross_match<O>(filtered: &[Frame], observations: &O) -> FireVaeResult<MatchResult>
where
    O: ObservationSet + ?Sized,
{
    let mut tracker = BestMatchTracker::new();

    for (i, generated) in filtered.iter().enumerate() {
        let data_range = dynamic_range(generated);

        for j in 0..observations.len() {
            let Some(obs) = observations.frame(j) else {
                break;
            };
            let mse_value = mse(obs, generated.view())?;
            let ssim_value = ssim(obs, generated.view(), data_range)?;

            if tracker.offer(i, j, mse_value, ssim_value) {
                log::debug!(
                    "new best: generated {} vs observation {} (mse {:.5}, ssim {:.5})",
                    i,
                    j,
                    mse_value,
                    ssim_value
                );
            }
        }
    }

    let (generated_index, observation_index) = tracker.best().ok_or(FireVaeError::NoBestMatch)?;
    let observation = observations
        .frame(observation_index)
        .ok_or(FireVaeError::NoBestMatch)?
        .to_owned();

    Ok(MatchResult {
        generated_index,
        generated: filtered[generated_index].clone(),
        observation_index,
        observation,
        mse: tracker.lowest_mse(),
        ssim: tracker.highest_ssim(),
    })
}

/// A filtered mask and its MSE to the best generated mask.
#[derive(Clone, Debug)]
pub struct RankedImage {
    /// Position in the filtered set.
    pub index: usize,
    pub image: Frame,
    pub mse: f64,
}

/// Ranks every filtered mask (the best one included) by MSE to `best`.
///
/// Sorted ascending; ties keep filtered-set order. Returns
/// `min(count, filtered.len())` entries.
pub fn rank_by_distance(filtered: &[Frame], best: &Frame, count: usize) -> FireVaeResult<Vec<RankedImage>> {
    let mut scored = filtered
        .iter()
        .enumerate()
        .map(|(index, image)| Ok((index, mse(best.view(), image.view())?)))
        .collect::<FireVaeResult<Vec<(usize, f64)>>>()?;

    scored.sort_by(|a, b| a.1.total_cmp(&b.1));

    Ok(scored
        .into_iter()
        .take(count)
        .map(|(index, mse)| RankedImage {
            index,
            image: filtered[index].clone(),
            mse,
        })
        .collect())
}

//! Reconstruction quality of a trained model on held-out frames.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::ElementConversion,
    tensor::{Tensor, backend::Backend},
};
use clap::ValueEnum;
use rand::Rng;

use crate::Frame;
use crate::data::FrameBatcher;
use crate::error::{FireVaeError, FireVaeResult};
use crate::frame::frames_from_flat;
use crate::model::FireVae;
use crate::sampler::tensor_to_pixels;

/// Per-batch reconstruction loss, summed over the batch.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconCriterion {
    /// Sum of squared pixel differences.
    #[default]
    SumSquared,
    /// Binary cross-entropy, treating pixels as Bernoulli probabilities.
    Bce,
}

impl ReconCriterion {
    pub fn evaluate<B: Backend>(&self, recon_x: Tensor<B, 2>, x: Tensor<B, 2>) -> Tensor<B, 1> {
        match self {
            ReconCriterion::SumSquared => (recon_x - x).powf_scalar(2.0).sum(),
            ReconCriterion::Bce => {
                // Clamp predicted pixels so log() never receives 0.0 or 1.0
                let eps = 1e-7;
                let recon_clamp = recon_x.clamp(eps, 1.0 - eps);
                (x.clone() * recon_clamp.clone().log()
                    + x.neg().add_scalar(1.0) * recon_clamp.neg().add_scalar(1.0).log())
                .neg()
                .sum()
            }
        }
    }
}

/// Every frame must flatten to the encoder's input width.
fn check_input_width<B: Backend>(model: &FireVae<B>, frames: &[Frame]) -> FireVaeResult<()> {
    let expected = model.encoder.input_dim();
    match frames.iter().find(|f| f.len() != expected) {
        Some(frame) => Err(FireVaeError::shape(
            format!("{expected} pixels per frame"),
            format!("{:?}", frame.dim()),
        )),
        None => Ok(()),
    }
}

/// Average reconstruction loss per frame.
///
/// Frames are pushed through the full model (encode, sample, decode) in
/// batches of `batch_size`; the per-batch criterion values are summed and
/// divided by the number of frames.
pub fn reconstruction_error<B: Backend>(
    model: &FireVae<B>,
    frames: &[Frame],
    batch_size: usize,
    criterion: ReconCriterion,
    device: &B::Device,
) -> FireVaeResult<f64> {
    if frames.is_empty() {
        return Err(FireVaeError::EmptyInput("no frames to evaluate".into()));
    }
    if batch_size == 0 {
        return Err(FireVaeError::InvalidArgument("batch_size must be positive".into()));
    }
    check_input_width(model, frames)?;

    let batcher = FrameBatcher::<B>::new();
    let mut total_error = 0.0;

    for chunk in frames.chunks(batch_size) {
        let x = batcher.batch(chunk.to_vec(), device);
        let (recon_x, _, _) = model.forward(x.clone());
        total_error += criterion.evaluate(recon_x, x).into_scalar().elem::<f64>();
    }

    Ok(total_error / frames.len() as f64)
}

/// Which frames to show in a reconstruction panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelSelection {
    /// `count` indices drawn uniformly, with replacement.
    Random(usize),
    Indices(Vec<usize>),
}

impl Default for PanelSelection {
    fn default() -> Self {
        PanelSelection::Indices(vec![0, 1, 2])
    }
}

/// Resolves a selection against `len` frames.
///
/// Random draws are capped at `len`; explicit indices must be in bounds.
pub fn select_panel_indices<R: Rng + ?Sized>(
    len: usize,
    selection: &PanelSelection,
    rng: &mut R,
) -> FireVaeResult<Vec<usize>> {
    match selection {
        PanelSelection::Random(count) => {
            if len == 0 {
                return Ok(Vec::new());
            }
            Ok((0..(*count).min(len)).map(|_| rng.random_range(0..len)).collect())
        }
        PanelSelection::Indices(indices) => {
            if let Some(bad) = indices.iter().find(|&&i| i >= len) {
                return Err(FireVaeError::InvalidArgument(format!(
                    "panel index {bad} out of range for {len} frames"
                )));
            }
            Ok(indices.clone())
        }
    }
}

/// One column of a reconstruction figure.
#[derive(Clone, Debug)]
pub struct ReconstructionPanel {
    pub index: usize,
    pub raw: Frame,
    pub recon: Frame,
    /// `raw - recon`.
    pub diff: Frame,
}

/// Reconstructs the frames at `indices` in one batch.
pub fn reconstruction_panels<B: Backend>(
    model: &FireVae<B>,
    frames: &[Frame],
    indices: &[usize],
    device: &B::Device,
) -> FireVaeResult<Vec<ReconstructionPanel>> {
    if indices.is_empty() {
        return Ok(Vec::new());
    }
    let selected: Vec<Frame> = indices
        .iter()
        .map(|&i| {
            frames.get(i).cloned().ok_or_else(|| {
                FireVaeError::InvalidArgument(format!("panel index {i} out of range"))
            })
        })
        .collect::<FireVaeResult<_>>()?;
    check_input_width(model, &selected)?;
    let (height, width) = selected[0].dim();

    let x = FrameBatcher::<B>::new().batch(selected.clone(), device);
    let (recon_x, _, _) = model.forward(x);
    let recons = frames_from_flat(&tensor_to_pixels(recon_x)?, indices.len(), [height, width])?;

    Ok(indices
        .iter()
        .zip(selected)
        .zip(recons)
        .map(|((&index, raw), recon)| {
            let diff = &raw - &recon;
            ReconstructionPanel {
                index,
                raw,
                recon,
                diff,
            }
        })
        .collect())
}

use burn::tensor::{Distribution, Tensor, backend::Backend};
use ndarray::Array2;

pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod filter;
pub mod frame;
pub mod matcher;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod sampler;

pub use error::{FireVaeError, FireVaeResult};
pub use pipeline::{GenerationOutcome, GenerationReport, generate_and_filter_images};

/// Height of a fire-front frame in pixels (256).
pub const FRAME_DIM_Y: usize = 256;

/// Width of a fire-front frame in pixels (256).
pub const FRAME_DIM_X: usize = 256;

/// Default dimensionality of the VAE latent space.
///
/// Only used when building a fresh [`model::FireVaeConfig`]; a loaded
/// checkpoint always reports its own latent size.
pub const LATENT_DIM: usize = 16;

/// A single-channel image, row-major `[height, width]`.
///
/// Generated samples, binarized samples and observation frames all share this
/// representation so that the metrics can compare them directly.
pub type Frame = Array2<f32>;

/// Reparameterization trick: `z = mu + eps * exp(0.5 * logvar)`, `eps ~ N(0, 1)`.
pub fn reparameterize<B: Backend>(mu: Tensor<B, 2>, logvar: Tensor<B, 2>) -> Tensor<B, 2> {
    let std = logvar.mul_scalar(0.5).exp();
    let eps = Tensor::random_like(&std, Distribution::Normal(0.0, 1.0));
    mu + eps * std
}

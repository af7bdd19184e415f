use burn::tensor::{Distribution, Tensor, backend::Backend};

use crate::Frame;
use crate::error::{FireVaeError, FireVaeResult};
use crate::frame::frames_from_flat;

/// A generative model that can turn latent vectors into images.
///
/// `decode` receives a `[batch, latent_dim]` tensor and must return one
/// flattened, row-major image per row: `[batch, height * width]`.
pub trait LatentDecoder<B: Backend> {
    /// Width of the latent space the decoder expects.
    fn latent_dim(&self) -> usize;

    fn decode(&self, z: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Draws `num_samples` latent vectors with i.i.d. `N(0, 1)` components.
pub fn sample_latents<B: Backend>(
    num_samples: usize,
    latent_dim: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    Tensor::<B, 2>::random(
        [num_samples, latent_dim],
        Distribution::Normal(0.0, 1.0),
        device,
    )
}

/// Moves a decoded batch back to the host as `f32` pixels.
pub fn tensor_to_pixels<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> FireVaeResult<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| FireVaeError::Tensor(format!("{e:?}")))
}

/// Samples the latent space and decodes every vector in a single batch.
///
/// Runs on whatever backend `B` is; pass a plain (non-autodiff) backend so no
/// gradient graph is recorded. Seeding `B` beforehand makes the draw
/// reproducible.
///
/// # Errors
///
/// [`FireVaeError::Shape`] when the decoder output does not hold exactly
/// `num_samples * height * width` values.
pub fn sample_images<B, M>(
    model: &M,
    num_samples: usize,
    shape: [usize; 2],
    device: &B::Device,
) -> FireVaeResult<Vec<Frame>>
where
    B: Backend,
    M: LatentDecoder<B>,
{
    if num_samples == 0 {
        return Ok(Vec::new());
    }

    let z = sample_latents::<B>(num_samples, model.latent_dim(), device);
    let decoded = model.decode(z);
    log::debug!("decoded batch dims: {:?}", decoded.dims());

    let pixels = tensor_to_pixels(decoded)?;
    frames_from_flat(&pixels, num_samples, shape)
}

use crate::error::{FireVaeError, FireVaeResult};
use crate::reparameterize;
use crate::sampler::LatentDecoder;
use crate::{FRAME_DIM_X, FRAME_DIM_Y, LATENT_DIM};
use burn::{
    config::Config,
    module::Module,
    nn::{Linear, LinearConfig, Relu},
    record::{BinFileRecorder, FullPrecisionSettings, Recorder},
    tensor::{Tensor, activation, backend::Backend},
};
use std::path::{Path, PathBuf};

/// File stem of the weights written by training (`fire_vae.bin`).
pub const MODEL_FILE_STEM: &str = "fire_vae";

/// Name of the architecture file stored next to the weights.
pub const MODEL_CONFIG_FILE: &str = "fire_vae.config.json";

// --- CONFIG ---

#[derive(Config, Debug)]
pub struct FireVaeConfig {
    /// Flattened frame size, 256×256 by default.
    #[config(default = "FRAME_DIM_X * FRAME_DIM_Y")]
    pub input_dim: usize,

    /// List of hidden layer sizes.
    /// e.g., vec![1024, 256] creates: Input -> 1024 -> 256 -> Latent
    #[config(default = "vec![1024, 256]")]
    pub hidden_dims: Vec<usize>,

    #[config(default = "LATENT_DIM")]
    pub latent_dim: usize,
}

// --- ENCODER ---

#[derive(Module, Debug)]
pub struct FireEncoder<B: Backend> {
    layers: Vec<Linear<B>>,
    fc_mu: Linear<B>,
    fc_logvar: Linear<B>,
    activation: Relu,
}

impl<B: Backend> FireEncoder<B> {
    pub fn new(config: &FireVaeConfig, device: &B::Device) -> Self {
        let mut layers = Vec::new();
        let mut current_dim = config.input_dim;

        for &dim in &config.hidden_dims {
            layers.push(LinearConfig::new(current_dim, dim).init(device));
            current_dim = dim;
        }

        let fc_mu = LinearConfig::new(current_dim, config.latent_dim).init(device);
        let fc_logvar = LinearConfig::new(current_dim, config.latent_dim).init(device);

        Self {
            layers,
            fc_mu,
            fc_logvar,
            activation: Relu::new(),
        }
    }

    /// Output width of the `mu` head, i.e. the latent dimensionality.
    pub fn latent_dim(&self) -> usize {
        // Linear weights are stored as [d_input, d_output].
        self.fc_mu.weight.val().dims()[1]
    }

    /// Flattened frame size the first layer accepts.
    pub fn input_dim(&self) -> usize {
        self.layers.first().unwrap_or(&self.fc_mu).weight.val().dims()[0]
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let mut x = x;

        for layer in &self.layers {
            x = layer.forward(x);
            x = self.activation.forward(x);
        }

        let mu = self.fc_mu.forward(x.clone());
        let logvar = self.fc_logvar.forward(x);

        (mu, logvar)
    }
}

// --- DECODER ---

#[derive(Module, Debug)]
pub struct FireDecoder<B: Backend> {
    layers: Vec<Linear<B>>,
    output_layer: Linear<B>,
    activation: Relu,
}

impl<B: Backend> FireDecoder<B> {
    pub fn new(config: &FireVaeConfig, device: &B::Device) -> Self {
        let mut layers = Vec::new();
        let mut current_dim = config.latent_dim;

        // Mirror of the encoder stack: Latent -> 256 -> 1024 -> Input
        for &dim in config.hidden_dims.iter().rev() {
            layers.push(LinearConfig::new(current_dim, dim).init(device));
            current_dim = dim;
        }

        let output_layer = LinearConfig::new(current_dim, config.input_dim).init(device);

        Self {
            layers,
            output_layer,
            activation: Relu::new(),
        }
    }

    /// Maps `[batch, latent_dim]` to flattened frames in `(0, 1)`.
    pub fn forward(&self, z: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = z;

        for layer in &self.layers {
            x = layer.forward(x);
            x = self.activation.forward(x);
        }

        let x = self.output_layer.forward(x);
        activation::sigmoid(x)
    }
}

// --- FULL VAE ---

/// Dense VAE over flattened fire-front frames.
#[derive(Module, Debug)]
pub struct FireVae<B: Backend> {
    pub encoder: FireEncoder<B>,
    pub decoder: FireDecoder<B>,
}

impl<B: Backend> FireVae<B> {
    pub fn new(config: &FireVaeConfig, device: &B::Device) -> Self {
        Self {
            encoder: FireEncoder::new(config, device),
            decoder: FireDecoder::new(config, device),
        }
    }

    /// Returns `(reconstruction, mu, logvar)`.
    pub fn forward(&self, x: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 2>) {
        let (mu, logvar) = self.encoder.forward(x);
        let z = reparameterize(mu.clone(), logvar.clone());
        let recon_x = self.decoder.forward(z);
        (recon_x, mu, logvar)
    }
}

impl<B: Backend> LatentDecoder<B> for FireVae<B> {
    fn latent_dim(&self) -> usize {
        self.encoder.latent_dim()
    }

    fn decode(&self, z: Tensor<B, 2>) -> Tensor<B, 2> {
        self.decoder.forward(z)
    }
}

// --- CHECKPOINTS ---

fn weights_path(model_dir: &Path) -> PathBuf {
    model_dir.join(MODEL_FILE_STEM)
}

/// Writes the architecture and full-precision weights into `model_dir`.
pub fn save_model<B: Backend>(
    model: FireVae<B>,
    config: &FireVaeConfig,
    model_dir: impl AsRef<Path>,
) -> FireVaeResult<()> {
    let dir = model_dir.as_ref();
    std::fs::create_dir_all(dir)?;

    config
        .save(dir.join(MODEL_CONFIG_FILE))
        .map_err(|e| FireVaeError::Config(e.to_string()))?;

    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .save_file(weights_path(dir), &recorder)
        .map_err(|e| FireVaeError::Record(format!("{e:?}")))?;

    Ok(())
}

/// Loads a trained model from `model_dir` onto `device`, ready for inference.
///
/// Expects `fire_vae.config.json` and the `fire_vae` binary record written by
/// [`save_model`].
pub fn load_model<B: Backend>(
    model_dir: impl AsRef<Path>,
    device: &B::Device,
) -> FireVaeResult<FireVae<B>> {
    let dir = model_dir.as_ref();
    let config_path = dir.join(MODEL_CONFIG_FILE);
    let config = FireVaeConfig::load(&config_path)
        .map_err(|e| FireVaeError::Config(format!("{}: {}", config_path.display(), e)))?;

    let record = BinFileRecorder::<FullPrecisionSettings>::new()
        .load(weights_path(dir), device)
        .map_err(|e| FireVaeError::Record(format!("{e:?}")))?;

    let model = FireVae::new(&config, device).load_record(record);
    log::info!(
        "Loaded model from {} (latent_dim = {})",
        dir.display(),
        model.latent_dim()
    );

    Ok(model)
}

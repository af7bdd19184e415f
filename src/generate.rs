#![recursion_limit = "256"]

// --- IMPORTS ---
use fire_vae::config::GenerationConfig;
use fire_vae::device::{DevicePreference, select_device};
use fire_vae::export::{load_frames_from_dir, save_frame_png};
use fire_vae::matcher::MAX_DISPLAY_IMAGES;
use fire_vae::model::load_model;
use fire_vae::{GenerationOutcome, generate_and_filter_images};

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use burn_wgpu::Wgpu;
use clap::Parser;
use std::path::PathBuf;

// --- CLI DEFINITION ---

/// Command-line interface for latent-space generation and matching.
///
/// Samples the trained model, keeps samples whose burned-area share falls in
/// the requested range, and finds the sample closest to any observed frame.
/// Flags override values from `--config`.
#[derive(Parser, Debug)]
#[command(author, version, about = "Generate, filter and match fire fronts")]
struct Args {
    /// Directory holding `fire_vae.config.json` and the `fire_vae` weights.
    #[arg(long, default_value = "fire_model")]
    model_dir: PathBuf,

    /// Directory of observed frames (grayscale PNG, same size as the model output).
    #[arg(long)]
    observations: PathBuf,

    /// Generation config (JSON) to start from.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    num_samples: Option<usize>,

    /// Binarization threshold.
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<f32>,

    /// Lower bound (percent) of active pixels.
    #[arg(long)]
    ratio_min: Option<f64>,

    /// Upper bound (percent) of active pixels.
    #[arg(long)]
    ratio_max: Option<f64>,

    /// Number of ranked samples to keep.
    #[arg(long)]
    num_images: Option<usize>,

    /// Log pixel counts for every sample.
    #[arg(long)]
    print_info: bool,

    #[arg(long, value_enum, default_value_t = DevicePreference::Auto)]
    device: DevicePreference,

    /// Seed for the latent draw.
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory for the PNGs and the effective config.
    #[arg(short, long, default_value = "generated")]
    output: PathBuf,
}

// --- HELPER FUNCTIONS ---

/// Starts from the config file (or defaults) and applies CLI overrides.
fn build_config(args: &Args) -> Result<GenerationConfig> {
    let mut config = match &args.config {
        Some(path) => GenerationConfig::load_json(path)?,
        None => GenerationConfig::new(),
    };

    if let Some(n) = args.num_samples {
        config.num_samples = n;
    }
    if let Some(t) = args.threshold {
        config.threshold = t;
    }
    if let Some(lo) = args.ratio_min {
        config.pixel_ratio_range.0 = lo;
    }
    if let Some(hi) = args.ratio_max {
        config.pixel_ratio_range.1 = hi;
    }
    if let Some(k) = args.num_images {
        config.num_images = k;
    }
    config.print_info |= args.print_info;

    Ok(config)
}

// --- MAIN EXECUTION ---

/// Entry point.
///
/// Steps:
/// 1. Parse arguments and build the generation config
/// 2. Select the device and load the trained model
/// 3. Load observation frames
/// 4. Run the sampling / filtering / matching pipeline
/// 5. Write the best pair and the ranked samples as PNGs
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = build_config(&args)?;
    log::info!("Configuration: {:?}", config);

    // 1. Setup Compute Backend
    type InferenceBackend = Wgpu;
    let device = select_device(args.device);
    if let Some(seed) = args.seed {
        InferenceBackend::seed(seed);
    }

    // 2. Load Model and Observations
    let model = load_model::<InferenceBackend>(&args.model_dir, &device)
        .with_context(|| format!("loading model from {}", args.model_dir.display()))?;
    let observations = load_frames_from_dir(&args.observations)
        .with_context(|| format!("loading observations from {}", args.observations.display()))?;

    // 3. Run Pipeline
    let outcome =
        generate_and_filter_images::<InferenceBackend, _, _>(&model, &observations, &config, &device)?;

    let report = match outcome {
        GenerationOutcome::NoneInRange { generated } => {
            log::warn!(
                "None of the {} samples fell in {:?}%; try another threshold or range.",
                generated,
                config.pixel_ratio_range
            );
            return Ok(());
        }
        GenerationOutcome::Matched(report) => report,
    };

    // 4. Save Outputs
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    config.save_json(args.output.join("generation.config.json"))?;

    save_frame_png(&report.best.generated, args.output.join("best_generated.png"))?;
    save_frame_png(
        &report.best.observation,
        args.output.join(format!("best_observation_{:04}.png", report.best.observation_index)),
    )?;

    for (rank, item) in report.top.iter().take(MAX_DISPLAY_IMAGES).enumerate() {
        let name = format!("top_{:03}_mse_{:.4}.png", rank, item.mse);
        save_frame_png(&item.image, args.output.join(name))?;
    }

    println!(
        "Best match: observation #{} | MSE {:.5} | SSIM {:.5} | {} valid samples",
        report.best.observation_index,
        report.best.mse,
        report.best.ssim,
        report.filtered.len()
    );
    println!("Saved outputs to {}", args.output.display());

    Ok(())
}

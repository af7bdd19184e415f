#![recursion_limit = "256"]

// --- IMPORTS ---
use fire_vae::device::{DevicePreference, select_device};
use fire_vae::evaluate::{
    PanelSelection, ReconCriterion, reconstruction_error, reconstruction_panels,
    select_panel_indices,
};
use fire_vae::export::{load_frames_from_dir, save_frame_png};
use fire_vae::model::load_model;

use anyhow::{Context, Result};
use burn_wgpu::Wgpu;
use clap::Parser;
use std::path::PathBuf;

// --- CLI DEFINITION ---

/// Reconstruction report for a trained model on a directory of frames.
///
/// Prints the mean per-frame reconstruction loss and writes, for a few
/// frames, the raw image, its reconstruction and their difference.
#[derive(Parser, Debug)]
#[command(author, version, about = "Fire VAE reconstruction check")]
struct Args {
    #[arg(long, default_value = "fire_model")]
    model_dir: PathBuf,

    /// Directory of frames to reconstruct (grayscale PNG).
    #[arg(long)]
    frames: PathBuf,

    #[arg(long, value_enum, default_value_t = ReconCriterion::SumSquared)]
    criterion: ReconCriterion,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Number of randomly chosen frames to render.
    #[arg(long, default_value_t = 5)]
    num_images: usize,

    /// Render these frame indices instead of a random pick.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    indices: Option<Vec<usize>>,

    #[arg(long, value_enum, default_value_t = DevicePreference::Auto)]
    device: DevicePreference,

    #[arg(short, long, default_value = "reconstructions")]
    output: PathBuf,
}

// --- MAIN EXECUTION ---

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    type InferenceBackend = Wgpu;
    let device = select_device(args.device);

    let model = load_model::<InferenceBackend>(&args.model_dir, &device)
        .with_context(|| format!("loading model from {}", args.model_dir.display()))?;
    let frames = load_frames_from_dir(&args.frames)
        .with_context(|| format!("loading frames from {}", args.frames.display()))?;

    // 1. Aggregate error
    let error = reconstruction_error(&model, &frames, args.batch_size, args.criterion, &device)?;
    println!(
        "Mean {:?} reconstruction error over {} frames: {:.6}",
        args.criterion,
        frames.len(),
        error
    );

    // 2. Panels
    let selection = match args.indices {
        Some(indices) => PanelSelection::Indices(indices),
        None => PanelSelection::Random(args.num_images),
    };
    let indices = select_panel_indices(frames.len(), &selection, &mut rand::rng())?;
    let panels = reconstruction_panels(&model, &frames, &indices, &device)?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for (n, panel) in panels.iter().enumerate() {
        save_frame_png(&panel.raw, args.output.join(format!("{n:02}_raw_{}.png", panel.index)))?;
        save_frame_png(&panel.recon, args.output.join(format!("{n:02}_recon_{}.png", panel.index)))?;
        save_frame_png(&panel.diff, args.output.join(format!("{n:02}_diff_{}.png", panel.index)))?;
    }
    println!("Saved {} panels to {}", panels.len(), args.output.display());

    Ok(())
}

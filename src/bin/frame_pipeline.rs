//! Run the frame pipeline over image files
//!
//! Builds one trajectory record from the given images, runs the configured
//! decode, resize and augment stages on it and writes every resulting image
//! terminal as PNG.
//!
//! Usage: cargo run --release --bin frame_pipeline -- --traj-index 3 --output-dir out frame_0.jpg frame_1.jpg

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use frame_transforms::imaging::encode_png;
use frame_transforms::tree::flatten;
use frame_transforms::utils::init_env_logging;
use frame_transforms::{FramePipeline, Leaf, PipelineConfig, Record, TRAJ_INDEX_KEY};

#[derive(Parser, Debug)]
#[command(name = "frame_pipeline")]
#[command(about = "Decode, resize and augment the frames of one trajectory")]
#[command(version)]
struct Args {
    /// Pipeline configuration (TOML); defaults to decode + resize + augment
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trajectory index used to seed augmentation
    #[arg(short, long, default_value = "0")]
    traj_index: i64,

    /// Output directory for the transformed frames
    #[arg(short, long, default_value = "output/frames")]
    output_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Input image files, stored as observation/image_0, image_1, ...
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_env_logging(args.verbose)?;

    let config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load pipeline config {}", path.display()))?,
        None => PipelineConfig::standard(),
    };
    let pipeline = FramePipeline::from_config(&config)?;

    let mut observation = Record::new();
    for (i, path) in args.images.iter().enumerate() {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        observation.insert(format!("image_{i}"), Leaf::bytes(bytes));
    }
    let record = Record::new()
        .with(TRAJ_INDEX_KEY, args.traj_index)
        .with("observation", observation);

    info!(
        "Processing {} frame(s) of trajectory {}",
        args.images.len(),
        args.traj_index
    );
    let output = pipeline.apply(&record).context("Pipeline failed")?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let mut written = 0;
    for (keypath, leaf) in flatten(&output) {
        if !matches!(leaf, Leaf::Uint8(_) | Leaf::Float32(_)) || leaf.shape().len() != 3 {
            continue;
        }
        let png = encode_png(&leaf).with_context(|| format!("Failed to encode '{keypath}'"))?;
        let path = args.output_dir.join(format!("{}.png", keypath.replace('/', "_")));
        fs::write(&path, png).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} to {}", keypath, path.display());
        written += 1;
    }

    info!("Done: {} image(s) written to {}", written, args.output_dir.display());
    Ok(())
}

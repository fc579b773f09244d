//! Estimate the drop width of one video with a trained model
//!
//! Usage: cargo run --release --bin infer -- --data-file data/dataset.csv --video-id 3

use anyhow::{Context, Result};
use clap::Parser;
use drop_width::config::PipelineConfig;
use drop_width::data::DataLoader;
use drop_width::inference::{align, estimate_width};
use drop_width::model::ModelArtifact;
use drop_width::report::{default_output_path, plot_comparison, write_aligned_frames, PlotStyle};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Estimate drop width for one video")]
struct Args {
    /// Measurement table (CSV)
    #[arg(short, long, default_value = "data/dataset.csv")]
    data_file: PathBuf,

    /// Trained model artifact (JSON)
    #[arg(short, long, default_value = "models/model_lstm.json")]
    weights_file: PathBuf,

    /// Video to estimate
    #[arg(short, long)]
    video_id: i64,

    /// Frames per window; must match the trained model
    #[arg(short = 's', long, default_value = "20")]
    window_size: usize,

    /// Plot path (SVG); defaults to <output-dir>/<data stem>_<video id>.svg
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for the aligned-frame spreadsheet and the default plot
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = PipelineConfig::default().with_window_size(args.window_size);

    let artifact = ModelArtifact::load(&args.weights_file)
        .with_context(|| format!("Failed to load model {}", args.weights_file.display()))?;
    let dataset = DataLoader::load_csv(&args.data_file)
        .with_context(|| format!("Failed to load {}", args.data_file.display()))?;

    let estimate = estimate_width(&dataset, args.video_id, &artifact, &config)
        .with_context(|| format!("Failed to estimate width of video {}", args.video_id))?;
    let video = dataset.video(args.video_id)?;
    let frames = align(&video, &estimate)?;

    if let Some(report) = &estimate.report {
        info!(video_id = args.video_id, "{}", report);
    }

    let table_path = default_output_path(&args.data_file, args.video_id, &args.output_dir, "csv");
    write_aligned_frames(&table_path, &frames)
        .with_context(|| format!("Failed to write {}", table_path.display()))?;

    let plot_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.data_file, args.video_id, &args.output_dir, "svg"));
    let style = PlotStyle::default().with_title(format!("Video {}", args.video_id));
    plot_comparison(&plot_path, &frames, &style)
        .with_context(|| format!("Failed to plot {}", plot_path.display()))?;

    Ok(())
}

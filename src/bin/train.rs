//! Train the drop width regressor on a labelled measurement table
//!
//! Usage: cargo run --release --bin train -- --data-file data/dataset.csv --model-output models/model_lstm.json

use anyhow::{Context, Result};
use clap::Parser;
use drop_width::config::PipelineConfig;
use drop_width::data::DataLoader;
use drop_width::pipeline::train_model;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the LSTM drop width regressor")]
struct Args {
    /// Measurement table (CSV) with train/test split tags
    #[arg(short, long, default_value = "data/dataset.csv")]
    data_file: PathBuf,

    /// Where to write the model artifact (JSON)
    #[arg(short, long, default_value = "models/model_lstm.json")]
    model_output: PathBuf,

    /// Training epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Mini-batch size
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Frames per window
    #[arg(short = 's', long)]
    window_size: Option<usize>,

    /// Pipeline configuration (JSON); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the per-epoch training history (JSON) here
    #[arg(long)]
    history: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Start from the small smoke-run preset instead of the defaults
    #[arg(long, conflicts_with = "config")]
    quick: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None if args.quick => PipelineConfig::quick(),
        None => PipelineConfig::default(),
    };
    if let Some(epochs) = args.epochs {
        config = config.with_epochs(epochs);
    }
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(window_size) = args.window_size {
        config = config.with_window_size(window_size);
    }
    if args.progress {
        config = config.with_progress(true);
    }

    info!(
        data = %args.data_file.display(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        window_size = config.window_size,
        hidden_size = config.regressor.hidden_size,
        "training drop width regressor"
    );

    let dataset = DataLoader::load_csv(&args.data_file)
        .with_context(|| format!("Failed to load {}", args.data_file.display()))?;

    let run = train_model(&dataset, &config).context("Training failed")?;

    if let Some(last) = run.history.last() {
        info!(
            examples = run.train_examples,
            loss = last.loss,
            mae = last.mae,
            val_loss = ?last.val_loss,
            val_mae = ?last.val_mae,
            "final epoch"
        );
    }
    if let Some(eval) = run.test_evaluation {
        info!(loss = eval.loss, mse = eval.mse, mae = eval.mae, "test partition");
    }

    run.artifact
        .save(&args.model_output)
        .with_context(|| format!("Failed to save model to {}", args.model_output.display()))?;

    if let Some(path) = &args.history {
        run.history
            .save_json(path)
            .with_context(|| format!("Failed to write history to {}", path.display()))?;
        info!(path = %path.display(), "saved training history");
    }

    Ok(())
}

//! # Drop Width
//!
//! Estimates the width of a moving liquid drop, frame by frame, from its
//! side-view geometry with an LSTM sequence regressor.
//!
//! ## Modules
//!
//! - `data` - Measurement tables, split tags and CSV loading
//! - `preprocessing` - Feature/label extraction, min-max scaling, windowing
//! - `model` - LSTM regressor, Adam, persisted model artifact
//! - `pipeline` - End-to-end training
//! - `inference` - Per-video estimation and frame alignment
//! - `report` - Aligned-frame spreadsheet and comparison plot
//! - `utils` - Regression metrics
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use drop_width::config::PipelineConfig;
//! use drop_width::data::DataLoader;
//! use drop_width::inference::estimate_and_align;
//! use drop_width::pipeline::train_model;
//!
//! let config = PipelineConfig::default();
//! let dataset = DataLoader::load_csv("data/dataset.csv")?;
//!
//! let run = train_model(&dataset, &config)?;
//! run.artifact.save("models/model_lstm.json")?;
//!
//! let (estimate, frames) = estimate_and_align(&dataset, 3, &run.artifact, &config)?;
//! println!("{} frames, {:?}", frames.len(), estimate.report);
//! # Ok::<(), drop_width::DropWidthError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod utils;

pub use config::PipelineConfig;
pub use error::{DropWidthError, Result};
pub use inference::{align, estimate_width, AlignedFrame, WidthEstimate};
pub use model::{ModelArtifact, WidthRegressor};

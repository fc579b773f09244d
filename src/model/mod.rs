//! # Width regressor
//!
//! LSTM over a window of normalized features, followed by dropout and a
//! single tanh unit rescaled onto the training label range.
//!
//! ```rust,no_run
//! use drop_width::config::PipelineConfig;
//! use drop_width::model::{TrainOptions, WidthRegressor};
//! # use drop_width::preprocessing::WindowedExamples;
//! # let examples = WindowedExamples::empty(20, 6);
//!
//! let config = PipelineConfig::default();
//! let (mut regressor, split) = WidthRegressor::build(&examples, &config.regressor)?;
//! let history = regressor.fit(&split, &TrainOptions::from(&config))?;
//! println!("final loss {:?}", history.last().map(|m| m.loss));
//! # Ok::<(), drop_width::DropWidthError>(())
//! ```

mod artifact;
mod dense;
mod lstm;
mod optimizer;
mod regressor;

pub use artifact::{ModelArtifact, ARTIFACT_VERSION};
pub use dense::{dropout_mask, DenseGradients, DenseLayer};
pub use lstm::{LstmCache, LstmGradients, LstmLayer};
pub use optimizer::{Adam, Optimizer, ParamGrad};
pub use regressor::{
    train_val_split, EpochMetrics, Evaluation, FitValidationSplit, LabelRange, TrainOptions,
    TrainingHistory, WidthRegressor,
};

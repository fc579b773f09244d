//! # Utilities
//!
//! Regression metrics used by training, evaluation and inference.

pub mod metrics;

pub use metrics::{mae, mape, mse, r2_score, rmse, RegressionReport};

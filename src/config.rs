//! Pipeline configuration
//!
//! Every tunable of the pipeline lives here: window size, regressor
//! hyper-parameters, training schedule and the two leniency policies that
//! decide what happens with short videos and with columns missing from one of
//! the normalized tables.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conversion factor from centimetres to micrometres
pub const CM_TO_UM: f64 = 10_000.0;

/// What to do with a video that has fewer frames than the window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShortSequencePolicy {
    /// Leave the video out of the windowed examples without a warning
    #[default]
    Skip,
    /// Fail with `InsufficientFrames`
    Reject,
}

/// What to do when a reference column is absent from the target table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaDriftPolicy {
    /// Log a warning and leave the column unnormalized
    #[default]
    Warn,
    /// Fail with `MissingColumn`
    Reject,
}

/// Recurrent regressor hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressorConfig {
    /// LSTM units
    pub hidden_size: usize,
    /// Dropout rate applied to the LSTM output during training
    pub dropout: f64,
    /// L2 coefficient on the kernel and recurrent weights
    pub l2: f64,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Fraction of windowed examples held out for validation
    pub validation_fraction: f64,
    /// Seed for weight init, the fit/validation split, shuffling and dropout
    pub seed: u64,
}

impl Default for RegressorConfig {
    fn default() -> Self {
        Self {
            hidden_size: 48,
            dropout: 0.5,
            l2: 0.01,
            learning_rate: 0.001,
            validation_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames per window (W)
    pub window_size: usize,
    /// Training epochs
    pub epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Label unit conversion applied to `Drop width (cm)`
    pub label_scale: f64,
    /// Log a training summary every N epochs
    pub log_every: usize,
    /// Show a progress bar while training
    pub progress: bool,
    pub short_sequences: ShortSequencePolicy,
    /// Missing columns while scaling the test partition at training time.
    /// Inference always rejects them.
    pub schema_drift: SchemaDriftPolicy,
    pub regressor: RegressorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            epochs: 2500,
            batch_size: 16,
            label_scale: CM_TO_UM,
            log_every: 100,
            progress: false,
            short_sequences: ShortSequencePolicy::default(),
            schema_drift: SchemaDriftPolicy::default(),
            regressor: RegressorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads a configuration from a JSON file; absent fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.regressor.seed = seed;
        self
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.regressor.hidden_size = hidden_size;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.regressor.learning_rate = learning_rate;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.regressor.dropout = dropout.clamp(0.0, 0.99);
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_short_sequences(mut self, policy: ShortSequencePolicy) -> Self {
        self.short_sequences = policy;
        self
    }

    pub fn with_schema_drift(mut self, policy: SchemaDriftPolicy) -> Self {
        self.schema_drift = policy;
        self
    }

    /// Small network and short schedule, for smoke runs on a laptop
    pub fn quick() -> Self {
        Self::default().with_epochs(50).with_hidden_size(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = PipelineConfig::default();
        assert_eq!(config.window_size, 20);
        assert_eq!(config.epochs, 2500);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.label_scale, 10_000.0);
        assert_eq!(config.regressor.hidden_size, 48);
        assert_eq!(config.regressor.dropout, 0.5);
        assert_eq!(config.regressor.l2, 0.01);
        assert_eq!(config.regressor.seed, 42);
        assert_eq!(config.short_sequences, ShortSequencePolicy::Skip);
        assert_eq!(config.schema_drift, SchemaDriftPolicy::Warn);
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::default()
            .with_window_size(10)
            .with_epochs(5)
            .with_batch_size(4)
            .with_seed(7)
            .with_dropout(1.5)
            .with_short_sequences(ShortSequencePolicy::Reject);

        assert_eq!(config.window_size, 10);
        assert_eq!(config.epochs, 5);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.regressor.seed, 7);
        assert_eq!(config.regressor.dropout, 0.99);
        assert_eq!(config.short_sequences, ShortSequencePolicy::Reject);
    }

    #[test]
    fn test_quick_preset() {
        let config = PipelineConfig::quick();
        assert_eq!(config.epochs, 50);
        assert_eq!(config.regressor.hidden_size, 16);
        assert_eq!(config.window_size, 20);
        assert_eq!(config.batch_size, 16);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "window_size": 12, "schema_drift": "reject", "regressor": { "hidden_size": 8 } }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.window_size, 12);
        assert_eq!(config.schema_drift, SchemaDriftPolicy::Reject);
        assert_eq!(config.regressor.hidden_size, 8);
        assert_eq!(config.regressor.dropout, 0.5);
        assert_eq!(config.epochs, 2500);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "epochs": 3, "short_sequences": "reject" }"#).unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.short_sequences, ShortSequencePolicy::Reject);
    }
}

//! Width regressor: LSTM -> dropout -> Dense(1, tanh) -> label rescale
//!
//! The tanh output in `[-1, 1]` is mapped linearly onto the range of the
//! training targets, so predictions always stay inside it. Training
//! minimises mean squared error plus an L2 penalty on the LSTM kernel and
//! recurrent weights with Adam, holding out a seeded validation fraction.

use super::dense::{dropout_mask, DenseLayer};
use super::lstm::LstmLayer;
use super::optimizer::{Adam, Optimizer};
use crate::config::{PipelineConfig, RegressorConfig};
use crate::error::{DropWidthError, Result};
use crate::preprocessing::WindowedExamples;
use crate::utils::metrics;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{s, Array1, Array2, Array3, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const PREDICT_CHUNK: usize = 256;

/// Minimum and maximum training target, frozen at build time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelRange {
    pub min: f64,
    pub max: f64,
}

impl LabelRange {
    pub fn from_targets(targets: &Array1<f64>) -> Result<Self> {
        if targets.is_empty() {
            return Err(DropWidthError::EmptyTrainingSet);
        }
        let min = targets.iter().copied().fold(f64::INFINITY, f64::min);
        let max = targets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self { min, max })
    }

    /// Maps a tanh activation onto `[min, max]`
    pub fn rescale(&self, activation: f64) -> f64 {
        (activation + 1.0) / 2.0 * (self.max - self.min) + self.min
    }

    /// d(rescale)/d(activation)
    pub fn slope(&self) -> f64 {
        (self.max - self.min) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Windowed examples divided into the part the optimizer sees and the part
/// held out for validation
#[derive(Debug, Clone)]
pub struct FitValidationSplit {
    pub fit: WindowedExamples,
    pub validation: WindowedExamples,
    pub fit_indices: Vec<usize>,
    pub validation_indices: Vec<usize>,
}

/// Seeded shuffle split of `0..n`, returning `(fit, validation)` indices
///
/// The validation part has `ceil(fraction * n)` examples, leaving at least one
/// for fitting.
pub fn train_val_split(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let n_val = ((fraction.clamp(0.0, 1.0) * n as f64).ceil() as usize).min(n.saturating_sub(1));

    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut rng);

    let fit = order.split_off(n_val);
    (fit, order)
}

/// Loss and MAE on a set of examples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// MSE plus the L2 penalty
    pub loss: f64,
    pub mse: f64,
    pub mae: f64,
}

/// Metrics after one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub mae: f64,
    pub val_loss: Option<f64>,
    pub val_mae: Option<f64>,
}

/// Per-epoch record of a training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn first(&self) -> Option<&EpochMetrics> {
        self.epochs.first()
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    /// Epoch with the lowest validation loss, if validation was run
    pub fn best_validation(&self) -> Option<&EpochMetrics> {
        self.epochs
            .iter()
            .filter(|m| m.val_loss.is_some())
            .min_by(|a, b| {
                a.val_loss
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&b.val_loss.unwrap_or(f64::INFINITY))
            })
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Training schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub log_every: usize,
    pub progress: bool,
}

impl From<&PipelineConfig> for TrainOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            epochs: config.epochs,
            batch_size: config.batch_size,
            log_every: config.log_every,
            progress: config.progress,
        }
    }
}

/// Sequence-to-one recurrent regressor of drop width
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidthRegressor {
    config: RegressorConfig,
    window_size: usize,
    n_features: usize,
    lstm: LstmLayer,
    head: DenseLayer,
    label_range: LabelRange,
}

impl WidthRegressor {
    /// Initializes a regressor for `examples` and splits them for fitting
    ///
    /// The label range is taken from all training targets, the validation
    /// part included.
    pub fn build(examples: &WindowedExamples, config: &RegressorConfig) -> Result<(Self, FitValidationSplit)> {
        if examples.is_empty() {
            return Err(DropWidthError::EmptyTrainingSet);
        }

        let label_range = LabelRange::from_targets(&examples.targets)?;
        let (fit_indices, validation_indices) =
            train_val_split(examples.len(), config.validation_fraction, config.seed);

        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        let lstm = LstmLayer::new(examples.n_features(), config.hidden_size, &mut rng);
        let head = DenseLayer::new(config.hidden_size, 1, &mut rng);

        let regressor = Self {
            config: config.clone(),
            window_size: examples.window_size(),
            n_features: examples.n_features(),
            lstm,
            head,
            label_range,
        };

        info!(
            window_size = regressor.window_size,
            features = regressor.n_features,
            hidden = config.hidden_size,
            parameters = regressor.num_parameters(),
            label_min = label_range.min,
            label_max = label_range.max,
            "built width regressor"
        );

        let split = FitValidationSplit {
            fit: examples.select(&fit_indices),
            validation: examples.select(&validation_indices),
            fit_indices,
            validation_indices,
        };

        Ok((regressor, split))
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn label_range(&self) -> LabelRange {
        self.label_range
    }

    pub fn config(&self) -> &RegressorConfig {
        &self.config
    }

    pub fn num_parameters(&self) -> usize {
        self.lstm.num_parameters() + self.head.num_parameters()
    }

    fn check_shape(&self, inputs: &ArrayView3<'_, f64>) -> Result<()> {
        let shape = inputs.shape();
        if shape[1] != self.window_size || shape[2] != self.n_features {
            return Err(DropWidthError::ShapeMismatch(format!(
                "expected windows of [{}, {}], got [{}, {}]",
                self.window_size, self.n_features, shape[1], shape[2]
            )));
        }
        Ok(())
    }

    /// Width estimate for each window of `[samples, window_size, features]`
    pub fn predict(&self, inputs: ArrayView3<'_, f64>) -> Result<Array1<f64>> {
        self.check_shape(&inputs)?;

        let n = inputs.shape()[0];
        let mut predictions = Array1::zeros(n);
        let mut start = 0;
        while start < n {
            let end = (start + PREDICT_CHUNK).min(n);
            let hidden = self.lstm.forward(inputs.slice(s![start..end, .., ..]));
            let activation = self.head.forward(&hidden);
            predictions
                .slice_mut(s![start..end])
                .assign(&activation.column(0).mapv(|a| self.label_range.rescale(a)));
            start = end;
        }

        Ok(predictions)
    }

    /// `l2 * (|kernel|² + |recurrent|²)`
    pub fn l2_penalty(&self) -> f64 {
        self.lstm.l2_penalty(self.config.l2)
    }

    pub fn evaluate(&self, examples: &WindowedExamples) -> Result<Evaluation> {
        let predictions = self.predict(examples.inputs.view())?;
        let mse = metrics::mse(&examples.targets, &predictions);
        Ok(Evaluation {
            loss: mse + self.l2_penalty(),
            mse,
            mae: metrics::mae(&examples.targets, &predictions),
        })
    }

    /// One gradient step on a mini-batch, returning its (mse, mae)
    fn train_step(
        &mut self,
        x: &Array3<f64>,
        y: &Array1<f64>,
        optimizer: &mut Adam,
        rng: &mut StdRng,
    ) -> (f64, f64) {
        let batch = y.len() as f64;

        let (hidden, cache) = self.lstm.forward_train(x.view());
        let mask = dropout_mask(hidden.dim(), self.config.dropout, rng);
        let dropped = &hidden * &mask;
        let activation = self.head.forward(&dropped);

        let predictions = activation.column(0).mapv(|a| self.label_range.rescale(a));
        let errors = &predictions - y;
        let mse = errors.mapv(|e| e * e).sum() / batch;
        let mae = errors.mapv(f64::abs).sum() / batch;

        let slope = self.label_range.slope();
        let d_activation = Array2::from_shape_fn(activation.dim(), |(i, _)| 2.0 * errors[i] / batch * slope);

        let head_grads = self.head.backward(&dropped, &activation, &d_activation);
        let d_hidden = &head_grads.input * &mask;
        let mut lstm_grads = self.lstm.backward(&cache, &d_hidden);

        let l2 = 2.0 * self.config.l2;
        lstm_grads.kernel.scaled_add(l2, &self.lstm.kernel);
        lstm_grads.recurrent.scaled_add(l2, &self.lstm.recurrent);

        optimizer.step(&mut [
            (self.lstm.kernel.view_mut().into_dyn(), lstm_grads.kernel.view().into_dyn()),
            (self.lstm.recurrent.view_mut().into_dyn(), lstm_grads.recurrent.view().into_dyn()),
            (self.lstm.bias.view_mut().into_dyn(), lstm_grads.bias.view().into_dyn()),
            (self.head.weights.view_mut().into_dyn(), head_grads.weights.view().into_dyn()),
            (self.head.biases.view_mut().into_dyn(), head_grads.biases.view().into_dyn()),
        ]);

        (mse, mae)
    }

    /// Trains on `split.fit`, reporting validation metrics on `split.validation`
    pub fn fit(&mut self, split: &FitValidationSplit, options: &TrainOptions) -> Result<TrainingHistory> {
        let n = split.fit.len();
        if n == 0 {
            return Err(DropWidthError::EmptyTrainingSet);
        }
        self.check_shape(&split.fit.inputs.view())?;

        let batch_size = options.batch_size.max(1);
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(2));
        let mut optimizer = Adam::new(self.config.learning_rate);
        let mut order: Vec<usize> = (0..n).collect();
        let mut history = TrainingHistory::default();

        info!(
            epochs = options.epochs,
            batch_size,
            fit = n,
            validation = split.validation.len(),
            "starting training"
        );

        let pb = if options.progress {
            let pb = ProgressBar::new(options.epochs as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        for epoch in 0..options.epochs {
            order.shuffle(&mut rng);

            let (mut sq_sum, mut abs_sum) = (0.0, 0.0);
            for chunk in order.chunks(batch_size) {
                let x = split.fit.inputs.select(Axis(0), chunk);
                let y = split.fit.targets.select(Axis(0), chunk);
                let (mse, mae) = self.train_step(&x, &y, &mut optimizer, &mut rng);
                sq_sum += mse * chunk.len() as f64;
                abs_sum += mae * chunk.len() as f64;
            }

            let mut metrics = EpochMetrics {
                epoch: epoch + 1,
                loss: sq_sum / n as f64 + self.l2_penalty(),
                mae: abs_sum / n as f64,
                val_loss: None,
                val_mae: None,
            };

            if !split.validation.is_empty() {
                let eval = self.evaluate(&split.validation)?;
                metrics.val_loss = Some(eval.loss);
                metrics.val_mae = Some(eval.mae);
            }

            pb.inc(1);
            pb.set_message(format!("loss {:.2}", metrics.loss));

            if options.log_every > 0 && (epoch + 1) % options.log_every == 0 {
                info!(
                    epoch = epoch + 1,
                    loss = metrics.loss,
                    mae = metrics.mae,
                    val_loss = ?metrics.val_loss,
                    val_mae = ?metrics.val_mae,
                    "epoch finished"
                );
            } else {
                debug!(epoch = epoch + 1, loss = metrics.loss, "epoch finished");
            }

            history.epochs.push(metrics);
        }

        pb.finish_and_clear();

        if let Some(last) = history.last() {
            info!(loss = last.loss, mae = last.mae, "training complete");
        }

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn examples(n: usize, window: usize, features: usize) -> WindowedExamples {
        let inputs = Array3::from_shape_fn((n, window, features), |(i, t, f)| {
            ((i + t) as f64 * 0.1 + f as f64 * 0.05).sin().abs()
        });
        // Target driven by the last frame of the first feature
        let targets = Array1::from_shape_fn(n, |i| 3500.0 + 500.0 * inputs[[i, window - 1, 0]]);
        WindowedExamples {
            inputs,
            targets,
            video_ids: vec![1; n],
        }
    }

    fn small_config() -> RegressorConfig {
        RegressorConfig {
            hidden_size: 6,
            ..RegressorConfig::default()
        }
    }

    #[test]
    fn test_label_range() {
        let range = LabelRange::from_targets(&Array1::from_vec(vec![3600.0, 3500.0, 4100.0])).unwrap();
        assert_eq!(range.min, 3500.0);
        assert_eq!(range.max, 4100.0);
        assert_eq!(range.rescale(-1.0), 3500.0);
        assert_eq!(range.rescale(1.0), 4100.0);
        assert_eq!(range.rescale(0.0), 3800.0);
        assert_eq!(range.slope(), 300.0);
        assert!(LabelRange::from_targets(&Array1::zeros(0)).is_err());
    }

    #[test]
    fn test_train_val_split() {
        let (fit, val) = train_val_split(10, 0.2, 42);
        assert_eq!(fit.len(), 8);
        assert_eq!(val.len(), 2);

        let mut all: Vec<usize> = fit.iter().chain(val.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        assert_eq!(train_val_split(10, 0.2, 42), (fit, val));
        assert_ne!(train_val_split(50, 0.2, 42).1, train_val_split(50, 0.2, 43).1);

        // ceil(0.2 * 11) = 3
        assert_eq!(train_val_split(11, 0.2, 1).1.len(), 3);
        // A single example is never held out
        assert_eq!(train_val_split(1, 0.2, 1), (vec![0], vec![]));
    }

    #[test]
    fn test_build_rejects_empty() {
        let empty = WindowedExamples::empty(4, 6);
        assert!(matches!(
            WidthRegressor::build(&empty, &small_config()),
            Err(DropWidthError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_predictions_stay_in_label_range() {
        let data = examples(20, 5, 3);
        let (model, split) = WidthRegressor::build(&data, &small_config()).unwrap();
        assert_eq!(split.fit.len(), 16);
        assert_eq!(split.validation.len(), 4);

        let extreme = Array3::from_elem((3, 5, 3), 1e6);
        let range = model.label_range();
        for p in model.predict(data.inputs.view()).unwrap().iter() {
            assert!(range.contains(*p));
        }
        for p in model.predict(extreme.view()).unwrap().iter() {
            assert!(*p >= range.min - 1e-9 && *p <= range.max + 1e-9);
        }
    }

    #[test]
    fn test_predict_checks_shape() {
        let data = examples(4, 5, 3);
        let (model, _) = WidthRegressor::build(&data, &small_config()).unwrap();
        let wrong = Array3::zeros((2, 4, 3));
        assert!(matches!(
            model.predict(wrong.view()),
            Err(DropWidthError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_build_is_deterministic() {
        let data = examples(12, 4, 2);
        let (a, split_a) = WidthRegressor::build(&data, &small_config()).unwrap();
        let (b, split_b) = WidthRegressor::build(&data, &small_config()).unwrap();
        assert_eq!(split_a.validation_indices, split_b.validation_indices);
        assert_eq!(
            a.predict(data.inputs.view()).unwrap(),
            b.predict(data.inputs.view()).unwrap()
        );
    }

    #[test]
    fn test_fit_reduces_loss() {
        let data = examples(40, 4, 2);
        let config = RegressorConfig {
            hidden_size: 8,
            dropout: 0.0,
            learning_rate: 0.01,
            ..RegressorConfig::default()
        };
        let (mut model, split) = WidthRegressor::build(&data, &config).unwrap();
        let before = model.evaluate(&split.fit).unwrap();

        let options = TrainOptions {
            epochs: 60,
            batch_size: 8,
            log_every: 0,
            progress: false,
        };
        let history = model.fit(&split, &options).unwrap();
        let after = model.evaluate(&split.fit).unwrap();

        assert_eq!(history.len(), 60);
        assert!(history.last().unwrap().val_loss.is_some());
        assert!(history.best_validation().is_some());
        assert!(after.mse < before.mse, "{} !< {}", after.mse, before.mse);
    }

    #[test]
    fn test_evaluate_adds_penalty() {
        let data = examples(6, 3, 2);
        let (model, _) = WidthRegressor::build(&data, &small_config()).unwrap();
        let eval = model.evaluate(&data).unwrap();
        assert_abs_diff_eq!(eval.loss, eval.mse + model.l2_penalty(), epsilon = 1e-9);
        assert!(eval.mae >= 0.0);
    }

    #[test]
    fn test_history_save_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let history = TrainingHistory {
            epochs: vec![EpochMetrics {
                epoch: 1,
                loss: 2.0,
                mae: 1.0,
                val_loss: None,
                val_mae: None,
            }],
        };
        history.save_json(&path).unwrap();
        let back: TrainingHistory = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.epochs, history.epochs);
    }
}

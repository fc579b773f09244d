//! End-to-end training: extraction, windowing, fitting and test evaluation

use crate::config::PipelineConfig;
use crate::data::Dataset;
use crate::error::Result;
use crate::model::{Evaluation, ModelArtifact, TrainOptions, TrainingHistory, WidthRegressor};
use crate::preprocessing::{extract_data_label, Partition, WindowedExamples, Windower};
use tracing::{info, warn};

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub artifact: ModelArtifact,
    pub history: TrainingHistory,
    /// Windows built from the training partition
    pub train_examples: usize,
    /// Metrics on the test partition, when it yields any window
    pub test_evaluation: Option<Evaluation>,
}

fn windows(windower: &Windower, partition: &Partition) -> Result<WindowedExamples> {
    windower.slice_patch(
        &partition.features,
        &partition.labels,
        &partition.keys,
        &partition.key_set,
    )
}

/// Trains a regressor on the `train` rows of `dataset` and evaluates it on the
/// `test` rows
pub fn train_model(dataset: &Dataset, config: &PipelineConfig) -> Result<TrainingRun> {
    let data = extract_data_label(dataset, config.label_scale, config.schema_drift)?;
    let windower = Windower::new(config.window_size, config.short_sequences)?;

    let examples = windows(&windower, &data.train)?;
    info!(
        examples = examples.len(),
        window_size = config.window_size,
        "built training windows"
    );

    let (mut regressor, split) = WidthRegressor::build(&examples, &config.regressor)?;
    let history = regressor.fit(&split, &TrainOptions::from(config))?;

    let test_evaluation = if data.test.is_empty() {
        None
    } else {
        let test = windows(&windower, &data.test)?;
        if test.is_empty() {
            warn!("no test video is long enough for a window, skipping evaluation");
            None
        } else {
            let eval = regressor.evaluate(&test)?;
            info!(windows = test.len(), loss = eval.loss, mae = eval.mae, "test evaluation");
            Some(eval)
        }
    };

    let artifact = ModelArtifact::new(
        regressor,
        data.normalizer,
        data.train_raw.columns().to_vec(),
        config.label_scale,
    );

    Ok(TrainingRun {
        artifact,
        history,
        train_examples: examples.len(),
        test_evaluation,
    })
}

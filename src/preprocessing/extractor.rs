//! Feature and label extraction with the train/test split

use super::normalizer::MinMaxNormalizer;
use crate::config::SchemaDriftPolicy;
use crate::data::{unique_in_order, Dataset, FeatureTable, SplitTag};
use crate::error::Result;
use ndarray::Array1;
use tracing::info;

/// One split tag's slice of the dataset
#[derive(Debug, Clone)]
pub struct Partition {
    /// Normalized feature table
    pub features: FeatureTable,
    /// Width labels in micrometres (zeros when unlabelled)
    pub labels: Array1<f64>,
    /// Video id of each row
    pub keys: Vec<i64>,
    /// Distinct video ids in first-appearance order
    pub key_set: Vec<i64>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Output of `extract_data_label`
#[derive(Debug, Clone)]
pub struct ExtractedData {
    pub train: Partition,
    pub test: Partition,
    /// Training features before normalization, the reference for every later fit
    pub train_raw: FeatureTable,
    /// Scaler fitted on `train_raw`
    pub normalizer: MinMaxNormalizer,
}

/// Labels of a dataset in micrometres; missing widths read as zero
pub fn labels_um(dataset: &Dataset, label_scale: f64) -> Array1<f64> {
    if !dataset.has_width() {
        return Array1::zeros(dataset.len());
    }
    dataset
        .rows()
        .iter()
        .map(|r| r.width_cm.unwrap_or(0.0) * label_scale)
        .collect()
}

/// Selects features, labels and keys and splits them by tag
///
/// The test partition is scaled with the statistics of the unnormalized
/// training partition. Rows with no recognised tag are left out of both.
pub fn extract_data_label(
    dataset: &Dataset,
    label_scale: f64,
    policy: SchemaDriftPolicy,
) -> Result<ExtractedData> {
    let train = dataset.partition(SplitTag::Train);
    let test = dataset.partition(SplitTag::Test);

    let train_raw = FeatureTable::from_dataset(&train);
    let test_raw = FeatureTable::from_dataset(&test);

    let normalizer = MinMaxNormalizer::fit(&train_raw);
    let train_features = normalizer.transform(&train_raw, policy)?;
    let test_features = normalizer.transform(&test_raw, policy)?;

    let partition = |ds: &Dataset, features: FeatureTable| {
        let keys: Vec<i64> = ds.rows().iter().map(|r| r.video_id).collect();
        Partition {
            features,
            labels: labels_um(ds, label_scale),
            key_set: unique_in_order(keys.iter().copied()),
            keys,
        }
    };

    let data = ExtractedData {
        train: partition(&train, train_features),
        test: partition(&test, test_features),
        train_raw,
        normalizer,
    };

    info!(
        train_rows = data.train.len(),
        train_videos = data.train.key_set.len(),
        test_rows = data.test.len(),
        test_videos = data.test.key_set.len(),
        "extracted features and labels"
    );

    Ok(data)
}

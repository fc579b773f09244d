//! # Preprocessing
//!
//! Turns a measurement table into regressor input:
//! - feature/label extraction and the train/test split
//! - min-max normalization fitted on the training partition
//! - sliding windows that stay inside one video
//!
//! ```rust,no_run
//! use drop_width::config::PipelineConfig;
//! use drop_width::data::DataLoader;
//! use drop_width::preprocessing::{extract_data_label, Windower};
//!
//! let config = PipelineConfig::default();
//! let dataset = DataLoader::load_csv("data/dataset.csv")?;
//! let data = extract_data_label(&dataset, config.label_scale, config.schema_drift)?;
//!
//! let windower = Windower::new(config.window_size, config.short_sequences)?;
//! let examples = windower.slice_patch(
//!     &data.train.features,
//!     &data.train.labels,
//!     &data.train.keys,
//!     &data.train.key_set,
//! )?;
//! println!("{} windows", examples.len());
//! # Ok::<(), drop_width::DropWidthError>(())
//! ```

mod extractor;
mod normalizer;
mod windower;

pub use extractor::{extract_data_label, labels_um, ExtractedData, Partition};
pub use normalizer::{normalize, ColumnRange, MinMaxNormalizer};
pub use windower::{WindowedExamples, Windower};

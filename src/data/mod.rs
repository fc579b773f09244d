//! Data Module
//!
//! - Measurement rows, split tags and datasets
//! - Named feature tables over `ndarray`
//! - CSV loading

mod loader;
mod table;
mod types;

pub use loader::DataLoader;
pub use table::FeatureTable;
pub use types::{
    unique_in_order, Dataset, MeasurementRow, SplitTag, FEATURE_COLUMNS, VIDEO_ID_COLUMN,
    WIDTH_COLUMN,
};

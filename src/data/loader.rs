//! Loading measurement tables from CSV spreadsheets

use super::types::{Dataset, MeasurementRow, FEATURE_COLUMNS, VIDEO_ID_COLUMN, WIDTH_COLUMN};
use crate::error::{DropWidthError, Result};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Data loader for measurement spreadsheets
pub struct DataLoader;

impl DataLoader {
    /// Loads a measurement table from a CSV file
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let file = File::open(&path)?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.as_ref().display(),
            rows = dataset.len(),
            videos = dataset.video_ids().len(),
            labelled = dataset.has_width(),
            "loaded measurement table"
        );
        Ok(dataset)
    }

    /// Parses a measurement table from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Dataset> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let headers = reader.headers()?.clone();
        let has = |name: &str| headers.iter().any(|h| h == name);

        for required in std::iter::once(VIDEO_ID_COLUMN).chain(FEATURE_COLUMNS) {
            if !has(required) {
                return Err(DropWidthError::MissingColumn(required.to_string()));
            }
        }
        let has_width = has(WIDTH_COLUMN);
        if !has_width {
            debug!("no '{}' column, labels default to zero", WIDTH_COLUMN);
        }

        let mut rows = Vec::new();
        for result in reader.deserialize() {
            let row: MeasurementRow = result?;
            rows.push(row);
        }

        Ok(Dataset::new(rows, has_width))
    }
}

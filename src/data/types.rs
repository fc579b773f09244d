//! Measurement rows and datasets

use crate::error::{DropWidthError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Header of the video identifier column
pub const VIDEO_ID_COLUMN: &str = "Video ID";
/// Header of the measured width column
pub const WIDTH_COLUMN: &str = "Drop width (cm)";

/// The six side-view features, in model input order
pub const FEATURE_COLUMNS: [&str; 6] = [
    "Advancing (degree)",
    "Receding (degree)",
    "Drop length (cm)",
    "Drop height (cm)",
    "Velocity (cm/s)",
    "Middle line angle (degree)",
];

/// Partition a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitTag {
    Train,
    Test,
}

impl FromStr for SplitTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(SplitTag::Train),
            "test" => Ok(SplitTag::Test),
            other => Err(format!("unknown split tag: {other}")),
        }
    }
}

impl fmt::Display for SplitTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitTag::Train => write!(f, "train"),
            SplitTag::Test => write!(f, "test"),
        }
    }
}

/// Unrecognised or empty tags leave the row outside both partitions
fn split_tag_lenient<'de, D>(deserializer: D) -> std::result::Result<Option<SplitTag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// One video frame's measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    #[serde(rename = "Video ID")]
    pub video_id: i64,
    #[serde(rename = "status", default, deserialize_with = "split_tag_lenient")]
    pub status: Option<SplitTag>,
    #[serde(rename = "Advancing (degree)")]
    pub advancing_deg: f64,
    #[serde(rename = "Receding (degree)")]
    pub receding_deg: f64,
    #[serde(rename = "Drop length (cm)")]
    pub length_cm: f64,
    #[serde(rename = "Drop height (cm)")]
    pub height_cm: f64,
    #[serde(rename = "Velocity (cm/s)")]
    pub velocity_cm_s: f64,
    #[serde(rename = "Middle line angle (degree)")]
    pub midline_deg: f64,
    #[serde(rename = "Drop width (cm)", default)]
    pub width_cm: Option<f64>,
}

impl MeasurementRow {
    /// Feature values in `FEATURE_COLUMNS` order
    pub fn features(&self) -> [f64; 6] {
        [
            self.advancing_deg,
            self.receding_deg,
            self.length_cm,
            self.height_cm,
            self.velocity_cm_s,
            self.midline_deg,
        ]
    }
}

/// Ordered measurement rows; row order is frame order
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<MeasurementRow>,
    has_width: bool,
}

impl Dataset {
    /// `has_width` tells whether the source carried a `Drop width (cm)` column
    pub fn new(rows: Vec<MeasurementRow>, has_width: bool) -> Self {
        Self { rows, has_width }
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_width(&self) -> bool {
        self.has_width
    }

    /// Distinct video identifiers in order of first appearance
    pub fn video_ids(&self) -> Vec<i64> {
        unique_in_order(self.rows.iter().map(|r| r.video_id))
    }

    /// Rows of a single video, in file order
    pub fn video(&self, video_id: i64) -> Result<Dataset> {
        let rows: Vec<MeasurementRow> = self
            .rows
            .iter()
            .filter(|r| r.video_id == video_id)
            .cloned()
            .collect();

        if rows.is_empty() {
            return Err(DropWidthError::UnknownVideo(video_id));
        }

        Ok(Dataset::new(rows, self.has_width))
    }

    /// Rows tagged with `tag`
    pub fn partition(&self, tag: SplitTag) -> Dataset {
        let rows = self
            .rows
            .iter()
            .filter(|r| r.status == Some(tag))
            .cloned()
            .collect();
        Dataset::new(rows, self.has_width)
    }
}

/// Distinct values in order of first appearance
pub fn unique_in_order<I: IntoIterator<Item = i64>>(values: I) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    values.into_iter().filter(|v| seen.insert(*v)).collect()
}

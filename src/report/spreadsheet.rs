//! Aligned frames as a CSV spreadsheet

use crate::data::{FEATURE_COLUMNS, VIDEO_ID_COLUMN};
use crate::error::Result;
use crate::inference::AlignedFrame;
use csv::Writer;
use std::path::Path;
use tracing::info;

pub const FRAME_COLUMN: &str = "Frame";
pub const MEASURED_COLUMN: &str = "Drop width (um)";
pub const ESTIMATED_COLUMN: &str = "Estimated width (um)";

/// Writes one row per aligned frame; the measured width is left empty when
/// unknown
pub fn write_aligned_frames<P: AsRef<Path>>(path: P, frames: &[AlignedFrame]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(path)?;

    let mut header = vec![FRAME_COLUMN, VIDEO_ID_COLUMN];
    header.extend(FEATURE_COLUMNS);
    header.extend([MEASURED_COLUMN, ESTIMATED_COLUMN]);
    writer.write_record(&header)?;

    for frame in frames {
        let mut record = vec![frame.frame.to_string(), frame.video_id.to_string()];
        record.extend(frame.features.iter().map(|v| v.to_string()));
        record.push(frame.measured_um.map(|v| v.to_string()).unwrap_or_default());
        record.push(frame.estimated_um.to_string());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = frames.len(), "wrote aligned frames");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(frame: usize, measured_um: Option<f64>, estimated_um: f64) -> AlignedFrame {
        AlignedFrame {
            frame,
            video_id: 4,
            features: [1.0, 2.0, 0.3, 0.1, 5.5, 90.0],
            measured_um,
            estimated_um,
        }
    }

    #[test]
    fn test_write_aligned_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("dataset_4.csv");
        write_aligned_frames(&path, &[frame(10, Some(3500.0), 3512.5), frame(11, None, 3498.0)]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 10);
        assert_eq!(&headers[0], "Frame");
        assert_eq!(&headers[1], "Video ID");
        assert_eq!(&headers[2], "Advancing (degree)");
        assert_eq!(&headers[8], "Drop width (um)");
        assert_eq!(&headers[9], "Estimated width (um)");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "10");
        assert_eq!(&rows[0][8], "3500");
        assert_eq!(&rows[0][9], "3512.5");
        assert_eq!(&rows[1][8], "");
    }
}

//! # Reporting
//!
//! Aligned-frame spreadsheet and the estimated vs. measured width plot.

mod plot;
mod spreadsheet;

pub use plot::{plot_comparison, PlotStyle};
pub use spreadsheet::{write_aligned_frames, ESTIMATED_COLUMN, FRAME_COLUMN, MEASURED_COLUMN};

use std::path::{Path, PathBuf};

/// `<dir>/<data file stem>_<video id>.<ext>`
pub fn default_output_path(data_file: &Path, video_id: i64, dir: &Path, ext: &str) -> PathBuf {
    let stem = data_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{stem}_{video_id}.{ext}"))
}

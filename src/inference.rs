//! Per-video width estimation and frame alignment
//!
//! A video of `N` frames yields `N - W + 1` windows. Each window's estimate is
//! attached to its midpoint frame, and the first and last `W/2` frames are
//! trimmed so that estimates and measurements cover the same frames
//! `[W/2, N - W/2)`. For an even window size the last window has no frame left
//! inside that range and is discarded.

use crate::config::{PipelineConfig, SchemaDriftPolicy, ShortSequencePolicy};
use crate::data::{Dataset, FeatureTable, FEATURE_COLUMNS};
use crate::error::{DropWidthError, Result};
use crate::model::ModelArtifact;
use crate::preprocessing::{labels_um, Windower};
use crate::utils::RegressionReport;
use ndarray::{s, Array1, Axis};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::info;

/// Frames of an `n_frames` video that receive an estimate
///
/// `None` when the video is too short for a single aligned frame, that is
/// when it has fewer than `2 * (W/2) + 1` frames.
pub fn aligned_frame_range(n_frames: usize, window_size: usize) -> Option<Range<usize>> {
    let half = window_size / 2;
    if window_size == 0 || n_frames < 2 * half + 1 {
        return None;
    }
    Some(half..n_frames - half)
}

/// Estimated and measured widths of one video over the aligned frames
#[derive(Debug, Clone)]
pub struct WidthEstimate {
    pub video_id: i64,
    pub window_size: usize,
    /// Rows of the source video
    pub n_frames: usize,
    /// Source frames covered by `estimated` and `measured`
    pub frames: Range<usize>,
    /// Estimated width in micrometres, one per aligned frame
    pub estimated: Array1<f64>,
    /// Measured width in micrometres (zeros for an unlabelled table)
    pub measured: Array1<f64>,
    pub labelled: bool,
    /// Accuracy over the aligned frames that carry a measurement
    pub report: Option<RegressionReport>,
}

impl WidthEstimate {
    pub fn len(&self) -> usize {
        self.estimated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimated.is_empty()
    }
}

/// One source frame with its estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedFrame {
    /// Position of the frame within its video
    pub frame: usize,
    pub video_id: i64,
    /// Raw feature values, in `FEATURE_COLUMNS` order
    pub features: [f64; 6],
    /// Measured width in micrometres
    pub measured_um: Option<f64>,
    pub estimated_um: f64,
}

/// Estimates the width of every aligned frame of `video_id`
pub fn estimate_width(
    dataset: &Dataset,
    video_id: i64,
    artifact: &ModelArtifact,
    config: &PipelineConfig,
) -> Result<WidthEstimate> {
    let video = dataset.video(video_id)?;
    let window_size = config.window_size;

    let columns: Vec<String> = FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect();
    artifact.check_compatible(window_size, &columns)?;

    let n_frames = video.len();
    let frames = aligned_frame_range(n_frames, window_size).ok_or(DropWidthError::InsufficientFrames {
        video_id,
        frames: n_frames,
        required: 2 * (window_size / 2) + 1,
        window_size,
    })?;

    // The fitted ranges must cover exactly the checked columns, so a range
    // without its column is a broken artifact rather than drift
    let raw = FeatureTable::from_dataset(&video);
    let features = artifact.normalizer.transform(&raw, SchemaDriftPolicy::Reject)?;

    let windower = Windower::new(window_size, ShortSequencePolicy::Reject)?;
    let windows = windower.slicing(features.values().view());
    let predictions = artifact.regressor.predict(windows.view())?;

    let estimated = predictions.slice(s![..frames.len()]).to_owned();
    let measured = labels_um(&video, artifact.label_scale)
        .slice(s![frames.start..frames.end])
        .to_owned();

    // Blank width cells read as zero in `measured` and are left out of the report
    let labelled = video.has_width();
    let known: Vec<usize> = video.rows()[frames.clone()]
        .iter()
        .enumerate()
        .filter(|(_, row)| row.width_cm.is_some())
        .map(|(k, _)| k)
        .collect();
    let report = (labelled && !known.is_empty()).then(|| {
        RegressionReport::compute(
            &measured.select(Axis(0), &known),
            &estimated.select(Axis(0), &known),
        )
    });

    match &report {
        Some(r) => info!(
            video_id,
            frames = estimated.len(),
            mse = r.mse,
            rmse = r.rmse,
            mae = r.mae,
            r2 = r.r2,
            "estimated drop width"
        ),
        None => info!(video_id, frames = estimated.len(), "estimated drop width (unlabelled)"),
    }

    Ok(WidthEstimate {
        video_id,
        window_size,
        n_frames,
        frames,
        estimated,
        measured,
        labelled,
        report,
    })
}

/// Attaches each estimate to its source row
///
/// `video` must be the rows the estimate was computed from.
pub fn align(video: &Dataset, estimate: &WidthEstimate) -> Result<Vec<AlignedFrame>> {
    if video.len() != estimate.n_frames {
        return Err(DropWidthError::ShapeMismatch(format!(
            "estimate covers a video of {} frames, got {} rows",
            estimate.n_frames,
            video.len()
        )));
    }

    let rows = &video.rows()[estimate.frames.clone()];
    Ok(rows
        .iter()
        .zip(estimate.estimated.iter())
        .enumerate()
        .map(|(k, (row, &estimated_um))| AlignedFrame {
            frame: estimate.frames.start + k,
            video_id: row.video_id,
            features: row.features(),
            measured_um: if estimate.labelled {
                row.width_cm.map(|_| estimate.measured[k])
            } else {
                None
            },
            estimated_um,
        })
        .collect())
}

/// `estimate_width` followed by `align` on the same video
pub fn estimate_and_align(
    dataset: &Dataset,
    video_id: i64,
    artifact: &ModelArtifact,
    config: &PipelineConfig,
) -> Result<(WidthEstimate, Vec<AlignedFrame>)> {
    let estimate = estimate_width(dataset, video_id, artifact, config)?;
    let frames = align(&dataset.video(video_id)?, &estimate)?;
    Ok((estimate, frames))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_frame_range() {
        // Odd window: all N - W + 1 windows
        assert_eq!(aligned_frame_range(10, 5), Some(2..8));
        assert_eq!(aligned_frame_range(10, 5).map(|r| r.len()), Some(10 - 5 + 1));
        // Even window: N - W frames, W/2 trimmed at both ends
        assert_eq!(aligned_frame_range(25, 10), Some(5..20));
        assert_eq!(aligned_frame_range(25, 10).map(|r| r.len()), Some(25 - 10));
        // Window of one keeps every frame
        assert_eq!(aligned_frame_range(3, 1), Some(0..3));
    }

    #[test]
    fn test_aligned_frame_range_too_short() {
        assert_eq!(aligned_frame_range(5, 20), None);
        assert_eq!(aligned_frame_range(20, 20), None);
        assert_eq!(aligned_frame_range(21, 20), Some(10..11));
        assert_eq!(aligned_frame_range(4, 5), None);
        assert_eq!(aligned_frame_range(5, 5), Some(2..3));
        assert_eq!(aligned_frame_range(5, 0), None);
    }
}

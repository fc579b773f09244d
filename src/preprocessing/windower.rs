//! Sliding windows over per-video feature sequences

use crate::config::ShortSequencePolicy;
use crate::data::FeatureTable;
use crate::error::{DropWidthError, Result};
use ndarray::{s, Array1, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Windowed examples ready for the regressor
#[derive(Debug, Clone)]
pub struct WindowedExamples {
    /// Feature windows [samples, window_size, features]
    pub inputs: Array3<f64>,
    /// Midpoint label of each window, in micrometres
    pub targets: Array1<f64>,
    /// Source video of each window
    pub video_ids: Vec<i64>,
}

impl WindowedExamples {
    pub fn empty(window_size: usize, n_features: usize) -> Self {
        Self {
            inputs: Array3::zeros((0, window_size, n_features)),
            targets: Array1::zeros(0),
            video_ids: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window_size(&self) -> usize {
        self.inputs.shape()[1]
    }

    pub fn n_features(&self) -> usize {
        self.inputs.shape()[2]
    }

    /// Examples at `indices`, in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            inputs: self.inputs.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
            video_ids: indices.iter().map(|&i| self.video_ids[i]).collect(),
        }
    }
}

/// Builds fixed-length windows that never cross a video boundary
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Windower {
    window_size: usize,
    short_sequences: ShortSequencePolicy,
}

impl Windower {
    pub fn new(window_size: usize, short_sequences: ShortSequencePolicy) -> Result<Self> {
        if window_size == 0 {
            return Err(DropWidthError::InvalidWindow(window_size));
        }
        Ok(Self {
            window_size,
            short_sequences,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Offset of the midpoint row inside a window
    pub fn midpoint(&self) -> usize {
        self.window_size / 2
    }

    /// All `rows - W + 1` contiguous windows of a single-video table
    ///
    /// Returns zero windows when the table is shorter than the window.
    pub fn slicing(&self, data: ArrayView2<'_, f64>) -> Array3<f64> {
        let n_rows = data.nrows();
        let n_slices = (n_rows + 1).saturating_sub(self.window_size);
        let mut result = Array3::zeros((n_slices, self.window_size, data.ncols()));

        for i in 0..n_slices {
            result
                .slice_mut(s![i, .., ..])
                .assign(&data.slice(s![i..i + self.window_size, ..]));
        }

        result
    }

    /// Label at row `i + W/2` for each window start `i`
    pub fn slicing_label(&self, labels: ArrayView1<'_, f64>) -> Array1<f64> {
        let n_slices = (labels.len() + 1).saturating_sub(self.window_size);
        let mid = self.midpoint();
        Array1::from_shape_fn(n_slices, |i| labels[i + mid])
    }

    /// Windows every training video and concatenates the results
    ///
    /// `keys` holds the video id of each row of `features`/`labels`, and
    /// `key_set` the distinct ids in the order they should be visited. Rows
    /// are grouped by id, so a window never spans two videos.
    pub fn slice_patch(
        &self,
        features: &FeatureTable,
        labels: &Array1<f64>,
        keys: &[i64],
        key_set: &[i64],
    ) -> Result<WindowedExamples> {
        if features.nrows() != labels.len() || features.nrows() != keys.len() {
            return Err(DropWidthError::ShapeMismatch(format!(
                "{} feature rows, {} labels, {} keys",
                features.nrows(),
                labels.len(),
                keys.len()
            )));
        }

        let mut inputs = Vec::new();
        let mut targets = Vec::new();
        let mut video_ids = Vec::new();

        for &key in key_set {
            let rows: Vec<usize> = keys
                .iter()
                .enumerate()
                .filter(|&(_, &k)| k == key)
                .map(|(i, _)| i)
                .collect();

            if rows.len() < self.window_size {
                match self.short_sequences {
                    ShortSequencePolicy::Skip => {
                        debug!(video_id = key, frames = rows.len(), "video shorter than window, skipped");
                        continue;
                    }
                    ShortSequencePolicy::Reject => {
                        return Err(DropWidthError::InsufficientFrames {
                            video_id: key,
                            frames: rows.len(),
                            required: self.window_size,
                            window_size: self.window_size,
                        });
                    }
                }
            }

            let video_features = features.values().select(Axis(0), &rows);
            let video_labels = labels.select(Axis(0), &rows);

            let windows = self.slicing(video_features.view());
            let window_labels = self.slicing_label(video_labels.view());

            video_ids.extend(std::iter::repeat(key).take(windows.shape()[0]));
            inputs.push(windows);
            targets.push(window_labels);
        }

        if inputs.is_empty() {
            return Ok(WindowedExamples::empty(self.window_size, features.ncols()));
        }

        let input_views: Vec<_> = inputs.iter().map(|a| a.view()).collect();
        let target_views: Vec<_> = targets.iter().map(|a| a.view()).collect();

        Ok(WindowedExamples {
            inputs: ndarray::concatenate(Axis(0), &input_views)
                .map_err(|e| DropWidthError::ShapeMismatch(e.to_string()))?,
            targets: ndarray::concatenate(Axis(0), &target_views)
                .map_err(|e| DropWidthError::ShapeMismatch(e.to_string()))?,
            video_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn sequential(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(i, j)| (i * 10 + j) as f64)
    }

    fn table(values: Array2<f64>) -> FeatureTable {
        let columns = (0..values.ncols()).map(|j| format!("f{j}")).collect();
        FeatureTable::new(columns, values).unwrap()
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(matches!(
            Windower::new(0, ShortSequencePolicy::Skip),
            Err(DropWidthError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_slicing_counts_and_contiguity() {
        let data = sequential(12, 3);
        for w in 1..=14 {
            let windower = Windower::new(w, ShortSequencePolicy::Skip).unwrap();
            let windows = windower.slicing(data.view());
            let expected = (12 + 1usize).saturating_sub(w);

            assert_eq!(windows.shape(), &[expected, w, 3]);
            for i in 0..expected {
                for t in 0..w {
                    assert_eq!(windows.slice(s![i, t, ..]), data.row(i + t));
                }
            }
        }
    }

    #[test]
    fn test_slicing_label_midpoint() {
        let labels = Array1::from_iter((0..11).map(|v| v as f64));

        let even = Windower::new(4, ShortSequencePolicy::Skip).unwrap();
        assert_eq!(even.slicing_label(labels.view()).to_vec(), vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);

        let odd = Windower::new(5, ShortSequencePolicy::Skip).unwrap();
        let out = odd.slicing_label(labels.view());
        assert_eq!(out.len(), 7);
        for (i, v) in out.iter().enumerate() {
            assert_eq!(*v, (i + 2) as f64);
        }

        let too_long = Windower::new(20, ShortSequencePolicy::Skip).unwrap();
        assert!(too_long.slicing_label(labels.view()).is_empty());
    }

    #[test]
    fn test_slice_patch_groups_by_video() {
        // Video 7 is interleaved with video 3 and video 9 is too short
        let keys = vec![7, 7, 3, 3, 3, 7, 7, 9, 3];
        let features = table(sequential(keys.len(), 2));
        let labels = Array1::from_iter((0..keys.len()).map(|v| v as f64));

        let windower = Windower::new(3, ShortSequencePolicy::Skip).unwrap();
        let out = windower.slice_patch(&features, &labels, &keys, &[7, 3, 9]).unwrap();

        // 4 rows each for 7 and 3 -> 2 windows each; 9 skipped
        assert_eq!(out.len(), 4);
        assert_eq!(out.video_ids, vec![7, 7, 3, 3]);
        // video 7 rows are 0,1,5,6: first window midpoint is row 1, second row 5
        assert_eq!(out.targets.to_vec(), vec![1.0, 5.0, 3.0, 4.0]);
        assert_eq!(out.inputs.slice(s![1, .., 0]).to_vec(), vec![10.0, 50.0, 60.0]);
    }

    #[test]
    fn test_slice_patch_rejects_short_video() {
        let keys = vec![1, 1, 2];
        let features = table(sequential(3, 1));
        let labels = Array1::zeros(3);

        let windower = Windower::new(2, ShortSequencePolicy::Reject).unwrap();
        match windower.slice_patch(&features, &labels, &keys, &[1, 2]) {
            Err(DropWidthError::InsufficientFrames { video_id, frames, .. }) => {
                assert_eq!(video_id, 2);
                assert_eq!(frames, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_slice_patch_all_short_is_empty() {
        let keys = vec![1, 1];
        let features = table(sequential(2, 6));
        let labels = Array1::zeros(2);

        let windower = Windower::new(5, ShortSequencePolicy::Skip).unwrap();
        let out = windower.slice_patch(&features, &labels, &keys, &[1]).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.inputs.shape(), &[0, 5, 6]);
    }

    #[test]
    fn test_slice_patch_shape_mismatch() {
        let features = table(sequential(3, 1));
        let labels = Array1::zeros(2);
        let windower = Windower::new(2, ShortSequencePolicy::Skip).unwrap();
        assert!(windower.slice_patch(&features, &labels, &[1, 1, 1], &[1]).is_err());
    }
}

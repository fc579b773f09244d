//! Min-max normalization by column name

use crate::config::SchemaDriftPolicy;
use crate::data::FeatureTable;
use crate::error::{DropWidthError, Result};
use ndarray::{ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fitted range of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    pub fn fit(name: &str, values: ArrayView1<'_, f64>) -> Self {
        let min = values.fold(f64::INFINITY, |a, &b| a.min(b));
        let max = values.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        Self {
            name: name.to_string(),
            min,
            max,
        }
    }

    /// Zero range is treated as 1, so constant columns map to 0
    fn scale(&self) -> f64 {
        let range = self.max - self.min;
        if range.abs() < 1e-12 || !range.is_finite() {
            1.0
        } else {
            range
        }
    }

    pub fn apply(&self, mut values: ArrayViewMut1<'_, f64>) {
        let scale = self.scale();
        values.mapv_inplace(|v| (v - self.min) / scale);
    }
}

/// Per-column min-max scaler fitted on a reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MinMaxNormalizer {
    ranges: Vec<ColumnRange>,
}

impl MinMaxNormalizer {
    /// Fits one range per column of `reference`
    pub fn fit(reference: &FeatureTable) -> Self {
        let ranges = reference
            .columns()
            .iter()
            .enumerate()
            .map(|(j, name)| ColumnRange::fit(name, reference.values().column(j)))
            .collect();
        Self { ranges }
    }

    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }

    pub fn range(&self, name: &str) -> Option<&ColumnRange> {
        self.ranges.iter().find(|r| r.name == name)
    }

    pub fn columns(&self) -> Vec<String> {
        self.ranges.iter().map(|r| r.name.clone()).collect()
    }

    /// Scales every fitted column present in `target`
    ///
    /// Fitted columns missing from `target` follow `policy`. Columns that were
    /// never fitted pass through unchanged.
    pub fn transform(&self, target: &FeatureTable, policy: SchemaDriftPolicy) -> Result<FeatureTable> {
        let mut out = target.clone();
        for range in &self.ranges {
            match target.position(&range.name) {
                Some(k) => range.apply(out.column_mut(k)),
                None => on_missing_column(&range.name, policy)?,
            }
        }
        Ok(out)
    }
}

fn on_missing_column(name: &str, policy: SchemaDriftPolicy) -> Result<()> {
    match policy {
        SchemaDriftPolicy::Warn => {
            warn!("Column '{}' not found in both datasets. Skipping normalization.", name);
            Ok(())
        }
        SchemaDriftPolicy::Reject => Err(DropWidthError::MissingColumn(name.to_string())),
    }
}

/// Fits on `reference` and scales both tables
///
/// Only columns present in both tables are scaled. Each call refits, so pass
/// the unnormalized training table as reference to reproduce training scaling.
pub fn normalize(
    reference: &FeatureTable,
    target: &FeatureTable,
    policy: SchemaDriftPolicy,
) -> Result<(FeatureTable, FeatureTable)> {
    let mut reference_out = reference.clone();
    let mut target_out = target.clone();

    for (j, name) in reference.columns().iter().enumerate() {
        match target.position(name) {
            Some(k) => {
                let range = ColumnRange::fit(name, reference.values().column(j));
                range.apply(reference_out.column_mut(j));
                range.apply(target_out.column_mut(k));
            }
            None => on_missing_column(name, policy)?,
        }
    }

    Ok((reference_out, target_out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn table(columns: &[&str], values: ndarray::Array2<f64>) -> FeatureTable {
        FeatureTable::new(columns.iter().map(|c| c.to_string()).collect(), values).unwrap()
    }

    #[test]
    fn test_normalize_reference_onto_unit_interval() {
        let reference = table(
            &["a", "b"],
            array![[0.0, 10.0], [5.0, 20.0], [10.0, 30.0], [15.0, 40.0]],
        );
        let (r, t) = normalize(&reference, &reference, SchemaDriftPolicy::Warn).unwrap();

        assert_eq!(r, t);
        for j in 0..2 {
            let col = r.values().column(j);
            assert!(col.iter().all(|&v| (0.0..=1.0).contains(&v)));
            assert_abs_diff_eq!(col[0], 0.0);
            assert_abs_diff_eq!(col[3], 1.0);
        }
    }

    #[test]
    fn test_target_uses_reference_statistics() {
        let reference = table(&["a"], array![[0.0], [10.0]]);
        let target = table(&["a"], array![[5.0], [20.0], [-10.0]]);
        let (_, t) = normalize(&reference, &target, SchemaDriftPolicy::Warn).unwrap();

        assert_eq!(t.values(), &array![[0.5], [2.0], [-1.0]]);
    }

    #[test]
    fn test_missing_column_is_skipped() {
        let reference = table(&["a", "b"], array![[0.0, 1.0], [10.0, 3.0]]);
        let target = table(&["b", "c"], array![[2.0, 100.0]]);
        let (r, t) = normalize(&reference, &target, SchemaDriftPolicy::Warn).unwrap();

        // "a" untouched in the reference, "c" untouched in the target
        assert_eq!(r.column("a").unwrap().to_vec(), vec![0.0, 10.0]);
        assert_eq!(r.column("b").unwrap().to_vec(), vec![0.0, 1.0]);
        assert_eq!(t.column("b").unwrap().to_vec(), vec![0.5]);
        assert_eq!(t.column("c").unwrap().to_vec(), vec![100.0]);
    }

    #[test]
    fn test_missing_column_rejected() {
        let reference = table(&["a", "b"], array![[0.0, 1.0]]);
        let target = table(&["b"], array![[2.0]]);
        match normalize(&reference, &target, SchemaDriftPolicy::Reject) {
            Err(DropWidthError::MissingColumn(name)) => assert_eq!(name, "a"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let reference = table(&["a"], array![[4.0], [4.0]]);
        let (r, _) = normalize(&reference, &reference, SchemaDriftPolicy::Warn).unwrap();
        assert_eq!(r.values(), &array![[0.0], [0.0]]);
    }

    #[test]
    fn test_fitted_normalizer_matches_refit() {
        let reference = table(&["a", "b"], array![[1.0, -2.0], [3.0, 6.0], [2.0, 0.0]]);
        let target = table(&["a", "b"], array![[2.0, 2.0]]);

        let (_, refit) = normalize(&reference, &target, SchemaDriftPolicy::Warn).unwrap();
        let fitted = MinMaxNormalizer::fit(&reference)
            .transform(&target, SchemaDriftPolicy::Warn)
            .unwrap();

        assert_eq!(refit, fitted);
    }
}

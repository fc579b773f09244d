//! Named feature table
//!
//! A thin wrapper over `Array2<f64>` that keeps column names next to the
//! values, so normalization can match columns by name across tables.

use super::types::{Dataset, FEATURE_COLUMNS};
use crate::error::{DropWidthError, Result};
use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureTable {
    /// Creates a table; `values` must have one column per name
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(DropWidthError::ShapeMismatch(format!(
                "{} column names for {} value columns",
                columns.len(),
                values.ncols()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Six side-view feature columns of a dataset
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut values = Array2::zeros((dataset.len(), FEATURE_COLUMNS.len()));
        for (i, row) in dataset.rows().iter().enumerate() {
            for (j, v) in row.features().into_iter().enumerate() {
                values[[i, j]] = v;
            }
        }

        Self {
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Index of a column by name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.position(name).map(|j| self.values.column(j))
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> ArrayViewMut1<'_, f64> {
        self.values.column_mut(index)
    }

    /// Rows at `indices`, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn table() -> FeatureTable {
        FeatureTable::new(
            vec!["a".into(), "b".into()],
            array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_checked() {
        assert!(FeatureTable::new(vec!["a".into()], Array2::zeros((2, 2))).is_err());
    }

    #[test]
    fn test_column_lookup() {
        let t = table();
        assert_eq!(t.position("b"), Some(1));
        assert_eq!(t.column("b").unwrap().to_vec(), vec![10.0, 20.0, 30.0]);
        assert!(t.column("c").is_none());
    }

    #[test]
    fn test_select_rows() {
        let t = table().select_rows(&[2, 0]);
        assert_eq!(t.values(), &array![[3.0, 30.0], [1.0, 10.0]]);
    }
}

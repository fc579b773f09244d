//! Persisted model: regressor weights together with everything inference
//! needs to reproduce the training-time preprocessing

use super::regressor::WidthRegressor;
use crate::error::{DropWidthError, Result};
use crate::preprocessing::MinMaxNormalizer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Format version written by this build
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub window_size: usize,
    /// Feature columns in the order the regressor consumes them
    pub feature_columns: Vec<String>,
    /// Factor applied to the raw width column to get training targets
    pub label_scale: f64,
    /// Scaler fitted on the raw training features
    pub normalizer: MinMaxNormalizer,
    pub regressor: WidthRegressor,
}

impl ModelArtifact {
    pub fn new(
        regressor: WidthRegressor,
        normalizer: MinMaxNormalizer,
        feature_columns: Vec<String>,
        label_scale: f64,
    ) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            window_size: regressor.window_size(),
            feature_columns,
            label_scale,
            normalizer,
            regressor,
        }
    }

    /// Writes the artifact as JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        info!(path = %path.display(), "saved model artifact");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = serde_json::from_reader(reader)?;

        if artifact.version != ARTIFACT_VERSION {
            return Err(DropWidthError::UnsupportedArtifact {
                found: artifact.version,
                expected: ARTIFACT_VERSION,
            });
        }
        if artifact.regressor.window_size() != artifact.window_size
            || artifact.regressor.n_features() != artifact.feature_columns.len()
        {
            return Err(DropWidthError::ArtifactMismatch(format!(
                "regressor expects [{}, {}] windows but the artifact declares window {} with {} columns",
                artifact.regressor.window_size(),
                artifact.regressor.n_features(),
                artifact.window_size,
                artifact.feature_columns.len()
            )));
        }

        info!(path = %path.display(), window_size = artifact.window_size, "loaded model artifact");
        Ok(artifact)
    }

    /// Fails unless the artifact was trained with this window size and these
    /// feature columns, in this order
    pub fn check_compatible(&self, window_size: usize, feature_columns: &[String]) -> Result<()> {
        if window_size != self.window_size {
            return Err(DropWidthError::ArtifactMismatch(format!(
                "model was trained with window size {}, got {}",
                self.window_size, window_size
            )));
        }
        if feature_columns != self.feature_columns.as_slice() {
            return Err(DropWidthError::ArtifactMismatch(format!(
                "model was trained on columns {:?}, got {:?}",
                self.feature_columns, feature_columns
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegressorConfig;
    use crate::data::FeatureTable;
    use crate::preprocessing::WindowedExamples;
    use ndarray::{Array1, Array2, Array3};

    fn artifact() -> ModelArtifact {
        let examples = WindowedExamples {
            inputs: Array3::from_shape_fn((6, 3, 2), |(i, t, f)| (i + t + f) as f64 * 0.1),
            targets: Array1::from_vec(vec![3500.0, 3550.0, 3600.0, 3650.0, 3700.0, 3750.0]),
            video_ids: vec![1; 6],
        };
        let config = RegressorConfig {
            hidden_size: 4,
            ..RegressorConfig::default()
        };
        let (regressor, _) = WidthRegressor::build(&examples, &config).unwrap();

        let columns = vec!["a".to_string(), "b".to_string()];
        let table = FeatureTable::new(columns.clone(), Array2::from_shape_vec((2, 2), vec![0.0, 1.0, 4.0, 3.0]).unwrap()).unwrap();
        ModelArtifact::new(regressor, MinMaxNormalizer::fit(&table), columns, 10_000.0)
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("model.json");
        let saved = artifact();
        saved.save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.window_size, 3);
        assert_eq!(loaded.feature_columns, saved.feature_columns);
        assert_eq!(loaded.normalizer, saved.normalizer);

        let x = Array3::from_shape_fn((4, 3, 2), |(i, t, f)| (i * t) as f64 * 0.2 - f as f64);
        assert_eq!(
            loaded.regressor.predict(x.view()).unwrap(),
            saved.regressor.predict(x.view()).unwrap()
        );
    }

    #[test]
    fn test_version_checked_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut stale = artifact();
        stale.version = 99;
        stale.save(&path).unwrap();

        assert!(matches!(
            ModelArtifact::load(&path),
            Err(DropWidthError::UnsupportedArtifact { found: 99, expected: 1 })
        ));
    }

    #[test]
    fn test_check_compatible() {
        let artifact = artifact();
        let columns = vec!["a".to_string(), "b".to_string()];
        assert!(artifact.check_compatible(3, &columns).is_ok());
        assert!(matches!(
            artifact.check_compatible(20, &columns),
            Err(DropWidthError::ArtifactMismatch(_))
        ));
        let swapped = vec!["b".to_string(), "a".to_string()];
        assert!(artifact.check_compatible(3, &swapped).is_err());
    }
}

//! Binary model checkpoints (`*_model.tl`) via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Current checkpoint format version.
const FORMAT_VERSION: u32 = 1;

/// Magic tag written ahead of every checkpoint.
const MAGIC: [u8; 4] = *b"CNPY";

/// Versioned envelope around the serialized forest.
#[derive(serde::Serialize, serde::Deserialize)]
struct Checkpoint {
    magic: [u8; 4],
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
    forest: RandomForest,
}

impl RandomForest {
    /// Serialize the forest into checkpoint bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::SerializeModel`] when bincode encoding fails.
    pub fn to_checkpoint_bytes(&self) -> Result<Vec<u8>, RfError> {
        let checkpoint = Checkpoint {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            n_classes: self.n_classes,
            forest: self.clone(),
        };
        bincode::serialize(&checkpoint).map_err(|source| RfError::SerializeModel { source })
    }

    /// Write the forest to a binary checkpoint file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let path = path.as_ref();
        let bytes = self.to_checkpoint_bytes()?;
        std::fs::write(path, &bytes).map_err(|source| RfError::WriteModel {
            path: path.to_path_buf(),
            source,
        })?;
        info!(size_bytes = bytes.len(), n_trees = self.trees.len(), "checkpoint written");
        Ok(())
    }

    /// Read a forest back from a checkpoint file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModelVersion`] | unknown magic tag or format version |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| RfError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;
        let checkpoint: Checkpoint =
            bincode::deserialize(&bytes).map_err(|source| RfError::DeserializeModel {
                path: path.to_path_buf(),
                source,
            })?;

        if checkpoint.magic != MAGIC || checkpoint.format_version != FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: checkpoint.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_trees = checkpoint.n_trees,
            n_features = checkpoint.n_features,
            n_classes = checkpoint.n_classes,
            "checkpoint loaded"
        );
        Ok(checkpoint.forest)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::RandomForestConfig;

    fn train_simple_model() -> RandomForest {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let names = vec!["x".to_string(), "y".to_string()];
        RandomForestConfig::new(5)
            .unwrap()
            .with_seed(42)
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest()
    }

    #[test]
    fn reloaded_checkpoint_predicts_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("all_aml_train_model.tl");
        let forest = train_simple_model();
        forest.save_checkpoint(&path).unwrap();
        let loaded = RandomForest::load_checkpoint(&path).unwrap();

        assert_eq!(loaded.feature_names(), forest.feature_names());
        for sample in [vec![1.5, 0.0], vec![11.0, 0.0], vec![5.0, 0.0]] {
            assert_eq!(forest.predict(&sample).unwrap(), loaded.predict(&sample).unwrap());
            assert_eq!(
                forest.predict_proba(&sample).unwrap().as_slice(),
                loaded.predict_proba(&sample).unwrap().as_slice()
            );
        }
    }

    #[test]
    fn missing_file_error() {
        let dir = TempDir::new().unwrap();
        let err = RandomForest::load_checkpoint(dir.path().join("absent.tl")).unwrap_err();
        assert!(matches!(err, RfError::ReadModel { .. }));
    }

    #[test]
    fn corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.tl");
        std::fs::write(&path, b"not a checkpoint").unwrap();
        let err = RandomForest::load_checkpoint(&path).unwrap_err();
        assert!(matches!(err, RfError::DeserializeModel { .. }));
    }
}

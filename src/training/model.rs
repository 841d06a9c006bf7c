// TrainedModel - fitted normalizer and forest, used together
//
// The only ways to obtain a model are `ClassifierTrainer::train` and
// `load_model` on a file written by `save_model`. Fields stay private so a
// forest can never be paired with a normalizer it was not fitted with.

use super::forest::RandomForest;
use super::normalizer::Normalizer;
use crate::analysis::classifier::MoodLabel;
use crate::analysis::features::FeatureVector;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Version written into saved model files
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Immutable trained classifier, safe to share across threads
///
/// Deserializing goes through `ModelFile`, so a parsed model has the
/// current format version and a well-formed normalizer and forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelFile")]
pub struct TrainedModel {
    version: u32,
    seed: u64,
    normalizer: Normalizer,
    forest: RandomForest,
}

/// Unchecked on-disk form of a `TrainedModel`
#[derive(Deserialize)]
struct ModelFile {
    version: u32,
    seed: u64,
    normalizer: Normalizer,
    forest: RandomForest,
}

impl TryFrom<ModelFile> for TrainedModel {
    type Error = String;

    fn try_from(file: ModelFile) -> std::result::Result<Self, Self::Error> {
        if file.version != MODEL_FORMAT_VERSION {
            return Err(format!(
                "model has format version {}, expected {}",
                file.version, MODEL_FORMAT_VERSION
            ));
        }
        if !file.normalizer.is_well_formed() {
            return Err("model normalizer is malformed".to_string());
        }
        if !file.forest.is_well_formed() {
            return Err("model forest is empty or has out-of-range splits".to_string());
        }
        Ok(Self {
            version: file.version,
            seed: file.seed,
            normalizer: file.normalizer,
            forest: file.forest,
        })
    }
}

impl TrainedModel {
    pub(crate) fn new(seed: u64, normalizer: Normalizer, forest: RandomForest) -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            seed,
            normalizer,
            forest,
        }
    }

    /// Normalize `features` with the paired normalizer, then take the forest vote
    pub fn predict(&self, features: &FeatureVector) -> MoodLabel {
        let row = self.normalizer.transform(features);
        self.forest.predict(&row)
    }

    pub fn n_trees(&self) -> usize {
        self.forest.len()
    }

    /// Seed the forest was grown with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

/// Write `model` as indented JSON
pub fn save_model<P: AsRef<Path>>(path: P, model: &TrainedModel) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(model).context("Failed to serialize model")?;
    fs::write(path, json).with_context(|| format!("Failed to write model to {:?}", path))?;
    log::info!(
        "[TrainedModel] Saved {} trees to {:?}",
        model.n_trees(),
        path
    );
    Ok(())
}

/// Read a model written by `save_model`
///
/// Rejects files from another format version and structurally broken models
/// (wrong slot count, empty forest, out-of-range split features).
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read model {:?}", path))?;
    let model: TrainedModel = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse model {:?}", path))?;

    log::info!(
        "[TrainedModel] Loaded {} trees from {:?}",
        model.n_trees(),
        path
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::training::{builtin_samples, ClassifierTrainer};

    fn small_model() -> TrainedModel {
        let config = TrainingConfig {
            n_trees: 10,
            ..TrainingConfig::default()
        };
        ClassifierTrainer::new(config).train(&[]).unwrap()
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = small_model();

        save_model(&path, &model).unwrap();
        let loaded = load_model(&path).unwrap();

        assert_eq!(loaded, model);
        for sample in builtin_samples() {
            assert_eq!(loaded.predict(&sample.features), model.predict(&sample.features));
        }
    }

    #[test]
    fn test_load_rejects_wrong_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut model = small_model();
        model.version = 99;
        fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();

        let err = load_model(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("format version"));
    }

    #[test]
    fn test_direct_parse_rejects_out_of_range_split() {
        let mut value = serde_json::to_value(small_model()).unwrap();
        value["forest"]["trees"][0]["root"] = serde_json::json!({
            "type": "split",
            "feature": 99,
            "threshold": 0.0,
            "left": { "type": "leaf", "label": "sad" },
            "right": { "type": "leaf", "label": "happy" }
        });

        let err = serde_json::from_value::<TrainedModel>(value).unwrap_err();
        assert!(err.to_string().contains("out-of-range"));
    }

    #[test]
    fn test_direct_parse_rejects_short_normalizer() {
        let mut value = serde_json::to_value(small_model()).unwrap();
        value["normalizer"]["mean"] = serde_json::json!([0.0, 0.0]);
        assert!(serde_json::from_value::<TrainedModel>(value).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_model(dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "{\"version\": 1}").unwrap();
        assert!(load_model(&path).is_err());
    }
}

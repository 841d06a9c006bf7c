// Training module - fits the mood classifier
//
// ClassifierTrainer validates labeled samples (or falls back to the built-in
// bootstrap set), fits a standard-scaling normalizer over them, then grows a
// seeded random forest on the normalised rows. Identical samples and seed
// always produce an identical model.
//
// Module organization:
// - normalizer: per-slot mean/scale transform
// - forest: CART trees and the voting ensemble
// - bootstrap: built-in one-per-mood sample set
// - model: TrainedModel and its JSON persistence

mod bootstrap;
mod forest;
mod model;
mod normalizer;

pub use bootstrap::builtin_samples;
pub use forest::{DecisionTree, ForestParams, RandomForest};
pub use model::{load_model, save_model, TrainedModel, MODEL_FORMAT_VERSION};
pub use normalizer::Normalizer;

use crate::analysis::classifier::MoodLabel;
use crate::analysis::features::{FeatureVector, FEATURE_COUNT};
use crate::config::TrainingConfig;
use crate::error::TrainingError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// One training example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub mood: MoodLabel,
    pub features: FeatureVector,
}

impl LabeledSample {
    pub fn new(mood: MoodLabel, features: FeatureVector) -> Self {
        Self { mood, features }
    }
}

/// Fits `TrainedModel`s from labeled feature vectors
pub struct ClassifierTrainer {
    config: TrainingConfig,
}

impl ClassifierTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on `samples`, or on the bootstrap set when `samples` is empty
    ///
    /// # Errors
    /// * `ConfigurationError` - `n_trees` is zero, a sample is labeled
    ///   `unknown`, or there is nothing to train on
    /// * `InvalidSample` - a sample carries a non-finite feature
    pub fn train(&self, samples: &[LabeledSample]) -> Result<TrainedModel, TrainingError> {
        if self.config.n_trees == 0 {
            return Err(TrainingError::ConfigurationError {
                reason: "n_trees must be at least 1".to_string(),
            });
        }

        let builtin;
        let samples = if samples.is_empty() {
            if !self.config.use_builtin_samples {
                return Err(TrainingError::ConfigurationError {
                    reason: "no training samples and built-in samples are disabled".to_string(),
                });
            }
            log::info!("[ClassifierTrainer] No samples supplied, using built-in bootstrap set");
            builtin = builtin_samples();
            builtin.as_slice()
        } else {
            samples
        };

        validate(samples)?;

        let vectors: Vec<FeatureVector> = samples.iter().map(|s| s.features).collect();
        let labels: Vec<MoodLabel> = samples.iter().map(|s| s.mood).collect();

        let normalizer = Normalizer::fit(&vectors);
        let rows: Vec<[f64; FEATURE_COUNT]> = vectors.iter().map(|v| normalizer.transform(v)).collect();

        let params = ForestParams {
            n_trees: self.config.n_trees,
            max_features: max_features(),
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split.max(2),
            bootstrap: self.config.bootstrap,
        };
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let forest = RandomForest::fit(&rows, &labels, &params, &mut rng);

        log::info!(
            "[ClassifierTrainer] Trained {} trees on {} samples (seed {})",
            forest.len(),
            samples.len(),
            self.config.seed
        );

        Ok(TrainedModel::new(self.config.seed, normalizer, forest))
    }
}

/// Candidate features per split: sqrt of the slot count
fn max_features() -> usize {
    ((FEATURE_COUNT as f64).sqrt() as usize).max(1)
}

fn validate(samples: &[LabeledSample]) -> Result<(), TrainingError> {
    for (index, sample) in samples.iter().enumerate() {
        if sample.mood == MoodLabel::Unknown {
            return Err(TrainingError::ConfigurationError {
                reason: format!("sample {} is labeled unknown, which is not trainable", index),
            });
        }
        if let Some(slot) = sample.features.first_non_finite() {
            return Err(TrainingError::InvalidSample {
                index,
                reason: format!("slot {} is not a finite number", slot),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(slot: usize, value: f64) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        values[slot] = value;
        FeatureVector::new(values)
    }

    fn one_hot_samples() -> Vec<LabeledSample> {
        vec![
            LabeledSample::new(MoodLabel::Sad, one_hot(0, 1.0)),
            LabeledSample::new(MoodLabel::Happy, one_hot(1, 1.0)),
            LabeledSample::new(MoodLabel::Vibe, one_hot(2, 1.0)),
            LabeledSample::new(MoodLabel::Motivation, one_hot(3, 1.0)),
        ]
    }

    #[test]
    fn test_max_features_is_sqrt_of_slots() {
        assert_eq!(max_features(), 4);
    }

    #[test]
    fn test_one_hot_prototype_classified_as_its_label() {
        let model = ClassifierTrainer::new(TrainingConfig::default())
            .train(&one_hot_samples())
            .unwrap();
        assert_eq!(model.predict(&one_hot(1, 1.0)), MoodLabel::Happy);
        assert_eq!(model.n_trees(), 100);
    }

    #[test]
    fn test_training_is_deterministic() {
        let trainer = ClassifierTrainer::new(TrainingConfig::default());
        let a = trainer.train(&one_hot_samples()).unwrap();
        let b = trainer.train(&one_hot_samples()).unwrap();
        assert_eq!(a, b);

        let held_out = one_hot(2, 0.4);
        assert_eq!(a.predict(&held_out), b.predict(&held_out));
    }

    #[test]
    fn test_empty_samples_use_builtin_set() {
        let model = ClassifierTrainer::new(TrainingConfig::default())
            .train(&[])
            .unwrap();
        for sample in builtin_samples() {
            assert_eq!(model.predict(&sample.features), sample.mood);
        }
    }

    #[test]
    fn test_empty_samples_without_fallback_is_configuration_error() {
        let config = TrainingConfig {
            use_builtin_samples: false,
            ..TrainingConfig::default()
        };
        let err = ClassifierTrainer::new(config).train(&[]).unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
    }

    #[test]
    fn test_zero_trees_is_configuration_error() {
        let config = TrainingConfig {
            n_trees: 0,
            ..TrainingConfig::default()
        };
        let err = ClassifierTrainer::new(config)
            .train(&one_hot_samples())
            .unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let mut samples = one_hot_samples();
        samples.push(LabeledSample::new(MoodLabel::Unknown, one_hot(4, 1.0)));
        let err = ClassifierTrainer::new(TrainingConfig::default())
            .train(&samples)
            .unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
    }

    #[test]
    fn test_non_finite_sample_is_rejected() {
        let mut samples = one_hot_samples();
        samples[2].features = one_hot(5, f64::INFINITY);
        let err = ClassifierTrainer::new(TrainingConfig::default())
            .train(&samples)
            .unwrap_err();
        assert_eq!(
            err,
            TrainingError::InvalidSample {
                index: 2,
                reason: "slot 5 is not a finite number".to_string()
            }
        );
    }

    #[test]
    fn test_samples_parse_from_json() {
        let json = format!(
            r#"[{{"mood": "vibe", "features": {:?}}}]"#,
            [0.5f64; FEATURE_COUNT].to_vec()
        );
        let samples: Vec<LabeledSample> = serde_json::from_str(&json).unwrap();
        assert_eq!(samples[0].mood, MoodLabel::Vibe);
        assert_eq!(samples[0].features.get(20), 0.5);
    }
}

// Normalizer - per-slot standard scaling
//
// x' = (x - mean) / scale, with mean and population standard deviation
// computed over the training vectors. Constant slots get scale 1 so they
// pass through centred instead of dividing by zero.

use crate::analysis::features::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// Fitted per-slot mean/scale transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Normalizer {
    /// Fit mean and scale over `vectors`
    ///
    /// An empty slice yields the identity transform.
    pub fn fit(vectors: &[FeatureVector]) -> Self {
        let mut mean = vec![0.0; FEATURE_COUNT];
        let mut scale = vec![1.0; FEATURE_COUNT];
        if vectors.is_empty() {
            return Self { mean, scale };
        }

        let n = vectors.len() as f64;
        for slot in 0..FEATURE_COUNT {
            let slot_mean = vectors.iter().map(|v| v.get(slot)).sum::<f64>() / n;
            let variance = vectors
                .iter()
                .map(|v| (v.get(slot) - slot_mean).powi(2))
                .sum::<f64>()
                / n;
            let std_dev = variance.sqrt();

            mean[slot] = slot_mean;
            // Rounding noise on a constant slot must not blow up the scale
            if std_dev > 10.0 * f64::EPSILON * slot_mean.abs().max(1.0) {
                scale[slot] = std_dev;
            }
        }

        Self { mean, scale }
    }

    /// Normalised copy of `vector`
    pub fn transform(&self, vector: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (slot, value) in out.iter_mut().enumerate() {
            let mean = self.mean.get(slot).copied().unwrap_or(0.0);
            let scale = self.scale.get(slot).copied().unwrap_or(1.0);
            *value = (vector.get(slot) - mean) / scale;
        }
        out
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// False when a deserialized normalizer does not cover every slot
    pub(crate) fn is_well_formed(&self) -> bool {
        self.mean.len() == FEATURE_COUNT
            && self.scale.len() == FEATURE_COUNT
            && self.scale.iter().all(|s| s.is_finite() && *s > 0.0)
    }
}

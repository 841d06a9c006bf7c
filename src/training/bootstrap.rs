// Built-in bootstrap training set
//
// One hand-written vector per trainable mood, shaped after the folder
// heuristics the tagger started from: slow minor tracks read as sad, fast
// major tracks as happy, mid-tempo (90-110 BPM) as vibe, and everything fast
// and loud as motivation. Four samples make an illustrative model only; it
// separates these prototypes and nothing more can be assumed.

use super::LabeledSample;
use crate::analysis::classifier::MoodLabel;
use crate::analysis::features::{FeatureVector, FEATURE_COUNT};

/// Slot order: bpm, key_is_major, rms, centroid, rolloff, zcr, valence,
/// tempo stability, mfcc 0..12
const SAD: [f64; FEATURE_COUNT] = [
    70.0, 0.0, 0.05, 1200.0, 2400.0, 0.035, 0.28, 0.045, -360.0, 125.0, 12.0, 28.0, 6.0, 11.0,
    1.0, 5.0, -2.0, 3.0, -1.0, 2.0, 0.0,
];

const HAPPY: [f64; FEATURE_COUNT] = [
    128.0, 1.0, 0.20, 2800.0, 5600.0, 0.090, 0.55, 0.010, -180.0, 95.0, -14.0, 31.0, -6.0, 12.0,
    -8.0, 6.0, -4.0, 4.0, -3.0, 2.0, -1.0,
];

const VIBE: [f64; FEATURE_COUNT] = [
    100.0, 1.0, 0.12, 1900.0, 3800.0, 0.060, 0.42, 0.020, -250.0, 110.0, 2.0, 22.0, 1.0, 9.0,
    -3.0, 4.0, -1.0, 2.0, -2.0, 1.0, 0.0,
];

const MOTIVATION: [f64; FEATURE_COUNT] = [
    150.0, 0.0, 0.28, 3400.0, 7000.0, 0.120, 0.47, 0.015, -140.0, 80.0, -22.0, 26.0, -10.0, 8.0,
    -11.0, 3.0, -6.0, 1.0, -4.0, 0.0, -2.0,
];

/// The bootstrap set: exactly one sample per trainable mood
pub fn builtin_samples() -> Vec<LabeledSample> {
    [
        (MoodLabel::Sad, SAD),
        (MoodLabel::Happy, HAPPY),
        (MoodLabel::Vibe, VIBE),
        (MoodLabel::Motivation, MOTIVATION),
    ]
    .into_iter()
    .map(|(mood, values)| LabeledSample::new(mood, FeatureVector::new(values)))
    .collect()
}

// Chroma module - pitch-class energy profile
//
// Each FFT bin between MIN_CHROMA_HZ and Nyquist is folded onto its nearest
// equal-tempered pitch class (C = 0 … B = 11). Every frame is normalised by
// its strongest pitch class, then frames are averaged into a 12-value
// profile that drives the key heuristic and the valence slot.

use super::fft::Spectrogram;

/// Number of pitch classes
pub const PITCH_CLASSES: usize = 12;

/// Bins below this frequency carry no usable pitch information
const MIN_CHROMA_HZ: f32 = 32.7;

/// Maps spectrogram bins to pitch classes
pub struct ChromaExtractor {
    /// Pitch class per bin, None for bins outside the chroma range
    bin_classes: Vec<Option<usize>>,
}

impl ChromaExtractor {
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let bin_classes = (0..fft_size / 2 + 1)
            .map(|k| {
                let freq = k as f32 * sample_rate as f32 / fft_size as f32;
                if freq < MIN_CHROMA_HZ || freq > nyquist {
                    None
                } else {
                    Some(pitch_class(freq))
                }
            })
            .collect();
        Self { bin_classes }
    }

    /// Max-normalised chroma of one magnitude frame
    pub fn frame_chroma(&self, spectrum: &[f32]) -> [f32; PITCH_CLASSES] {
        let mut chroma = [0.0f32; PITCH_CLASSES];
        for (mag, class) in spectrum.iter().zip(self.bin_classes.iter()) {
            if let Some(class) = class {
                chroma[*class] += mag * mag;
            }
        }

        let peak = chroma.iter().cloned().fold(0.0f32, f32::max);
        if peak > 1e-10 {
            for value in chroma.iter_mut() {
                *value /= peak;
            }
        } else {
            chroma = [0.0; PITCH_CLASSES];
        }
        chroma
    }

    /// Time-averaged chroma profile over every frame
    pub fn profile(&self, spectrogram: &Spectrogram) -> [f32; PITCH_CLASSES] {
        let mut profile = [0.0f32; PITCH_CLASSES];
        let frames = spectrogram.frames();
        if frames.is_empty() {
            return profile;
        }

        for frame in frames {
            let chroma = self.frame_chroma(frame);
            for (acc, value) in profile.iter_mut().zip(chroma.iter()) {
                *acc += value;
            }
        }
        for value in profile.iter_mut() {
            *value /= frames.len() as f32;
        }
        profile
    }
}

/// Pitch class (C = 0) of the equal-tempered note nearest to `freq`
pub fn pitch_class(freq: f32) -> usize {
    let midi = (12.0 * (freq / 440.0).log2() + 69.0).round() as i64;
    midi.rem_euclid(PITCH_CLASSES as i64) as usize
}

/// Index of the strongest pitch class; the lowest index wins ties
pub fn dominant_pitch_class(profile: &[f32; PITCH_CLASSES]) -> usize {
    let mut best = 0;
    for (i, &value) in profile.iter().enumerate().skip(1) {
        if value > profile[best] {
            best = i;
        }
    }
    best
}

// MFCC module - mel-frequency cepstral coefficients
//
// Algorithm per frame:
// 1. Power spectrum |X[k]|²
// 2. Triangular mel filterbank (HTK mel scale, 0 Hz to Nyquist)
// 3. Log compression in dB, floored at -100 dB
// 4. Orthonormal DCT-II, first MFCC_COUNT coefficients kept

use super::types::MFCC_COUNT;

/// Power floor before log compression (-100 dB)
const POWER_FLOOR: f32 = 1e-10;

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// MFCC computation with a precomputed filterbank and DCT basis
pub struct MfccExtractor {
    /// filters[m][k] = weight of bin k in mel band m
    filters: Vec<Vec<f32>>,
    /// dct[c][m] = orthonormal DCT-II basis
    dct: Vec<Vec<f32>>,
}

impl MfccExtractor {
    pub fn new(sample_rate: u32, fft_size: usize, n_mels: usize) -> Self {
        let n_mels = n_mels.max(MFCC_COUNT);
        let num_bins = fft_size / 2 + 1;
        let mel_max = hz_to_mel(sample_rate as f32 / 2.0);

        let hz_points: Vec<f32> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
            .collect();

        let filters = (0..n_mels)
            .map(|m| {
                let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
                (0..num_bins)
                    .map(|k| {
                        let freq = k as f32 * sample_rate as f32 / fft_size as f32;
                        let rising = (freq - left) / (center - left);
                        let falling = (right - freq) / (right - center);
                        rising.min(falling).max(0.0)
                    })
                    .collect()
            })
            .collect();

        let dct = (0..MFCC_COUNT)
            .map(|c| {
                let scale = if c == 0 {
                    (1.0 / n_mels as f32).sqrt()
                } else {
                    (2.0 / n_mels as f32).sqrt()
                };
                (0..n_mels)
                    .map(|m| {
                        scale
                            * (std::f32::consts::PI * c as f32 * (2 * m + 1) as f32
                                / (2 * n_mels) as f32)
                                .cos()
                    })
                    .collect()
            })
            .collect();

        Self { filters, dct }
    }

    /// MFCCs of one magnitude frame
    pub fn frame_mfcc(&self, spectrum: &[f32]) -> [f32; MFCC_COUNT] {
        let log_mel: Vec<f32> = self
            .filters
            .iter()
            .map(|filter| {
                let energy: f32 = filter
                    .iter()
                    .zip(spectrum.iter())
                    .map(|(w, mag)| w * mag * mag)
                    .sum();
                10.0 * energy.max(POWER_FLOOR).log10()
            })
            .collect();

        let mut coefficients = [0.0f32; MFCC_COUNT];
        for (coefficient, basis) in coefficients.iter_mut().zip(self.dct.iter()) {
            *coefficient = basis.iter().zip(log_mel.iter()).map(|(b, x)| b * x).sum();
        }
        coefficients
    }

    /// Mean MFCCs over all frames
    pub fn mean_mfcc(&self, frames: &[Vec<f32>]) -> [f64; MFCC_COUNT] {
        let mut mean = [0.0f64; MFCC_COUNT];
        if frames.is_empty() {
            return mean;
        }
        for frame in frames {
            for (acc, value) in mean.iter_mut().zip(self.frame_mfcc(frame).iter()) {
                *acc += *value as f64;
            }
        }
        for value in mean.iter_mut() {
            *value /= frames.len() as f64;
        }
        mean
    }
}

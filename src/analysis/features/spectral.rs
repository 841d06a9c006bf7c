// Spectral module - Frequency-domain feature extraction
//
// This module computes spectral shape features from magnitude spectra.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

/// Spectral feature computation functions
pub struct SpectralFeatures {
    sample_rate: u32,
    fft_size: usize,
    rolloff_percent: f32,
}

impl SpectralFeatures {
    /// Create a new spectral features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `fft_size` - FFT window size
    /// * `rolloff_percent` - Energy fraction below the roll-off frequency (e.g. 0.85)
    pub fn new(sample_rate: u32, fft_size: usize, rolloff_percent: f32) -> Self {
        Self {
            sample_rate,
            fft_size,
            rolloff_percent: rolloff_percent.clamp(0.0, 1.0),
        }
    }

    /// Compute spectral centroid (weighted mean frequency)
    ///
    /// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]|
    ///
    /// # Returns
    /// Spectral centroid in Hz, 0 for a silent frame
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f32 {
        let freq_bin_width = self.sample_rate as f32 / self.fft_size as f32;

        let weighted_sum: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &mag)| i as f32 * freq_bin_width * mag)
            .sum();

        let magnitude_sum: f32 = spectrum.iter().sum();

        if magnitude_sum > 1e-10 {
            weighted_sum / magnitude_sum
        } else {
            0.0
        }
    }

    /// Compute spectral roll-off
    ///
    /// Finds the frequency below which `rolloff_percent` of the spectral
    /// energy is contained.
    ///
    /// # Returns
    /// Roll-off frequency in Hz, 0 for a silent frame
    pub fn compute_rolloff(&self, spectrum: &[f32]) -> f32 {
        let total_energy: f32 = spectrum.iter().map(|&mag| mag * mag).sum();

        if total_energy < 1e-10 {
            return 0.0;
        }

        let threshold = self.rolloff_percent * total_energy;
        let freq_bin_width = self.sample_rate as f32 / self.fft_size as f32;

        let mut cumulative_energy = 0.0;
        for (i, &mag) in spectrum.iter().enumerate() {
            cumulative_energy += mag * mag;
            if cumulative_energy >= threshold {
                return i as f32 * freq_bin_width;
            }
        }

        // Rounding left us just short of the threshold: report Nyquist
        (spectrum.len() - 1) as f32 * freq_bin_width
    }
}

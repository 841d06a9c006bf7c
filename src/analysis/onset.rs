// OnsetDetector - spectral flux onset strength and peak picking
//
// Algorithm:
// 1. Take the magnitude spectrogram of the track (Hann window, hop-spaced frames)
// 2. Compute positive difference from previous frame: SF[k] = max(0, |X_t[k]| - |X_(t-1)[k]|)
// 3. Sum across frequency bins: flux_t = Σ SF[k]  (onset strength envelope)
// 4. Adaptive threshold: threshold_t = median(flux[t-N:t+N]) + offset × max(flux)
// 5. Peak pick: local maxima where flux_t > threshold_t
//
// The envelope drives tempo estimation and beat tracking; the picked peaks
// tell the tempo estimator whether there is any rhythmic content at all.

use crate::analysis::features::Spectrogram;

/// Half-size of the median filter window in frames
const MEDIAN_WINDOW_HALFSIZE: usize = 16;

/// Threshold offset relative to the envelope peak
const THRESHOLD_OFFSET: f32 = 0.1;

/// Offline onset detector over a whole spectrogram
pub struct OnsetDetector {
    median_window_halfsize: usize,
    threshold_offset: f32,
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self {
            median_window_halfsize: MEDIAN_WINDOW_HALFSIZE,
            threshold_offset: THRESHOLD_OFFSET,
        }
    }
}

impl OnsetDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Onset strength envelope, one value per spectrogram frame
    ///
    /// The first frame has no predecessor and gets zero flux.
    pub fn envelope(&self, spectrogram: &Spectrogram) -> Vec<f32> {
        let frames = spectrogram.frames();
        let mut envelope = Vec::with_capacity(frames.len());
        if frames.is_empty() {
            return envelope;
        }

        envelope.push(0.0);
        for pair in frames.windows(2) {
            envelope.push(spectral_flux(&pair[0], &pair[1]));
        }
        envelope
    }

    /// Frame indices of onsets in `envelope`
    pub fn pick_onsets(&self, envelope: &[f32]) -> Vec<usize> {
        let mut peaks = Vec::new();
        if envelope.len() < 3 {
            return peaks;
        }

        let peak_level = envelope.iter().cloned().fold(0.0f32, f32::max);
        if peak_level <= 1e-10 {
            return peaks;
        }
        let offset = self.threshold_offset * peak_level;

        for i in 1..envelope.len() - 1 {
            let (prev, curr, next) = (envelope[i - 1], envelope[i], envelope[i + 1]);
            if curr > prev && curr >= next && curr > self.adaptive_threshold(envelope, i, offset) {
                peaks.push(i);
            }
        }

        log::debug!("[OnsetDetector] Picked {} onsets", peaks.len());
        peaks
    }

    /// threshold(t) = median(flux[t-N:t+N]) + offset
    fn adaptive_threshold(&self, envelope: &[f32], index: usize, offset: f32) -> f32 {
        let start = index.saturating_sub(self.median_window_halfsize);
        let end = (index + self.median_window_halfsize + 1).min(envelope.len());

        let mut window: Vec<f32> = envelope[start..end].to_vec();
        if window.is_empty() {
            return offset;
        }
        window.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let median = if window.len() % 2 == 0 {
            let mid = window.len() / 2;
            (window[mid - 1] + window[mid]) / 2.0
        } else {
            window[window.len() / 2]
        };

        median + offset
    }
}

/// SF(t) = Σ max(0, |X(t)| - |X(t-1)|)
fn spectral_flux(prev: &[f32], curr: &[f32]) -> f32 {
    curr.iter()
        .zip(prev.iter())
        .map(|(c, p)| (c - p).max(0.0))
        .sum()
}

// Temporal module - Time-domain feature extraction
//
// This module computes features directly from time-domain audio frames:
// zero-crossing rate and RMS energy.

/// Compute zero-crossing rate (ZCR)
///
/// Formula: ZCR = crossings / (N - 1)
///
/// Zero is treated as positive, so an all-zero frame has no crossings.
///
/// # Returns
/// Zero-crossing rate (0.0 to 1.0)
pub fn compute_zcr(audio: &[f32]) -> f32 {
    if audio.len() < 2 {
        return 0.0;
    }

    let crossings = audio
        .windows(2)
        .filter(|pair| (pair[1] >= 0.0) != (pair[0] >= 0.0))
        .count();

    crossings as f32 / (audio.len() - 1) as f32
}

/// Compute root-mean-square energy of a frame
pub fn compute_rms(audio: &[f32]) -> f32 {
    if audio.is_empty() {
        return 0.0;
    }
    let energy: f32 = audio.iter().map(|&x| x * x).sum();
    (energy / audio.len() as f32).sqrt()
}

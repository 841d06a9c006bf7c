// BeatTracker - dynamic-programming beat tracking
//
// Given an onset strength envelope and a target beat period (in frames),
// pick the beat sequence that maximises onset strength at the beats while
// penalising inter-beat intervals that stray from the period.
//
// Algorithm (Ellis, 2007):
// 1. Local score: envelope / std(envelope), smoothed with a Gaussian of width ~period
// 2. cumscore[i] = local[i] + max_{p} (cumscore[p] - tightness × ln((i - p) / period)²)
//    over predecessors p with period/2 ≤ i - p ≤ 2 × period
// 3. Last beat: final local maximum of cumscore above half the median of the maxima
// 4. Backtrack predecessors to recover the full sequence
//
// References:
// - Ellis, D. (2007). Beat Tracking by Dynamic Programming

/// Beat tracker for a fixed beat period
pub struct BeatTracker {
    tightness: f32,
}

impl BeatTracker {
    pub fn new(tightness: f32) -> Self {
        Self {
            tightness: tightness.max(0.0),
        }
    }

    /// Beat positions (frame indices, ascending)
    ///
    /// Returns no beats for a silent envelope or a non-positive period.
    pub fn track(&self, envelope: &[f32], period: f32) -> Vec<usize> {
        if envelope.is_empty() || !(period >= 1.0) {
            return Vec::new();
        }

        let std_dev = sample_std_dev(envelope);
        if std_dev <= 1e-10 {
            return Vec::new();
        }

        let normalized: Vec<f32> = envelope.iter().map(|v| v / std_dev).collect();
        let local = local_score(&normalized, period);
        let (backlink, cumscore) = self.dynamic_program(&local, period);

        let Some(last) = last_beat(&cumscore) else {
            return Vec::new();
        };

        let mut beats = vec![last];
        while let Some(prev) = backlink[*beats.last().unwrap_or(&last)] {
            beats.push(prev);
        }
        beats.reverse();
        beats
    }

    fn dynamic_program(&self, local: &[f32], period: f32) -> (Vec<Option<usize>>, Vec<f32>) {
        let n = local.len();
        let min_offset = (period / 2.0).round().max(1.0) as usize;
        let max_offset = (2.0 * period).round() as usize;
        let onset_floor = 0.01 * local.iter().cloned().fold(0.0f32, f32::max);

        let mut backlink: Vec<Option<usize>> = vec![None; n];
        let mut cumscore = vec![0.0f32; n];
        let mut first_beat = true;

        for i in 0..n {
            let mut best: Option<(usize, f32)> = None;
            for offset in min_offset..=max_offset.max(min_offset) {
                let Some(prev) = i.checked_sub(offset) else {
                    break;
                };
                let penalty = self.tightness * (offset as f32 / period).ln().powi(2);
                let score = cumscore[prev] - penalty;
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((prev, score));
                }
            }

            cumscore[i] = local[i] + best.map_or(0.0, |(_, s)| s.max(0.0));

            if first_beat && local[i] < onset_floor {
                backlink[i] = None;
            } else {
                backlink[i] = best.map(|(prev, _)| prev);
                first_beat = false;
            }
        }

        (backlink, cumscore)
    }
}

/// Envelope convolved with a Gaussian window spanning ±period frames
fn local_score(envelope: &[f32], period: f32) -> Vec<f32> {
    let half = period.round() as isize;
    let window: Vec<f32> = (-half..=half)
        .map(|t| (-0.5 * (t as f32 * 32.0 / period).powi(2)).exp())
        .collect();

    let n = envelope.len() as isize;
    (0..n)
        .map(|i| {
            window
                .iter()
                .enumerate()
                .filter_map(|(w, weight)| {
                    let j = i + w as isize - half;
                    (0..n).contains(&j).then(|| weight * envelope[j as usize])
                })
                .sum()
        })
        .collect()
}

/// Last local maximum of `cumscore` scoring at least half the median maximum
fn last_beat(cumscore: &[f32]) -> Option<usize> {
    if cumscore.is_empty() {
        return None;
    }
    if cumscore.len() < 3 {
        return Some(cumscore.len() - 1);
    }

    let maxima: Vec<usize> = (1..cumscore.len() - 1)
        .filter(|&i| cumscore[i] > cumscore[i - 1] && cumscore[i] >= cumscore[i + 1])
        .collect();
    if maxima.is_empty() {
        return Some(cumscore.len() - 1);
    }

    let mut values: Vec<f32> = maxima.iter().map(|&i| cumscore[i]).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = values[values.len() / 2];

    maxima
        .iter()
        .rev()
        .find(|&&i| cumscore[i] >= 0.5 * median)
        .copied()
}

/// Sample standard deviation (n - 1 denominator)
fn sample_std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / (values.len() - 1) as f32;
    variance.sqrt()
}

/// Population standard deviation of the intervals between consecutive beat times
///
/// Zero when fewer than two beats are available.
pub fn interval_std_dev(beat_times: &[f32]) -> f64 {
    if beat_times.len() < 2 {
        return 0.0;
    }
    let intervals: Vec<f64> = beat_times
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64)
        .collect();
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let variance =
        intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>() / intervals.len() as f64;
    variance.sqrt()
}

//! Mel Filter Bank and Cepstral Helpers

/// Floor applied to power before taking the logarithm
const AMIN: f64 = 1e-10;

/// Triangular mel filter bank on the Slaney mel scale with area normalisation
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    /// Sparse filters: (fft bin, weight) pairs per mel band
    filters: Vec<Vec<(usize, f32)>>,
}

impl MelFilterBank {
    /// Build a filter bank covering `f_min..f_max` Hz
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, f_min: f64, f_max: f64) -> Self {
        let sr = sample_rate.max(1) as f64;
        let bins = n_fft / 2 + 1;
        let f_max = f_max.min(sr / 2.0).max(f_min);

        let fft_freqs: Vec<f64> = (0..bins)
            .map(|i| i as f64 * sr / n_fft.max(1) as f64)
            .collect();

        let mel_min = hz_to_mel(f_min);
        let mel_max = hz_to_mel(f_max);
        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let filters = (0..n_mels)
            .map(|m| {
                let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                let enorm = 2.0 / (right - left);
                fft_freqs
                    .iter()
                    .enumerate()
                    .filter_map(|(bin, &f)| {
                        let lower = (f - left) / (center - left);
                        let upper = (right - f) / (right - center);
                        let w = lower.min(upper).max(0.0);
                        if w > 0.0 && w.is_finite() {
                            Some((bin, (w * enorm) as f32))
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    /// Number of mel bands
    pub fn bands(&self) -> usize {
        self.filters.len()
    }

    /// Project one power-spectrum frame onto the mel bands
    pub fn apply(&self, power: &[f32]) -> Vec<f64> {
        self.filters
            .iter()
            .map(|filter| {
                filter
                    .iter()
                    .map(|&(bin, w)| power.get(bin).copied().unwrap_or(0.0) as f64 * w as f64)
                    .sum()
            })
            .collect()
    }
}

/// Slaney-style Hz to mel: linear below 1 kHz, logarithmic above
pub(crate) fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

/// Inverse of [`hz_to_mel`]
pub(crate) fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

/// Convert a power spectrogram to decibels in place.
///
/// `10 * log10(max(S, 1e-10) / reference)`, then everything below
/// `max - top_db` is raised to that floor.
pub(crate) fn power_to_db(frames: &mut [Vec<f64>], reference: f64, top_db: f64) {
    let ref_db = 10.0 * reference.max(AMIN).log10();
    let mut peak = f64::NEG_INFINITY;

    for value in frames.iter_mut().flatten() {
        *value = 10.0 * value.max(AMIN).log10() - ref_db;
        peak = peak.max(*value);
    }

    let floor = peak - top_db;
    for value in frames.iter_mut().flatten() {
        *value = value.max(floor);
    }
}

/// Orthonormal DCT-II, returning the first `count` coefficients
pub(crate) fn dct_ortho(values: &[f64], count: usize) -> Vec<f64> {
    let n = values.len().max(1) as f64;
    (0..count)
        .map(|k| {
            let sum: f64 = values
                .iter()
                .enumerate()
                .map(|(m, &v)| {
                    v * (std::f64::consts::PI * k as f64 * (2.0 * m as f64 + 1.0) / (2.0 * n)).cos()
                })
                .sum();
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            sum * scale
        })
        .collect()
}

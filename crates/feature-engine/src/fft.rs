//! Short-Time Fourier Analysis

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// STFT analyzer producing power spectrogram frames
pub struct StftAnalyzer {
    /// Planned forward FFT of length `n_fft`
    fft: Arc<dyn Fft<f32>>,
    /// Periodic Hann window
    window: Vec<f32>,
    /// FFT size (samples per frame)
    n_fft: usize,
    /// Hop between successive frames (samples)
    hop_length: usize,
}

impl StftAnalyzer {
    /// Create a new STFT analyzer
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let n_fft = n_fft.max(1);
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(n_fft),
            window: Self::hann_window(n_fft),
            n_fft,
            hop_length: hop_length.max(1),
        }
    }

    /// Periodic Hann window (DFT-even), matching `scipy.signal.get_window("hann", n)`
    fn hann_window(n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
                (0.5 - 0.5 * phase.cos()) as f32
            })
            .collect()
    }

    /// Number of positive-frequency bins per frame
    pub fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// FFT size
    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Compute the power spectrogram `|X|²`, one row per frame.
    ///
    /// Frames are centred: the signal is zero-padded by `n_fft / 2` on both
    /// sides so frame `t` is centred on sample `t * hop_length`.
    pub fn power_spectrogram(&self, signal: &[f32]) -> Vec<Vec<f32>> {
        let pad = self.n_fft / 2;
        let frames = self.frame_count(signal.len());
        let bins = self.bins();

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];
        let mut out = Vec::with_capacity(frames);

        for t in 0..frames {
            let origin = (t * self.hop_length) as isize - pad as isize;
            for (i, cell) in buffer.iter_mut().enumerate() {
                let idx = origin + i as isize;
                let sample = if idx >= 0 {
                    signal.get(idx as usize).copied().unwrap_or(0.0)
                } else {
                    0.0
                };
                let sample = if sample.is_finite() { sample } else { 0.0 };
                *cell = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            out.push(buffer.iter().take(bins).map(|c| c.norm_sqr()).collect());
        }

        out
    }
}

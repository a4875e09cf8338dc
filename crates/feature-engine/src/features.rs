//! Cepstral Feature Vector Assembly

use crate::fft::StftAnalyzer;
use crate::mel::{dct_ortho, power_to_db, MelFilterBank};
use crate::waveform::Waveform;
use crate::FeatureError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// STFT and mel parameters (librosa defaults)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// FFT size in samples
    pub n_fft: usize,
    /// Hop between frames in samples
    pub hop_length: usize,
    /// Number of mel bands
    pub n_mels: usize,
    /// Lowest filter frequency (Hz)
    pub f_min: f64,
    /// Highest filter frequency (Hz); Nyquist when unset
    pub f_max: Option<f64>,
    /// Dynamic range kept by the dB conversion
    pub top_db: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            f_min: 0.0,
            f_max: None,
            top_db: 80.0,
        }
    }
}

/// Time-averaged cepstral descriptor of one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Mean coefficient values, one per cepstral index
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// Feature extractor turning waveforms into averaged cepstral coefficients
pub struct FeatureExtractor {
    /// STFT analyzer
    stft: StftAnalyzer,
    /// Spectral parameters
    config: SpectralConfig,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new(config: SpectralConfig) -> Self {
        Self {
            stft: StftAnalyzer::new(config.n_fft, config.hop_length),
            config,
        }
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    /// Mel power spectrogram, one row of `n_mels` energies per frame
    pub(crate) fn mel_power(&self, waveform: &Waveform) -> Result<Vec<Vec<f64>>, FeatureError> {
        if !(self.config.top_db.is_finite() && self.config.top_db > 0.0) {
            return Err(FeatureError::InvalidConfig(format!(
                "top_db must be positive, got {}",
                self.config.top_db
            )));
        }

        let sample_rate = waveform.sample_rate();
        let nyquist = sample_rate as f64 / 2.0;
        let f_max = self.config.f_max.map_or(nyquist, |f| f.min(nyquist));
        if self.config.f_min >= f_max {
            return Err(FeatureError::InvalidAudio(format!(
                "{} Hz audio has no content between {} Hz and {} Hz",
                sample_rate, self.config.f_min, f_max
            )));
        }

        let bank = MelFilterBank::new(
            sample_rate,
            self.stft.n_fft(),
            self.config.n_mels,
            self.config.f_min,
            f_max,
        );

        Ok(self
            .stft
            .power_spectrogram(waveform.samples())
            .iter()
            .map(|frame| bank.apply(frame))
            .collect())
    }

    /// Extract an `n`-dimensional descriptor: per-frame cepstral coefficients
    /// averaged over time.
    pub fn extract(&self, waveform: &Waveform, n: usize) -> Result<FeatureVector, FeatureError> {
        if n == 0 || n > self.config.n_mels {
            return Err(FeatureError::InvalidDimension {
                requested: n,
                max: self.config.n_mels,
            });
        }

        let mut frames = self.mel_power(waveform)?;
        power_to_db(&mut frames, 1.0, self.config.top_db);

        let mut sums = vec![0.0f64; n];
        for frame in &frames {
            for (sum, c) in sums.iter_mut().zip(dct_ortho(frame, n)) {
                *sum += c;
            }
        }

        let count = frames.len().max(1) as f64;
        let values: Vec<f32> = sums.iter().map(|s| (s / count) as f32).collect();

        debug!(
            "Extracted {} cepstral features from {} frames ({:.2}s @ {} Hz)",
            n,
            frames.len(),
            waveform.duration_secs(),
            waveform.sample_rate()
        );

        Ok(FeatureVector::new(values))
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(SpectralConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tone(freq: f32, sample_rate: u32, len: usize) -> Waveform {
        let samples = (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        Waveform::new(samples, sample_rate).unwrap()
    }

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::default();
        let wave = tone(440.0, 16_000, 16_000);

        let features = extractor.extract(&wave, 18).unwrap();

        assert_eq!(features.len(), 18);
        assert!(features.values.iter().all(|v| v.is_finite()));
        // Zeroth coefficient tracks overall log energy and dominates
        assert!(features.values[0].abs() > features.values[17].abs());
    }

    #[test]
    fn test_different_tones_give_different_features() {
        let extractor = FeatureExtractor::default();
        let low = extractor.extract(&tone(200.0, 16_000, 16_000), 16).unwrap();
        let high = extractor.extract(&tone(4_000.0, 16_000, 16_000), 16).unwrap();
        assert_ne!(low, high);
    }

    #[test]
    fn test_short_clip_still_yields_one_frame() {
        let extractor = FeatureExtractor::default();
        let wave = Waveform::new(vec![0.1, -0.1, 0.2], 8_000).unwrap();
        let features = extractor.extract(&wave, 20).unwrap();
        assert_eq!(features.len(), 20);
    }

    #[test]
    fn test_silence_is_finite() {
        let extractor = FeatureExtractor::default();
        let wave = Waveform::new(vec![0.0; 4_000], 8_000).unwrap();
        let features = extractor.extract(&wave, 16).unwrap();
        assert!(features.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_invalid_dimension() {
        let extractor = FeatureExtractor::default();
        let wave = tone(440.0, 16_000, 1_000);

        assert!(matches!(
            extractor.extract(&wave, 0),
            Err(FeatureError::InvalidDimension { requested: 0, .. })
        ));
        assert!(matches!(
            extractor.extract(&wave, 129),
            Err(FeatureError::InvalidDimension { requested: 129, max: 128 })
        ));
    }

    #[test]
    fn test_band_above_nyquist_is_invalid_audio() {
        let extractor = FeatureExtractor::new(SpectralConfig {
            f_min: 300.0,
            ..Default::default()
        });
        let err = extractor.extract(&tone(50.0, 400, 4_000), 16).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidAudio(_)));

        // Same settings are fine once the rate covers the band
        assert!(extractor.extract(&tone(500.0, 8_000, 4_000), 16).is_ok());
    }

    #[test]
    fn test_non_positive_top_db_rejected() {
        let extractor = FeatureExtractor::new(SpectralConfig {
            top_db: 0.0,
            ..Default::default()
        });
        let wave = tone(440.0, 8_000, 4_000);
        assert!(matches!(
            extractor.extract(&wave, 16),
            Err(FeatureError::InvalidConfig(_))
        ));
        assert!(matches!(
            crate::MelSpectrogram::compute(&extractor, &wave),
            Err(FeatureError::InvalidConfig(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_length_always_matches_request(
            samples in prop::collection::vec(-1.0f32..1.0, 1..6_000),
            n in 1usize..=40,
            rate in prop::sample::select(vec![8_000u32, 16_000, 22_050]),
        ) {
            let extractor = FeatureExtractor::default();
            let wave = Waveform::new(samples, rate).unwrap();
            let features = extractor.extract(&wave, n).unwrap();
            prop_assert_eq!(features.len(), n);
        }

        #[test]
        fn prop_extraction_is_deterministic(
            samples in prop::collection::vec(-1.0f32..1.0, 1..4_000),
            n in 1usize..=20,
        ) {
            let extractor = FeatureExtractor::default();
            let wave = Waveform::new(samples, 16_000).unwrap();
            let a = extractor.extract(&wave, n).unwrap();
            let b = extractor.extract(&wave, n).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}

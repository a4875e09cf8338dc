//! Waveform Loading

use crate::FeatureError;
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

/// Mono waveform at its native sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Wrap already-decoded mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, FeatureError> {
        if sample_rate == 0 {
            return Err(FeatureError::InvalidAudio("sample rate is zero".to_string()));
        }
        if samples.is_empty() {
            return Err(FeatureError::InvalidAudio("waveform is empty".to_string()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Decode a WAV file from disk
    pub fn from_wav_path(path: &Path) -> Result<Self, FeatureError> {
        let reader = WavReader::open(path).map_err(|e| {
            FeatureError::InvalidAudio(format!("{}: {}", path.display(), e))
        })?;
        Self::from_reader(reader)
    }

    /// Decode an in-memory WAV container
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, FeatureError> {
        let reader = WavReader::new(Cursor::new(bytes))
            .map_err(|e| FeatureError::InvalidAudio(e.to_string()))?;
        Self::from_reader(reader)
    }

    fn from_reader<R: Read>(mut reader: WavReader<R>) -> Result<Self, FeatureError> {
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| FeatureError::InvalidAudio(format!("sample error: {}", e)))?,
            SampleFormat::Int => {
                let scale = (1i64 << spec.bits_per_sample.saturating_sub(1)).max(1) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| FeatureError::InvalidAudio(format!("sample error: {}", e)))?
            }
        };

        // Down-mix to mono
        let samples: Vec<f32> = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        debug!(
            "Decoded waveform: {} samples @ {} Hz ({} channel(s))",
            samples.len(),
            spec.sample_rate,
            channels
        );

        Self::new(samples, spec.sample_rate)
    }

    /// Mono samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Native sample rate (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

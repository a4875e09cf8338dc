//! Feature Engineering Engine
//!
//! Turns pump recordings into fixed-length cepstral descriptors for the
//! autoencoder, plus a diagnostic log-mel spectrogram.

mod features;
mod fft;
mod mel;
mod spectrogram;
mod waveform;

pub use features::{FeatureExtractor, FeatureVector, SpectralConfig};
pub use fft::StftAnalyzer;
pub use mel::MelFilterBank;
pub use spectrogram::MelSpectrogram;
pub use waveform::Waveform;

use thiserror::Error;

/// Errors during waveform decoding and feature extraction
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),
    #[error("Invalid feature dimension {requested}: must be between 1 and {max}")]
    InvalidDimension { requested: usize, max: usize },
    #[error("Image encoding failed: {0}")]
    ImageEncoding(String),
    #[error("Invalid spectral configuration: {0}")]
    InvalidConfig(String),
}

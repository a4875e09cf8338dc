//! Diagnostic Log-Mel Spectrogram

use crate::features::FeatureExtractor;
use crate::mel::power_to_db;
use crate::waveform::Waveform;
use crate::FeatureError;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Magma-like palette anchors, dark to bright
const PALETTE: [[u8; 3]; 9] = [
    [0, 0, 4],
    [28, 16, 68],
    [79, 18, 123],
    [129, 37, 129],
    [181, 54, 122],
    [229, 80, 100],
    [251, 135, 97],
    [254, 194, 135],
    [252, 253, 191],
];

/// Log-scaled mel spectrogram in dB relative to its loudest cell
#[derive(Debug, Clone)]
pub struct MelSpectrogram {
    /// dB values, `frames[t][mel]`, all in `[-top_db, 0]`
    frames: Vec<Vec<f32>>,
    /// Dynamic range
    top_db: f64,
    sample_rate: u32,
    hop_length: usize,
}

impl MelSpectrogram {
    /// Compute the spectrogram with the extractor's STFT and mel settings
    pub fn compute(extractor: &FeatureExtractor, waveform: &Waveform) -> Result<Self, FeatureError> {
        let top_db = extractor.config().top_db;
        let mut power = extractor.mel_power(waveform)?;
        let peak = power
            .iter()
            .flatten()
            .copied()
            .fold(0.0f64, f64::max);
        power_to_db(&mut power, peak, top_db);

        Ok(Self {
            frames: power
                .into_iter()
                .map(|row| row.into_iter().map(|v| v as f32).collect())
                .collect(),
            top_db,
            sample_rate: waveform.sample_rate(),
            hop_length: extractor.config().hop_length,
        })
    }

    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_mels(&self) -> usize {
        self.frames.first().map(Vec::len).unwrap_or(0)
    }

    /// Time covered by one frame step (seconds)
    pub fn frame_step_secs(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate.max(1) as f64
    }

    /// Render as a PNG: time on the x axis, lowest mel band on the bottom row
    pub fn render_png(&self) -> Result<Vec<u8>, FeatureError> {
        let width = self.n_frames().max(1) as u32;
        let height = self.n_mels().max(1) as u32;
        let mut img = RgbImage::new(width, height);

        for (x, frame) in self.frames.iter().enumerate() {
            for (mel, &db) in frame.iter().enumerate() {
                let level = ((db as f64 + self.top_db) / self.top_db).clamp(0.0, 1.0);
                let y = height - 1 - mel as u32;
                img.put_pixel(x as u32, y, Rgb(colour(level)));
            }
        }

        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| FeatureError::ImageEncoding(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

/// Interpolate the palette at `level` in `[0, 1]`
fn colour(level: f64) -> [u8; 3] {
    let scaled = level * (PALETTE.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(PALETTE.len() - 1);
    let t = scaled - lo as f64;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let a = PALETTE[lo][c] as f64;
        let b = PALETTE[hi][c] as f64;
        out[c] = (a + (b - a) * t).round() as u8;
    }
    out
}

//! Storage Layer
//!
//! Read access to the bundled `normal` / `abnormal` recordings and scoped
//! temporary files for uploaded audio.

mod repository;
mod upload;

pub use repository::{DatasetKind, DatasetRepository};
pub use upload::TransientUpload;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Folder '{0}' not found")]
    FolderNotFound(String),
    #[error("Audio file '{0}' not found")]
    FileNotFound(String),
    #[error("Invalid file name: {0}")]
    InvalidName(String),
    #[error("Unknown dataset '{0}': expected 'normal' or 'abnormal'")]
    UnknownDataset(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

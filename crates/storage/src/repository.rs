//! Dataset Repository

use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// One of the two bundled recording folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Normal,
    Abnormal,
}

impl DatasetKind {
    /// Folder name under the dataset root
    pub fn dir_name(&self) -> &'static str {
        match self {
            DatasetKind::Normal => "normal",
            DatasetKind::Abnormal => "abnormal",
        }
    }
}

impl FromStr for DatasetKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(DatasetKind::Normal),
            "abnormal" => Ok(DatasetKind::Abnormal),
            _ => Err(StorageError::UnknownDataset(s.to_string())),
        }
    }
}

/// Repository over the dataset root
pub struct DatasetRepository {
    root: PathBuf,
}

impl DatasetRepository {
    /// Create a repository rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("Dataset repository at {}", root.display());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder(&self, kind: DatasetKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Sorted `.wav` file names in a folder.
    ///
    /// A missing folder is an error; an existing folder without recordings
    /// yields an empty list.
    pub fn list(&self, kind: DatasetKind) -> Result<Vec<String>, StorageError> {
        let folder = self.folder(kind);
        if !folder.is_dir() {
            warn!("Dataset folder missing: {}", folder.display());
            return Err(StorageError::FolderNotFound(kind.dir_name().to_string()));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&folder)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_wav_name(name) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();

        if files.is_empty() {
            warn!("No .wav files found in {}", folder.display());
        } else {
            debug!("Listed {} recordings in {}", files.len(), folder.display());
        }
        Ok(files)
    }

    /// Resolve a recording's path, rejecting names that would leave the folder
    pub fn resolve(&self, kind: DatasetKind, file: &str) -> Result<PathBuf, StorageError> {
        let single_component = matches!(
            Path::new(file).components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        );
        if !single_component || file.contains('/') || file.contains('\\') || !is_wav_name(file) {
            return Err(StorageError::InvalidName(file.to_string()));
        }

        let folder = self.folder(kind);
        if !folder.is_dir() {
            return Err(StorageError::FolderNotFound(kind.dir_name().to_string()));
        }

        let path = folder.join(file);
        if !path.is_file() {
            return Err(StorageError::FileNotFound(file.to_string()));
        }
        Ok(path)
    }

    /// Raw bytes of a recording
    pub fn read(&self, kind: DatasetKind, file: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(kind, file)?;
        Ok(std::fs::read(path)?)
    }
}

fn is_wav_name(name: &str) -> bool {
    name.len() > 4 && name.to_ascii_lowercase().ends_with(".wav")
}

//! Transient Upload Files

use crate::StorageError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Uploaded audio spooled to a temporary file.
///
/// The file is deleted when the guard is dropped, including on early
/// returns and unwinding.
pub struct TransientUpload {
    file: NamedTempFile,
}

impl TransientUpload {
    /// Write `bytes` to a fresh `.wav` file in `dir` (system temp dir when `None`)
    pub fn write(dir: Option<&Path>, bytes: &[u8]) -> Result<Self, StorageError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-").suffix(".wav");

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        debug!("Spooled {} upload bytes to {}", bytes.len(), file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for TransientUpload {
    fn drop(&mut self) {
        debug!("Removing transient upload {}", self.file.path().display());
    }
}

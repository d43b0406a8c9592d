//! Upload staging.
//!
//! Every uploaded file is written under `<temp_dir>/uploads` with a unique name before any
//! operation touches it. The [`UploadStage`] that wrote it owns it: once the stage is dropped,
//! after the response has been built or when the operation failed, all of its files are removed.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::Result;
use crate::core::naming::unique_stage_name;

/// One uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDescriptor {
    /// File name as sent by the client
    pub original_name: String,
    /// Where the content lives on disk
    pub staged_path: PathBuf,
    pub size: u64,
    /// Content type declared by the client, if any
    pub mime_type: Option<String>,
}

impl UploadDescriptor {
    /// Describe a file that already exists locally, without staging a copy.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let original_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            original_name,
            staged_path: path.to_path_buf(),
            size: metadata.len(),
            mime_type: None,
        })
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.staged_path).await?)
    }
}

/// Owner of the files staged for one request.
#[derive(Debug)]
pub struct UploadStage {
    dir: PathBuf,
    uploads: Vec<UploadDescriptor>,
}

impl UploadStage {
    /// Prepare a stage writing into `dir`, creating it if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            uploads: Vec::new(),
        })
    }

    /// Write `bytes` to a fresh staged file and record it.
    pub async fn stage(
        &mut self,
        original_name: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<UploadDescriptor> {
        let staged_path = self.dir.join(unique_stage_name(original_name));

        let descriptor = UploadDescriptor {
            original_name: original_name.to_string(),
            staged_path,
            size: bytes.len() as u64,
            mime_type: mime_type.map(str::to_string),
        };
        // Recorded before writing so a partial write is cleaned up too.
        self.uploads.push(descriptor.clone());

        fs::write(&descriptor.staged_path, bytes).await?;
        tracing::debug!(
            name = %descriptor.original_name,
            size = descriptor.size,
            path = %descriptor.staged_path.display(),
            "Staged upload"
        );

        Ok(descriptor)
    }

    pub fn uploads(&self) -> &[UploadDescriptor] {
        &self.uploads
    }
}

impl Drop for UploadStage {
    fn drop(&mut self) {
        for upload in &self.uploads {
            match std::fs::remove_file(&upload.staged_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %upload.staged_path.display(),
                    "Failed to remove staged upload: {}",
                    e
                ),
            }
        }
    }
}

//! The session state file
//!
//! Writes go to a uniquely named temp file next to the target, are synced,
//! then renamed over the target so readers only ever see a whole snapshot.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::StorageError;
use crate::Result;

pub const DEFAULT_STATE_FILE_NAME: &str = "_sessionState.json";

#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new<P: AsRef<Path>>(dir: P, file_name: &str) -> Self {
        Self {
            path: dir.as_ref().join(file_name),
        }
    }

    /// State file with the default name inside `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir, DEFAULT_STATE_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Read the whole file
    pub async fn read(&self) -> Result<Vec<u8>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::Missing(self.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file contents with `bytes`
    pub async fn write_atomic(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = write_and_rename(&temp_path, &self.path, bytes).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        path = %temp_path.display(),
                        "Failed to remove temp state file: {}",
                        cleanup
                    );
                }
            }
            return Err(e.into());
        }

        tracing::debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "Wrote state file"
        );

        Ok(())
    }

    /// Delete the file; a missing file is not an error
    pub async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.path
            .with_file_name(format!("{}.{}.tmp", file_name, Uuid::new_v4()))
    }
}

async fn write_and_rename(temp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(temp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(temp_path, path).await
}

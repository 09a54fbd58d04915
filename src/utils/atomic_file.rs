//! Write-then-rename file replacement
//!
//! Readers of a target path see either the old contents or the new ones,
//! never a partially written file. Temporary files live next to their target
//! so the final rename never crosses a filesystem.

use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A file written to its temporary path, waiting to be renamed into place
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    /// Write `content` to a temporary sibling of `target`
    pub async fn stage(target: &Path, content: &[u8]) -> io::Result<Self> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = temp_path_for(target);
        if let Err(e) = tokio::fs::write(&temp_path, content).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }
        Ok(Self {
            temp_path,
            target: target.to_path_buf(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically replace the target with the staged contents
    pub async fn commit(self) -> io::Result<PathBuf> {
        tokio::fs::rename(&self.temp_path, &self.target).await?;
        Ok(self.target)
    }

    /// Remove the temporary file without touching the target
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.temp_path).await {
            warn!(
                "Failed to remove temporary file {}: {}",
                self.temp_path.display(),
                e
            );
        }
    }
}

/// Replace `target` with `content` in one atomic step
pub async fn write_atomic(target: &Path, content: &[u8]) -> io::Result<()> {
    StagedFile::stage(target, content).await?.commit().await?;
    Ok(())
}

/// `dir/name.ext` -> `dir/.name.ext.tmp`
pub fn temp_path_for(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{file_name}.tmp"))
}

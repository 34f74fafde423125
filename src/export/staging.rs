//! Staging directory lifecycle
//!
//! The staging directory and the archive sit at fixed paths. They are removed
//! at the start of every archive export, never at the end, so leftovers from a
//! failed or interrupted run are cleaned up by the next attempt.

use crate::config::{ExportConfig, FileCollisionAction};
use crate::error::Result;
use crate::utils::{get_unique_path, remove_dir_idempotent, remove_file_idempotent};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fixed staging directory and archive paths for archive exports
#[derive(Clone, Debug)]
pub struct StagingArea {
    dir: PathBuf,
    archive: PathBuf,
}

impl StagingArea {
    /// Staging area at the configured fixed paths
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            dir: config.staging_dir(),
            archive: config.archive_path(),
        }
    }

    /// Staging directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Archive file path
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Delete any previous staging directory and archive, then create a fresh empty directory
    ///
    /// Missing paths are not an error.
    pub async fn reset(&self) -> Result<()> {
        debug!(dir = ?self.dir, archive = ?self.archive, "resetting staging area");
        remove_dir_idempotent(&self.dir).await?;
        remove_file_idempotent(&self.archive).await?;
        remove_file_idempotent(&partial_path(&self.archive)).await?;
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }
}

/// Local destination for a file named `file_name` inside `dir`
///
/// Returns `None` when the collision policy says to skip.
pub(crate) fn destination(
    dir: &Path,
    file_name: &str,
    action: FileCollisionAction,
) -> Result<Option<PathBuf>> {
    get_unique_path(&dir.join(file_name), action)
}

/// Sibling `.part` path a file is written to before being moved into place
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

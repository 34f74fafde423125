//! ZIP archive creation for staged images

use super::staging::partial_path;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const COPY_CHUNK: usize = 64 * 1024;

/// Packs a directory into a single archive file
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive the contents of `source_dir` into `dest`, returning the number of file entries
    ///
    /// Once `cancel` fires, implementations must stop writing, leave nothing
    /// at `dest` and return an error. The call must not return while work on
    /// `dest` is still in progress.
    async fn create(
        &self,
        source_dir: &Path,
        dest: &Path,
        cancel: CancellationToken,
    ) -> Result<usize>;
}

/// [`Archiver`] producing deflated ZIP files
///
/// Entries are stored with paths relative to the source directory, in sorted
/// order. The archive is written next to `dest` with a `.part` suffix and
/// renamed once complete, so `dest` either holds a whole archive or nothing.
/// Cancellation is checked between entries and between copied chunks.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZipArchiver;

#[async_trait]
impl Archiver for ZipArchiver {
    async fn create(
        &self,
        source_dir: &Path,
        dest: &Path,
        cancel: CancellationToken,
    ) -> Result<usize> {
        let source = source_dir.to_path_buf();
        let dest = dest.to_path_buf();
        spawn_blocking(move || write_zip(&source, &dest, &cancel))
            .await
            .map_err(|e| Error::Other(format!("archive task panicked: {e}")))?
    }
}

fn write_zip(source_dir: &Path, dest: &Path, cancel: &CancellationToken) -> Result<usize> {
    let partial = partial_path(dest);
    match write_entries(source_dir, &partial, cancel) {
        Ok(entries) => {
            std::fs::rename(&partial, dest)?;
            info!(?dest, entries, "archive created");
            Ok(entries)
        }
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&partial)
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                debug!(?partial, error = %cleanup, "failed to remove partial archive");
            }
            Err(e)
        }
    }
}

fn write_entries(source_dir: &Path, partial: &Path, cancel: &CancellationToken) -> Result<usize> {
    let files = collect_files(source_dir)?;
    let mut writer = ZipWriter::new(BufWriter::new(File::create(partial)?));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in &files {
        ensure_active(cancel)?;
        debug!(entry = %name, "adding archive entry");
        writer.start_file(name.as_str(), options)?;
        copy_entry(&mut File::open(path)?, &mut writer, cancel)?;
    }

    let mut out = writer.finish()?;
    out.flush()?;
    Ok(files.len())
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Other("archive creation cancelled".into()));
    }
    Ok(())
}

fn copy_entry(input: &mut File, out: &mut impl Write, cancel: &CancellationToken) -> Result<()> {
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        ensure_active(cancel)?;
        let n = input.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        out.write_all(&buf[..n])?;
    }
}

/// Regular files under `root` as (entry name, path), sorted by entry name
fn collect_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::Other(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((name, entry.into_path()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

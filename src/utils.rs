//! Utility functions for file naming and path manipulation

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Derive a local file name from an image URL
///
/// Takes the final path segment of the URL, ignoring any query string or
/// fragment, and percent-decodes it. Returns `None` when no usable name
/// exists: an empty last segment (`http://host/dir/`), or a decoded name that
/// would escape the target directory.
///
/// Strings that are not absolute URLs fall back to splitting on `/`.
///
/// # Examples
///
/// ```
/// use sales_export::utils::file_name_from_url;
///
/// assert_eq!(file_name_from_url("http://x/a.jpg").as_deref(), Some("a.jpg"));
/// assert_eq!(file_name_from_url("http://x/img/a%20b.jpg?v=2").as_deref(), Some("a b.jpg"));
/// assert_eq!(file_name_from_url("http://x/img/"), None);
/// ```
pub fn file_name_from_url(url: &str) -> Option<String> {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => {
            let without_suffix = url.split(['?', '#']).next().unwrap_or_default();
            without_suffix.rsplit('/').next().map(str::to_string)
        }
    }?;

    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);
    let name = decoded.trim();

    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return None;
    }
    Some(name.to_string())
}

/// Get a unique path for a file, handling collisions according to the specified action
///
/// # Returns
///
/// - `Rename`: the original path if free, otherwise `name (1).ext`, `name (2).ext`, ...
/// - `Overwrite`: the original path unchanged
/// - `Skip`: `None` if the file already exists
///
/// # Examples
///
/// ```
/// use sales_export::utils::get_unique_path;
/// use sales_export::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/sales-export-doc-example/a.jpg");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If a.jpg exists, returns "a (1).jpg"; if that exists too, "a (2).jpg", etc.
/// assert!(unique.is_some());
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<Option<PathBuf>> {
    match action {
        FileCollisionAction::Overwrite => Ok(Some(path.to_path_buf())),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Ok(None);
            }
            Ok(Some(path.to_path_buf()))
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(Some(path.to_path_buf()));
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
                Error::Other(format!("cannot extract file stem from {}", path.display()))
            })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent().ok_or_else(|| {
                Error::Other(format!(
                    "cannot extract parent directory from {}",
                    path.display()
                ))
            })?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(Some(new_path));
                }
            }

            Err(Error::Other(format!(
                "could not find a unique file name for {} after {} attempts",
                path.display(),
                MAX_RENAME_ATTEMPTS
            )))
        }
    }
}

/// Remove a file, treating a missing file as success
pub async fn remove_file_idempotent(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Remove a directory tree, treating a missing directory as success
pub async fn remove_dir_idempotent(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

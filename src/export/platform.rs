//! Platform facilities the export pipeline hands results to
//!
//! The share sheet and the media gallery are host facilities. They sit behind
//! [`ShareTarget`] and [`Gallery`] so the pipeline can run against a desktop
//! command, a plain directory or a test double.

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use crate::utils::get_unique_path;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hands a finished archive to the user
#[async_trait]
pub trait ShareTarget: Send + Sync {
    /// Offer the file at `path` to the user
    async fn share(&self, path: &Path) -> Result<()>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Answer to a storage/media permission request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// Access granted
    Granted,
    /// Access refused
    Denied,
}

/// The device media library
#[async_trait]
pub trait Gallery: Send + Sync {
    /// Ask for permission to write media
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Register a downloaded file as a media asset, returning where it now lives
    async fn persist(&self, file: &Path) -> Result<PathBuf>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Share target for hosts with no sharing facility
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableShare;

#[async_trait]
impl ShareTarget for UnavailableShare {
    async fn share(&self, path: &Path) -> Result<()> {
        Err(Error::NotSupported(format!(
            "sharing is not available on this host ({})",
            path.display()
        )))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Share target that runs an external program with the archive path as its last argument
///
/// A non-zero exit status, a spawn failure or running past `timeout` all fail
/// the share.
#[derive(Clone, Debug)]
pub struct CommandShare {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandShare {
    /// Run `program` with no extra arguments and a 30 second limit
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Arguments placed before the archive path
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Time limit for the program
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ShareTarget for CommandShare {
    async fn share(&self, path: &Path) -> Result<()> {
        debug!(program = ?self.program, ?path, "running share command");
        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.program)
                .args(&self.args)
                .arg(path)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                info!(program = ?self.program, ?path, "archive shared");
                Ok(())
            }
            Ok(Ok(output)) => {
                let code = output.status.code();
                warn!(program = ?self.program, ?code, "share command failed");
                Err(Error::Other(format!(
                    "share command exited with {}",
                    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
                )))
            }
            Ok(Err(e)) => {
                warn!(program = ?self.program, error = %e, "failed to run share command");
                Err(e.into())
            }
            Err(_) => {
                warn!(program = ?self.program, timeout = ?self.timeout, "share command timed out");
                Err(Error::Timeout {
                    operation: "share".into(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }

    fn name(&self) -> &str {
        "command"
    }
}

/// How a [`DirectoryGallery`] answers permission requests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionPolicy {
    /// Always grant
    #[default]
    Grant,
    /// Always deny
    Deny,
}

/// Gallery backed by a plain directory
///
/// Persisting copies the file into `root`; name clashes get a numbered suffix.
#[derive(Clone, Debug)]
pub struct DirectoryGallery {
    root: PathBuf,
    policy: PermissionPolicy,
}

impl DirectoryGallery {
    /// Gallery writing into `root`, granting permission
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: PermissionPolicy::Grant,
        }
    }

    /// Set how permission requests are answered
    pub fn with_policy(mut self, policy: PermissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Directory media is copied into
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Gallery for DirectoryGallery {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(match self.policy {
            PermissionPolicy::Grant => PermissionStatus::Granted,
            PermissionPolicy::Deny => PermissionStatus::Denied,
        })
    }

    async fn persist(&self, file: &Path) -> Result<PathBuf> {
        let name = file
            .file_name()
            .ok_or_else(|| Error::Other(format!("{} has no file name", file.display())))?;
        tokio::fs::create_dir_all(&self.root).await?;
        let target = get_unique_path(&self.root.join(name), FileCollisionAction::Rename)?
            .ok_or_else(|| Error::Other(format!("no free name for {}", file.display())))?;
        tokio::fs::copy(file, &target).await?;
        debug!(source = ?file, ?target, "saved to gallery");
        Ok(target)
    }

    fn name(&self) -> &str {
        "directory"
    }
}

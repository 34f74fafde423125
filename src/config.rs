//! Configuration types for sales-export

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Record service configuration (base URL, request limits)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the sales service (default: "http://192.168.3.7:4000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for record and sign-in requests (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Lifetime of a signed-in session (None = until sign-out)
    #[serde(default, with = "optional_duration_serde")]
    pub session_ttl: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            session_ttl: None,
        }
    }
}

impl ServiceConfig {
    /// Build a URL below the configured base
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Export behavior configuration (paths, time limits, collisions)
///
/// The staging directory and the archive live at fixed names inside
/// `document_dir`; every archive export reuses (and overwrites) them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// App-private document directory (default: "./documents")
    #[serde(default = "default_document_dir")]
    pub document_dir: PathBuf,

    /// Staging directory name below `document_dir` (default: "selected_images")
    #[serde(default = "default_staging_dir_name")]
    pub staging_dir_name: String,

    /// Archive file name below `document_dir` (default: "selected_images.zip")
    #[serde(default = "default_archive_name")]
    pub archive_name: String,

    /// Time limit for one image download (default: 60 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// Time limit for archive creation (default: 300 seconds)
    #[serde(default = "default_archive_timeout", with = "duration_serde")]
    pub archive_timeout: Duration,

    /// What to do when two selected images map to the same local file name
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// Clear the selection after a successful export (default: true)
    #[serde(default = "default_true")]
    pub clear_selection_on_success: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            document_dir: default_document_dir(),
            staging_dir_name: default_staging_dir_name(),
            archive_name: default_archive_name(),
            download_timeout: default_download_timeout(),
            archive_timeout: default_archive_timeout(),
            file_collision: FileCollisionAction::default(),
            clear_selection_on_success: true,
        }
    }
}

impl ExportConfig {
    /// Fixed staging directory path
    pub fn staging_dir(&self) -> PathBuf {
        self.document_dir.join(&self.staging_dir_name)
    }

    /// Fixed archive path
    pub fn archive_path(&self) -> PathBuf {
        self.document_dir.join(&self.archive_name)
    }
}

/// File collision handling
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to the file name
    #[default]
    Rename,
    /// Overwrite the existing file
    Overwrite,
    /// Skip the image
    Skip,
}

/// Filter engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterConfig {
    /// chrono format used to render record dates for matching (default: "%-d/%-m/%Y")
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Offset from UTC applied before rendering dates, in minutes (default: 0)
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            utc_offset_minutes: 0,
        }
    }
}

/// Selection tracker configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Drop selected images that are no longer visible when the filter changes (default: false)
    #[serde(default)]
    pub prune_on_filter_change: bool,
}

/// Main configuration
///
/// Fields are organized into sub-configs:
/// - [`service`](ServiceConfig) - record service endpoint and request limits
/// - [`export`](ExportConfig) - staging paths, time limits, collision policy
/// - [`filter`](FilterConfig) - date rendering for the date criterion
/// - [`selection`](SelectionConfig) - selection maintenance
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Record service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Export pipeline settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Filter engine settings
    #[serde(default)]
    pub filter: FilterConfig,

    /// Selection tracker settings
    #[serde(default)]
    pub selection: SelectionConfig,
}

impl Config {
    /// Check settings that would make exports misbehave
    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(Error::config("base_url", "must not be empty"));
        }
        if url::Url::parse(&self.service.base_url).is_err() {
            return Err(Error::config(
                "base_url",
                format!("not a valid URL: {}", self.service.base_url),
            ));
        }
        validate_file_name("staging_dir_name", &self.export.staging_dir_name)?;
        validate_file_name("archive_name", &self.export.archive_name)?;
        if self.export.staging_dir_name == self.export.archive_name {
            return Err(Error::config(
                "archive_name",
                "must differ from staging_dir_name",
            ));
        }
        for (key, value) in [
            ("request_timeout", self.service.request_timeout),
            ("download_timeout", self.export.download_timeout),
            ("archive_timeout", self.export.archive_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::config(key, "must be greater than zero"));
            }
        }
        if self.filter.date_format.is_empty() {
            return Err(Error::config("date_format", "must not be empty"));
        }
        Ok(())
    }
}

fn validate_file_name(key: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::config(key, "must not be empty"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(Error::config(
            key,
            format!("must be a plain file name, got {name:?}"),
        ));
    }
    Ok(())
}

fn default_base_url() -> String {
    "http://192.168.3.7:4000".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_document_dir() -> PathBuf {
    PathBuf::from("./documents")
}

fn default_staging_dir_name() -> String {
    "selected_images".to_string()
}

fn default_archive_name() -> String {
    "selected_images.zip".to_string()
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_archive_timeout() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_date_format() -> String {
    "%-d/%-m/%Y".to_string()
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

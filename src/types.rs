//! Core types for sales-export

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// One delivery-order line as returned by the record service
///
/// Records are immutable once fetched. Field names follow the service's JSON keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// Delivery order number
    #[serde(rename = "DONo")]
    pub order_no: String,

    /// Sales/sub-order number
    #[serde(rename = "SPONo", default)]
    pub sub_order_no: Option<String>,

    /// Customer number
    #[serde(rename = "CustNo")]
    pub customer_no: String,

    /// Date of record (absent when the service sends no usable date)
    #[serde(rename = "DPDate", default, with = "record_date")]
    pub recorded_at: Option<DateTime<Utc>>,

    /// Remote image URL (absent when the service sends null or an empty string)
    #[serde(
        rename = "URL_FILE",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub image_url: Option<String>,
}

impl SalesRecord {
    /// The image reference used for selection, if any
    pub fn image_ref(&self) -> Option<&str> {
        self.image_url.as_deref()
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

// DPDate arrives either as RFC 3339 or as a naive SQL-style timestamp (treated as UTC).
// Null, missing and unparseable values load as `None` instead of failing the whole list.
mod record_date {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use tracing::warn;

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };
        let parsed = value.as_str().and_then(parse);
        if parsed.is_none() {
            warn!(raw = %value, "unusable DPDate, record loaded without a date");
        }
        Ok(parsed)
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

/// Which export variant to run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Bundle the selected images into one archive and hand it to the share facility
    Archive,
    /// Save each selected image to the device gallery
    Gallery,
}

impl std::fmt::Display for ExportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportMode::Archive => write!(f, "archive"),
            ExportMode::Gallery => write!(f, "gallery"),
        }
    }
}

/// Export pipeline stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    /// No export running
    Idle,
    /// Checking the selection (and permission for gallery exports)
    Validating,
    /// Resetting the staging directory and previous archive
    Staging,
    /// Fetching selected images one at a time
    Downloading,
    /// Compressing the staging directory
    Archiving,
    /// Sharing the archive or reporting gallery results
    Finalizing,
    /// Export finished successfully
    Success,
    /// Export failed
    Failed,
}

impl ExportStage {
    /// Whether this stage ends an export attempt
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStage::Success | ExportStage::Failed)
    }
}

/// Outcome of a successful export
///
/// Counts always satisfy `staged + failed + skipped == requested`.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    /// Which variant ran
    pub mode: ExportMode,
    /// Number of image references in the selection
    pub requested: usize,
    /// Images that downloaded with status 200 (and were persisted, for gallery exports)
    pub staged: usize,
    /// Images whose download did not end in a 200 response, timeouts included
    pub failed: usize,
    /// Images skipped because no file name could be derived from the URL, or
    /// because the file already existed under the `skip` collision policy
    pub skipped: usize,
    /// Local files produced, in download order
    pub files: Vec<PathBuf>,
    /// Archive handed to the share facility (archive exports only)
    pub artifact: Option<PathBuf>,
}

impl ExportReport {
    /// Whether every requested image made it through
    pub fn is_complete(&self) -> bool {
        self.staged == self.requested
    }
}

/// A user-facing outcome message (title + body)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Short title
    pub title: String,
    /// Message body
    pub message: String,
}

impl Alert {
    /// Create a new alert
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// The alert shown after a successful export
    pub fn for_report(report: &ExportReport) -> Self {
        let mut message = match report.mode {
            ExportMode::Archive => String::from("ZIP file created and shared."),
            ExportMode::Gallery => String::from("Images saved to gallery."),
        };
        if !report.is_complete() {
            message.push_str(&format!(
                " {} of {} images exported",
                report.staged, report.requested
            ));
            if report.failed > 0 {
                message.push_str(&format!(", {} failed", report.failed));
            }
            if report.skipped > 0 {
                message.push_str(&format!(", {} skipped", report.skipped));
            }
            message.push('.');
        }
        Alert::new("Success", message)
    }
}

/// Event emitted during an export
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Pipeline entered a new stage
    StageChanged {
        /// Export variant
        mode: ExportMode,
        /// The stage just entered
        stage: ExportStage,
    },

    /// One image was downloaded (and persisted, for gallery exports)
    ItemStaged {
        /// Source URL
        url: String,
        /// Local file path
        path: PathBuf,
    },

    /// One image was skipped because no file name could be derived
    ItemSkipped {
        /// Source URL
        url: String,
    },

    /// One image failed to download or persist
    ItemFailed {
        /// Source URL
        url: String,
        /// HTTP status, when the server answered
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        /// Error description
        error: String,
    },

    /// Export finished successfully
    Completed {
        /// Final report
        report: ExportReport,
    },

    /// Export failed
    Failed {
        /// Export variant
        mode: ExportMode,
        /// Machine-readable error code
        code: String,
        /// Error description
        error: String,
    },
}

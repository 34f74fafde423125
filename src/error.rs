//! Error types for sales-export
//!
//! This module provides error handling for the library, including:
//! - The crate-wide [`Error`] type with conversions from I/O, HTTP, JSON and ZIP errors
//! - The export outcome taxonomy ([`ExportError`]) recovered at the export boundary
//! - Machine-readable error codes and fixed user-facing alerts

use crate::types::{Alert, ExportMode};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sales-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type returned at the export boundary
pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Main error type for sales-export
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "archive_name")
        key: Option<String>,
    },

    /// Export pipeline outcome other than success
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// No valid session is available for a call that requires one
    #[error("not signed in: {0}")]
    Unauthenticated(String),

    /// Sign-in was rejected by the service
    #[error("sign-in rejected: {0}")]
    SignInRejected(String),

    /// The record service answered with a non-success status
    #[error("record service returned HTTP {status} for {url}")]
    Service {
        /// HTTP status code returned by the service
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// ZIP archive creation failed
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An operation exceeded its configured time limit
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// What was being waited on (e.g. "download", "archive")
        operation: String,
        /// The limit that was exceeded, in seconds
        seconds: u64,
    },

    /// Operation not supported by the configured platform facility
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Terminal export failures
///
/// Every variant ends the current export attempt. They are recovered at the
/// export boundary ([`crate::browser::SalesBrowser`]) and turned into one alert;
/// none of them propagate further.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Export was requested with nothing selected
    #[error("no images selected")]
    EmptySelection,

    /// Storage/media permission was refused
    #[error("storage permission denied")]
    PermissionDenied,

    /// Every download in the batch failed or was skipped
    #[error("none of the {requested} selected images could be downloaded")]
    NoFilesStaged {
        /// Number of image references in the selection
        requested: usize,
    },

    /// The archive was missing right before hand-off to the share facility
    #[error("archive {path} is not available for sharing")]
    ShareUnavailable {
        /// The fixed archive path that was checked
        path: PathBuf,
    },

    /// Another export is still running
    #[error("an export is already in progress")]
    ExportInProgress,

    /// Any other failure during staging, downloading, archiving or hand-off
    #[error("{mode} export failed: {reason}")]
    ExportFailed {
        /// Which export variant failed
        mode: ExportMode,
        /// The underlying failure
        reason: String,
    },
}

impl ExportError {
    /// Wrap an unexpected failure as a generic export failure
    pub fn failed(mode: ExportMode, error: impl std::fmt::Display) -> Self {
        ExportError::ExportFailed {
            mode,
            reason: error.to_string(),
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::EmptySelection => "empty_selection",
            ExportError::PermissionDenied => "permission_denied",
            ExportError::NoFilesStaged { .. } => "no_files_staged",
            ExportError::ShareUnavailable { .. } => "share_unavailable",
            ExportError::ExportInProgress => "export_in_progress",
            ExportError::ExportFailed { .. } => "export_failed",
        }
    }

    /// The fixed user-facing alert for this outcome
    pub fn alert(&self) -> Alert {
        match self {
            ExportError::EmptySelection => {
                Alert::new("No selection", "Please select at least one image.")
            }
            ExportError::PermissionDenied => Alert::new(
                "Permission required",
                "Please allow access to save files.",
            ),
            ExportError::NoFilesStaged { .. } => {
                Alert::new("Error", "No files were downloaded successfully.")
            }
            ExportError::ShareUnavailable { .. } => {
                Alert::new("Error", "Failed to create ZIP file.")
            }
            ExportError::ExportInProgress => Alert::new(
                "Export in progress",
                "Please wait for the current export to finish.",
            ),
            ExportError::ExportFailed { mode, .. } => match mode {
                ExportMode::Archive => Alert::new("Error", "Failed to create ZIP file."),
                ExportMode::Gallery => Alert::new("Error", "Failed to save images."),
            },
        }
    }
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Export(e) => e.error_code(),
            Error::Unauthenticated(_) => "unauthenticated",
            Error::SignInRejected(_) => "sign_in_rejected",
            Error::Service { .. } => "service_error",
            Error::NotFound(_) => "not_found",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Archive(_) => "archive_error",
            Error::Timeout { .. } => "timeout",
            Error::NotSupported(_) => "not_supported",
            Error::Other(_) => "internal_error",
        }
    }

    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

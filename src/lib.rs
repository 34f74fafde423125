//! # sales-export
//!
//! Browse delivery-order records from the sales service, pick their product
//! images and export them, either as one shared ZIP archive or straight into
//! a media gallery.
//!
//! ## Overview
//!
//! - **Records** are fetched in full from the service and filtered
//!   client-side by order number, displayed date and customer number
//! - **Selection** is an ordered set of image URLs; "select all" is derived
//!   from the visible records
//! - **Export** runs one pipeline at a time and reports every outcome as a
//!   single alert; progress is published as events
//!
//! ## Quick Start
//!
//! ```no_run
//! use sales_export::{AuthService, Config, SalesBrowser};
//! use sales_export::export::{CommandShare, DirectoryGallery};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let session = AuthService::new(config.service.clone())?
//!         .sign_in("user-1", "emp-42")
//!         .await?;
//!
//!     let mut browser = SalesBrowser::from_config(
//!         &config,
//!         session,
//!         Arc::new(CommandShare::new("xdg-open")),
//!         Arc::new(DirectoryGallery::new("./Pictures")),
//!     )?;
//!
//!     let mut events = browser.pipeline().subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     browser.load().await?;
//!     browser.toggle_select_all();
//!     let alert = browser.save_as_zip().await;
//!     println!("{}: {}", alert.title, alert.message);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Record browsing and the export trigger
pub mod browser;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export pipeline (staging, downloads, archiving, platform hand-off)
pub mod export;
/// Client-side record filtering
pub mod filter;
/// Sales record service client
pub mod records;
/// Image selection tracking
pub mod selection;
/// Sessions and sign-in
pub mod session;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use browser::SalesBrowser;
pub use config::{Config, ExportConfig, FileCollisionAction, ServiceConfig};
pub use error::{Error, ExportError, ExportResult, Result};
pub use export::ExportPipeline;
pub use filter::{FilterCriteria, FilterEngine};
pub use records::{HttpRecordStore, RecordStore};
pub use selection::SelectionTracker;
pub use session::{AuthService, Session};
pub use types::{Alert, Event, ExportMode, ExportReport, ExportStage, SalesRecord};

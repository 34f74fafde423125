//! Export pipeline for selected images
//!
//! An export walks a fixed sequence of stages:
//! `Idle → Validating → Staging → Downloading → Archiving → Finalizing → {Success, Failed} → Idle`.
//! The gallery variant skips `Archiving`. Submodules provide the facilities
//! each stage relies on:
//! - [`staging`] - fixed staging directory and archive paths
//! - [`fetch`] - image downloads ([`Fetcher`])
//! - [`archive`] - ZIP creation ([`Archiver`])
//! - [`platform`] - share sheet and media gallery seams

pub mod archive;
pub mod fetch;
pub mod platform;
pub mod staging;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use archive::{Archiver, ZipArchiver};
pub use fetch::{FetchOutcome, Fetcher, HttpFetcher};
pub use platform::{
    CommandShare, DirectoryGallery, Gallery, PermissionPolicy, PermissionStatus, ShareTarget,
    UnavailableShare,
};
pub use staging::StagingArea;

use crate::config::{ExportConfig, FileCollisionAction};
use crate::error::{Error, ExportError, ExportResult, Result};
use crate::types::{Event, ExportMode, ExportReport, ExportStage};
use crate::utils::{file_name_from_url, remove_file_idempotent};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Releases the single-flight flag and returns the stage to idle when dropped
struct FlightGuard {
    busy: Arc<AtomicBool>,
    stage: Arc<watch::Sender<ExportStage>>,
}

impl FlightGuard {
    fn acquire(busy: &Arc<AtomicBool>, stage: &Arc<watch::Sender<ExportStage>>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                busy: busy.clone(),
                stage: stage.clone(),
            })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.stage.send_replace(ExportStage::Idle);
        self.busy.store(false, Ordering::Release);
    }
}

/// Runs exports of selected image references (cloneable - all fields are Arc-wrapped)
///
/// At most one export runs at a time; a second start while one is in flight
/// is rejected with [`ExportError::ExportInProgress`].
#[derive(Clone)]
pub struct ExportPipeline {
    /// Export paths, limits and collision policy
    pub(crate) config: Arc<ExportConfig>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    staging: StagingArea,
    fetcher: Arc<dyn Fetcher>,
    archiver: Arc<dyn Archiver>,
    share: Arc<dyn ShareTarget>,
    gallery: Arc<dyn Gallery>,
    busy: Arc<AtomicBool>,
    stage: Arc<watch::Sender<ExportStage>>,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("config", &self.config)
            .field("share", &self.share.name())
            .field("gallery", &self.gallery.name())
            .field("busy", &self.is_busy())
            .field("stage", &self.stage())
            .finish_non_exhaustive()
    }
}

impl ExportPipeline {
    /// Create a pipeline from explicit facilities
    pub fn new(
        config: ExportConfig,
        fetcher: Arc<dyn Fetcher>,
        archiver: Arc<dyn Archiver>,
        share: Arc<dyn ShareTarget>,
        gallery: Arc<dyn Gallery>,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        let (stage, _stage_rx) = watch::channel(ExportStage::Idle);
        Self {
            staging: StagingArea::new(&config),
            config: Arc::new(config),
            event_tx,
            fetcher,
            archiver,
            share,
            gallery,
            busy: Arc::new(AtomicBool::new(false)),
            stage: Arc::new(stage),
        }
    }

    /// Create a pipeline that downloads over HTTP and writes ZIP archives
    pub fn with_http(
        config: ExportConfig,
        share: Arc<dyn ShareTarget>,
        gallery: Arc<dyn Gallery>,
    ) -> Self {
        Self::new(
            config,
            Arc::new(HttpFetcher::new()),
            Arc::new(ZipArchiver),
            share,
            gallery,
        )
    }

    /// Subscribe to export events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current stage
    pub fn stage(&self) -> ExportStage {
        *self.stage.borrow()
    }

    /// Watch stage changes
    pub fn watch_stage(&self) -> watch::Receiver<ExportStage> {
        self.stage.subscribe()
    }

    /// Whether an export is currently running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Fixed staging directory and archive paths
    pub fn staging_area(&self) -> &StagingArea {
        &self.staging
    }

    /// Download the selected images and share them as one ZIP archive
    pub async fn export_archive(&self, selection: &[String]) -> ExportResult<ExportReport> {
        self.export(ExportMode::Archive, selection).await
    }

    /// Download the selected images and save each one to the gallery
    pub async fn export_to_gallery(&self, selection: &[String]) -> ExportResult<ExportReport> {
        self.export(ExportMode::Gallery, selection).await
    }

    /// Run one export of `selection`, in order
    ///
    /// Per-item download failures are counted in the report, not returned.
    /// The export fails only with one of the [`ExportError`] kinds.
    pub async fn export(
        &self,
        mode: ExportMode,
        selection: &[String],
    ) -> ExportResult<ExportReport> {
        let Some(_guard) = FlightGuard::acquire(&self.busy, &self.stage) else {
            warn!(%mode, "export rejected, another export is running");
            return Err(ExportError::ExportInProgress);
        };

        info!(%mode, requested = selection.len(), "starting export");
        let result = self.run(mode, selection).await;

        match &result {
            Ok(report) => {
                self.set_stage(mode, ExportStage::Success);
                info!(
                    %mode,
                    requested = report.requested,
                    staged = report.staged,
                    failed = report.failed,
                    skipped = report.skipped,
                    artifact = ?report.artifact,
                    "export complete"
                );
                self.event_tx
                    .send(Event::Completed {
                        report: report.clone(),
                    })
                    .ok();
            }
            Err(e) => {
                self.set_stage(mode, ExportStage::Failed);
                match e {
                    ExportError::EmptySelection | ExportError::PermissionDenied => {
                        warn!(%mode, code = e.error_code(), "export refused: {}", e)
                    }
                    _ => error!(%mode, code = e.error_code(), error = %e, "export failed"),
                }
                self.event_tx
                    .send(Event::Failed {
                        mode,
                        code: e.error_code().to_string(),
                        error: e.to_string(),
                    })
                    .ok();
            }
        }

        self.set_stage(mode, ExportStage::Idle);
        result
    }

    async fn run(&self, mode: ExportMode, selection: &[String]) -> ExportResult<ExportReport> {
        let fail = |e: Error| match e {
            Error::Export(inner) => inner,
            other => ExportError::failed(mode, other),
        };

        self.set_stage(mode, ExportStage::Validating);
        if selection.is_empty() {
            return Err(ExportError::EmptySelection);
        }
        if mode == ExportMode::Gallery {
            let status = self.gallery.request_permission().await.map_err(fail)?;
            if status == PermissionStatus::Denied {
                return Err(ExportError::PermissionDenied);
            }
        }

        self.set_stage(mode, ExportStage::Staging);
        let (target_dir, collision) = match mode {
            ExportMode::Archive => {
                self.staging.reset().await.map_err(fail)?;
                (self.staging.dir().to_path_buf(), self.config.file_collision)
            }
            ExportMode::Gallery => {
                tokio::fs::create_dir_all(&self.config.document_dir)
                    .await
                    .map_err(|e| fail(e.into()))?;
                (
                    self.config.document_dir.clone(),
                    FileCollisionAction::Overwrite,
                )
            }
        };

        self.set_stage(mode, ExportStage::Downloading);
        let mut report = ExportReport {
            mode,
            requested: selection.len(),
            staged: 0,
            failed: 0,
            skipped: 0,
            files: Vec::new(),
            artifact: None,
        };
        for url in selection {
            self.download_one(mode, url, &target_dir, collision, &mut report)
                .await
                .map_err(fail)?;
        }

        if report.staged == 0 {
            if mode == ExportMode::Archive {
                self.set_stage(mode, ExportStage::Archiving);
            }
            return Err(ExportError::NoFilesStaged {
                requested: report.requested,
            });
        }

        if mode == ExportMode::Gallery {
            self.set_stage(mode, ExportStage::Finalizing);
            return Ok(report);
        }

        self.set_stage(mode, ExportStage::Archiving);
        let archive = self.staging.archive().to_path_buf();
        let entries = self.create_archive(&archive).await.map_err(fail)?;
        if entries != report.staged {
            warn!(
                entries,
                staged = report.staged,
                "archive entry count differs from staged files"
            );
        }

        self.set_stage(mode, ExportStage::Finalizing);
        if !tokio::fs::try_exists(&archive).await.unwrap_or(false) {
            return Err(ExportError::ShareUnavailable { path: archive });
        }
        debug!(share = self.share.name(), ?archive, "handing archive to share target");
        self.share.share(&archive).await.map_err(fail)?;
        report.artifact = Some(archive);
        Ok(report)
    }

    /// Download one reference into `dir`, updating `report`
    ///
    /// Only local failures (creating or persisting files) are returned as
    /// errors; network failures and non-200 statuses are counted.
    async fn download_one(
        &self,
        mode: ExportMode,
        url: &str,
        dir: &Path,
        collision: FileCollisionAction,
        report: &mut ExportReport,
    ) -> Result<()> {
        let Some(name) = file_name_from_url(url) else {
            debug!(%url, "no file name in image reference, skipping");
            self.skip(url, report);
            return Ok(());
        };
        let Some(dest) = staging::destination(dir, &name, collision)? else {
            debug!(%url, %name, "file already exists, skipping");
            self.skip(url, report);
            return Ok(());
        };

        // Downloads land next to `dest` and replace it only on success
        let partial = staging::partial_path(&dest);
        let outcome = match self.fetch_with_timeout(url, &partial).await {
            Ok(outcome) => outcome,
            Err(Error::Io(e)) => {
                remove_file_idempotent(&partial).await.ok();
                return Err(Error::Io(e));
            }
            Err(e) => {
                self.record_failure(url, &partial, None, e.to_string(), report)
                    .await;
                return Ok(());
            }
        };
        if !outcome.is_success() {
            self.record_failure(
                url,
                &partial,
                Some(outcome.status),
                format!("HTTP {}", outcome.status),
                report,
            )
            .await;
            return Ok(());
        }
        if let Err(e) = tokio::fs::rename(&outcome.path, &dest).await {
            remove_file_idempotent(&outcome.path).await.ok();
            return Err(e.into());
        }

        let path = match mode {
            ExportMode::Archive => dest,
            ExportMode::Gallery => self.gallery.persist(&dest).await?,
        };
        debug!(%url, ?path, "image staged");
        report.staged += 1;
        report.files.push(path.clone());
        self.event_tx
            .send(Event::ItemStaged {
                url: url.to_string(),
                path,
            })
            .ok();
        Ok(())
    }

    async fn fetch_with_timeout(&self, url: &str, dest: &Path) -> Result<FetchOutcome> {
        let limit = self.config.download_timeout;
        tokio::time::timeout(limit, self.fetcher.fetch(url, dest))
            .await
            .map_err(|_| Error::Timeout {
                operation: "download".into(),
                seconds: limit.as_secs(),
            })?
    }

    /// Build the archive within `archive_timeout`
    ///
    /// On timeout the archiver is cancelled and awaited, so the export does
    /// not end while anything still writes to the archive path.
    async fn create_archive(&self, archive: &Path) -> Result<usize> {
        let limit = self.config.archive_timeout;
        let cancel = CancellationToken::new();
        let task = self
            .archiver
            .create(self.staging.dir(), archive, cancel.clone());
        tokio::pin!(task);

        match tokio::time::timeout(limit, &mut task).await {
            Ok(result) => result,
            Err(_) => {
                warn!(seconds = limit.as_secs(), "archive timed out, cancelling");
                cancel.cancel();
                match task.await {
                    Ok(entries) => {
                        debug!(entries, "archive finished after cancellation, discarding");
                        remove_file_idempotent(archive).await?;
                    }
                    Err(e) => debug!(error = %e, "archive task stopped"),
                }
                Err(Error::Timeout {
                    operation: "archive".into(),
                    seconds: limit.as_secs(),
                })
            }
        }
    }

    fn skip(&self, url: &str, report: &mut ExportReport) {
        report.skipped += 1;
        self.event_tx
            .send(Event::ItemSkipped {
                url: url.to_string(),
            })
            .ok();
    }

    async fn record_failure(
        &self,
        url: &str,
        partial: &Path,
        status: Option<u16>,
        error: String,
        report: &mut ExportReport,
    ) {
        warn!(%url, ?status, %error, "image download failed");
        if let Err(e) = remove_file_idempotent(partial).await {
            debug!(?partial, error = %e, "failed to remove partial download");
        }
        report.failed += 1;
        self.event_tx
            .send(Event::ItemFailed {
                url: url.to_string(),
                status,
                error,
            })
            .ok();
    }

    fn set_stage(&self, mode: ExportMode, stage: ExportStage) {
        debug!(%mode, ?stage, "export stage");
        self.stage.send_replace(stage);
        self.event_tx.send(Event::StageChanged { mode, stage }).ok();
    }
}

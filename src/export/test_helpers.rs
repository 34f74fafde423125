//! Shared fakes and builders for export pipeline tests.

use super::{
    Archiver, ExportPipeline, FetchOutcome, Fetcher, Gallery, PermissionStatus, ShareTarget,
    ZipArchiver,
};
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Share target that records every path it is given
#[derive(Default)]
pub(crate) struct RecordingShare {
    pub(crate) shared: Mutex<Vec<PathBuf>>,
    pub(crate) fail: bool,
}

impl RecordingShare {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<PathBuf> {
        self.shared.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShareTarget for RecordingShare {
    async fn share(&self, path: &Path) -> Result<()> {
        self.shared.lock().unwrap().push(path.to_path_buf());
        if self.fail {
            return Err(Error::Other("share sheet dismissed".into()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Gallery that answers with a fixed permission and records persisted files
pub(crate) struct RecordingGallery {
    pub(crate) status: PermissionStatus,
    pub(crate) persisted: Mutex<Vec<PathBuf>>,
    pub(crate) permission_requests: Mutex<usize>,
    pub(crate) fail_persist: bool,
}

impl RecordingGallery {
    pub(crate) fn granting() -> Self {
        Self::with_status(PermissionStatus::Granted)
    }

    pub(crate) fn denying() -> Self {
        Self::with_status(PermissionStatus::Denied)
    }

    pub(crate) fn failing_persist() -> Self {
        Self {
            fail_persist: true,
            ..Self::granting()
        }
    }

    fn with_status(status: PermissionStatus) -> Self {
        Self {
            status,
            persisted: Mutex::new(Vec::new()),
            permission_requests: Mutex::new(0),
            fail_persist: false,
        }
    }

    pub(crate) fn persisted(&self) -> Vec<PathBuf> {
        self.persisted.lock().unwrap().clone()
    }

    pub(crate) fn permission_requests(&self) -> usize {
        *self.permission_requests.lock().unwrap()
    }
}

#[async_trait]
impl Gallery for RecordingGallery {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        *self.permission_requests.lock().unwrap() += 1;
        Ok(self.status)
    }

    async fn persist(&self, file: &Path) -> Result<PathBuf> {
        if self.fail_persist {
            return Err(Error::Other("media store unavailable".into()));
        }
        assert!(file.exists(), "persist called for missing file {file:?}");
        self.persisted.lock().unwrap().push(file.to_path_buf());
        Ok(file.to_path_buf())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Archiver that reports success without writing anything
pub(crate) struct PhantomArchiver;

#[async_trait]
impl Archiver for PhantomArchiver {
    async fn create(
        &self,
        _source_dir: &Path,
        _dest: &Path,
        _cancel: CancellationToken,
    ) -> Result<usize> {
        Ok(1)
    }
}

/// Archiver that runs until cancelled, then takes `wind_down` to stop
#[derive(Default)]
pub(crate) struct StallingArchiver {
    pub(crate) cancelled: Notify,
    pub(crate) stopped: AtomicBool,
    pub(crate) wind_down: Duration,
}

#[async_trait]
impl Archiver for StallingArchiver {
    async fn create(
        &self,
        _source_dir: &Path,
        _dest: &Path,
        cancel: CancellationToken,
    ) -> Result<usize> {
        cancel.cancelled().await;
        self.cancelled.notify_one();
        tokio::time::sleep(self.wind_down).await;
        self.stopped.store(true, Ordering::SeqCst);
        Err(Error::Other("archive creation cancelled".into()))
    }
}

/// Fetcher that waits for a signal before completing each download with status 200
#[derive(Default)]
pub(crate) struct GatedFetcher {
    pub(crate) started: Notify,
    pub(crate) release: Notify,
}

#[async_trait]
impl Fetcher for GatedFetcher {
    async fn fetch(&self, _url: &str, dest: &Path) -> Result<FetchOutcome> {
        self.started.notify_one();
        self.release.notified().await;
        tokio::fs::write(dest, b"gated").await?;
        Ok(FetchOutcome {
            status: 200,
            path: dest.to_path_buf(),
        })
    }
}

/// Export config rooted at `root`
pub(crate) fn test_config(root: &Path) -> ExportConfig {
    ExportConfig {
        document_dir: root.join("documents"),
        ..Default::default()
    }
}

/// HTTP pipeline rooted at `root` with the given share target and gallery
pub(crate) fn http_pipeline(
    root: &Path,
    share: Arc<dyn ShareTarget>,
    gallery: Arc<dyn Gallery>,
) -> ExportPipeline {
    ExportPipeline::with_http(test_config(root), share, gallery)
}

/// Pipeline with a custom fetcher, real ZIP archiver
pub(crate) fn pipeline_with_fetcher(
    root: &Path,
    fetcher: Arc<dyn Fetcher>,
    share: Arc<dyn ShareTarget>,
    gallery: Arc<dyn Gallery>,
) -> ExportPipeline {
    ExportPipeline::new(test_config(root), fetcher, Arc::new(ZipArchiver), share, gallery)
}

/// Mock image host answering each `(path, status)` pair
pub(crate) async fn image_server(routes: &[(&str, u16)]) -> MockServer {
    let server = MockServer::start().await;
    for (route, status) in routes {
        let body = format!("image at {route}").into_bytes();
        Mock::given(method("GET"))
            .and(path(*route))
            .respond_with(ResponseTemplate::new(*status).set_body_bytes(body))
            .mount(&server)
            .await;
    }
    server
}

/// Entry names of the ZIP at `path`
pub(crate) fn zip_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

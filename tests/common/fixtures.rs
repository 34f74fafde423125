//! Mock sales service and platform fakes

use async_trait::async_trait;
use sales_export::export::{Gallery, PermissionStatus, ShareTarget};
use sales_export::{Config, ExportConfig, ServiceConfig};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bytes served for every image
pub const IMAGE_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg";

/// Start a mock service with `/login`, `/sales-erp` and image routes
///
/// `records` are `(order_no, customer_no, image_path)`; an image path of `None`
/// produces a record without an image. `missing` lists image paths that
/// answer 404.
pub async fn start_service(
    records: &[(&str, &str, Option<&str>)],
    missing: &[&str],
) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "token": "test-token",
            "profile": {"name": "Tester"}
        })))
        .mount(&server)
        .await;

    let body: Vec<serde_json::Value> = records
        .iter()
        .map(|(order_no, customer_no, image)| {
            serde_json::json!({
                "DONo": order_no,
                "SPONo": format!("SP-{order_no}"),
                "CustNo": customer_no,
                "DPDate": "2024-03-05T08:30:00Z",
                "URL_FILE": image.map(|p| format!("{}{p}", server.uri())),
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/sales-erp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    for (_, _, image) in records {
        let Some(image) = image else { continue };
        let response = if missing.contains(image) {
            ResponseTemplate::new(404)
        } else {
            ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES.to_vec())
        };
        Mock::given(method("GET"))
            .and(path(*image))
            .respond_with(response)
            .mount(&server)
            .await;
    }

    server
}

/// Config pointing at `server` with documents under `root`
pub fn test_config(server: &MockServer, root: &Path) -> Config {
    Config {
        service: ServiceConfig {
            base_url: server.uri(),
            ..Default::default()
        },
        export: ExportConfig {
            document_dir: root.join("documents"),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Share target that records what it was handed
#[derive(Default)]
pub struct CapturingShare {
    pub shared: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl ShareTarget for CapturingShare {
    async fn share(&self, path: &Path) -> sales_export::Result<()> {
        self.shared.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn name(&self) -> &str {
        "capturing"
    }
}

/// Gallery that grants permission and records persisted files
#[derive(Default)]
pub struct CapturingGallery {
    pub saved: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Gallery for CapturingGallery {
    async fn request_permission(&self) -> sales_export::Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn persist(&self, file: &Path) -> sales_export::Result<PathBuf> {
        self.saved.lock().unwrap().push(file.to_path_buf());
        Ok(file.to_path_buf())
    }

    fn name(&self) -> &str {
        "capturing"
    }
}

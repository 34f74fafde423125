//! Read-only access to the remote sales-order records
//!
//! The service is fetched in full; no pagination, filtering or sorting
//! parameters are sent. Filtering happens client-side in [`crate::filter`].

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::SalesRecord;
use async_trait::async_trait;
use tracing::{debug, info};

/// Source of sales-order records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch every record, in service order
    async fn list_records(&self, session: &Session) -> Result<Vec<SalesRecord>>;

    /// Fetch a single record by its service id
    async fn get_record(&self, session: &Session, id: &str) -> Result<SalesRecord>;
}

/// [`RecordStore`] backed by the sales HTTP service
///
/// - `GET {base}/sales-erp` returns a JSON array of records
/// - `GET {base}/sales-erp/{id}` returns one record (or a one-element array)
#[derive(Clone, Debug)]
pub struct HttpRecordStore {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl HttpRecordStore {
    /// Create a store for the configured service
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    async fn get_json(&self, session: &Session, url: &str) -> Result<serde_json::Value> {
        let token = session.authorization()?;
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthenticated(format!(
                "service refused the session token for {url}"
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(Error::Service {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list_records(&self, session: &Session) -> Result<Vec<SalesRecord>> {
        let url = self.config.endpoint("sales-erp");
        debug!(%url, "fetching sales records");

        let value = self.get_json(session, &url).await?;
        let records: Vec<SalesRecord> = serde_json::from_value(value)?;

        info!(count = records.len(), "fetched sales records");
        Ok(records)
    }

    async fn get_record(&self, session: &Session, id: &str) -> Result<SalesRecord> {
        let url = self
            .config
            .endpoint(&format!("sales-erp/{}", urlencoding::encode(id)));
        debug!(%url, "fetching sales record");

        match self.get_json(session, &url).await? {
            serde_json::Value::Array(items) => items
                .into_iter()
                .next()
                .map(serde_json::from_value::<SalesRecord>)
                .transpose()?
                .ok_or_else(|| Error::NotFound(format!("sales record {id}"))),
            value => Ok(serde_json::from_value(value)?),
        }
    }
}

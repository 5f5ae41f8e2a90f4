//! HTTP client for the process-inventory endpoint.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::types::MachineSnapshot;

pub const LATEST_PATH: &str = "api/processes/latest/";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid data source address: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("data source answered {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fetches the latest machine snapshots. Cheap to clone; clones share the
/// connection pool.
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    client: reqwest::Client,
    endpoint: Url,
}

impl SnapshotFetcher {
    pub fn new(base: &str) -> Result<Self, TransportError> {
        let endpoint = latest_endpoint(base)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// One GET, no retries. Non-2xx and undecodable bodies are errors.
    pub async fn fetch_latest(&self) -> Result<Vec<MachineSnapshot>, TransportError> {
        debug!(url = %self.endpoint, "fetching latest snapshots");
        let resp = self.client.get(self.endpoint.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }
        let body = resp.bytes().await?;
        let machines: Vec<MachineSnapshot> = serde_json::from_slice(&body)?;
        debug!(machines = machines.len(), "fetched snapshots");
        Ok(machines)
    }
}

/// Resolve `<base>/api/processes/latest/`. A bare `host:port` gets `http://`,
/// and the base path is treated as a directory.
pub fn latest_endpoint(base: &str) -> Result<Url, url::ParseError> {
    let base = base.trim();
    let mut url = if base.starts_with("http://") || base.starts_with("https://") {
        Url::parse(base)?
    } else {
        Url::parse(&format!("http://{base}"))?
    };
    if !url.path().ends_with('/') {
        let dir = format!("{}/", url.path());
        url.set_path(&dir);
    }
    url.join(LATEST_PATH)
}

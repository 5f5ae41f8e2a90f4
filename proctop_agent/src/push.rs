//! Push mode: sample locally and POST each report to a central agent.

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::http::INGEST_PATH;
use crate::sampler::{collect_processes, SharedSystem};
use crate::types::IngestRequest;

/// `<base>/api/processes/` with exactly one slash at the seam.
pub fn ingest_url(base: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), INGEST_PATH)
}

pub async fn push_once(client: &Client, url: &str, body: &IngestRequest) -> Result<()> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("posting to {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("{url} answered {status}");
    }
    Ok(())
}

/// Runs until the process exits; failures are logged and retried next period.
pub async fn run_pusher(base: &str, sys: SharedSystem, hostname: String, period: Duration) {
    let url = ingest_url(base);
    let client = Client::new();
    loop {
        let processes = collect_processes(&sys).await;
        let body = IngestRequest {
            hostname: hostname.clone(),
            processes,
        };
        match push_once(&client, &url, &body).await {
            Ok(()) => debug!(%url, count = body.processes.len(), "pushed report"),
            Err(e) => warn!(error = %format!("{e:#}"), "push failed"),
        }
        sleep(period).await;
    }
}

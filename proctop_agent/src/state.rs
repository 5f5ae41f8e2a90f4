//! Shared agent state: the latest report per machine.

use std::sync::Arc;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::types::{MachineReport, ProcessEntry};

/// Latest report per hostname, in first-seen order.
#[derive(Clone, Default)]
pub struct Store {
    machines: Arc<RwLock<Vec<MachineReport>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the machine's report wholesale, keeping its position; new
    /// machines go to the end.
    pub async fn replace(&self, hostname: &str, processes: Vec<ProcessEntry>) {
        let report = MachineReport {
            hostname: hostname.to_string(),
            last_updated: now_rfc3339(),
            processes,
        };
        let mut machines = self.machines.write().await;
        match machines.iter_mut().find(|m| m.hostname == hostname) {
            Some(slot) => *slot = report,
            None => machines.push(report),
        }
    }

    pub async fn snapshot(&self) -> Vec<MachineReport> {
        self.machines.read().await.clone()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

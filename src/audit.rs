//! Audit sink: one record per authorization decision. Write-only,
//! thread-safe; records are independent and may be reordered across
//! concurrent requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditRecord {
    pub timestamp_millis: u128,
    pub user_id: Option<String>,
    pub command: String,
    pub blocked: bool,
    pub reason: String,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord);
}

/// An in-memory sink useful for tests and the CLI's `--json` trail.
#[derive(Default)]
pub struct InMemoryAuditSink {
    records: tokio::sync::Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, record: AuditRecord) {
        self.records.lock().await.push(record);
    }
}

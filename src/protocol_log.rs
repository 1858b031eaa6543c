//! Append-only log of agent-to-agent messages for the dashboard.

use chrono::{DateTime, Utc};
use derive_new::new;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Entries kept before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 500;

/// One logged step of a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct ProtocolLogEntry {
    /// When the step finished.
    #[new(value = "Utc::now()")]
    pub timestamp: DateTime<Utc>,
    /// Agent (or `coordinator`) that produced it.
    #[new(into)]
    pub agent: String,
    /// Step name, e.g. `analyze_board`.
    #[new(into)]
    pub message_type: String,
    /// Step output.
    pub data: Value,
}

/// Bounded, shared protocol log.
#[derive(Debug)]
pub struct ProtocolLog {
    entries: RwLock<VecDeque<ProtocolLogEntry>>,
    capacity: usize,
}

impl Default for ProtocolLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ProtocolLog {
    /// Log holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    /// Appends an entry, evicting the oldest when full.
    #[instrument(skip(self, data))]
    pub async fn record(&self, agent: &str, message_type: &str, data: Value) {
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(ProtocolLogEntry::new(agent, message_type, data));
        debug!(len = entries.len(), "Protocol log entry recorded");
    }

    /// All entries, oldest first.
    pub async fn entries(&self) -> Vec<ProtocolLogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// The last `n` entries, oldest first.
    pub async fn recent(&self, n: usize) -> Vec<ProtocolLogEntry> {
        let entries = self.entries.read().await;
        entries.iter().skip(entries.len().saturating_sub(n)).cloned().collect()
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every entry.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

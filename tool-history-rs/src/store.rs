// tool-history-rs/src/store.rs
// History store abstraction and the default in-memory backend.
//
// Implementation notes:
// - Append-only: records are never mutated after insertion.
// - Insertion order is preserved and is the recency tie-break used by
//   consumers ranking suggestions.
// - Retention is an explicit bounded policy; the oldest records are evicted
//   first once the capacity is reached.

use std::collections::VecDeque;
use std::env;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use crate::feed::{HistoryEvent, HistorySubscription};
use crate::record::ToolInvocationRecord;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Bounded retention for the in-memory store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetentionPolicy {
    /// Maximum number of records kept across all tools.
    pub max_records: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { max_records: 1024 }
    }
}

impl RetentionPolicy {
    /// Construct a policy from TOOL_HISTORY_MAX_RECORDS.
    ///
    /// Never panics: unset, unparsable, or zero values fall back to the
    /// default capacity.
    pub fn from_env() -> Self {
        let max_records = env::var("TOOL_HISTORY_MAX_RECORDS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or_else(|| Self::default().max_records);

        Self { max_records }
    }
}

/// Storage interface for tool invocation history.
///
/// Implementations must preserve insertion order in `query` results and
/// never return records for a different tool id.
#[async_trait]
pub trait ToolHistoryStore: Send + Sync {
    /// Append a record. The append is atomic with respect to the
    /// cooperative execution model: it completes before control yields.
    async fn record(&self, record: ToolInvocationRecord);

    /// All records for `tool_id`, in insertion order.
    async fn query(&self, tool_id: &str) -> Vec<ToolInvocationRecord>;

    /// Only the successful records for `tool_id`, in insertion order.
    async fn query_successes(&self, tool_id: &str) -> Vec<ToolInvocationRecord>;

    /// Discard all records.
    async fn clear(&self);

    /// Total number of retained records across all tools.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Default in-memory backend with bounded retention and a live feed.
///
/// Suitable for process-lifetime history. A persistent backend can be wired
/// behind [`ToolHistoryStore`] later without touching consumers.
pub struct InMemoryHistoryStore {
    retention: RetentionPolicy,
    records: RwLock<VecDeque<ToolInvocationRecord>>,
    events: broadcast::Sender<HistoryEvent>,
}

impl InMemoryHistoryStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            retention,
            records: RwLock::new(VecDeque::new()),
            events,
        }
    }

    /// Subscribe to history mutations.
    ///
    /// The snapshot and the receiver are taken under the same lock that
    /// guards appends, so no mutation is both in the snapshot and delivered
    /// as an event, and none is missed.
    pub async fn subscribe(&self) -> HistorySubscription {
        let records = self.records.read().await;
        HistorySubscription {
            events: self.events.subscribe(),
            snapshot: records.iter().cloned().collect(),
        }
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

#[async_trait]
impl ToolHistoryStore for InMemoryHistoryStore {
    async fn record(&self, record: ToolInvocationRecord) {
        let mut records = self.records.write().await;

        if records.len() >= self.retention.max_records {
            if let Some(evicted) = records.pop_front() {
                tracing::debug!(
                    tool = %evicted.tool_id,
                    record_id = %evicted.id,
                    capacity = %self.retention.max_records,
                    "evicting oldest invocation record at capacity"
                );
            }
        }

        records.push_back(record.clone());
        // Send while the write lock is held so subscribers observe events in
        // append order. Lagging or absent receivers are not an error.
        let _ = self.events.send(HistoryEvent::Recorded(record));
    }

    async fn query(&self, tool_id: &str) -> Vec<ToolInvocationRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| r.tool_id == tool_id)
            .cloned()
            .collect()
    }

    async fn query_successes(&self, tool_id: &str) -> Vec<ToolInvocationRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| r.tool_id == tool_id && r.is_success())
            .cloned()
            .collect()
    }

    async fn clear(&self) {
        let mut records = self.records.write().await;
        let discarded = records.len();
        records.clear();
        let _ = self.events.send(HistoryEvent::Cleared);

        tracing::debug!(discarded = %discarded, "tool invocation history cleared");
    }

    async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

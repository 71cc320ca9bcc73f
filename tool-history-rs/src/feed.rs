// tool-history-rs/src/feed.rs
// Live update feed over history mutations.
//
// Subscription contract: the snapshot reflects every mutation that will NOT
// be delivered on the receiver; everything after it arrives in occurrence
// order. Dropping the receiver ends the subscription.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::record::ToolInvocationRecord;

/// A single history mutation, as observed by subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HistoryEvent {
    /// A record was appended.
    Recorded(ToolInvocationRecord),
    /// The history was discarded wholesale.
    Cleared,
}

/// A point-in-time snapshot plus a receiver for subsequent mutations.
#[derive(Debug)]
pub struct HistorySubscription {
    pub snapshot: Vec<ToolInvocationRecord>,
    pub events: broadcast::Receiver<HistoryEvent>,
}

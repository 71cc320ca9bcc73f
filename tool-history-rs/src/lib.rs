//! # Tool Invocation History
//!
//! Append-only history of tool invocations with bounded retention and a
//! live update feed.
//!
//! ## Features
//!
//! - Immutable per-attempt invocation records with outcome and duration
//! - Insertion-ordered queries scoped to a single tool
//! - Explicit, configurable retention instead of unbounded growth
//! - Snapshot-then-live-updates subscriptions over a broadcast channel

pub mod feed;
pub mod record;
pub mod store;

// Re-export commonly used types
pub use feed::{HistoryEvent, HistorySubscription};
pub use record::{InvocationOutcome, ToolInvocationRecord, ToolParameters};
pub use store::{InMemoryHistoryStore, RetentionPolicy, ToolHistoryStore};

//! # Recovery Engine
//!
//! An adaptive retry and recovery engine for fallible tool calls: bounded
//! sequential retries, heuristic failure classification, and
//! confidence-ranked parameter-correction suggestions derived from the
//! invocation history.
//!
//! ## Features
//!
//! - Bounded, strictly sequential retries per logical call
//! - Closed failure taxonomy (timeout / invalid parameter / unknown) with
//!   total, pure classification
//! - Suggestions mined from prior successful invocations of the same tool,
//!   ranked by confidence with recency tie-breaks
//! - Terminal notifications that always resolve normally; only
//!   misconfiguration is surfaced as an error
//! - Structured logging with correlation IDs and optional metrics
//! - Pluggable backoff between attempts (immediate retry by default)

pub mod classifier;
pub mod config;
pub mod logging;
pub mod retry;
pub mod suggestion;
pub mod types;


// Re-export commonly used types
pub use classifier::{ErrorClassifier, HeuristicErrorClassifier};
pub use config::{BackoffStrategy, RecoveryConfig};
pub use logging::{
    clear_correlation_id, current_correlation_id, generate_correlation_id, init_logging,
    set_correlation_id, with_correlation_id, LoggingConfig,
};
pub use retry::RecoveryEngine;
pub use suggestion::SuggestionEngine;
pub use types::{
    Classification, ErrorCategory, ErrorNotification, NotificationContext, RecoveryError, Result,
    Suggestion, ToolCallError, ToolCallOutcome,
};

// History types used throughout the public API
pub use tool_history::{
    HistoryEvent, HistorySubscription, InMemoryHistoryStore, InvocationOutcome, RetentionPolicy,
    ToolHistoryStore, ToolInvocationRecord, ToolParameters,
};

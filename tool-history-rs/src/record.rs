// tool-history-rs/src/record.rs
// Structured record of a single tool invocation attempt.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parameter mapping passed to a tool invocation.
pub type ToolParameters = serde_json::Map<String, serde_json::Value>;

/// Outcome of a single invocation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationOutcome {
    pub success: bool,
    pub duration_ms: u64,
}

/// Persisted representation of one tool invocation attempt.
///
/// Records are immutable once appended to a store; they are only ever
/// created and read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub id: Uuid,
    pub tool_id: String,
    pub parameters: ToolParameters,
    pub outcome: InvocationOutcome,
    pub timestamp: DateTime<Utc>,
}

impl ToolInvocationRecord {
    fn new(
        tool_id: impl Into<String>,
        parameters: ToolParameters,
        success: bool,
        duration: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool_id: tool_id.into(),
            parameters,
            outcome: InvocationOutcome {
                success,
                duration_ms: duration.as_millis() as u64,
            },
            timestamp: Utc::now(),
        }
    }

    /// Record for an attempt that completed successfully.
    pub fn success(
        tool_id: impl Into<String>,
        parameters: ToolParameters,
        duration: Duration,
    ) -> Self {
        Self::new(tool_id, parameters, true, duration)
    }

    /// Record for an attempt that failed.
    pub fn failure(
        tool_id: impl Into<String>,
        parameters: ToolParameters,
        duration: Duration,
    ) -> Self {
        Self::new(tool_id, parameters, false, duration)
    }

    pub fn is_success(&self) -> bool {
        self.outcome.success
    }
}

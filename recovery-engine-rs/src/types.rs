//! # Recovery Types
//!
//! Core data contracts for the retry and recovery engine: raw tool failures,
//! their classification, correction suggestions, and the terminal
//! notification surfaced when retries are exhausted.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tool_history::ToolParameters;

/// A type alias for Result with the error type defaulting to [`RecoveryError`]
pub type Result<T, E = RecoveryError> = std::result::Result<T, E>;

/// Errors that escape the engine's public contract.
///
/// Operational tool failures never surface here; they resolve normally as a
/// [`ToolCallOutcome::Failure`]. Only local misconfiguration does.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("max_retries must be at least 1, got {0}")]
    InvalidMaxRetries(u32),

    #[error("logging initialization failed: {0}")]
    LoggingInit(String),
}

/// Closed set of terminal failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The operation exceeded its expected time bound.
    Timeout,
    /// A specific parameter was rejected.
    InvalidParameter,
    /// Default when no specific rule matches.
    Unknown,
}

impl ErrorCategory {
    /// Stable lowercase name, also used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::InvalidParameter => "invalid_parameter",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier verdict: exactly one category, plus the parameter keys the
/// verdict is about when the category is [`ErrorCategory::InvalidParameter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: ErrorCategory,
    /// Keys of the failing call implicated by the error. Empty unless the
    /// category is `InvalidParameter`.
    pub implicated_parameters: Vec<String>,
    pub detail: Option<String>,
}

impl Classification {
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Timeout,
            implicated_parameters: Vec::new(),
            detail: Some(detail.into()),
        }
    }

    pub fn invalid_parameter(implicated: Vec<String>, detail: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::InvalidParameter,
            implicated_parameters: implicated,
            detail: Some(detail.into()),
        }
    }

    pub fn unknown() -> Self {
        Self {
            category: ErrorCategory::Unknown,
            implicated_parameters: Vec::new(),
            detail: None,
        }
    }
}

/// Raw failure value produced by a tool operation.
///
/// Tool operations are opaque; this is the minimal structured surface the
/// classifier inspects. All fields are optional signals: a failure with
/// nothing but (possibly empty) message text is still valid input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallError {
    pub message: String,
    /// Observed duration of the failed attempt, when the caller measured it.
    pub elapsed: Option<Duration>,
    /// Explicit timeout marker set by the tool itself.
    pub timed_out: bool,
    /// Parameter key the tool explicitly rejected.
    pub rejected_parameter: Option<String>,
    /// Additional context as key-value pairs
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
}

impl ToolCallError {
    /// Creates a new error with the given message
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Marks this error as a timeout
    pub fn timed_out(mut self) -> Self {
        self.timed_out = true;
        self
    }

    /// Records the observed duration of the failed attempt
    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    /// Names the parameter the tool rejected
    pub fn rejected_parameter<S: Into<String>>(mut self, key: S) -> Self {
        self.rejected_parameter = Some(key.into());
        self
    }

    /// Adds context information to the error
    pub fn context<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.context.insert(key.into(), value);
        }
        self
    }
}

impl fmt::Display for ToolCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "tool call failed without message")
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl StdError for ToolCallError {}

impl From<&str> for ToolCallError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ToolCallError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// A proposed parameter correction derived from a prior successful call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub tool_name: String,
    pub suggested_parameters: BTreeMap<String, String>,
    /// Likelihood in [0, 1] that the corrected parameters succeed.
    pub confidence: f64,
    pub reasoning: String,
}

/// Call-site context captured into an [`ErrorNotification`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationContext {
    pub tool_name: String,
    pub parameters: ToolParameters,
    pub timestamp: DateTime<Utc>,
    /// Attempts actually performed before giving up.
    pub retry_count: u32,
    pub correlation_id: Option<String>,
}

/// Terminal failure report handed to the presentation layer.
///
/// Constructed once, at the moment retries are exhausted; never mutated
/// afterwards. Suggestions are ordered by descending confidence, ties broken
/// by recency of the source record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorNotification {
    pub id: Uuid,
    pub category: ErrorCategory,
    pub message: String,
    pub context: NotificationContext,
    pub suggestions: Vec<Suggestion>,
}

impl ErrorNotification {
    /// Build the notification for an exhausted retry sequence.
    pub fn from_exhausted_retries(
        tool_id: &str,
        parameters: ToolParameters,
        retry_count: u32,
        error: &ToolCallError,
        classification: &Classification,
        suggestions: Vec<Suggestion>,
        correlation_id: Option<String>,
    ) -> Self {
        let message = format!(
            "tool call '{}' failed after {} attempt(s): {}",
            tool_id, retry_count, error
        );

        Self {
            id: Uuid::new_v4(),
            category: classification.category,
            message,
            context: NotificationContext {
                tool_name: tool_id.to_string(),
                parameters,
                timestamp: Utc::now(),
                retry_count,
                correlation_id,
            },
            suggestions,
        }
    }
}

/// The result of a retried tool call.
///
/// Exactly one of the variants is present after terminal resolution: the
/// operation's value, or the notification describing why it kept failing.
#[derive(Debug)]
pub enum ToolCallOutcome<T> {
    /// The operation succeeded with the given result
    Success(T),
    /// All retries failed, returning the terminal notification
    Failure(ErrorNotification),
}

impl<T> ToolCallOutcome<T> {
    /// Converts the outcome to a standard Result
    pub fn into_result(self) -> std::result::Result<T, ErrorNotification> {
        match self {
            ToolCallOutcome::Success(value) => Ok(value),
            ToolCallOutcome::Failure(notification) => Err(notification),
        }
    }

    /// Returns true if the outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, ToolCallOutcome::Success(_))
    }

    /// Returns true if the outcome is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, ToolCallOutcome::Failure(_))
    }

    /// The notification, when the outcome is a failure
    pub fn notification(&self) -> Option<&ErrorNotification> {
        match self {
            ToolCallOutcome::Success(_) => None,
            ToolCallOutcome::Failure(notification) => Some(notification),
        }
    }

    /// Maps a function over the success value
    pub fn map<U, F>(self, f: F) -> ToolCallOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            ToolCallOutcome::Success(value) => ToolCallOutcome::Success(f(value)),
            ToolCallOutcome::Failure(notification) => ToolCallOutcome::Failure(notification),
        }
    }

    /// Unwraps the success value or panics
    pub fn unwrap(self) -> T {
        match self {
            ToolCallOutcome::Success(value) => value,
            ToolCallOutcome::Failure(notification) => {
                panic!(
                    "called unwrap on a ToolCallOutcome::Failure: {}",
                    notification.message
                )
            }
        }
    }

    /// Unwraps the success value or computes one from the notification
    pub fn unwrap_or_else<F>(self, f: F) -> T
    where
        F: FnOnce(ErrorNotification) -> T,
    {
        match self {
            ToolCallOutcome::Success(value) => value,
            ToolCallOutcome::Failure(notification) => f(notification),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_are_stable() {
        assert_eq!(ErrorCategory::Timeout.as_str(), "timeout");
        assert_eq!(ErrorCategory::InvalidParameter.as_str(), "invalid_parameter");
        assert_eq!(ErrorCategory::Unknown.as_str(), "unknown");
    }

    #[test]
    fn tool_call_error_display_tolerates_empty_message() {
        let err = ToolCallError::default();
        assert_eq!(format!("{}", err), "tool call failed without message");

        let err = ToolCallError::new("ENOENT");
        assert_eq!(format!("{}", err), "ENOENT");
    }

    #[test]
    fn outcome_combinators() {
        let ok: ToolCallOutcome<i32> = ToolCallOutcome::Success(41);
        assert!(ok.is_success());
        let mapped = ok.map(|v| v + 1);
        assert_eq!(mapped.into_result().expect("success"), 42);

        let classification = Classification::unknown();
        let notification = ErrorNotification::from_exhausted_retries(
            "search",
            ToolParameters::new(),
            3,
            &ToolCallError::new("boom"),
            &classification,
            Vec::new(),
            None,
        );
        let failed: ToolCallOutcome<i32> = ToolCallOutcome::Failure(notification);
        assert!(failed.is_failure());
        assert_eq!(
            failed.notification().map(|n| n.context.retry_count),
            Some(3)
        );
        assert_eq!(failed.unwrap_or_else(|_| 7), 7);
    }

    #[test]
    fn notification_captures_context() {
        let mut params = ToolParameters::new();
        params.insert("path".to_string(), serde_json::json!("/a/txt"));

        let classification =
            Classification::invalid_parameter(vec!["path".to_string()], "path rejected");
        let notification = ErrorNotification::from_exhausted_retries(
            "readFile",
            params.clone(),
            3,
            &ToolCallError::new("no such file"),
            &classification,
            Vec::new(),
            Some("corr-1".to_string()),
        );

        assert_eq!(notification.category, ErrorCategory::InvalidParameter);
        assert_eq!(notification.context.tool_name, "readFile");
        assert_eq!(notification.context.parameters, params);
        assert_eq!(notification.context.retry_count, 3);
        assert_eq!(notification.context.correlation_id.as_deref(), Some("corr-1"));
        assert!(notification.message.contains("readFile"));
        assert!(notification.message.contains("3 attempt(s)"));
    }
}

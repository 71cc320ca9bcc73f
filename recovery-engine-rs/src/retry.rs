//! # Retry Engine
//!
//! This module orchestrates bounded re-execution of tool calls: every
//! attempt is recorded into the invocation history, and once attempts are
//! exhausted the failure is classified and enriched with parameter
//! correction suggestions before being surfaced.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use tool_history::{InMemoryHistoryStore, ToolHistoryStore, ToolInvocationRecord, ToolParameters};

use crate::classifier::{ErrorClassifier, HeuristicErrorClassifier};
use crate::config::RecoveryConfig;
use crate::logging::current_correlation_id;
use crate::suggestion::SuggestionEngine;
use crate::types::{
    ErrorCategory, ErrorNotification, RecoveryError, Result, ToolCallError, ToolCallOutcome,
};

/// Orchestrates retries for fallible tool calls.
///
/// Attempts for one logical call are strictly sequential; independent calls
/// may run concurrently and each owns its own attempt counter. The engine
/// enforces no timeout of its own and applies no backpressure.
pub struct RecoveryEngine {
    config: RecoveryConfig,
    store: Arc<dyn ToolHistoryStore>,
    classifier: Arc<dyn ErrorClassifier>,
    suggestions: SuggestionEngine,
}

impl RecoveryEngine {
    /// Creates an engine over the given history store with the default
    /// heuristic classifier.
    pub fn new(config: RecoveryConfig, store: Arc<dyn ToolHistoryStore>) -> Self {
        let classifier: Arc<dyn ErrorClassifier> =
            Arc::new(HeuristicErrorClassifier::new(config.timeout_threshold));

        Self {
            suggestions: SuggestionEngine::new(store.clone()),
            config,
            store,
            classifier,
        }
    }

    /// Creates an engine with default configuration and a fresh in-memory
    /// history store.
    pub fn with_defaults() -> Self {
        Self::new(
            RecoveryConfig::default(),
            Arc::new(InMemoryHistoryStore::default()),
        )
    }

    /// Replaces the classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// The shared history store this engine records into.
    pub fn history(&self) -> &Arc<dyn ToolHistoryStore> {
        &self.store
    }

    /// Discards all invocation records. In-flight retries are unaffected.
    pub async fn clear_history(&self) {
        self.store.clear().await;
    }

    /// Executes `operation` with the configured default attempt bound.
    pub async fn execute<F, Fut, T>(
        &self,
        operation: F,
        tool_id: &str,
        parameters: &ToolParameters,
    ) -> Result<ToolCallOutcome<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, ToolCallError>>,
    {
        self.execute_with_retry(operation, self.config.max_retries, tool_id, parameters)
            .await
    }

    /// Executes `operation` up to `max_retries` times, sequentially.
    ///
    /// Every attempt appends an invocation record before the next one
    /// starts. On success the result is returned immediately; on the final
    /// failure the error is classified, suggestions are gathered, and the
    /// call resolves with a [`ToolCallOutcome::Failure`] carrying the
    /// notification. The only error returned through the outer `Result` is
    /// the fail-fast configuration error for `max_retries == 0`.
    pub async fn execute_with_retry<F, Fut, T>(
        &self,
        operation: F,
        max_retries: u32,
        tool_id: &str,
        parameters: &ToolParameters,
    ) -> Result<ToolCallOutcome<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, ToolCallError>>,
    {
        if max_retries == 0 {
            warn!(tool = %tool_id, "rejecting tool call configured with zero attempts");
            return Err(RecoveryError::InvalidMaxRetries(max_retries));
        }

        let correlation_id = current_correlation_id();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let attempt_started = Instant::now();
            let result = operation().await;
            let attempt_duration = attempt_started.elapsed();

            match result {
                Ok(value) => {
                    self.store
                        .record(ToolInvocationRecord::success(
                            tool_id,
                            parameters.clone(),
                            attempt_duration,
                        ))
                        .await;

                    if attempt > 1 {
                        info!(
                            tool = %tool_id,
                            attempt = %attempt,
                            duration_ms = %started.elapsed().as_millis(),
                            "tool call succeeded after retries"
                        );
                    }

                    self.record_metrics(tool_id, true, None, started);
                    return Ok(ToolCallOutcome::Success(value));
                }
                Err(error) => {
                    self.store
                        .record(ToolInvocationRecord::failure(
                            tool_id,
                            parameters.clone(),
                            attempt_duration,
                        ))
                        .await;

                    if attempt >= max_retries {
                        let classification =
                            self.classifier.classify(tool_id, parameters, &error);
                        let suggestions = self
                            .suggestions
                            .suggest(
                                tool_id,
                                parameters,
                                &classification,
                                self.config.max_suggestions,
                            )
                            .await;

                        warn!(
                            tool = %tool_id,
                            attempt = %attempt,
                            max_retries = %max_retries,
                            category = %classification.category,
                            suggestions = %suggestions.len(),
                            duration_ms = %started.elapsed().as_millis(),
                            error = %error,
                            "giving up on tool call after retries"
                        );

                        self.record_metrics(
                            tool_id,
                            false,
                            Some(classification.category),
                            started,
                        );

                        let notification = ErrorNotification::from_exhausted_retries(
                            tool_id,
                            parameters.clone(),
                            attempt,
                            &error,
                            &classification,
                            suggestions,
                            correlation_id,
                        );
                        return Ok(ToolCallOutcome::Failure(notification));
                    }

                    let backoff = self.config.backoff.delay_for(attempt);
                    debug!(
                        tool = %tool_id,
                        attempt = %attempt,
                        max_retries = %max_retries,
                        backoff_ms = %backoff.as_millis(),
                        error = %error,
                        "retrying tool call after failure"
                    );

                    if !backoff.is_zero() {
                        sleep(backoff).await;
                    }
                }
            }
        }
    }

    fn record_metrics(
        &self,
        tool_id: &str,
        success: bool,
        category: Option<ErrorCategory>,
        started: Instant,
    ) {
        if !self.config.record_metrics {
            return;
        }

        let outcome = if success { "success" } else { "failure" };
        metrics::increment_counter!(
            "recovery_tool_calls_total",
            "tool" => tool_id.to_string(),
            "outcome" => outcome
        );

        if let Some(category) = category {
            metrics::increment_counter!(
                "recovery_tool_call_failures_total",
                "tool" => tool_id.to_string(),
                "category" => category.as_str()
            );
        }

        metrics::histogram!(
            "recovery_tool_call_duration_ms",
            started.elapsed().as_millis() as f64,
            "tool" => tool_id.to_string()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_on_first_attempt_skips_retry_machinery() {
        let engine = RecoveryEngine::with_defaults();

        let outcome = engine
            .execute_with_retry(|| async { Ok::<_, ToolCallError>(42) }, 3, "answer", &ToolParameters::new())
            .await
            .expect("valid configuration");

        assert_eq!(outcome.into_result().expect("success"), 42);
        assert_eq!(engine.history().len().await, 1);
    }

    #[tokio::test]
    async fn zero_max_retries_fails_fast_without_attempting() {
        let engine = RecoveryEngine::with_defaults();

        let result = engine
            .execute_with_retry(
                || async { Ok::<_, ToolCallError>(1) },
                0,
                "noop",
                &ToolParameters::new(),
            )
            .await;

        assert!(matches!(result, Err(RecoveryError::InvalidMaxRetries(0))));
        assert!(engine.history().is_empty().await);
    }

    #[tokio::test]
    async fn independent_calls_run_concurrently() {
        let engine = RecoveryEngine::with_defaults();
        let alpha_params = ToolParameters::new();
        let beta_params = ToolParameters::new();

        let (left, right) = tokio::join!(
            engine.execute_with_retry(
                || async { Ok::<_, ToolCallError>("left") },
                3,
                "alpha",
                &alpha_params,
            ),
            engine.execute_with_retry(
                || async { Ok::<_, ToolCallError>("right") },
                3,
                "beta",
                &beta_params,
            ),
        );

        assert!(left.expect("valid configuration").is_success());
        assert!(right.expect("valid configuration").is_success());
        assert_eq!(engine.history().query("alpha").await.len(), 1);
        assert_eq!(engine.history().query("beta").await.len(), 1);
    }
}

// recovery-engine-rs/src/classifier.rs
// Heuristic classification of raw tool failures.

use std::time::Duration;

use tool_history::ToolParameters;

use crate::types::Classification;

/// Strategy interface for failure classification.
///
/// Classification is a pure function of its inputs: no side effects, no
/// history consultation, and total over every possible error value.
pub trait ErrorClassifier: Send + Sync {
    fn classify(
        &self,
        tool_id: &str,
        parameters: &ToolParameters,
        error: &crate::types::ToolCallError,
    ) -> Classification;
}

/// Message vocabulary that marks a rejected or malformed parameter.
const PARAMETER_REJECTION_VOCAB: &[&str] = &[
    "invalid",
    "missing",
    "required",
    "malformed",
    "out of range",
    "unexpected",
    "no such",
    "not found",
];

/// Message vocabulary that marks an exceeded time bound.
const TIMEOUT_VOCAB: &[&str] = &["timeout", "timed out", "deadline exceeded"];

/// Heuristic classifier applying the category rules in priority order:
/// timeout first, then rejected parameter, then unknown.
#[derive(Debug, Clone)]
pub struct HeuristicErrorClassifier {
    timeout_threshold: Duration,
}

impl HeuristicErrorClassifier {
    pub fn new(timeout_threshold: Duration) -> Self {
        Self { timeout_threshold }
    }
}

impl Default for HeuristicErrorClassifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ErrorClassifier for HeuristicErrorClassifier {
    fn classify(
        &self,
        _tool_id: &str,
        parameters: &ToolParameters,
        error: &crate::types::ToolCallError,
    ) -> Classification {
        let message = error.message.to_ascii_lowercase();

        // Rule 1: timeout. An explicit marker or an observed duration past
        // the threshold wins over anything the message says.
        if error.timed_out {
            return Classification::timeout("tool reported a timeout");
        }
        if let Some(elapsed) = error.elapsed {
            if elapsed >= self.timeout_threshold {
                return Classification::timeout(format!(
                    "attempt ran {}ms, past the {}ms threshold",
                    elapsed.as_millis(),
                    self.timeout_threshold.as_millis()
                ));
            }
        }
        if TIMEOUT_VOCAB.iter().any(|v| message.contains(v)) {
            return Classification::timeout("error message indicates a timeout");
        }

        // Rule 2: rejected parameter. An explicit marker, a parameter key
        // named in the message, or rejection vocabulary next to one of the
        // call's own string values.
        let mut implicated = Vec::new();

        if let Some(key) = &error.rejected_parameter {
            push_unique(&mut implicated, key);
        }

        for key in parameters.keys() {
            // Single-character keys match too eagerly as substrings.
            if key.len() >= 2 && message.contains(&key.to_ascii_lowercase()) {
                push_unique(&mut implicated, key);
            }
        }

        if PARAMETER_REJECTION_VOCAB.iter().any(|v| message.contains(v)) {
            for (key, value) in parameters.iter() {
                if let Some(text) = value.as_str() {
                    if text.len() >= 3 && message.contains(&text.to_ascii_lowercase()) {
                        push_unique(&mut implicated, key);
                    }
                }
            }
        }

        if !implicated.is_empty() {
            let detail = format!("error implicates parameter(s): {}", implicated.join(", "));
            return Classification::invalid_parameter(implicated, detail);
        }

        // Rule 3: default. Must never fail, whatever the error carried.
        Classification::unknown()
    }
}

fn push_unique(out: &mut Vec<String>, key: &str) {
    if !out.iter().any(|k| k == key) {
        out.push(key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorCategory, ToolCallError};

    fn params_with(key: &str, value: serde_json::Value) -> ToolParameters {
        let mut params = ToolParameters::new();
        params.insert(key.to_string(), value);
        params
    }

    fn classify(parameters: &ToolParameters, error: &ToolCallError) -> Classification {
        HeuristicErrorClassifier::default().classify("tool", parameters, error)
    }

    #[test]
    fn explicit_timeout_marker_wins() {
        let error = ToolCallError::new("anything at all").timed_out();
        let verdict = classify(&ToolParameters::new(), &error);
        assert_eq!(verdict.category, ErrorCategory::Timeout);
    }

    #[test]
    fn elapsed_past_threshold_is_timeout() {
        let classifier = HeuristicErrorClassifier::new(Duration::from_millis(100));
        let error = ToolCallError::new("slow").elapsed(Duration::from_millis(250));
        let verdict = classifier.classify("tool", &ToolParameters::new(), &error);
        assert_eq!(verdict.category, ErrorCategory::Timeout);
    }

    #[test]
    fn timeout_vocabulary_in_message_is_timeout() {
        let error = ToolCallError::new("operation timed out after 30s");
        let verdict = classify(&ToolParameters::new(), &error);
        assert_eq!(verdict.category, ErrorCategory::Timeout);
    }

    #[test]
    fn timeout_outranks_parameter_rejection() {
        let params = params_with("path", serde_json::json!("/a/txt"));
        let error = ToolCallError::new("timed out reading path /a/txt");
        let verdict = classify(&params, &error);
        assert_eq!(verdict.category, ErrorCategory::Timeout);
    }

    #[test]
    fn explicitly_rejected_parameter_is_invalid_parameter() {
        let params = params_with("query", serde_json::json!(42));
        let error = ToolCallError::new("bad request").rejected_parameter("query");
        let verdict = classify(&params, &error);
        assert_eq!(verdict.category, ErrorCategory::InvalidParameter);
        assert_eq!(verdict.implicated_parameters, vec!["query".to_string()]);
    }

    #[test]
    fn parameter_key_named_in_message_is_implicated() {
        let params = params_with("path", serde_json::json!("/a/txt"));
        let error = ToolCallError::new("path must be absolute");
        let verdict = classify(&params, &error);
        assert_eq!(verdict.category, ErrorCategory::InvalidParameter);
        assert_eq!(verdict.implicated_parameters, vec!["path".to_string()]);
    }

    #[test]
    fn parameter_value_with_rejection_vocabulary_is_implicated() {
        let params = params_with("path", serde_json::json!("/a/txt"));
        let error = ToolCallError::new("ENOENT: no such file or directory '/a/txt'");
        let verdict = classify(&params, &error);
        assert_eq!(verdict.category, ErrorCategory::InvalidParameter);
        assert_eq!(verdict.implicated_parameters, vec!["path".to_string()]);
    }

    #[test]
    fn value_mention_without_vocabulary_stays_unknown() {
        let params = params_with("url", serde_json::json!("http://example.test"));
        let error = ToolCallError::new("connection refused to http://example.test");
        let verdict = classify(&params, &error);
        assert_eq!(verdict.category, ErrorCategory::Unknown);
    }

    #[test]
    fn classification_is_total_over_degenerate_errors() {
        let empty = ToolCallError::default();
        assert_eq!(
            classify(&ToolParameters::new(), &empty).category,
            ErrorCategory::Unknown
        );

        let noisy = ToolCallError::new("\u{0}\u{1}???").context("weird", serde_json::json!(null));
        assert_eq!(
            classify(&ToolParameters::new(), &noisy).category,
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn same_inputs_same_verdict() {
        let params = params_with("path", serde_json::json!("/a/txt"));
        let error = ToolCallError::new("invalid path: /a/txt");
        let first = classify(&params, &error);
        let second = classify(&params, &error);
        assert_eq!(first.category, second.category);
        assert_eq!(first.implicated_parameters, second.implicated_parameters);
    }
}

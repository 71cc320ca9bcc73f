// recovery-engine-rs/src/suggestion.rs
// Parameter-correction suggestions derived from prior successful calls.
//
// Scoring model: per-key credit over the union of parameter keys. Keys the
// classifier implicated are the ones expected to be wrong, so a candidate
// offering a different value there is treated as the correction and earns
// full credit; repeating the failing value on an implicated key earns almost
// none. Unimplicated keys earn credit for matching (or at least same-typed)
// values.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tool_history::{ToolHistoryStore, ToolInvocationRecord, ToolParameters};

use crate::types::{Classification, Suggestion};

const IMPLICATED_MATCH_CREDIT: f64 = 0.25;
const TYPE_MATCH_CREDIT: f64 = 0.5;

/// Derives ranked parameter corrections for a failing tool call from the
/// invocation history.
pub struct SuggestionEngine {
    store: Arc<dyn ToolHistoryStore>,
}

impl SuggestionEngine {
    pub fn new(store: Arc<dyn ToolHistoryStore>) -> Self {
        Self { store }
    }

    /// Ranked suggestions for `tool_id`, at most `max_suggestions` of them.
    ///
    /// Returns an empty vector when the cap is zero or no prior success for
    /// the tool exists; both are valid, non-error states.
    pub async fn suggest(
        &self,
        tool_id: &str,
        failing_parameters: &ToolParameters,
        classification: &Classification,
        max_suggestions: usize,
    ) -> Vec<Suggestion> {
        if max_suggestions == 0 {
            return Vec::new();
        }

        let successes = self.store.query_successes(tool_id).await;
        if successes.is_empty() {
            tracing::debug!(tool = %tool_id, "no prior successful call to derive suggestions from");
            return Vec::new();
        }

        let mut candidates: Vec<Candidate> = successes
            .into_iter()
            .map(|record| {
                let (confidence, differing) =
                    score(failing_parameters, &record.parameters, classification);
                Candidate {
                    confidence,
                    differing,
                    record,
                }
            })
            .filter(|c| c.confidence > 0.0)
            .collect();

        candidates.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| b.record.timestamp.cmp(&a.record.timestamp))
        });

        tracing::debug!(
            tool = %tool_id,
            candidates = %candidates.len(),
            category = %classification.category,
            "ranked suggestion candidates"
        );

        let mut seen = BTreeSet::new();
        let mut suggestions = Vec::new();
        for candidate in candidates {
            let suggested_parameters = stringify_parameters(&candidate.record.parameters);
            // Identical prior parameter sets collapse into the best-ranked one.
            if !seen.insert(suggested_parameters.clone()) {
                continue;
            }

            suggestions.push(Suggestion {
                tool_name: tool_id.to_string(),
                suggested_parameters,
                confidence: candidate.confidence,
                reasoning: render_reasoning(&candidate, failing_parameters),
            });

            if suggestions.len() == max_suggestions {
                break;
            }
        }

        suggestions
    }
}

struct Candidate {
    confidence: f64,
    differing: Vec<String>,
    record: ToolInvocationRecord,
}

/// Similarity between the failing call and a prior successful one, in [0, 1],
/// plus the keys on which the two differ.
fn score(
    failing: &ToolParameters,
    candidate: &ToolParameters,
    classification: &Classification,
) -> (f64, Vec<String>) {
    let keys: BTreeSet<&String> = failing.keys().chain(candidate.keys()).collect();
    if keys.is_empty() {
        // Both calls were parameterless; the prior success is as close a
        // match as history can offer.
        return (1.0, Vec::new());
    }

    let mut credit = 0.0;
    let mut differing = Vec::new();

    for key in &keys {
        let implicated = classification
            .implicated_parameters
            .iter()
            .any(|k| k == *key);

        match (failing.get(*key), candidate.get(*key)) {
            (Some(failing_value), Some(candidate_value)) if failing_value == candidate_value => {
                credit += if implicated { IMPLICATED_MATCH_CREDIT } else { 1.0 };
            }
            (Some(failing_value), Some(candidate_value)) => {
                differing.push((*key).clone());
                if implicated {
                    credit += 1.0;
                } else if same_type(failing_value, candidate_value) {
                    credit += TYPE_MATCH_CREDIT;
                }
            }
            (Some(_), None) | (None, Some(_)) => {
                differing.push((*key).clone());
                if implicated {
                    credit += 1.0;
                }
            }
            (None, None) => unreachable!("key taken from the union of both mappings"),
        }
    }

    let confidence = (credit / keys.len() as f64).clamp(0.0, 1.0);
    (confidence, differing)
}

fn same_type(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    use serde_json::Value::*;
    matches!(
        (a, b),
        (Null, Null)
            | (Bool(_), Bool(_))
            | (Number(_), Number(_))
            | (String(_), String(_))
            | (Array(_), Array(_))
            | (Object(_), Object(_))
    )
}

fn stringify_parameters(parameters: &ToolParameters) -> BTreeMap<String, String> {
    parameters
        .iter()
        .map(|(key, value)| {
            let rendered = match value.as_str() {
                Some(text) => text.to_string(),
                None => value.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

fn render_reasoning(candidate: &Candidate, failing: &ToolParameters) -> String {
    let duration_ms = candidate.record.outcome.duration_ms;

    if candidate.differing.is_empty() {
        return format!(
            "parameters match a prior successful call exactly; it succeeded in {}ms",
            duration_ms
        );
    }

    let mut parts = Vec::new();
    for key in &candidate.differing {
        match (failing.get(key), candidate.record.parameters.get(key)) {
            (Some(failing_value), Some(candidate_value)) => parts.push(format!(
                "`{}` succeeded as {} (failing value {})",
                key, candidate_value, failing_value
            )),
            (None, Some(candidate_value)) => parts.push(format!(
                "`{}` was additionally set to {}",
                key, candidate_value
            )),
            (Some(failing_value), None) => parts.push(format!(
                "`{}` (failing value {}) was absent",
                key, failing_value
            )),
            (None, None) => {}
        }
    }

    format!(
        "prior call succeeded in {}ms; differs on {}",
        duration_ms,
        parts.join(", ")
    )
}

//! # Engine Configuration
//!
//! Configuration surface for the recovery engine, with environment-variable
//! construction that never panics.

use std::env;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Delay policy applied between failed attempts.
///
/// The observed tool-call contract retries immediately, so `None` is the
/// default; backoff is an opt-in extension point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Retry immediately.
    None,
    /// Wait a constant delay between attempts.
    Fixed { delay: Duration },
    /// Exponential backoff with full jitter, capped at `max`.
    Exponential {
        base: Duration,
        max: Duration,
        /// Jitter factor (0.0 - 1.0) to add randomness to backoff
        jitter_factor: f64,
    },
}

impl BackoffStrategy {
    /// Conventional exponential policy: 100ms base, 30s cap, 10% jitter.
    pub fn exponential() -> Self {
        Self::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_secs(30),
            jitter_factor: 0.1,
        }
    }

    /// Delay before the retry following failed attempt number `attempt`
    /// (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::None => Duration::ZERO,
            BackoffStrategy::Fixed { delay } => *delay,
            BackoffStrategy::Exponential {
                base,
                max,
                jitter_factor,
            } => {
                let base_ms = base.as_millis() as f64;
                let max_ms = max.as_millis() as f64;

                let exp_backoff = base_ms * 2.0_f64.powf(attempt.saturating_sub(1) as f64);
                let capped_backoff = exp_backoff.min(max_ms);

                // Full jitter to avoid thundering herd
                let jitter_range = capped_backoff * jitter_factor;
                let jitter = if jitter_range > 0.0 {
                    rand::thread_rng().gen_range(-jitter_range..jitter_range)
                } else {
                    0.0
                };

                Duration::from_millis((capped_backoff + jitter).max(0.0) as u64)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::None
    }
}

/// Configuration for the recovery engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Maximum number of attempts per call when the caller does not pass an
    /// explicit bound.
    pub max_retries: u32,

    /// Maximum number of suggestions attached to a notification.
    pub max_suggestions: usize,

    /// Elapsed duration past which a failed attempt classifies as a timeout.
    pub timeout_threshold: Duration,

    /// Delay policy between failed attempts.
    pub backoff: BackoffStrategy,

    /// Whether to record metrics.
    pub record_metrics: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_suggestions: 3,
            timeout_threshold: Duration::from_secs(30),
            backoff: BackoffStrategy::default(),
            record_metrics: true,
        }
    }
}

impl RecoveryConfig {
    /// Construct configuration from environment variables.
    ///
    /// This helper is intentionally conservative and never panics; unset or
    /// unparsable values keep their defaults.
    /// - RECOVERY_MAX_RETRIES: positive integer
    /// - RECOVERY_MAX_SUGGESTIONS: non-negative integer
    /// - RECOVERY_TIMEOUT_THRESHOLD_MS: positive integer, milliseconds
    /// - RECOVERY_RECORD_METRICS: "1", "true", "yes", "on" (case-insensitive)
    pub fn from_env() -> Self {
        fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
            env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
        }

        fn parse_bool_var(name: &str, default: bool) -> bool {
            match env::var(name) {
                Ok(val) => {
                    let v = val.trim().to_ascii_lowercase();
                    matches!(v.as_str(), "1" | "true" | "yes" | "on")
                }
                Err(_) => default,
            }
        }

        let defaults = Self::default();

        Self {
            max_retries: parse_var::<u32>("RECOVERY_MAX_RETRIES")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_retries),
            max_suggestions: parse_var::<usize>("RECOVERY_MAX_SUGGESTIONS")
                .unwrap_or(defaults.max_suggestions),
            timeout_threshold: parse_var::<u64>("RECOVERY_TIMEOUT_THRESHOLD_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout_threshold),
            backoff: defaults.backoff,
            record_metrics: parse_bool_var("RECOVERY_RECORD_METRICS", defaults.record_metrics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = RecoveryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_suggestions, 3);
        assert_eq!(config.timeout_threshold, Duration::from_secs(30));
        assert!(matches!(config.backoff, BackoffStrategy::None));
        assert!(config.record_metrics);
    }

    #[test]
    fn immediate_strategy_never_waits() {
        let strategy = BackoffStrategy::None;
        for attempt in 1..=5 {
            assert_eq!(strategy.delay_for(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let strategy = BackoffStrategy::Exponential {
            base: Duration::from_millis(10),
            max: Duration::from_millis(35),
            jitter_factor: 0.0, // Disable jitter for testing
        };

        assert_eq!(strategy.delay_for(1), Duration::from_millis(10));
        assert_eq!(strategy.delay_for(2), Duration::from_millis(20));
        assert_eq!(strategy.delay_for(3), Duration::from_millis(35));
        assert_eq!(strategy.delay_for(10), Duration::from_millis(35));
    }

    #[test]
    fn jitter_stays_within_range() {
        let strategy = BackoffStrategy::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_secs(1),
            jitter_factor: 0.5,
        };

        for _ in 0..50 {
            let delay = strategy.delay_for(1);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn from_env_ignores_invalid_values() {
        std::env::set_var("RECOVERY_MAX_RETRIES", "zero");
        std::env::set_var("RECOVERY_MAX_SUGGESTIONS", "5");
        std::env::set_var("RECOVERY_TIMEOUT_THRESHOLD_MS", "2500");
        std::env::set_var("RECOVERY_RECORD_METRICS", "off");

        let config = RecoveryConfig::from_env();
        assert_eq!(config.max_retries, RecoveryConfig::default().max_retries);
        assert_eq!(config.max_suggestions, 5);
        assert_eq!(config.timeout_threshold, Duration::from_millis(2500));
        assert!(!config.record_metrics);

        std::env::remove_var("RECOVERY_MAX_RETRIES");
        std::env::remove_var("RECOVERY_MAX_SUGGESTIONS");
        std::env::remove_var("RECOVERY_TIMEOUT_THRESHOLD_MS");
        std::env::remove_var("RECOVERY_RECORD_METRICS");
    }
}

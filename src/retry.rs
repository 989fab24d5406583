//! Bounded retries for provider calls.
//!
//! A failed call is classified as transient or permanent. Transient errors
//! are retried after a linear backoff (`initial_backoff * attempt`) until the
//! attempt budget runs out. Permanent errors stop immediately.

use crate::config::{duration_from_secs, RetryConfig};
use crate::error::ProviderError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How a provider error should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected to go away on retry (rate limit, timeout, overload).
    Transient,
    /// Retrying will not help (bad key, malformed request).
    Permanent,
}

/// Decides whether an error is worth retrying.
pub type Classifier = Arc<dyn Fn(&ProviderError) -> ErrorClass + Send + Sync>;

/// HTTP status codes worth retrying, compared with the error code exactly.
pub const TRANSIENT_STATUS_CODES: &[&str] = &["429", "500", "502", "503", "504"];

/// Substrings marking a transient failure, matched case-insensitively
/// against the error code and message.
pub const TRANSIENT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "quota",
    "resource_exhausted",
    "timeout",
    "timed out",
    "serviceunavailable",
    "unavailable",
    "overloaded",
];

/// Status-code and substring classifier over [`TRANSIENT_STATUS_CODES`]
/// and [`TRANSIENT_MARKERS`].
///
/// Anything it does not recognize is permanent.
pub fn default_classifier(err: &ProviderError) -> ErrorClass {
    if TRANSIENT_STATUS_CODES.contains(&err.code.trim()) {
        return ErrorClass::Transient;
    }

    let haystack = format!("{} {}", err.code, err.message).to_lowercase();

    if TRANSIENT_MARKERS.iter().any(|m| haystack.contains(m)) {
        ErrorClass::Transient
    } else {
        ErrorClass::Permanent
    }
}

/// Attempt budget and backoff base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Wait before retry `n` is `initial_backoff * n`.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(3),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: duration_from_secs(config.initial_backoff_seconds),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff.saturating_mul(attempt)
    }
}

/// Runs provider calls under a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    classifier: Classifier,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryExecutor {
    /// Executor using [`default_classifier`].
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            classifier: Arc::new(default_classifier),
        }
    }

    /// Replace the error classifier.
    #[allow(dead_code)]
    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&ProviderError) -> ErrorClass + Send + Sync + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Run `call` until it succeeds, fails permanently, or the attempt
    /// budget is spent. Returns the last error on failure.
    ///
    /// `label` only appears in log lines.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("Attempt {}/{} for {}", attempt, max_attempts, label);

            let err = match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            match (self.classifier)(&err) {
                ErrorClass::Permanent => {
                    warn!("❌ Permanent error for {}: {}", label, err);
                    return Err(err);
                }
                ErrorClass::Transient if attempt < max_attempts => {
                    let wait = self.policy.backoff_for(attempt);
                    warn!(
                        "⚠️  Transient error on attempt {} for {}: {}. Waiting {:.1}s before retrying",
                        attempt,
                        label,
                        err,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                ErrorClass::Transient => {
                    error!(
                        "❌ Giving up on {} after {} attempts: {}",
                        label, max_attempts, err
                    );
                    return Err(err);
                }
            }
        }
    }
}

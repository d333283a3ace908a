//! Bounded retry policy applied to every remote activity call

use crate::activities::{ActivityError, ActivityResult};
use crate::config::RetryConfig;
use crate::error::{ApprovalError, Result};
use std::future::Future;
use std::time::Duration;

/// Retry policy with exponential backoff and a per-attempt timeout.
///
/// Transient failures and timeouts are retried until `max_attempts` is
/// reached; invalid input is never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub maximum_interval: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_interval: Duration::from_millis(config.initial_interval_ms),
            backoff_coefficient: config.backoff_coefficient.max(1.0),
            maximum_interval: Duration::from_millis(config.maximum_interval_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl RetryPolicy {
    /// Policy without backoff delays, for callers that drive time themselves
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_interval: Duration::ZERO,
            backoff_coefficient: 1.0,
            maximum_interval: Duration::ZERO,
            timeout: Duration::from_secs(crate::constants::ACTIVITY_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn next_interval(&self, current: Duration) -> Duration {
        current
            .mul_f64(self.backoff_coefficient)
            .min(self.maximum_interval)
    }

    /// Run `call` until it succeeds, fails with invalid input, or exhausts the policy
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ActivityResult<T>>,
    {
        let mut interval = self.initial_interval;
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        log::info!("{} succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(value);
                }
                Ok(Err(ActivityError::Invalid(message))) => {
                    log::error!("{} rejected its input: {}", operation, message);
                    return Err(ApprovalError::ContractViolation(format!(
                        "{}: {}",
                        operation, message
                    )));
                }
                Ok(Err(ActivityError::Transient(message))) => last_error = message,
                Err(_) => last_error = format!("timed out after {:?}", self.timeout),
            }

            if attempt < self.max_attempts {
                log::warn!(
                    "{} attempt {}/{} failed: {}; retrying in {:?}",
                    operation,
                    attempt,
                    self.max_attempts,
                    last_error,
                    interval
                );
                tokio::time::sleep(interval).await;
                interval = self.next_interval(interval);
            }
        }

        log::error!(
            "{} failed after {} attempts: {}",
            operation,
            self.max_attempts,
            last_error
        );
        Err(ApprovalError::RetryExhausted {
            operation: operation.to_string(),
            attempts: self.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::immediate(3);

        let result = policy
            .run("upload", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(ActivityError::Transient(format!("attempt {} failed", n)))
                } else {
                    Ok(n)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_reported_with_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::immediate(2);

        let err = policy
            .run("dispatch_review(Review2)", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ActivityError::Transient("connection refused".to_string()))
            })
            .await
            .unwrap_err();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(err.kind(), ErrorKind::RetryExhausted);
        match err {
            ApprovalError::RetryExhausted { operation, attempts, last_error } => {
                assert_eq!(operation, "dispatch_review(Review2)");
                assert_eq!(attempts, 2);
                assert_eq!(last_error, "connection refused");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::immediate(5);

        let err = policy
            .run("complete", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ActivityError::Invalid("reviewer bob rejected".to_string()))
            })
            .await
            .unwrap_err();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failed_attempt() {
        let policy = RetryPolicy::immediate(2).with_timeout(Duration::from_millis(5));

        let err = policy
            .run("finalize", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), ActivityError>(())
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 5,
            initial_interval_ms: 1_000,
            backoff_coefficient: 2.0,
            maximum_interval_ms: 3_000,
            timeout_secs: 10,
        });
        let second = policy.next_interval(policy.initial_interval);
        let third = policy.next_interval(second);
        assert_eq!(second, Duration::from_secs(2));
        assert_eq!(third, Duration::from_secs(3));
    }
}

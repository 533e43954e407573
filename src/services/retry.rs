//! Lock-retry-with-backoff helper
//!
//! Concurrent runs across providers can contend on the same underlying
//! resource (typically attachment creation). Best-effort side writes wrap
//! the operation in a small retry policy: bounded attempts, exponential
//! backoff, and optionally swallowing the final failure so the surrounding
//! run keeps its correctness guarantees.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// When true, exhausting all attempts yields Ok(None) instead of the
    /// last error; the caller logs a notice and continues
    pub swallow_on_exhaustion: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, swallow_on_exhaustion: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
            swallow_on_exhaustion,
        }
    }

    /// Run `op` until it succeeds or attempts are exhausted. Delay doubles
    /// after each failed attempt.
    pub async fn run<T, F, Fut>(&self, op: F) -> AppResult<Option<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut delay = self.base_delay;
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) => return Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(
                        "retryable operation failed (attempt {}/{}): {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        if self.swallow_on_exhaustion {
            tracing::warn!(
                "operation abandoned after {} attempts (best-effort, continuing)",
                self.max_attempts
            );
            Ok(None)
        } else {
            Err(last_error.unwrap_or_else(|| AppError::Internal("retry exhausted".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let policy = RetryPolicy::new(3, 1, false);
        let result = policy.run(|| async { Ok::<_, AppError>(42) }).await.unwrap();
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let policy = RetryPolicy::new(3, 1, false);
        let attempts = AtomicU32::new(0);
        let result = policy
            .run(|| async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::Internal("busy".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, Some(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_swallow_on_exhaustion() {
        let policy = RetryPolicy::new(2, 1, true);
        let result: Option<i32> = policy
            .run(|| async { Err(AppError::Internal("locked".to_string())) })
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_error_propagated_without_swallow() {
        let policy = RetryPolicy::new(2, 1, false);
        let result: AppResult<Option<i32>> = policy
            .run(|| async { Err(AppError::Internal("locked".to_string())) })
            .await;
        assert!(result.is_err());
    }
}

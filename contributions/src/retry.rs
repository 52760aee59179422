use crate::api::{Error, Result};
use derive_more::Constructor;
use log::warn;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Constructor)]
pub struct RetryPolicy {
    /// Attempts made after the first one fails.
    pub retries: u32,
    /// Wait before the first retry, doubled after each further failure.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(DEFAULT_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

/// Runs `operation` until it succeeds, fails permanently or the retry budget is spent.
///
/// Not-found failures are returned after the first attempt. Any other failure is retried
/// after `delay`, `2 * delay`, `4 * delay`, ... so at most `retries + 1` attempts are made.
/// Cancelling `cancel` aborts both a running attempt and a pending backoff with [`Error::Cancelled`].
pub async fn retry<T, F, FUT>(policy: &RetryPolicy, cancel: &CancellationToken, mut operation: F) -> Result<T>
where
    F: FnMut() -> FUT,
    FUT: Future<Output = Result<T>>,
{
    let mut retries = policy.retries;
    let mut delay = policy.delay;
    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = operation() => outcome,
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if retries == 0 || err.is_not_found() => return Err(err),
            Err(err) => {
                warn!(
                    "Attempt failed, retrying in {} ms ({} retries left): {}",
                    delay.as_millis(),
                    retries,
                    err
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                retries -= 1;
                delay = delay.saturating_mul(2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn transient() -> Error {
        Error::Status {
            status: 502,
            url: "/repos/o/r/commits".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget_with_doubling_delays() {
        let start = Instant::now();
        let attempts = Mutex::new(Vec::new());
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));

        let result: Result<()> = retry(&policy, &CancellationToken::new(), || {
            attempts.lock().unwrap().push(start.elapsed());
            async { Err(transient()) }
        })
        .await;

        assert!(matches!(result, Err(Error::Status { status: 502, .. })));
        let attempts = attempts.into_inner().unwrap();
        assert_eq!(
            attempts,
            vec![
                Duration::from_millis(0),
                Duration::from_millis(1000),
                Duration::from_millis(3000),
                Duration::from_millis(7000),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = retry(&RetryPolicy::default(), &CancellationToken::new(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::NotFound("/repos/o/typo".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        let result: Result<()> = retry(&policy, &CancellationToken::new(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::RateLimited { reset: 0 }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_from_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = retry(&RetryPolicy::default(), &CancellationToken::new(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(transient())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        let result: Result<()> = retry(&policy, &cancel, || async { Err(transient()) }).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn cancelled_token_skips_operation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let attempts = AtomicU32::new(0);
        let result = retry(&RetryPolicy::default(), &cancel, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
    }
}

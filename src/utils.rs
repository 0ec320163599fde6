use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use card_reader_types::RetryConfig;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Cancelled;

/// Run `f`, retrying every failure up to `retries` more times.
///
/// The sleep before retry `n` is `initial_backoff * 2^n`, capped at
/// `max_backoff`. The last error is returned once retries are exhausted.
pub async fn with_retries<T, F, Fut>(
    retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
    f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let config = RetryConfig {
        retries,
        initial_backoff,
        max_backoff,
    };
    with_retry_config(&config, f).await
}

pub async fn with_retry_config<T, F, Fut>(config: &RetryConfig, f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_loop(config, None, f).await
}

/// [`with_retry_config`] that gives up with [`Cancelled`] as soon as `cancel`
/// fires, including mid-backoff. An attempt already in flight is not
/// interrupted; its result is discarded.
pub async fn with_retries_cancellable<T, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_loop(config, Some(cancel), f).await
}

async fn retry_loop<T, F, Fut>(
    config: &RetryConfig,
    cancel: Option<&CancellationToken>,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0usize;

    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(Cancelled.into());
        }
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt >= config.retries {
                    return Err(e);
                }
                let backoff = config.backoff_for(attempt);
                attempt += 1;
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, error = %e, "retrying");
                match cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = token.cancelled() => return Err(Cancelled.into()),
                            _ = tokio::time::sleep(backoff) => {}
                        }
                    }
                    None => tokio::time::sleep(backoff).await,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();
        let value = with_retries(3, Duration::from_millis(1000), Duration::from_millis(8000), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(anyhow!("boom {}", n))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms + 2000ms of backoff.
        assert!(started.elapsed() >= Duration::from_millis(3000));
        assert!(started.elapsed() < Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_after_exhausting() {
        let calls = AtomicUsize::new(0);
        let err = with_retry_config(&RetryConfig::new(2, 10, 100), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(anyhow!("attempt {}", n)) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "attempt 2");
    }

    #[tokio::test]
    async fn test_no_retries_calls_once() {
        let calls = AtomicUsize::new(0);
        let result = with_retry_config(&RetryConfig::none(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(anyhow!("nope")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let task = {
            let token = token.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                with_retries_cancellable(&RetryConfig::new(5, 60_000, 60_000), &token, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(anyhow!("down")) }
                })
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        let err = task.await.unwrap().unwrap_err();
        assert!(err.is::<Cancelled>());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

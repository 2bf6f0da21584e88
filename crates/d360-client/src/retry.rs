//! Bounded retry with exponential backoff.

use crate::error::{D360Error, D360Result};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, TransportFailure};
use log::{debug, warn};
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Delay schedule: the n-th retry sleeps `unit * 2^n`, optionally capped and
/// with up to `jitter` of random extra delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub unit: Duration,
    pub max_delay: Option<Duration>,
    pub jitter: Option<Duration>,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            max_delay: None,
            jitter: None,
        }
    }
}

impl Backoff {
    pub fn delay(&self, retry: u32) -> Duration {
        let mut delay = self.unit.saturating_mul(2u32.saturating_pow(retry));
        if let Some(jitter) = self.jitter {
            let jitter_ms = u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX);
            if jitter_ms > 0 {
                let extra = Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms));
                delay = delay.saturating_add(extra);
            }
        }
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

/// How many attempts a call gets and which failures earn another one.
///
/// Only attempt failures are retried. Any HTTP response, whatever its
/// status, ends the loop.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub retryable: fn(&TransportFailure) -> bool,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            retryable: TransportFailure::is_transient,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
            ..Default::default()
        }
    }

    /// Drive `attempt` until it yields a response or the budget runs out.
    /// The closure receives the 1-based attempt number.
    pub async fn run<F, Fut>(&self, mut attempt: F) -> D360Result<ApiResponse>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<ApiResponse, TransportFailure>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut failures = 0u32;
        loop {
            let failure = match attempt(failures + 1).await {
                Ok(resp) => return Ok(resp),
                Err(failure) => failure,
            };

            if !(self.retryable)(&failure) {
                return Err(match failure {
                    TransportFailure::Network(cause) => D360Error::transport(failures + 1, cause),
                    TransportFailure::Request(cause) => {
                        D360Error::internal(format!("Could not build request: {}", cause))
                    }
                });
            }

            failures += 1;
            if failures >= max_attempts {
                warn!("Giving up after {} attempt(s): {}", failures, failure);
                return Err(D360Error::transport(failures, failure.to_string()));
            }

            let delay = self.backoff.delay(failures);
            warn!(
                "Attempt {} failed ({}), retrying in {:?}",
                failures, failure, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Send `request` through `transport` under this policy.
    pub async fn execute(
        &self,
        transport: &dyn HttpTransport,
        request: &ApiRequest,
    ) -> D360Result<ApiResponse> {
        self.run(|n| {
            debug!("{} {} (attempt {})", request.method, request.path, n);
            transport.execute(request)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::D360ErrorCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn network(msg: &str) -> TransportFailure {
        TransportFailure::Network(msg.to_string())
    }

    #[test]
    fn test_backoff_doubles() {
        let b = Backoff::default();
        assert_eq!(b.delay(1), Duration::from_secs(2));
        assert_eq!(b.delay(2), Duration::from_secs(4));
        assert_eq!(b.delay(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_cap_and_jitter() {
        let b = Backoff {
            unit: Duration::from_millis(100),
            max_delay: Some(Duration::from_millis(500)),
            jitter: Some(Duration::from_millis(50)),
        };
        let d1 = b.delay(1);
        assert!(d1 >= Duration::from_millis(200) && d1 < Duration::from_millis(250));
        assert_eq!(b.delay(10), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_saturates_with_jitter() {
        let b = Backoff {
            unit: Duration::from_millis(u64::MAX),
            max_delay: None,
            jitter: Some(Duration::MAX),
        };
        assert_eq!(b.delay(40), Duration::MAX);

        let capped = Backoff {
            max_delay: Some(Duration::from_secs(60)),
            ..b
        };
        assert_eq!(capped.delay(40), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let resp = RetryPolicy::default()
            .run(|_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(network("connection reset"))
                    } else {
                        Ok(ApiResponse::new(200, "{}"))
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(network("timed out")) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.code, D360ErrorCode::Transport);
        assert!(err.message.contains("3 attempt"));
        assert!(err.details.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_response_is_never_retried() {
        let calls = AtomicU32::new(0);
        let resp = RetryPolicy::default()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(ApiResponse::new(503, "unavailable")) }
            })
            .await
            .unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TransportFailure::Request("bad url".into())) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.code, D360ErrorCode::Internal);
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let policy = RetryPolicy {
            retryable: |_| false,
            ..RetryPolicy::default()
        };
        let err = policy
            .run(|_| async { Err(network("refused")) })
            .await
            .unwrap_err();
        assert_eq!(err.code, D360ErrorCode::Transport);
        assert!(err.message.contains("1 attempt"));
    }
}

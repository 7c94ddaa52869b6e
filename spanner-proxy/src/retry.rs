//! Retry classification and backoff for the adapter RPCs.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tonic::{Code, Status};
use tonic_types::StatusExt;

/// `INTERNAL` errors carrying one of these signatures denote a terminated
/// stream and are not retried. The substrings match the gRPC client's error
/// formatting.
const TERMINAL_INTERNAL_ERRORS: [&str; 4] = [
    "stream terminated by RST_STREAM",
    "HTTP/2 error code: INTERNAL_ERROR",
    "Connection closed with unknown cause",
    "Received unexpected EOS on DATA frame from server",
];

/// Fallback backoff used when the server did not return any retry
/// information.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    cur: Duration,
    max: Duration,
    multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            cur: Duration::from_millis(20),
            max: Duration::from_secs(32),
            multiplier: 1.3,
        }
    }
}

impl Backoff {
    /// Returns the next jittered delay and advances the ceiling.
    fn pause(&mut self) -> Duration {
        let ceiling = self.cur.as_nanos().max(1) as u64;
        let delay = Duration::from_nanos(rand::thread_rng().gen_range(1..=ceiling));
        self.cur = self.cur.mul_f64(self.multiplier).min(self.max);
        delay
    }

    #[cfg(test)]
    fn ceiling(&self) -> Duration {
        self.cur
    }
}

fn is_retryable(status: &Status) -> bool {
    match status.code() {
        Code::ResourceExhausted | Code::Unavailable => true,
        Code::Internal => !TERMINAL_INTERNAL_ERRORS
            .iter()
            .any(|signature| status.message().contains(signature)),
        _ => false,
    }
}

/// Extracts the retry backoff the server attached to the error, if any.
pub(crate) fn extract_retry_delay(status: &Status) -> Option<Duration> {
    status.get_details_retry_info().and_then(|info| info.retry_delay)
}

/// Returns how long to wait before the next attempt, or `None` if the error
/// is not retryable. A server-provided retry delay overrides the computed
/// backoff.
fn retry_delay(status: &Status, backoff: &mut Backoff) -> Option<Duration> {
    if !is_retryable(status) {
        return None;
    }
    let delay = backoff.pause();
    Some(extract_retry_delay(status).unwrap_or(delay))
}

/// Runs `f` until it succeeds or fails with a non-retryable error. With
/// `disable_retry` the first error is returned as-is; the first attempt is
/// always made.
pub(crate) async fn run_with_retry<T, F, Fut>(disable_retry: bool, f: F) -> Result<T, Status>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, Status>>,
{
    let mut backoff = Backoff::default();
    loop {
        let status = match f().await {
            Ok(v) => return Ok(v),
            Err(status) => status,
        };
        if disable_retry {
            return Err(status);
        }
        match retry_delay(&status, &mut backoff) {
            Some(delay) => tokio::time::sleep(delay).await,
            None => return Err(status),
        }
    }
}

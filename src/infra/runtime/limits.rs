use std::future::Future;
use std::time::Duration;

use crate::core::error::TransportError;
use crate::infra::config::TransportConfig;

const FIRST_BACKOFF: Duration = Duration::from_millis(50);
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Build a reqwest client bounded by the configured timeouts.
pub fn make_http_client_with(cfg: &TransportConfig) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .connect_timeout(cfg.connect_timeout)
        .timeout(cfg.timeout)
        .build()
        .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))
}

/// Pause before retry number `retry` (0-based): 50ms, 100ms, 200ms ... capped at 1s.
pub fn backoff(retry: u32) -> Duration {
    FIRST_BACKOFF
        .saturating_mul(1u32 << retry.min(16))
        .min(MAX_BACKOFF)
}

/// Run `op(attempt)`, re-running it up to `retries` more times while
/// `retryable` accepts the error. The caller owns the overall deadline.
pub async fn retry_async<T, E, Fut, F, P>(retries: u32, retryable: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Err(e) if attempt < retries && retryable(&e) => {
                tokio::time::sleep(backoff(attempt)).await;
                attempt += 1;
            }
            done => return done,
        }
    }
}

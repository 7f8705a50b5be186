//! Transport-level retry for upstream GET requests.
//!
//! Only transient failures are retried: timeouts, connection errors and 5xx
//! responses. A 4xx is returned to the caller at once. Business-level
//! fallbacks (cached flight payloads, weather sentinels) live in the callers.

use rand::Rng;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::errors::TravelError;

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Backoff for the given retry with up to 50% random jitter added
fn jittered_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let ceiling = retry.backoff_ms(attempt);
    let jitter = if ceiling > 1 {
        rand::thread_rng().gen_range(0..=ceiling / 2)
    } else {
        0
    };
    Duration::from_millis(ceiling + jitter)
}

/// Send a request built by `build`, retrying transient failures.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed on send.
/// Returns the first successful (2xx) response.
pub async fn send_with_retry<F>(
    build: F,
    retry: &RetryConfig,
    label: &str,
) -> Result<Response, TravelError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        let outcome = match build().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let err = TravelError::UpstreamError(format!("{label} returned {status}: {body}"));
                if !is_retryable_status(status) {
                    return Err(err);
                }
                err
            }
            Err(e) => {
                let transient = e.is_timeout() || e.is_connect();
                let err = TravelError::from(e);
                if !transient {
                    return Err(err);
                }
                err
            }
        };

        if attempt >= retry.max_retries {
            warn!(upstream = label, attempts = attempt + 1, error = %outcome, "Giving up on upstream request");
            return Err(outcome);
        }
        attempt += 1;
        let delay = jittered_delay(retry, attempt);
        debug!(upstream = label, attempt, delay_ms = delay.as_millis() as u64, error = %outcome, "Retrying upstream request");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_jitter_stays_within_half_of_backoff() {
        let retry = RetryConfig::default();
        for attempt in 1..=4 {
            let base = retry.backoff_ms(attempt);
            let delay = jittered_delay(&retry, attempt).as_millis() as u64;
            assert!(delay >= base && delay <= base + base / 2);
        }
    }
}

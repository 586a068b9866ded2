//! Resilient HTTP requests: per-attempt timeout and bounded retries
//!
//! Every network call made by the rating client goes through
//! [`fetch_with_retry`]. A non-2xx status counts as a failure just like a
//! connection error or a timeout, and failed attempts are retried with a
//! linear backoff of `step * (attempt + 1)`.

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use thiserror::Error;
use tracing::{debug, warn};

/// Per-attempt timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Backoff step used when none is configured
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Errors that can occur while performing a request
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    /// Connection failure, timeout, or body read failure
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request body is a stream and cannot be sent more than once
    #[error("request cannot be retried because its body is not cloneable")]
    NotCloneable,
}

/// How many times to retry a request and how long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Timeout applied to each attempt
    pub timeout: Duration,
    /// Base delay; the wait after attempt `n` (0-based) is `step * (n + 1)`
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            timeout: DEFAULT_TIMEOUT,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given 0-based attempt failed
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt + 1)
    }
}

/// Sends `request`, retrying failures according to `policy`
///
/// # Returns
/// * `Ok(Response)` - The first response with a 2xx status
/// * `Err(FetchError)` - The last error once every attempt has failed
pub async fn fetch_with_retry(
    request: RequestBuilder,
    policy: &RetryPolicy,
) -> Result<Response, FetchError> {
    let mut attempt = 0;

    loop {
        let attempt_request = request.try_clone().ok_or(FetchError::NotCloneable)?;

        match send_once(attempt_request, policy.timeout).await {
            Ok(response) => return Ok(response),
            Err(e) if attempt < policy.max_retries => {
                let backoff = policy.backoff(attempt);
                warn!(
                    error = %e,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "request attempt failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(error = %e, attempt = attempt + 1, "request attempt failed, giving up");
                return Err(e);
            }
        }
    }
}

/// Performs a single attempt and maps non-2xx statuses to errors
async fn send_once(request: RequestBuilder, timeout: Duration) -> Result<Response, FetchError> {
    let response = request.timeout(timeout).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Status {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    debug!(status = status.as_u16(), url = %response.url(), "request succeeded");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            timeout: Duration::from_secs(2),
            backoff_step: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.timeout, Duration::from_secs(8));
        assert_eq!(policy.backoff_step, Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let request = Client::new().get(format!("{}/flaky", server.uri()));
        let response = fetch_with_retry(request, &fast_policy(2))
            .await
            .expect("third attempt should succeed");

        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_surfaces_last_error_after_exhausting_retries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let request = Client::new().get(format!("{}/down", server.uri()));
        let result = fetch_with_retry(request, &fast_policy(2)).await;

        match result {
            Err(FetchError::Status { code, reason }) => {
                assert_eq!(code, 500);
                assert_eq!(reason, "Internal Server Error");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn test_status_error_message_format() {
        let err = FetchError::Status {
            code: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }

    #[tokio::test]
    async fn test_zero_retries_makes_single_attempt() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let request = Client::new().get(server.uri());
        assert!(fetch_with_retry(request, &fast_policy(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_attempt_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let policy = RetryPolicy {
            max_retries: 0,
            timeout: Duration::from_millis(50),
            backoff_step: Duration::from_millis(10),
        };
        let request = Client::new().get(server.uri());

        match fetch_with_retry(request, &policy).await {
            Err(FetchError::Request(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_body_is_replayed_on_retry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(wiremock::matchers::body_string("payload"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::body_string("payload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let request = Client::new().post(server.uri()).body("payload");
        assert!(fetch_with_retry(request, &fast_policy(1)).await.is_ok());
    }
}

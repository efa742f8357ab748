//! Retry and status mapping shared by the HTTP model backends

use crate::llm::client::ModelClientError;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Delays between attempts; the first attempt is immediate
pub(crate) const BACKOFF_DELAYS_MS: [u64; 3] = [100, 200, 300];

/// Map a non-success status to the error taxonomy
///
/// Only 5xx becomes [`ModelClientError::ServerError`], so the retry decision
/// never depends on what the body says.
pub(crate) fn map_status_error(api: &str, status: StatusCode, body: String) -> ModelClientError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ModelClientError::AuthenticationFailed(format!("{status} - {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            ModelClientError::RateLimitExceeded(format!("{status} - {body}"))
        }
        s if s.is_server_error() => ModelClientError::ServerError {
            status: s.as_u16(),
            message: format!("{api} API error: {status} - {body}"),
        },
        _ => ModelClientError::ApiError(format!("{api} API error: {status} - {body}")),
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// backoff schedule is exhausted
pub(crate) async fn with_retry<T, F, Fut>(mut attempt: F) -> Result<T, ModelClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ModelClientError>>,
{
    let mut last_error = None;
    for attempt_number in 0..=BACKOFF_DELAYS_MS.len() {
        if attempt_number > 0 {
            let delay_ms = BACKOFF_DELAYS_MS[attempt_number - 1];
            debug!("Model retry attempt {} after {}ms delay", attempt_number, delay_ms);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        match attempt().await {
            Ok(value) => {
                if attempt_number > 0 {
                    debug!("Model request succeeded after {} retries", attempt_number);
                }
                return Ok(value);
            }
            Err(e) => {
                warn!("Model request attempt {} failed: {}", attempt_number + 1, e);
                if !e.is_retryable() {
                    error!("Non-retryable model error, aborting: {}", e);
                    return Err(e);
                }
                last_error = Some(e);
            }
        }
    }

    error!("Model request failed after all retries");
    Err(last_error.unwrap_or_else(|| {
        ModelClientError::NetworkError("All retry attempts failed".to_string())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            map_status_error("OpenAI", StatusCode::UNAUTHORIZED, String::new()),
            ModelClientError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            map_status_error("OpenAI", StatusCode::TOO_MANY_REQUESTS, String::new()),
            ModelClientError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            map_status_error("Anthropic", StatusCode::BAD_GATEWAY, String::new()),
            ModelClientError::ServerError { status: 502, .. }
        ));
    }

    #[test]
    fn test_client_error_body_does_not_make_it_retryable() {
        let error = map_status_error(
            "OpenAI",
            StatusCode::BAD_REQUEST,
            "upstream server error: bad model name".to_string(),
        );
        assert!(matches!(error, ModelClientError::ApiError(_)));
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(|| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Err(ModelClientError::NetworkError("reset".into()))
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ModelClientError::ApiError("bad request".into())) }
        })
        .await;

        assert!(matches!(result, Err(ModelClientError::ApiError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_schedule() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ModelClientError::ServerError {
                    status: 503,
                    message: "unavailable".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(ModelClientError::ServerError { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), BACKOFF_DELAYS_MS.len() + 1);
    }
}

//! Rate-limit backoff and transparent token refresh around HTTP calls.

use std::future::Future;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use serde::Deserialize;

use super::AccessTokenProvider;
use crate::error::{Error, Result};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Longest single wait between attempts, whatever the server asks for.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(120);

/// Structured error body returned by Google APIs.
#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `base_delay * 2^n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows `attempt` (zero-based).
    ///
    /// A server-provided `Retry-After` wins over exponential backoff. Either
    /// way the wait never exceeds [`MAX_RETRY_DELAY`].
    pub fn delay_for(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        let delay = match retry_after {
            Some(seconds) => Duration::from_secs(seconds),
            None => self.base_delay.saturating_mul(2u32.saturating_pow(attempt.min(16))),
        };
        delay.min(MAX_RETRY_DELAY)
    }

    /// Runs `call` with a bearer token until it succeeds or attempts run out.
    ///
    /// 429 waits and retries, 401 refreshes the token and retries, 5xx and
    /// transport failures back off and retry. Anything else is returned at
    /// once. When every attempt fails, the last error is returned unchanged.
    pub async fn execute<P, F, Fut>(&self, tokens: &P, mut call: F) -> Result<Response>
    where
        P: AccessTokenProvider,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = reqwest::Result<Response>>,
    {
        let mut token = tokens.access_token().await?;
        let mut last_error = Error::Http("no attempt made".to_string());

        for attempt in 0..=self.max_retries {
            let retry_after = match call(token.clone()).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = retry_after_secs(&response);
                    tracing::warn!(
                        "Rate limited (attempt {}), retry after {:?}s",
                        attempt + 1,
                        retry_after
                    );
                    last_error = Error::RateLimited { retry_after };
                    retry_after
                }
                Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                    tracing::debug!("Access token rejected; refreshing");
                    last_error = Error::TokenExpired;
                    token = tokens.refresh().await?;
                    continue;
                }
                Ok(response) => {
                    let err = error_from_response(response).await;
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    tracing::warn!("Request failed (attempt {}): {}", attempt + 1, err);
                    last_error = err;
                    None
                }
                Err(e) => {
                    tracing::warn!("Request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Error::Http(e.to_string());
                    None
                }
            };

            if attempt < self.max_retries {
                tokio::time::sleep(self.delay_for(attempt, retry_after)).await;
            }
        }

        Err(last_error)
    }
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Converts a non-2xx response into an [`Error`].
pub async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return Error::Http(e.to_string()),
    };

    let (reason, message) = match serde_json::from_str::<GoogleErrorBody>(&body) {
        Ok(parsed) => (
            parsed
                .error
                .status
                .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string()),
            parsed.error.message,
        ),
        Err(_) => (
            status.canonical_reason().unwrap_or_default().to_string(),
            body,
        ),
    };

    if status == StatusCode::NOT_FOUND {
        return Error::NotFound(message);
    }
    Error::Api {
        status: status.as_u16(),
        reason,
        message,
    }
}

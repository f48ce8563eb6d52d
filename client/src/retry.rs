//! Backoff for lookup requests.
//!
//! A request is resent on 408, 409, 429 and 5xx responses, and on connect or
//! timeout failures. The service can steer this with `x-should-retry:
//! true|false` and with `Retry-After` / `Retry-After-Ms`, which replace the
//! computed delay when they fall inside (0, 60s).
//!
//! Delays double from [`RetryConfig::initial_delay`] up to
//! [`RetryConfig::max_delay`], then shrink by a random share of up to
//! `jitter_factor` so clients started together drift apart.
//!
//! Starting a session is safe to repeat. Submitting challenge text is not:
//! the service burns the text on receipt, so solve calls use
//! [`RetryConfig::none`].

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response, StatusCode};

const MAX_SERVER_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Resends after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Largest share (0.0..=1.0) a delay may be shortened by.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    /// Send once, never resend.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Pause before resend number `step + 1`.
    ///
    /// A server-provided delay in `headers` takes precedence.
    #[must_use]
    pub fn delay_for(&self, step: u32, headers: Option<&HeaderMap>) -> Duration {
        if let Some(delay) = headers.and_then(server_delay) {
            return delay;
        }

        let doubled = self
            .initial_delay
            .saturating_mul(2_u32.saturating_pow(step))
            .min(self.max_delay);
        let shrink = rand::random::<f64>() * self.jitter_factor.clamp(0.0, 1.0);
        doubled.mul_f64(1.0 - shrink)
    }
}

/// Delay the server asked for, if it is usable.
#[must_use]
pub fn server_delay(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);
    let usable = |d: &Duration| !d.is_zero() && *d < MAX_SERVER_DELAY;

    let millis = header("retry-after-ms")
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|ms| ms.is_finite() && *ms > 0.0)
        .map(|ms| Duration::from_secs_f64(ms / 1000.0))
        .filter(usable);

    millis.or_else(|| {
        header("retry-after")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .filter(usable)
    })
}

/// Whether an error response may be resent.
#[must_use]
pub fn is_retryable_status(status: StatusCode, headers: &HeaderMap) -> bool {
    let forced = headers
        .get("x-should-retry")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| match v.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        });

    forced.unwrap_or(matches!(status.as_u16(), 408 | 409 | 429 | 500..=599))
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

/// Final result of [`send`].
#[derive(Debug)]
pub enum SendOutcome {
    /// 2xx response.
    Success(Response),
    /// Last non-2xx response, kept so its body can be read.
    ErrorStatus(Response),
    /// No response at all.
    Failed {
        attempts: u32,
        source: reqwest::Error,
    },
}

impl SendOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Send the request built by `build`, resending per `config`.
///
/// `build` runs once per attempt.
pub async fn send<F>(build: F, config: &RetryConfig) -> SendOutcome
where
    F: Fn() -> RequestBuilder,
{
    let mut step: u32 = 0;

    loop {
        let exhausted = step >= config.max_retries;

        let delay = match build().send().await {
            Ok(response) if response.status().is_success() => {
                return SendOutcome::Success(response);
            }
            Ok(response) => {
                let status = response.status();
                if exhausted || !is_retryable_status(status, response.headers()) {
                    return SendOutcome::ErrorStatus(response);
                }
                let delay = config.delay_for(step, Some(response.headers()));
                tracing::debug!(
                    %status,
                    retry_count = step + 1,
                    delay_ms = delay.as_millis(),
                    "Resending after error status"
                );
                delay
            }
            Err(source) => {
                if exhausted || !is_retryable_error(&source) {
                    return SendOutcome::Failed {
                        attempts: step + 1,
                        source,
                    };
                }
                let delay = config.delay_for(step, None);
                tracing::debug!(
                    error = %source,
                    retry_count = step + 1,
                    delay_ms = delay.as_millis(),
                    "Resending after transport error"
                );
                delay
            }
        };

        tokio::time::sleep(delay).await;
        step += 1;
    }
}

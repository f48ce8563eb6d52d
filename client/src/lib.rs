//! Client for the remote IMEI lookup and challenge service.
//!
//! # Architecture
//!
//! - [`LookupService`] - the seam the verification session talks through
//! - [`HttpLookupService`] - reqwest implementation of the service contract
//! - [`retry`] - backoff policy applied to idempotent calls
//!
//! # Service Contract
//!
//! | Call | Success body | Error body |
//! |------|--------------|------------|
//! | `GET /start/{imei}` | `{ captcha_image, session_id }` | `{ detail }` |
//! | `POST /solve` `{ session_id, captcha_text }` | `{ status, message }` | `{ detail }` |
//!
//! # Error Handling
//!
//! Every failure is a [`ServiceError`]. Its message is the service's `detail`
//! when one was sent and a generic "unreachable" message otherwise; transport
//! specifics go to the log, not to the user.

pub mod retry;
mod http;
mod wire;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use http::HttpLookupService;
pub use imei_types::{
    ChallengeAttempt, Imei, SERVICE_UNREACHABLE, ServiceError, ServiceErrorKind, Session,
    SessionId, SolveResult, Verdict,
};
use retry::RetryConfig;

/// Base URL of the reference deployment.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Operations the remote lookup service provides.
pub trait LookupService: Send + Sync {
    /// Open a session for `imei` and fetch its challenge.
    fn start(&self, imei: &Imei) -> impl Future<Output = Result<Session, ServiceError>> + Send;

    /// Submit an answer to the challenge of session `session`.
    fn solve(
        &self,
        session: &SessionId,
        attempt: &ChallengeAttempt,
    ) -> impl Future<Output = Result<SolveResult, ServiceError>> + Send;
}

impl<T: LookupService> LookupService for Arc<T> {
    fn start(&self, imei: &Imei) -> impl Future<Output = Result<Session, ServiceError>> + Send {
        (**self).start(imei)
    }

    fn solve(
        &self,
        session: &SessionId,
        attempt: &ChallengeAttempt,
    ) -> impl Future<Output = Result<SolveResult, ServiceError>> + Send {
        (**self).solve(session, attempt)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientConfigError {
    #[error("invalid service URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("service URL must use http or https, got {0:?}")]
    UnsupportedScheme(String),
}

/// Connection settings for [`HttpLookupService`].
///
/// ```rust
/// use std::time::Duration;
/// use imei_client::ClientConfig;
/// use imei_client::retry::RetryConfig;
///
/// let config = ClientConfig::new("http://127.0.0.1:8000")
///     .unwrap()
///     .with_request_timeout(Some(Duration::from_secs(30)))
///     .with_start_retry(RetryConfig::none());
/// # let _ = config;
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: url::Url,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
    start_retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ClientConfigError> {
        let trimmed = base_url.trim();
        let parsed = url::Url::parse(trimmed).map_err(|source| ClientConfigError::InvalidUrl {
            url: trimmed.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientConfigError::UnsupportedScheme(
                parsed.scheme().to_string(),
            ));
        }

        Ok(Self {
            base_url: parsed,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            start_retry: RetryConfig::default(),
        })
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `None` disables the overall request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_start_retry(mut self, retry: RetryConfig) -> Self {
        self.start_retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    #[must_use]
    pub fn start_retry(&self) -> &RetryConfig {
        &self.start_retry
    }
}

/// Read an error response body, keeping at most 32 KiB.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            break;
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

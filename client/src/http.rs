use reqwest::{Response, redirect};

use imei_types::{
    ChallengeAttempt, ChallengeImage, Imei, ServiceError, Session, SessionId, SolveResult, Verdict,
};

use crate::retry::{self, RetryConfig, SendOutcome};
use crate::wire::{SolveRequest, SolveResponse, StartResponse, extract_detail};
use crate::{ClientConfig, LookupService, read_capped_error_body};

const USER_AGENT: &str = concat!("imei-hunter/", env!("CARGO_PKG_VERSION"));

/// [`LookupService`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpLookupService {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpLookupService {
    pub fn new(config: ClientConfig) -> Result<Self, ServiceError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout())
            .redirect(redirect::Policy::none());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            tracing::error!(error = %e, "Failed to build HTTP client");
            ServiceError::config(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base URL with `segments` appended, each escaped as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<url::Url, ServiceError> {
        let mut url = self.config.base_url().clone();
        url.path_segments_mut()
            .map_err(|()| ServiceError::config("service URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl LookupService for HttpLookupService {
    async fn start(&self, imei: &Imei) -> Result<Session, ServiceError> {
        let url = self.endpoint(&["start", imei.as_str()])?;
        tracing::debug!(imei = %imei.masked(), "Requesting verification session");

        let outcome = retry::send(
            || self.client.get(url.clone()),
            self.config.start_retry(),
        )
        .await;
        let response = into_success(outcome, "start").await?;
        let status = response.status().as_u16();

        let body: StartResponse = response
            .json()
            .await
            .map_err(|e| body_error(&e, status, "start"))?;

        let Some(id) = SessionId::new(body.session_id) else {
            tracing::warn!(endpoint = "start", "Service returned an empty session id");
            return Err(ServiceError::decode(status));
        };

        tracing::info!(imei = %imei.masked(), session_id = %id, "Verification session started");
        Ok(Session::new(id, ChallengeImage::new(body.captcha_image)))
    }

    async fn solve(
        &self,
        session: &SessionId,
        attempt: &ChallengeAttempt,
    ) -> Result<SolveResult, ServiceError> {
        let url = self.endpoint(&["solve"])?;
        let request = SolveRequest {
            session_id: session.as_str(),
            captcha_text: attempt.as_str(),
        };

        // The service consumes the text on receipt; never resend it.
        let outcome = retry::send(
            || self.client.post(url.clone()).json(&request),
            &RetryConfig::none(),
        )
        .await;
        let response = into_success(outcome, "solve").await?;
        let status = response.status().as_u16();

        let body: SolveResponse = response
            .json()
            .await
            .map_err(|e| body_error(&e, status, "solve"))?;

        let result = SolveResult::from_wire(&body.status, body.message);
        if let SolveResult::Resolved(outcome) = &result
            && let Verdict::Unrecognized(raw) = &outcome.verdict
        {
            tracing::warn!(
                session_id = %session,
                status = %raw,
                "Unrecognized solve status, treating as unknown"
            );
        }
        Ok(result)
    }
}

async fn into_success(
    outcome: SendOutcome,
    endpoint: &'static str,
) -> Result<Response, ServiceError> {
    match outcome {
        SendOutcome::Success(response) => Ok(response),
        SendOutcome::ErrorStatus(response) => {
            let status = response.status();
            let body = read_capped_error_body(response).await;
            let detail = extract_detail(&body);
            tracing::warn!(
                %status,
                endpoint,
                has_detail = detail.is_some(),
                "Lookup service returned an error status"
            );
            Err(ServiceError::http(status.as_u16(), detail.as_deref()))
        }
        SendOutcome::Failed { attempts, source } => {
            tracing::warn!(error = %source, attempts, endpoint, "Lookup service unreachable");
            Err(ServiceError::transport())
        }
    }
}

fn body_error(error: &reqwest::Error, status: u16, endpoint: &'static str) -> ServiceError {
    if error.is_decode() {
        tracing::warn!(error = %error, endpoint, "Malformed response body");
        ServiceError::decode(status)
    } else {
        tracing::warn!(error = %error, endpoint, "Failed to read response body");
        ServiceError::transport()
    }
}
